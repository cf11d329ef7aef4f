use super::value::{compare_values, field};
use super::Document;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
    Lt,
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, data: &Value) -> bool {
        let Some(actual) = field(data, &self.field) else {
            return false;
        };
        let ord = compare_values(actual, &self.value);
        match self.op {
            FilterOp::Eq => actual == &self.value,
            FilterOp::Gte => ord != Ordering::Less && same_kind(actual, &self.value),
            FilterOp::Lte => ord != Ordering::Greater && same_kind(actual, &self.value),
            FilterOp::Lt => ord == Ordering::Less && same_kind(actual, &self.value),
        }
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Conjunction of field filters over one collection, with optional ordering.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Gte, value)
    }

    pub fn lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lte, value)
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Lt, value)
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn without_order(&self) -> Self {
        Self {
            order_by: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(data))
    }

    /// Stable in-memory sort by `order_by`; documents missing the field sort first.
    pub fn sort_documents(&self, docs: &mut [Document]) {
        let Some(order) = &self.order_by else { return };
        docs.sort_by(|a, b| {
            let ord = match (field(&a.data, &order.field), field(&b.data, &order.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DocPath;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document {
            path: DocPath::new("trips", id),
            data,
            version: 1,
        }
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let q = Query::new("trips")
            .eq("busId", "bus1")
            .gte("departureTime", "2024-12-25T00:00:00Z")
            .lte("departureTime", "2024-12-25T23:59:59Z");

        assert!(q.matches(&json!({"busId": "bus1", "departureTime": "2024-12-25T08:00:00Z"})));
        assert!(!q.matches(&json!({"busId": "bus2", "departureTime": "2024-12-25T08:00:00Z"})));
        assert!(!q.matches(&json!({"busId": "bus1", "departureTime": "2024-12-26T08:00:00Z"})));
        assert!(!q.matches(&json!({"busId": "bus1"})));
    }

    #[test]
    fn test_exclusive_upper_bound_compares_chronologically() {
        let q = Query::new("trips")
            .gte("departureTime", "2024-12-25T00:00:00Z")
            .lt("departureTime", "2024-12-26T00:00:00Z");

        assert!(q.matches(&json!({"departureTime": "2024-12-25T23:59:59.999999Z"})));
        assert!(q.matches(&json!({"departureTime": "2024-12-25T00:00:00Z"})));
        assert!(!q.matches(&json!({"departureTime": "2024-12-26T00:00:00Z"})));
    }

    #[test]
    fn test_range_filter_ignores_other_types() {
        let q = Query::new("trips").gte("seats", 3);
        assert!(q.matches(&json!({"seats": 4})));
        assert!(!q.matches(&json!({"seats": "four"})));
    }

    #[test]
    fn test_sort_documents_desc() {
        let q = Query::new("trips").order_by("createdAt", Direction::Desc);
        let mut docs = vec![
            doc("a", json!({"createdAt": "2024-01-01T00:00:00Z"})),
            doc("b", json!({"createdAt": "2024-03-01T00:00:00Z"})),
            doc("c", json!({})),
            doc("d", json!({"createdAt": "2024-02-01T00:00:00Z"})),
        ];
        q.sort_documents(&mut docs);
        let ids: Vec<_> = docs.iter().map(|d| d.id().to_string()).collect();
        assert_eq!(ids, vec!["b", "d", "a", "c"]);
    }
}
