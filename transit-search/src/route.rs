//! Splitting free-text route names like `"Colombo to Kandy"` into their ends.

/// Tried in this order; the first one present in the route wins.
pub const ROUTE_SEPARATORS: [&str; 5] = [" to ", " - ", " → ", " -> ", " | "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteEnds<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
}

/// Split `route` at the first occurrence of the first separator it contains.
/// `None` when no separator occurs.
pub fn parse_route(route: &str) -> Option<RouteEnds<'_>> {
    ROUTE_SEPARATORS.iter().find_map(|sep| {
        route.split_once(sep).map(|(origin, destination)| RouteEnds {
            origin: origin.trim(),
            destination: destination.trim(),
        })
    })
}

/// Whether `route` matches the passenger's filters. Matching is
/// case-insensitive.
///
/// With both ends given, each must be a substring of the matching half of the
/// parsed route. With one end given, the whole route text is searched, and a
/// route marked "return" is also searched in the reverse direction.
pub fn route_matches(route: &str, from: Option<&str>, to: Option<&str>) -> bool {
    let route = route.to_lowercase();
    let from = from.map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty());
    let to = to.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());

    match (from, to) {
        (None, None) => true,
        (Some(from), Some(to)) => {
            parse_route(&route).is_some_and(|ends| ends.origin.contains(&from) && ends.destination.contains(&to))
        }
        (Some(filter), None) | (None, Some(filter)) => {
            route.contains(&filter) || reversed(&route).is_some_and(|r| r.contains(&filter))
        }
    }
}

/// `"b to a"` for a return route `"a to b (return)"`.
fn reversed(route: &str) -> Option<String> {
    if !route.contains("return") {
        return None;
    }
    let ends = parse_route(route)?;
    let strip = |s: &str| {
        s.replace("return", "")
            .trim_matches(|c: char| c.is_whitespace() || "()[],-".contains(c))
            .to_string()
    };
    Some(format!("{} to {}", strip(ends.destination), strip(ends.origin)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        let ends = parse_route("Colombo to Kandy").unwrap();
        assert_eq!((ends.origin, ends.destination), ("Colombo", "Kandy"));
        assert_eq!(parse_route("Galle - Matara").unwrap().destination, "Matara");
        assert_eq!(parse_route("Jaffna → Vavuniya").unwrap().origin, "Jaffna");
        assert_eq!(parse_route("Kandy -> Badulla").unwrap().destination, "Badulla");
        assert_eq!(parse_route("Negombo | Chilaw").unwrap().origin, "Negombo");
        assert!(parse_route("Colombo").is_none());
    }

    #[test]
    fn test_separator_order_beats_position() {
        // " to " is tried before " - " even though " - " comes first in the text.
        let ends = parse_route("A - B to C").unwrap();
        assert_eq!((ends.origin, ends.destination), ("A - B", "C"));
    }

    #[test]
    fn test_single_filter_searches_whole_route() {
        assert!(route_matches("Colombo to Kandy", Some("colombo"), None));
        assert!(route_matches("Colombo to Kandy", None, Some("Colombo")));
        assert!(route_matches("Colombo to Kandy", Some("  "), None));
        assert!(route_matches("Anything", None, None));
    }

    #[test]
    fn test_both_filters_use_parsed_halves() {
        assert!(route_matches("Colombo to Kandy", Some("Colombo"), Some("Kandy")));
        assert!(!route_matches("Colombo to Kandy", Some("Colombo"), Some("Galle")));
        assert!(!route_matches("Colombo to Kandy", Some("Kandy"), Some("Colombo")));
        assert!(!route_matches("Colombo Kandy express", Some("Colombo"), Some("Kandy")));
    }

    #[test]
    fn test_return_routes_match_reversed() {
        assert!(route_matches("Colombo to Kandy (return)", Some("kandy to colombo"), None));
        assert!(!route_matches("Colombo to Kandy", Some("kandy to colombo"), None));
    }
}
