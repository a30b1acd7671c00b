//! Static operation and timeout tables.

use std::collections::BTreeMap;
use std::time::Duration;

/// Maps logical operations to backend paths.
///
/// Immutable after construction. Operations without an entry fall back to
/// the generic passthrough route so new backend capabilities work without a
/// gateway release.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<&'static str, &'static str>,
}

impl RouteTable {
    /// The gateway's stock vocabulary, mirroring the backend's AI surface.
    pub fn standard() -> Self {
        let routes = BTreeMap::from([
            ("analyze", "/analyze"),
            ("validate", "/ai/validate"),
            ("predict", "/ai/predict"),
            ("detect-anomalies", "/ai/detect-anomalies"),
            ("learning-stats", "/ai/learning-stats"),
        ]);
        Self { routes }
    }

    /// Backend path for `operation`; unmapped operations pass through.
    pub fn resolve(&self, operation: &str) -> String {
        match self.routes.get(operation) {
            Some(path) => (*path).to_string(),
            None => format!("/ai/{operation}"),
        }
    }

    /// Known operation names, for the /status feature list.
    pub fn operations(&self) -> Vec<&'static str> {
        self.routes.keys().copied().collect()
    }
}

/// Timeout budget for a priority: 1-5 gets the base budget, 6-10 twice it.
/// Priority is validated at the edge; anything else lands in the base tier.
pub fn timeout_for(priority: u8, base: Duration) -> Duration {
    if priority >= 6 {
        base.saturating_mul(2)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_operations_resolve_to_table_entries() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("predict"), "/ai/predict");
        assert_eq!(table.resolve("analyze"), "/analyze");
        assert_eq!(table.resolve("learning-stats"), "/ai/learning-stats");
    }

    #[test]
    fn unknown_operation_falls_back_to_passthrough() {
        let table = RouteTable::standard();
        assert_eq!(table.resolve("summarize"), "/ai/summarize");
    }

    #[test]
    fn timeout_doubles_at_priority_six() {
        let base = Duration::from_secs(10);
        for p in 1..=5 {
            assert_eq!(timeout_for(p, base), base, "priority {p}");
        }
        for p in 6..=10 {
            assert_eq!(timeout_for(p, base), base * 2, "priority {p}");
        }
    }

    #[test]
    fn doubling_saturates_instead_of_overflowing() {
        assert_eq!(timeout_for(10, Duration::MAX), Duration::MAX);
    }

    #[test]
    fn operations_list_is_stable() {
        let ops = RouteTable::standard().operations();
        assert!(ops.contains(&"predict"));
        assert!(ops.contains(&"validate"));
        assert_eq!(ops.len(), 5);
    }
}
