//! Core shared models: node and edge identities, value intervals

use serde::{Deserialize, Serialize};

/// Identifier of a basic block in the control-flow DAG.
///
/// Node ids are opaque strings taken from the DOT input; ordering is
/// lexicographic and fixes the canonical node numbering.
pub type NodeId = String;

/// Directed edge between two basic blocks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Edge {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Identifier handed to each generated `Path`, used to key side artifacts
/// (ILP dumps, measurement folders) without back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathId(pub u64);

impl std::fmt::Display for PathId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "path-{}", self.0)
    }
}

/// Closed interval of path values, with optionally-absent bounds.
///
/// `None` on either side means that side is unbounded. Both bounds present
/// are normalized so `lower <= upper`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    lower: Option<f64>,
    upper: Option<f64>,
}

impl Interval {
    /// Interval covering all real numbers.
    pub fn all() -> Self {
        Interval::default()
    }

    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        match (lower, upper) {
            (Some(lo), Some(hi)) if lo > hi => Interval {
                lower: Some(hi),
                upper: Some(lo),
            },
            _ => Interval { lower, upper },
        }
    }

    pub fn bounded(lower: f64, upper: f64) -> Self {
        Interval::new(Some(lower), Some(upper))
    }

    pub fn lower_bound(&self) -> Option<f64> {
        self.lower
    }

    pub fn upper_bound(&self) -> Option<f64> {
        self.upper
    }

    pub fn has_finite_lower_bound(&self) -> bool {
        self.lower.is_some()
    }

    pub fn has_finite_upper_bound(&self) -> bool {
        self.upper.is_some()
    }

    /// Whether `value` lies inside the interval (bounds inclusive).
    pub fn contains(&self, value: f64) -> bool {
        self.lower.map_or(true, |lo| value >= lo) && self.upper.map_or(true, |hi| value <= hi)
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.lower {
            Some(lo) => write!(f, "[{}", lo)?,
            None => write!(f, "(-Infinity")?,
        }
        match self.upper {
            Some(hi) => write!(f, ", {}]", hi),
            None => write!(f, ", Infinity)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_normalizes_swapped_bounds() {
        let iv = Interval::bounded(10.0, 2.0);
        assert_eq!(iv.lower_bound(), Some(2.0));
        assert_eq!(iv.upper_bound(), Some(10.0));
    }

    #[test]
    fn test_interval_contains() {
        let iv = Interval::new(Some(1.0), None);
        assert!(iv.contains(1.0));
        assert!(iv.contains(100.0));
        assert!(!iv.contains(0.5));
        assert!(Interval::all().contains(-1e12));
    }

    #[test]
    fn test_edge_display() {
        assert_eq!(Edge::new("a", "b").to_string(), "a -> b");
    }
}
