//! Persistent path constraints carried across ILP queries.
//!
//! Exclusive sets forbid a path from using a whole edge set at once
//! (`sum <= |S| - 1`); they accumulate as infeasible paths are discovered.
//! Bundled sets tie edges together (`sum over S \ {e0} = (|S| - 1) * x_e0`),
//! pinning a query to a previously chosen path. Exclusive sets can be
//! cleared between enumeration rounds; bundles live for one query.

use crate::shared::models::Edge;

#[derive(Debug, Clone, Default)]
pub struct ConstraintStore {
    exclusive: Vec<Vec<Edge>>,
    bundled: Vec<Vec<Edge>>,
}

impl ConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forbid any path that traverses every edge in `edges`.
    pub fn add_exclusive(&mut self, edges: Vec<Edge>) {
        if !edges.is_empty() {
            self.exclusive.push(edges);
        }
    }

    /// Require the edges in `edges` to be taken together or not at all.
    pub fn add_bundled(&mut self, edges: Vec<Edge>) {
        if edges.len() > 1 {
            self.bundled.push(edges);
        }
    }

    pub fn exclusive_sets(&self) -> &[Vec<Edge>] {
        &self.exclusive
    }

    pub fn bundled_sets(&self) -> &[Vec<Edge>] {
        &self.bundled
    }

    pub fn num_exclusive(&self) -> usize {
        self.exclusive.len()
    }

    pub fn clear_exclusive(&mut self) {
        self.exclusive.clear();
    }

    pub fn clear_bundled(&mut self) {
        self.bundled.clear();
    }

    /// Drop exclusive sets added after a save point.
    pub fn truncate_exclusive(&mut self, len: usize) {
        self.exclusive.truncate(len);
    }

    /// Drop bundled sets added after a save point.
    pub fn truncate_bundled(&mut self, len: usize) {
        self.bundled.truncate(len);
    }

    pub fn num_bundled(&self) -> usize {
        self.bundled.len()
    }
}
