//! Node-indexed vectors for the right-hand side and the solution.

use nalgebra::DVector;

use crate::node::NodeId;

/// A vector indexed by [`NodeId`], with ground pinned at index 0.
///
/// Reads past the end return 0 and writes to ground are dropped, which is
/// what device code expects when a terminal is grounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeVector {
    values: Vec<f64>,
}

impl NodeVector {
    /// A zero vector covering `len` entries (ground included).
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    /// Value at a node; ground and unknown nodes read as 0.
    #[inline]
    pub fn get(&self, node: NodeId) -> f64 {
        if node.is_ground() {
            return 0.0;
        }
        self.values.get(node.index()).copied().unwrap_or(0.0)
    }

    /// Accumulate into a node entry.
    #[inline]
    pub fn add(&mut self, node: NodeId, value: f64) {
        if node.is_ground() {
            return;
        }
        if let Some(slot) = self.values.get_mut(node.index()) {
            *slot += value;
        }
    }

    /// Overwrite a node entry.
    pub fn set(&mut self, node: NodeId, value: f64) {
        if node.is_ground() {
            return;
        }
        if let Some(slot) = self.values.get_mut(node.index()) {
            *slot = value;
        }
    }

    /// Zero every entry.
    pub fn clear(&mut self) {
        self.values.fill(0.0);
    }

    /// Grow or shrink to `len` entries, filling with zeros.
    pub fn resize(&mut self, len: usize) {
        self.values.resize(len, 0.0);
    }

    /// Number of entries, ground included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw values, ground first.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Dense vector with the ground entry removed.
    pub fn to_dense(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.values.len().saturating_sub(1),
            self.values.iter().skip(1).copied(),
        )
    }

    /// Build from a dense solution vector (ground excluded).
    pub fn from_dense(dense: &DVector<f64>) -> Self {
        let mut values = Vec::with_capacity(dense.len() + 1);
        values.push(0.0);
        values.extend(dense.iter().copied());
        Self { values }
    }
}
