//! Sparse admittance matrix addressed through element handles.
//!
//! Devices bind one [`ElementHandle`] per (row, column) pair they touch at
//! setup time and afterwards only ever accumulate into those handles. Any
//! pair involving ground binds to a discard slot so stamping code never
//! needs to special-case grounded terminals.

use indexmap::IndexMap;
use nalgebra::DMatrix;
use num_complex::Complex;

use crate::node::NodeId;

/// Opaque reference to one matrix entry. The default handle discards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ElementHandle(Option<usize>);

impl ElementHandle {
    /// Handle for any entry in the ground row or column. Writes are dropped.
    pub const DISCARD: ElementHandle = ElementHandle(None);

    /// True if writes through this handle are dropped.
    pub fn is_discard(self) -> bool {
        self.0.is_none()
    }
}

/// Sparse matrix with separate real and imaginary planes.
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    index: IndexMap<(NodeId, NodeId), usize>,
    real: Vec<f64>,
    imag: Vec<f64>,
}

impl SparseMatrix {
    /// Create an empty matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handle to entry (row, col), creating it if needed.
    ///
    /// Binding the same pair twice returns the same handle, so rebinding
    /// after a reallocation is idempotent.
    pub fn element(&mut self, row: NodeId, col: NodeId) -> ElementHandle {
        if row.is_ground() || col.is_ground() {
            return ElementHandle::DISCARD;
        }
        let next = self.index.len();
        let slot = *self.index.entry((row, col)).or_insert(next);
        if slot == self.real.len() {
            self.real.push(0.0);
            self.imag.push(0.0);
        }
        ElementHandle(Some(slot))
    }

    /// Handle for an existing entry, without creating one.
    pub fn find(&self, row: NodeId, col: NodeId) -> Option<ElementHandle> {
        self.index
            .get(&(row, col))
            .map(|&slot| ElementHandle(Some(slot)))
    }

    /// Accumulate into the real part of an entry.
    #[inline]
    pub fn add(&mut self, handle: ElementHandle, value: f64) {
        if let Some(slot) = handle.0 {
            self.real[slot] += value;
        }
    }

    /// Accumulate into the imaginary part of an entry.
    #[inline]
    pub fn add_imag(&mut self, handle: ElementHandle, value: f64) {
        if let Some(slot) = handle.0 {
            self.imag[slot] += value;
        }
    }

    /// Real part of an entry (0 for the discard handle).
    pub fn get(&self, handle: ElementHandle) -> f64 {
        handle.0.map_or(0.0, |slot| self.real[slot])
    }

    /// Imaginary part of an entry (0 for the discard handle).
    pub fn get_imag(&self, handle: ElementHandle) -> f64 {
        handle.0.map_or(0.0, |slot| self.imag[slot])
    }

    /// Real part of entry (row, col), 0 if the entry was never bound.
    pub fn value(&self, row: NodeId, col: NodeId) -> f64 {
        self.find(row, col).map_or(0.0, |h| self.get(h))
    }

    /// Imaginary part of entry (row, col), 0 if the entry was never bound.
    pub fn value_imag(&self, row: NodeId, col: NodeId) -> f64 {
        self.find(row, col).map_or(0.0, |h| self.get_imag(h))
    }

    /// Zero every value, keeping the structure and all bound handles.
    pub fn clear(&mut self) {
        self.real.fill(0.0);
        self.imag.fill(0.0);
    }

    /// Number of structurally nonzero entries.
    pub fn len(&self) -> usize {
        self.real.len()
    }

    /// True if no entry has been bound.
    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Iterate over `((row, col), re, im)` for every bound entry.
    pub fn entries(&self) -> impl Iterator<Item = ((NodeId, NodeId), f64, f64)> + '_ {
        self.index
            .iter()
            .map(|(&pos, &slot)| (pos, self.real[slot], self.imag[slot]))
    }

    /// Dense real matrix of dimension `size` with ground removed.
    ///
    /// Node `n` maps to row/column `n - 1`.
    pub fn to_dense(&self, size: usize) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(size, size);
        for ((row, col), re, _) in self.entries() {
            dense[(row.index() - 1, col.index() - 1)] += re;
        }
        dense
    }

    /// Dense complex matrix of dimension `size` with ground removed.
    pub fn to_dense_complex(&self, size: usize) -> DMatrix<Complex<f64>> {
        let mut dense = DMatrix::from_element(size, size, Complex::new(0.0, 0.0));
        for ((row, col), re, im) in self.entries() {
            dense[(row.index() - 1, col.index() - 1)] += Complex::new(re, im);
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_handles_discard() {
        let mut m = SparseMatrix::new();
        let h = m.element(NodeId::GROUND, NodeId::new(1));
        assert!(h.is_discard());
        m.add(h, 5.0);
        assert_eq!(m.get(h), 0.0);
        assert!(m.is_empty());
    }

    #[test]
    fn test_default_handle_discards() {
        let mut m = SparseMatrix::new();
        let h = ElementHandle::default();
        assert_eq!(h, ElementHandle::DISCARD);
        assert!(h.is_discard());
        m.add(h, 1.0);
        assert!(m.is_empty());
    }

    #[test]
    fn test_rebinding_is_idempotent() {
        let mut m = SparseMatrix::new();
        let a = m.element(NodeId::new(1), NodeId::new(2));
        let b = m.element(NodeId::new(1), NodeId::new(2));
        assert_eq!(a, b);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_accumulate_and_dense() {
        let mut m = SparseMatrix::new();
        let n1 = NodeId::new(1);
        let n2 = NodeId::new(2);
        let h11 = m.element(n1, n1);
        let h12 = m.element(n1, n2);
        m.add(h11, 1.0);
        m.add(h11, 2.0);
        m.add(h12, -0.5);
        m.add_imag(h12, 0.25);

        let dense = m.to_dense(2);
        assert!((dense[(0, 0)] - 3.0).abs() < 1e-15);
        assert!((dense[(0, 1)] + 0.5).abs() < 1e-15);
        assert_eq!(dense[(1, 1)], 0.0);

        let complex = m.to_dense_complex(2);
        assert!((complex[(0, 1)].im - 0.25).abs() < 1e-15);

        m.clear();
        assert_eq!(m.value(n1, n1), 0.0);
        assert_eq!(m.len(), 2);
    }
}
