//! Per-timepoint history state.
//!
//! Devices reserve a contiguous block of slots at setup and address them by
//! offset. `state(0)` is the present timepoint, `state(1)` the last accepted
//! one, and so on back to the configured depth.

use crate::error::{Error, Result};

/// Default history depth: highest integration order plus two.
pub const DEFAULT_DEPTH: usize = 8;

#[derive(Debug, Clone)]
pub struct StateVector {
    history: Vec<Vec<f64>>,
    len: usize,
}

impl Default for StateVector {
    fn default() -> Self {
        Self {
            history: vec![Vec::new(); DEFAULT_DEPTH],
            len: 0,
        }
    }
}

impl StateVector {
    /// Create an empty state vector with `depth` timepoints of history.
    pub fn with_depth(depth: usize) -> Result<Self> {
        if depth < 3 {
            return Err(Error::HistoryDepth(depth));
        }
        Ok(Self {
            history: vec![Vec::new(); depth],
            len: 0,
        })
    }

    /// Reserve `count` consecutive slots and return the first offset.
    pub fn allocate(&mut self, count: usize) -> usize {
        let base = self.len;
        self.len += count;
        for buf in &mut self.history {
            buf.resize(self.len, 0.0);
        }
        base
    }

    /// Number of allocated slots per timepoint.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of timepoints kept.
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    /// Read slot `index` at history level `t`.
    #[inline]
    pub fn get(&self, t: usize, index: usize) -> f64 {
        self.history[t][index]
    }

    /// Write slot `index` at history level `t`.
    #[inline]
    pub fn set(&mut self, t: usize, index: usize, value: f64) {
        self.history[t][index] = value;
    }

    /// Checked read, for callers that take offsets from outside.
    pub fn try_get(&self, t: usize, index: usize) -> Result<f64> {
        self.history
            .get(t)
            .and_then(|buf| buf.get(index))
            .copied()
            .ok_or(Error::StateOutOfRange {
                index,
                len: self.len,
            })
    }

    /// Whole timepoint as a slice.
    pub fn state(&self, t: usize) -> &[f64] {
        &self.history[t]
    }

    /// Whole timepoint as a mutable slice.
    pub fn state_mut(&mut self, t: usize) -> &mut [f64] {
        &mut self.history[t]
    }

    /// Copy one timepoint over another.
    pub fn copy_state(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let src = self.history[from].clone();
        self.history[to].copy_from_slice(&src);
    }

    /// Advance one accepted timepoint.
    ///
    /// The oldest buffer is recycled as the new present, seeded with the
    /// values just accepted.
    pub fn rotate(&mut self) {
        self.history.rotate_right(1);
        self.copy_state(1, 0);
    }

    /// Zero every timepoint.
    pub fn clear(&mut self) {
        for buf in &mut self.history {
            buf.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_contiguous() {
        let mut s = StateVector::default();
        assert_eq!(s.allocate(17), 0);
        assert_eq!(s.allocate(35), 17);
        assert_eq!(s.len(), 52);
        assert_eq!(s.state(DEFAULT_DEPTH - 1).len(), 52);
    }

    #[test]
    fn test_rotate_shifts_history() {
        let mut s = StateVector::with_depth(3).unwrap();
        s.allocate(1);
        s.set(0, 0, 1.0);
        s.rotate();
        s.set(0, 0, 2.0);
        s.rotate();
        assert_eq!(s.get(0, 0), 2.0);
        assert_eq!(s.get(1, 0), 2.0);
        assert_eq!(s.get(2, 0), 1.0);
    }

    #[test]
    fn test_try_get_out_of_range() {
        let mut s = StateVector::default();
        s.allocate(2);
        assert!(s.try_get(0, 1).is_ok());
        assert!(matches!(
            s.try_get(0, 2),
            Err(Error::StateOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_shallow_depth_rejected() {
        assert!(StateVector::with_depth(2).is_err());
    }
}
