//! Linear solves of the assembled system.
//!
//! Small systems are factored densely with nalgebra; larger ones go
//! through faer's sparse LU on the element list of the [`SparseMatrix`].

use faer::prelude::*;
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use spicemos_core::{NodeVector, SparseMatrix};

use crate::error::{Error, Result};

/// Systems with this many or more unknowns use the sparse path.
pub const SPARSE_THRESHOLD: usize = 50;

fn check_square(rows: usize, cols: usize, rhs: usize) -> Result<()> {
    if rows != cols {
        return Err(Error::DimensionMismatch {
            expected: rows,
            actual: cols,
        });
    }
    if rows != rhs {
        return Err(Error::DimensionMismatch {
            expected: rows,
            actual: rhs,
        });
    }
    Ok(())
}

/// Solve `a x = b` by dense LU.
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    check_square(a.nrows(), a.ncols(), b.len())?;
    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

/// Solve a complex `a x = b` by dense LU.
pub fn solve_complex(a: &DMatrix<Complex64>, b: &DVector<Complex64>) -> Result<DVector<Complex64>> {
    check_square(a.nrows(), a.ncols(), b.len())?;
    a.clone().lu().solve(b).ok_or(Error::SingularMatrix)
}

/// Solve `a x = b` by sparse LU. Duplicate triplets are summed.
pub fn solve_sparse(
    size: usize,
    triplets: &[(usize, usize, f64)],
    rhs: &DVector<f64>,
) -> Result<DVector<f64>> {
    check_square(size, size, rhs.len())?;
    let entries: Vec<_> = triplets
        .iter()
        .map(|&(r, c, v)| Triplet::new(r, c, v))
        .collect();
    let mat = SparseColMat::<usize, f64>::try_new_from_triplets(size, size, &entries)
        .map_err(|_| Error::SingularMatrix)?;
    let lu = mat.sp_lu().map_err(|_| Error::SingularMatrix)?;
    let x = lu.solve(&Col::<f64>::from_fn(size, |i| rhs[i]));
    let x = DVector::from_fn(size, |i, _| x[i]);
    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(Error::SingularMatrix)
    }
}

/// Solve a complex `a x = b` by sparse LU.
pub fn solve_sparse_complex(
    size: usize,
    triplets: &[(usize, usize, Complex64)],
    rhs: &DVector<Complex64>,
) -> Result<DVector<Complex64>> {
    check_square(size, size, rhs.len())?;
    let entries: Vec<_> = triplets
        .iter()
        .map(|&(r, c, v)| Triplet::new(r, c, c64::new(v.re, v.im)))
        .collect();
    let mat = SparseColMat::<usize, c64>::try_new_from_triplets(size, size, &entries)
        .map_err(|_| Error::SingularMatrix)?;
    let lu = mat.sp_lu().map_err(|_| Error::SingularMatrix)?;
    let x = lu.solve(&Col::<c64>::from_fn(size, |i| c64::new(rhs[i].re, rhs[i].im)));
    let x = DVector::from_fn(size, |i, _| Complex64::new(x[i].re, x[i].im));
    if x.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
        Ok(x)
    } else {
        Err(Error::SingularMatrix)
    }
}

/// Solve the real plane of `matrix` against `rhs`, returning node values
/// with ground at index 0.
pub fn solve_system(matrix: &SparseMatrix, rhs: &NodeVector, size: usize) -> Result<NodeVector> {
    let mut b = rhs.to_dense();
    b.resize_vertically_mut(size, 0.0);
    let x = if size >= SPARSE_THRESHOLD {
        let triplets: Vec<_> = matrix
            .entries()
            .map(|((r, c), re, _)| (r.index() - 1, c.index() - 1, re))
            .collect();
        solve_sparse(size, &triplets, &b)?
    } else {
        solve_dense(&matrix.to_dense(size), &b)?
    };
    Ok(NodeVector::from_dense(&x))
}

/// Solve both planes of `matrix` against `rhs + j·irhs`.
pub fn solve_system_complex(
    matrix: &SparseMatrix,
    rhs: &NodeVector,
    irhs: &NodeVector,
    size: usize,
) -> Result<DVector<Complex64>> {
    let b = DVector::from_fn(size, |i, _| {
        let n = i + 1;
        let re = rhs.as_slice().get(n).copied().unwrap_or(0.0);
        let im = irhs.as_slice().get(n).copied().unwrap_or(0.0);
        Complex64::new(re, im)
    });
    if size >= SPARSE_THRESHOLD {
        let triplets: Vec<_> = matrix
            .entries()
            .map(|((r, c), re, im)| (r.index() - 1, c.index() - 1, Complex64::new(re, im)))
            .collect();
        solve_sparse_complex(size, &triplets, &b)
    } else {
        solve_complex(&matrix.to_dense_complex(size), &b)
    }
}
