//! Square basis matrix over compressed path vectors.
//!
//! Rows are paths in reduced-edge coordinates. The determinant is kept as a
//! (sign, log-magnitude) pair so that near-singular bases degrade to
//! `-inf` log-magnitude instead of underflowing to a denormal.

use rand::Rng;

use crate::errors::{PathtimeError, Result};

/// Pivots smaller than this are treated as exact zeros during elimination.
const PIVOT_EPSILON: f64 = 1e-12;

/// Row-major square matrix of path coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl BasisMatrix {
    pub fn identity(dim: usize) -> Self {
        let mut data = vec![0.0; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = 1.0;
        }
        BasisMatrix { dim, data }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let dim = rows.len();
        if rows.iter().any(|r| r.len() != dim) {
            return Err(PathtimeError::degenerate(
                "basis matrix rows must all have length equal to the dimension",
            ));
        }
        let data = rows.into_iter().flatten().collect();
        Ok(BasisMatrix { dim, data })
    }

    /// Parses the whitespace text format produced by [`to_text`](Self::to_text).
    pub fn from_text(text: &str) -> Result<Self> {
        let rows: Vec<Vec<f64>> = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.split_whitespace()
                    .map(|tok| {
                        tok.parse::<f64>().map_err(|_| {
                            PathtimeError::degenerate(format!(
                                "basis matrix file has a non-numeric entry: {tok}"
                            ))
                        })
                    })
                    .collect()
            })
            .collect::<Result<_>>()?;
        Self::from_rows(rows)
    }

    /// One whitespace-separated line per row.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for r in 0..self.dim {
            let line: Vec<String> = self.row(r).iter().map(|v| format!("{v}")).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.dim..(r + 1) * self.dim]
    }

    pub fn set_row(&mut self, r: usize, values: &[f64]) {
        debug_assert_eq!(values.len(), self.dim);
        self.data[r * self.dim..(r + 1) * self.dim].copy_from_slice(values);
    }

    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.dim + c]
    }

    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.dim + c] = value;
    }

    pub fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for c in 0..self.dim {
            self.data.swap(a * self.dim + c, b * self.dim + c);
        }
    }

    /// Fisher-Yates shuffle of the rows.
    pub fn shuffle_rows<R: Rng>(&mut self, rng: &mut R) {
        for i in (1..self.dim).rev() {
            let j = rng.gen_range(0..=i);
            self.swap_rows(i, j);
        }
    }

    /// Determinant as (sign, log |det|); sign 0.0 means singular, in which
    /// case the log-magnitude is `-inf`.
    pub fn slogdet(&self) -> (f64, f64) {
        let n = self.dim;
        if n == 0 {
            return (1.0, 0.0);
        }
        let mut lu = self.data.clone();
        let mut sign = 1.0_f64;
        let mut log_abs = 0.0_f64;
        for col in 0..n {
            // Partial pivoting.
            let mut pivot_row = col;
            let mut pivot_abs = lu[col * n + col].abs();
            for r in (col + 1)..n {
                let a = lu[r * n + col].abs();
                if a > pivot_abs {
                    pivot_abs = a;
                    pivot_row = r;
                }
            }
            if pivot_abs < PIVOT_EPSILON {
                return (0.0, f64::NEG_INFINITY);
            }
            if pivot_row != col {
                for c in 0..n {
                    lu.swap(col * n + c, pivot_row * n + c);
                }
                sign = -sign;
            }
            let pivot = lu[col * n + col];
            sign *= pivot.signum();
            log_abs += pivot.abs().ln();
            for r in (col + 1)..n {
                let factor = lu[r * n + col] / pivot;
                for c in col..n {
                    lu[r * n + c] -= factor * lu[col * n + c];
                }
            }
        }
        (sign, log_abs)
    }

    /// Determinant magnitude; 0.0 when singular.
    pub fn det_abs(&self) -> f64 {
        let (sign, log_abs) = self.slogdet();
        if sign == 0.0 {
            0.0
        } else {
            log_abs.exp()
        }
    }

    /// Signed determinant.
    pub fn det(&self) -> f64 {
        let (sign, log_abs) = self.slogdet();
        if sign == 0.0 {
            0.0
        } else {
            sign * log_abs.exp()
        }
    }

    /// Determinant of the minor obtained by deleting `skip_row` and
    /// `skip_col`. For a 1x1 matrix the minor is empty and has determinant 1.
    pub fn minor_det(&self, skip_row: usize, skip_col: usize) -> f64 {
        let n = self.dim;
        debug_assert!(skip_row < n && skip_col < n);
        if n == 1 {
            return 1.0;
        }
        let mut rows = Vec::with_capacity(n - 1);
        for r in 0..n {
            if r == skip_row {
                continue;
            }
            let mut row = Vec::with_capacity(n - 1);
            for c in 0..n {
                if c == skip_col {
                    continue;
                }
                row.push(self.get(r, c));
            }
            rows.push(row);
        }
        BasisMatrix {
            dim: n - 1,
            data: rows.into_iter().flatten().collect(),
        }
        .det()
    }

    /// Gauss-Jordan inverse with partial pivoting.
    pub fn invert(&self) -> Result<BasisMatrix> {
        let n = self.dim;
        let mut work = self.data.clone();
        let mut inv = BasisMatrix::identity(n);
        for col in 0..n {
            let mut pivot_row = col;
            let mut pivot_abs = work[col * n + col].abs();
            for r in (col + 1)..n {
                let a = work[r * n + col].abs();
                if a > pivot_abs {
                    pivot_abs = a;
                    pivot_row = r;
                }
            }
            if pivot_abs < PIVOT_EPSILON {
                return Err(PathtimeError::degenerate(
                    "basis matrix is singular and cannot be inverted",
                ));
            }
            if pivot_row != col {
                for c in 0..n {
                    work.swap(col * n + c, pivot_row * n + c);
                }
                inv.swap_rows(col, pivot_row);
            }
            let pivot = work[col * n + col];
            for c in 0..n {
                work[col * n + c] /= pivot;
                inv.data[col * n + c] /= pivot;
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work[r * n + col];
                if factor == 0.0 {
                    continue;
                }
                for c in 0..n {
                    work[r * n + c] -= factor * work[col * n + c];
                    inv.data[r * n + c] -= factor * inv.data[col * n + c];
                }
            }
        }
        Ok(inv)
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.dim);
        (0..self.dim)
            .map(|r| self.row(r).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }
}
