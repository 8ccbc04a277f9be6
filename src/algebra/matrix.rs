//! Square matrices of polynomials.
//!
//! Entry `(i, j)` describes how the old value of variable `i` flows into the
//! new value of variable `j`. Product is composition of flows, sum is the
//! union of alternative flows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::polynomial::Polynomial;
use crate::error::{MwpError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Polynomial>>", into = "Vec<Vec<Polynomial>>")]
pub struct Matrix {
    rows: Vec<Vec<Polynomial>>,
}

impl TryFrom<Vec<Vec<Polynomial>>> for Matrix {
    type Error = MwpError;

    fn try_from(rows: Vec<Vec<Polynomial>>) -> Result<Self> {
        Matrix::from_rows(rows)
    }
}

impl From<Matrix> for Vec<Vec<Polynomial>> {
    fn from(m: Matrix) -> Self {
        m.rows
    }
}

impl Matrix {
    /// `n × n` matrix of zero polynomials.
    pub fn zero(n: usize) -> Self {
        Self {
            rows: vec![vec![Polynomial::zero(); n]; n],
        }
    }

    /// `n × n` matrix with `m` on the diagonal.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zero(n);
        for i in 0..n {
            matrix.rows[i][i] = Polynomial::unit();
        }
        matrix
    }

    pub fn from_rows(rows: Vec<Vec<Polynomial>>) -> Result<Self> {
        let n = rows.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(MwpError::Malformed(format!(
                "row {} has {} entries, expected {}",
                i,
                row.len(),
                n
            )));
        }
        Ok(Self { rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> &Polynomial {
        &self.rows[row][col]
    }

    pub fn rows(&self) -> &[Vec<Polynomial>] {
        &self.rows
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: Polynomial) {
        self.rows[row][col] = value;
    }

    /// Entrywise sum. Both operands must have the same size.
    pub fn add(&self, other: &Matrix) -> Matrix {
        debug_assert_eq!(self.size(), other.size());
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(r1, r2)| r1.iter().zip(r2).map(|(a, b)| a.add(b)).collect())
            .collect();
        Matrix { rows }
    }

    /// Matrix product. Both operands must have the same size.
    pub fn product(&self, other: &Matrix) -> Matrix {
        debug_assert_eq!(self.size(), other.size());
        let n = self.size();
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        (0..n).fold(Polynomial::zero(), |acc, k| {
                            acc.add(&self.rows[i][k].times(&other.rows[k][j]))
                        })
                    })
                    .collect()
            })
            .collect();
        Matrix { rows }
    }

    /// Grow to `n × n`, filling the new rows and columns like the identity.
    pub fn resize(&self, n: usize) -> Matrix {
        let mut result = Matrix::identity(n);
        let keep = self.size().min(n);
        for i in 0..keep {
            for j in 0..keep {
                result.rows[i][j] = self.rows[i][j].clone();
            }
        }
        result
    }

    /// Kleene star `I + M + M² + …`.
    ///
    /// Always terminates: entries only grow in a finite lattice.
    pub fn fixpoint(&self) -> Matrix {
        let (fix, _) = self.star(None);
        fix
    }

    /// [`fixpoint`](Self::fixpoint) that gives up after `limit` iterations.
    pub fn fixpoint_bounded(&self, limit: usize) -> Result<Matrix> {
        match self.star(Some(limit)) {
            (fix, true) => Ok(fix),
            (_, false) => Err(MwpError::FixpointLimit { limit }),
        }
    }

    fn star(&self, limit: Option<usize>) -> (Matrix, bool) {
        let identity = Matrix::identity(self.size());
        let mut fix = identity.clone();
        let mut current = identity;
        let mut iterations = 0usize;
        loop {
            if limit.is_some_and(|l| iterations >= l) {
                return (fix, false);
            }
            iterations += 1;
            current = current.product(self);
            let next = fix.add(&current);
            if next == fix {
                debug!(size = self.size(), iterations, "fixpoint reached");
                return (fix, true);
            }
            fix = next;
        }
    }

    /// Apply `f` to every entry, passing its coordinates.
    pub fn map(&self, mut f: impl FnMut(usize, usize, &Polynomial) -> Polynomial) -> Matrix {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| row.iter().enumerate().map(|(j, p)| f(i, j, p)).collect())
            .collect();
        Matrix { rows }
    }

    /// The JSON cell structure used in result files.
    pub fn encode(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn decode(value: serde_json::Value) -> Result<Matrix> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::semiring::Scalar;

    #[test]
    fn fixpoint_of_zero_is_identity() {
        assert_eq!(Matrix::zero(3).fixpoint(), Matrix::identity(3));
    }

    #[test]
    fn resize_pads_with_identity() {
        let mut m = Matrix::zero(1);
        m.set(0, 0, Polynomial::constant(Scalar::W));
        let r = m.resize(2);
        assert_eq!(r.get(0, 0), &Polynomial::constant(Scalar::W));
        assert!(r.get(0, 1).is_zero());
        assert!(r.get(1, 1).is_unit());
    }

    #[test]
    fn bounded_fixpoint_reports_limit() {
        let mut m = Matrix::zero(2);
        m.set(0, 1, Polynomial::constant(Scalar::M));
        assert!(matches!(m.fixpoint_bounded(0), Err(MwpError::FixpointLimit { limit: 0 })));
        assert_eq!(m.fixpoint_bounded(10).unwrap(), m.fixpoint());
    }

    #[test]
    fn decode_rejects_ragged_rows() {
        let value = serde_json::json!([[[{"scalar": "m", "deltas": []}]], []]);
        assert!(Matrix::decode(value).is_err());
    }
}
