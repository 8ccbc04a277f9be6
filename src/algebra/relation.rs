//! Relations: a variable list paired with a flow matrix.
//!
//! Relations over different variable sets are combined after
//! *homogenisation*: both sides are extended to the union of their variables
//! (left operand's order first), filling the missing parts with identity.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::matrix::Matrix;
use super::monomial::Delta;
use super::polynomial::Polynomial;
use super::semiring::{Scalar, Semiring};
use crate::choice::Choices;
use crate::error::{MwpError, Result};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "RelationRecord", into = "RelationRecord")]
pub struct Relation {
    variables: Vec<String>,
    matrix: Matrix,
}

/// Wire shape of a relation; decoding checks the variables against the
/// matrix size.
#[derive(Serialize, Deserialize)]
struct RelationRecord {
    variables: Vec<String>,
    matrix: Matrix,
}

impl TryFrom<RelationRecord> for Relation {
    type Error = MwpError;

    fn try_from(r: RelationRecord) -> Result<Self> {
        Relation::with_matrix(r.variables, r.matrix)
    }
}

impl From<Relation> for RelationRecord {
    fn from(r: Relation) -> Self {
        RelationRecord {
            variables: r.variables,
            matrix: r.matrix,
        }
    }
}

impl PartialEq for Relation {
    /// Order-insensitive: same variables, equal matrices once aligned.
    fn eq(&self, other: &Self) -> bool {
        let mine: BTreeSet<_> = self.variables.iter().collect();
        let theirs: BTreeSet<_> = other.variables.iter().collect();
        if mine != theirs {
            return false;
        }
        let (a, b) = Relation::homogenise(self, other);
        a.matrix == b.matrix
    }
}

impl Relation {
    /// The relation with no variables; neutral for sum and composition.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn identity<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        let matrix = Matrix::identity(variables.len());
        Self { variables, matrix }
    }

    /// Relation where no variable flows anywhere, not even into itself.
    pub fn zero<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        let variables: Vec<String> = variables.into_iter().map(Into::into).collect();
        let matrix = Matrix::zero(variables.len());
        Self { variables, matrix }
    }

    pub fn with_matrix(variables: Vec<String>, matrix: Matrix) -> Result<Self> {
        if variables.len() != matrix.size() {
            return Err(MwpError::Malformed(format!(
                "{} variables for a {}x{} matrix",
                variables.len(),
                matrix.size(),
                matrix.size()
            )));
        }
        Ok(Self { variables, matrix })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn position(&self, variable: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == variable)
    }

    /// Identity relation whose column for `variable` is replaced by
    /// `vector` (entry `k` of the vector becomes row `k` of that column).
    ///
    /// An unknown `variable` leaves the identity untouched.
    pub fn replace_column(&self, vector: &[Polynomial], variable: &str) -> Relation {
        let mut result = Relation::identity(self.variables.iter().cloned());
        if let Some(j) = self.position(variable) {
            for (i, poly) in vector.iter().enumerate().take(result.matrix.size()) {
                result.matrix.set(i, j, poly.clone());
            }
        }
        result
    }

    /// Extend both relations to a shared variable list.
    pub fn homogenise(r1: &Relation, r2: &Relation) -> (Relation, Relation) {
        if r1.variables == r2.variables {
            return (r1.clone(), r2.clone());
        }
        if r1.is_empty() {
            return (Relation::identity(r2.variables.iter().cloned()), r2.clone());
        }
        if r2.is_empty() {
            return (r1.clone(), Relation::identity(r1.variables.iter().cloned()));
        }
        let mut variables = r1.variables.clone();
        variables.extend(
            r2.variables
                .iter()
                .filter(|v| !r1.variables.contains(v))
                .cloned(),
        );
        let n = variables.len();
        let m1 = r1.matrix.resize(n);

        // position in r2 for every extended variable it knows
        let mapping: Vec<(usize, usize)> = variables
            .iter()
            .enumerate()
            .filter_map(|(ext, v)| r2.position(v).map(|orig| (ext, orig)))
            .collect();
        let mut m2 = Matrix::identity(n);
        for &(ei, oi) in &mapping {
            for &(ej, oj) in &mapping {
                m2.set(ei, ej, r2.matrix.get(oi, oj).clone());
            }
        }
        (
            Relation {
                variables: variables.clone(),
                matrix: m1,
            },
            Relation {
                variables,
                matrix: m2,
            },
        )
    }

    /// `self` followed by `other`.
    pub fn compose(&self, other: &Relation) -> Relation {
        let (a, b) = Relation::homogenise(self, other);
        debug!(variables = a.variables.len(), "composing relations");
        Relation {
            matrix: a.matrix.product(&b.matrix),
            variables: a.variables,
        }
    }

    /// Either `self` or `other`.
    pub fn sum(&self, other: &Relation) -> Relation {
        let (a, b) = Relation::homogenise(self, other);
        Relation {
            matrix: a.matrix.add(&b.matrix),
            variables: a.variables,
        }
    }

    pub fn fixpoint(&self) -> Relation {
        debug!(variables = ?self.variables, "computing fixpoint");
        Relation {
            variables: self.variables.clone(),
            matrix: self.matrix.fixpoint(),
        }
    }

    pub fn fixpoint_bounded(&self, limit: usize) -> Result<Relation> {
        debug!(variables = ?self.variables, limit, "computing fixpoint");
        Ok(Relation {
            variables: self.variables.clone(),
            matrix: self.matrix.fixpoint_bounded(limit)?,
        })
    }

    /// Rule W: after a loop fixpoint, `p` anywhere and `w` on the diagonal
    /// become `i`.
    ///
    /// Also returns the delta lists that became infinite.
    pub fn while_correction(&self) -> (Relation, Vec<Vec<Delta>>) {
        let mut promoted = Vec::new();
        let matrix = self.matrix.map(|i, j, poly| {
            let (poly, deltas) = poly.escalate(|s| s == Scalar::P || (i == j && s == Scalar::W));
            promoted.extend(deltas);
            poly
        });
        let relation = Relation {
            variables: self.variables.clone(),
            matrix,
        };
        (relation, promoted)
    }

    /// Rule L, for loops that run a bounded number of times controlled by
    /// `guard`: any scalar other than `m` on the diagonal becomes `i`, and
    /// every `p` flow is also charged to the guard's row.
    pub fn loop_correction(&self, guard: &str) -> (Relation, Vec<Vec<Delta>>) {
        let mut promoted = Vec::new();
        let mut matrix = self.matrix.map(|i, j, poly| {
            if i != j {
                return poly.clone();
            }
            let (poly, deltas) = poly.escalate(|s| s != Scalar::M);
            promoted.extend(deltas);
            poly
        });
        if let Some(ell) = self.position(guard) {
            for j in 0..matrix.size() {
                let polynomial = (0..matrix.size())
                    .filter(|&i| i != j)
                    .flat_map(|i| self.matrix.get(i, j).monomials().to_vec())
                    .filter(|m| m.scalar() == Scalar::P);
                let charged = Polynomial::from_monomials(polynomial);
                if !charged.is_zero() {
                    let updated = matrix.get(ell, j).add(&charged);
                    matrix.set(ell, j, updated);
                }
            }
        }
        let relation = Relation {
            variables: self.variables.clone(),
            matrix,
        };
        (relation, promoted)
    }

    /// Scalar matrix obtained by fixing every choice. Entries with no
    /// matching monomial default to `m` on the diagonal, `o` elsewhere.
    pub fn apply_choice(&self, choices: &[u8]) -> ScalarMatrix {
        let n = self.matrix.size();
        let cells = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        let least = if i == j { Scalar::one() } else { Scalar::zero() };
                        self.matrix.get(i, j).choice_scalar(choices, least)
                    })
                    .collect()
            })
            .collect();
        ScalarMatrix {
            variables: self.variables.clone(),
            cells,
        }
    }

    /// Choices under which no entry of the matrix is infinite.
    ///
    /// `extra` scalars are treated like `i`.
    pub fn eval(&self, domain: &[u8], index: usize, extra: &[Scalar]) -> Result<Choices> {
        let witnesses = self
            .matrix
            .rows()
            .iter()
            .flatten()
            .flat_map(|p| p.infinity_deltas(extra));
        Choices::generate(domain, index, witnesses)
    }

    /// Like [`eval`](Self::eval), restricted to the column of `variable`.
    pub fn var_eval(
        &self,
        domain: &[u8],
        index: usize,
        variable: &str,
        extra: &[Scalar],
    ) -> Result<Choices> {
        let col = self
            .position(variable)
            .ok_or_else(|| MwpError::Internal(format!("unknown variable {}", variable)))?;
        let witnesses = self
            .matrix
            .rows()
            .iter()
            .flat_map(|row| row[col].infinity_deltas(extra));
        Choices::generate(domain, index, witnesses)
    }

    /// [`var_eval`](Self::var_eval) for every variable, in relation order.
    pub fn var_eval_all(&self, domain: &[u8], index: usize) -> Result<IndexMap<String, Choices>> {
        self.variables
            .iter()
            .map(|v| Ok((v.clone(), self.var_eval(domain, index, v, &[])?)))
            .collect()
    }

    /// Flows `source → [targets]` that are infinite under some choice.
    ///
    /// With a non-empty `only`, keep pairs touching one of those variables.
    pub fn infinity_flows(&self, only: &[String]) -> IndexMap<String, Vec<String>> {
        let mut flows = IndexMap::new();
        for (i, source) in self.variables.iter().enumerate() {
            let targets: Vec<String> = self
                .variables
                .iter()
                .enumerate()
                .filter(|&(j, target)| {
                    self.matrix.get(i, j).some_infinity()
                        && (only.is_empty() || only.contains(source) || only.contains(target))
                })
                .map(|(_, t)| t.clone())
                .collect();
            if !targets.is_empty() {
                flows.insert(source.clone(), targets);
            }
        }
        flows
    }

    /// Human-readable form of [`infinity_flows`](Self::infinity_flows):
    /// `x ➔ y, z ‖ y ➔ y`.
    pub fn infinity_pairs(&self, only: &[String]) -> String {
        self.infinity_flows(only)
            .iter()
            .map(|(s, t)| format!("{} ➔ {}", s, t.join(", ")))
            .collect::<Vec<_>>()
            .join(" ‖ ")
    }

    pub fn encode(&self) -> Result<serde_json::Value> {
        self.matrix.encode()
    }

    pub fn decode(variables: Vec<String>, matrix: serde_json::Value) -> Result<Relation> {
        Relation::with_matrix(variables, Matrix::decode(matrix)?)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = self.variables.iter().map(String::len).max().unwrap_or(0);
        for (i, var) in self.variables.iter().enumerate() {
            let row: Vec<String> = self.matrix.rows()[i].iter().map(|p| p.to_string()).collect();
            writeln!(f, "{:<pad$} | {}", var, row.join("  "), pad = pad)?;
        }
        Ok(())
    }
}

/// A relation after every choice has been fixed: one scalar per flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarMatrix {
    pub variables: Vec<String>,
    pub cells: Vec<Vec<Scalar>>,
}

impl ScalarMatrix {
    pub fn get(&self, row: usize, col: usize) -> Scalar {
        self.cells[row][col]
    }

    /// Scalars flowing into `col`, paired with their source variable.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (&str, Scalar)> + '_ {
        self.variables
            .iter()
            .zip(&self.cells)
            .map(move |(v, row)| (v.as_str(), row[col]))
    }
}

impl fmt::Display for ScalarMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pad = self.variables.iter().map(String::len).max().unwrap_or(0);
        for (var, row) in self.variables.iter().zip(&self.cells) {
            let row: Vec<String> = row.iter().map(|s| s.to_string()).collect();
            writeln!(f, "{:<pad$} | {}", var, row.join(" "), pad = pad)?;
        }
        Ok(())
    }
}
