//! Monomials: a scalar guarded by a conjunction of choice constraints.
//!
//! A monomial `s·δ(v₀,i₀)·δ(v₁,i₁)…` contributes `s` when the global choice
//! vector picks value `vₖ` at every index `iₖ`, and `o` otherwise. At most one
//! delta is kept per index; asking for two different values at the same index
//! can never be satisfied, so the monomial collapses to zero.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::semiring::{Scalar, Semiring};

/// A single choice constraint: "choice `index` takes `value`".
///
/// Field order makes the derived `Ord` compare by index first, then value,
/// which is the order monomials are kept in. On the wire a delta is the pair
/// `[value, index]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "(u8, usize)", into = "(u8, usize)")]
pub struct Delta {
    pub index: usize,
    pub value: u8,
}

impl Delta {
    pub fn new(value: u8, index: usize) -> Self {
        Self { index, value }
    }
}

impl From<(u8, usize)> for Delta {
    fn from((value, index): (u8, usize)) -> Self {
        Delta::new(value, index)
    }
}

impl From<Delta> for (u8, usize) {
    fn from(d: Delta) -> Self {
        (d.value, d.index)
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "δ({},{})", self.value, self.index)
    }
}

/// Wire shape of a monomial; decoding goes through `Monomial::with_deltas` so
/// that conflicting or unsorted deltas are normalized.
#[derive(Serialize, Deserialize)]
struct MonomialRecord {
    scalar: Scalar,
    deltas: Vec<Delta>,
}

/// A scalar together with index-disjoint deltas, sorted by index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "MonomialRecord", into = "MonomialRecord")]
pub struct Monomial {
    scalar: Scalar,
    deltas: Vec<Delta>,
}

impl From<MonomialRecord> for Monomial {
    fn from(r: MonomialRecord) -> Self {
        Monomial::with_deltas(r.scalar, r.deltas)
    }
}

impl From<Monomial> for MonomialRecord {
    fn from(m: Monomial) -> Self {
        MonomialRecord {
            scalar: m.scalar,
            deltas: m.deltas,
        }
    }
}

impl Monomial {
    /// A monomial without deltas.
    pub fn new(scalar: Scalar) -> Self {
        Self {
            scalar,
            deltas: Vec::new(),
        }
    }

    /// Build a monomial by inserting `deltas` one at a time.
    pub fn with_deltas(scalar: Scalar, deltas: impl IntoIterator<Item = Delta>) -> Self {
        let mut mono = Self::new(scalar);
        for d in deltas {
            mono.insert(d);
        }
        mono
    }

    pub fn zero() -> Self {
        Self::new(Scalar::zero())
    }

    pub fn unit() -> Self {
        Self::new(Scalar::one())
    }

    pub fn scalar(&self) -> Scalar {
        self.scalar
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    pub fn is_zero(&self) -> bool {
        self.scalar.is_zero()
    }

    /// Add one constraint.
    ///
    /// Re-inserting an existing delta does nothing; a second value at an
    /// already constrained index turns the monomial into zero.
    pub fn insert(&mut self, delta: Delta) {
        if self.is_zero() {
            self.deltas.clear();
            return;
        }
        match self.deltas.binary_search_by_key(&delta.index, |d| d.index) {
            Ok(pos) if self.deltas[pos].value == delta.value => {}
            Ok(_) => {
                self.scalar = Scalar::zero();
                self.deltas.clear();
            }
            Err(pos) => self.deltas.insert(pos, delta),
        }
    }

    /// Product of two monomials: multiply scalars, merge constraints.
    pub fn product(&self, other: &Monomial) -> Monomial {
        let scalar = self.scalar.mul(&other.scalar);
        if scalar.is_zero() {
            return Monomial::zero();
        }
        let mut result = Monomial {
            scalar,
            deltas: self.deltas.clone(),
        };
        for d in &other.deltas {
            result.insert(*d);
            if result.is_zero() {
                break;
            }
        }
        result
    }

    /// True when the choice vector satisfies every delta.
    pub fn matches(&self, choices: &[u8]) -> bool {
        self.deltas
            .iter()
            .all(|d| choices.get(d.index) == Some(&d.value))
    }

    /// The scalar under `choices`, `o` when some delta is not satisfied.
    pub fn evaluate(&self, choices: &[u8]) -> Scalar {
        if self.matches(choices) {
            self.scalar
        } else {
            Scalar::zero()
        }
    }

    /// Delta-set inclusion: every delta of `other` is also in `self`.
    pub fn contains(&self, other: &Monomial) -> bool {
        other
            .deltas
            .iter()
            .all(|d| self.deltas.binary_search(d).is_ok())
    }

    /// `self` makes `other` redundant in a sum: it fires whenever `other`
    /// fires, with at least the same scalar.
    pub fn absorbs(&self, other: &Monomial) -> bool {
        other.contains(self) && self.scalar >= other.scalar
    }

    /// Same constraints, different scalar.
    pub fn with_scalar(&self, scalar: Scalar) -> Monomial {
        Monomial::with_deltas(scalar, self.deltas.iter().copied())
    }
}

impl fmt::Display for Monomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scalar)?;
        for d in &self.deltas {
            write!(f, ".{}", d)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(value: u8, index: usize) -> Delta {
        Delta::new(value, index)
    }

    #[test]
    fn insert_keeps_index_order() {
        let m = Monomial::with_deltas(Scalar::W, [d(1, 3), d(0, 1), d(2, 2)]);
        let idx: Vec<_> = m.deltas().iter().map(|d| d.index).collect();
        assert_eq!(idx, vec![1, 2, 3]);
    }

    #[test]
    fn repeated_delta_is_noop() {
        let mut m = Monomial::with_deltas(Scalar::P, [d(1, 0)]);
        m.insert(d(1, 0));
        assert_eq!(m, Monomial::with_deltas(Scalar::P, [d(1, 0)]));
    }

    #[test]
    fn conflicting_delta_collapses() {
        let a = Monomial::with_deltas(Scalar::M, [d(0, 4), d(1, 4)]);
        let b = Monomial::with_deltas(Scalar::M, [d(1, 4), d(0, 4)]);
        assert_eq!(a, Monomial::zero());
        assert_eq!(b, Monomial::zero());
    }

    #[test]
    fn product_merges_and_multiplies() {
        let a = Monomial::with_deltas(Scalar::W, [d(0, 0)]);
        let b = Monomial::with_deltas(Scalar::P, [d(2, 1)]);
        let ab = a.product(&b);
        assert_eq!(ab.scalar(), Scalar::P);
        assert_eq!(ab.deltas(), &[d(0, 0), d(2, 1)]);

        let c = Monomial::with_deltas(Scalar::M, [d(1, 0)]);
        assert!(a.product(&c).is_zero());
    }

    #[test]
    fn evaluate_under_choice() {
        let m = Monomial::with_deltas(Scalar::W, [d(0, 0), d(2, 1)]);
        assert_eq!(m.evaluate(&[0, 2]), Scalar::W);
        assert_eq!(m.evaluate(&[0, 1]), Scalar::O);
        assert_eq!(m.evaluate(&[0]), Scalar::O);
    }

    #[test]
    fn absorption() {
        let general = Monomial::with_deltas(Scalar::P, [d(0, 0)]);
        let specific = Monomial::with_deltas(Scalar::W, [d(0, 0), d(1, 1)]);
        assert!(general.absorbs(&specific));
        assert!(!specific.absorbs(&general));
    }
}
