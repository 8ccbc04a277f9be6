//! Polynomials over the mwp semiring.
//!
//! A polynomial is a sum of monomials kept in canonical form:
//!
//! - sorted by delta list (see [`compare_deltas`]),
//! - at most one monomial per delta list (scalars of equal keys are summed),
//! - no zero monomials (the empty list is the zero polynomial),
//! - no monomial absorbed by another one (see [`Monomial::absorbs`]).
//!
//! Canonical form makes structural equality meaningful, which the fixpoint
//! relies on to detect convergence.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::monomial::{Delta, Monomial};
use super::semiring::{Scalar, Semiring};

/// Order on delta lists: the first differing position decides by
/// `(index, value)`; a strict prefix is smaller.
pub fn compare_deltas(a: &[Delta], b: &[Delta]) -> Ordering {
    // slices already compare lexicographically with shorter-is-smaller
    a.cmp(b)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Monomial>", into = "Vec<Monomial>")]
pub struct Polynomial {
    monomials: Vec<Monomial>,
}

impl From<Vec<Monomial>> for Polynomial {
    fn from(monomials: Vec<Monomial>) -> Self {
        Polynomial::from_monomials(monomials)
    }
}

impl From<Polynomial> for Vec<Monomial> {
    fn from(p: Polynomial) -> Self {
        if p.monomials.is_empty() {
            vec![Monomial::zero()]
        } else {
            p.monomials
        }
    }
}

impl Polynomial {
    pub fn zero() -> Self {
        Self::default()
    }

    /// The polynomial `m`.
    pub fn unit() -> Self {
        Self::constant(Scalar::one())
    }

    pub fn constant(scalar: Scalar) -> Self {
        Self::from_monomials([Monomial::new(scalar)])
    }

    /// Normalize an arbitrary collection of monomials.
    pub fn from_monomials(monomials: impl IntoIterator<Item = Monomial>) -> Self {
        let mut list: Vec<Monomial> = monomials.into_iter().filter(|m| !m.is_zero()).collect();
        list.sort_by(|a, b| compare_deltas(a.deltas(), b.deltas()));
        Self::from_sorted(list)
    }

    /// Three-way branch at choice `index`: `s₀·δ(0,index) + s₁·δ(1,index) + s₂·δ(2,index)`.
    pub fn from_scalars(index: usize, scalars: [Scalar; 3]) -> Self {
        Self::from_monomials(
            scalars
                .into_iter()
                .zip(0u8..)
                .map(|(s, value)| Monomial::with_deltas(s, [Delta::new(value, index)])),
        )
    }

    /// Canonicalize a list already sorted by delta list: merge equal keys,
    /// then drop absorbed monomials.
    fn from_sorted(sorted: Vec<Monomial>) -> Self {
        let mut merged: Vec<Monomial> = Vec::with_capacity(sorted.len());
        for mono in sorted {
            if mono.is_zero() {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.deltas() == mono.deltas() => {
                    let scalar = last.scalar().add(&mono.scalar());
                    *last = last.with_scalar(scalar);
                }
                _ => merged.push(mono),
            }
        }
        let kept: Vec<bool> = merged
            .iter()
            .enumerate()
            .map(|(i, m)| {
                !merged
                    .iter()
                    .enumerate()
                    .any(|(j, other)| i != j && other.absorbs(m))
            })
            .collect();
        let monomials = merged
            .into_iter()
            .zip(kept)
            .filter_map(|(m, keep)| keep.then_some(m))
            .collect();
        Self { monomials }
    }

    pub fn monomials(&self) -> &[Monomial] {
        &self.monomials
    }

    pub fn len(&self) -> usize {
        self.monomials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monomials.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.monomials.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        *self == Self::unit()
    }

    /// Sum: linear merge of the two sorted lists.
    pub fn add(&self, other: &Polynomial) -> Polynomial {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let mut merged = Vec::with_capacity(self.len() + other.len());
        let (mut a, mut b) = (self.monomials.iter().peekable(), other.monomials.iter().peekable());
        loop {
            let take_left = match (a.peek(), b.peek()) {
                (Some(x), Some(y)) => compare_deltas(x.deltas(), y.deltas()) != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { a.next() } else { b.next() };
            merged.extend(next.cloned());
        }
        Self::from_sorted(merged)
    }

    /// Multiply every monomial by `mono`, dropping products that vanish.
    pub fn multiply(&self, mono: &Monomial) -> Polynomial {
        Self::from_monomials(self.monomials.iter().map(|m| m.product(mono)))
    }

    /// Full product.
    ///
    /// The zero polynomial takes part as the monomial `o`, so an infinite
    /// monomial survives multiplication by zero (`o·i = i`).
    ///
    /// Each monomial of `other` yields a sorted row of products with `self`;
    /// the rows are merged through a heap keyed on their current head so the
    /// `|self|·|other|` products are never sorted as one list.
    pub fn times(&self, other: &Polynomial) -> Polynomial {
        let zero = [Monomial::zero()];
        let lhs = if self.is_zero() { &zero[..] } else { &self.monomials[..] };
        let rhs = if other.is_zero() { &zero[..] } else { &other.monomials[..] };
        let rows: Vec<Vec<Monomial>> = rhs
            .iter()
            .map(|m2| Self::from_monomials(lhs.iter().map(|m1| m1.product(m2))).monomials)
            .filter(|row| !row.is_empty())
            .collect();

        let mut heap = BinaryHeap::new();
        for (r, row) in rows.iter().enumerate() {
            heap.push(Reverse((row[0].deltas(), r, 0usize)));
        }
        let mut merged = Vec::new();
        while let Some(Reverse((_, r, i))) = heap.pop() {
            merged.push(rows[r][i].clone());
            if let Some(next) = rows[r].get(i + 1) {
                heap.push(Reverse((next.deltas(), r, i + 1)));
            }
        }
        Self::from_sorted(merged)
    }

    /// Sum of all monomial values under `choices`.
    pub fn evaluate(&self, choices: &[u8]) -> Scalar {
        self.monomials
            .iter()
            .fold(Scalar::zero(), |acc, m| acc.add(&m.evaluate(choices)))
    }

    /// Like [`evaluate`](Self::evaluate), but returns `least` when no monomial
    /// matches `choices`. The zero polynomial is always `o`.
    pub fn choice_scalar(&self, choices: &[u8], least: Scalar) -> Scalar {
        if self.is_zero() {
            return Scalar::zero();
        }
        self.monomials
            .iter()
            .filter(|m| m.matches(choices))
            .map(|m| m.scalar())
            .reduce(|a, b| a.add(&b))
            .unwrap_or(least)
    }

    /// Delta lists of monomials whose scalar is `i` or one of `extra`.
    pub fn infinity_deltas(&self, extra: &[Scalar]) -> Vec<Vec<Delta>> {
        self.monomials
            .iter()
            .filter(|m| m.scalar().is_infinite() || extra.contains(&m.scalar()))
            .map(|m| m.deltas().to_vec())
            .collect()
    }

    pub fn some_infinity(&self) -> bool {
        self.monomials.iter().any(|m| m.scalar().is_infinite())
    }

    /// Rewrite monomials whose scalar satisfies `pred` to `i`.
    ///
    /// Returns the new polynomial and the delta lists that became infinite.
    pub fn escalate(&self, pred: impl Fn(Scalar) -> bool) -> (Polynomial, Vec<Vec<Delta>>) {
        let mut promoted = Vec::new();
        let monomials = self
            .monomials
            .iter()
            .map(|m| {
                if pred(m.scalar()) {
                    promoted.push(m.deltas().to_vec());
                    m.with_scalar(Scalar::I)
                } else {
                    m.clone()
                }
            })
            .collect::<Vec<_>>();
        (Self::from_monomials(monomials), promoted)
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.monomials.is_empty() {
            return write!(f, "{}", Scalar::O);
        }
        for (i, m) in self.monomials.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}", m)?;
        }
        Ok(())
    }
}
