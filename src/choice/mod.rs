//! Choice reduction.
//!
//! An analysis with `n` assignments yields a matrix whose entries depend on
//! a choice vector in `domain^n`. Evaluating every vector is out of the
//! question, so instead we start from the *witnesses*: delta lists of
//! infinite monomials. Any choice vector satisfying a witness makes the
//! result infinite. [`Choices`] describes the complement of all witnesses as
//! a list of maximal boxes, each box giving one allowed-value set per index.
//!
//! Generation works in two steps:
//!
//! 1. [`simplify`] shrinks the witness set without changing which choice
//!    vectors it covers (subsumption, saturation and the all-but-one rule).
//! 2. [`build_vectors`] enumerates the maximal boxes that avoid every
//!    witness.

pub mod delta_graph;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algebra::Delta;
use crate::error::{MwpError, Result};

pub use delta_graph::DeltaGraph;

/// One allowed-value set per choice index.
pub type Vector = Vec<BTreeSet<u8>>;

/// A delta list that forces an infinite result, sorted by index.
pub type Witness = Vec<Delta>;

/// The choice vectors that avoid every infinity witness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<Vec<u8>>>", into = "Vec<Vec<Vec<u8>>>")]
pub struct Choices {
    valid: Vec<Vector>,
    index: usize,
}

impl From<Vec<Vec<Vec<u8>>>> for Choices {
    fn from(valid: Vec<Vec<Vec<u8>>>) -> Self {
        Choices::from_vectors(valid)
    }
}

impl From<Choices> for Vec<Vec<Vec<u8>>> {
    fn from(c: Choices) -> Self {
        c.valid
            .into_iter()
            .map(|v| v.into_iter().map(|s| s.into_iter().collect()).collect())
            .collect()
    }
}

impl Choices {
    /// Compute the safe choices for `index` indices over `domain`.
    pub fn generate(
        domain: &[u8],
        index: usize,
        witnesses: impl IntoIterator<Item = Witness>,
    ) -> Result<Choices> {
        let witnesses: BTreeSet<Witness> = witnesses.into_iter().collect();
        if let Some(d) = witnesses.iter().flatten().find(|d| d.index >= index) {
            return Err(MwpError::Internal(format!(
                "witness delta {} outside of {} choice indices",
                d, index
            )));
        }
        let simplified = simplify(domain, witnesses);
        debug!(
            witnesses = simplified.len(),
            "infinity paths: {}",
            simplified
                .iter()
                .map(|w| format!("{:?}", w.iter().map(|d| (d.value, d.index)).collect::<Vec<_>>()))
                .collect::<Vec<_>>()
                .join(" # ")
        );
        let valid = build_vectors(domain, index, &simplified);
        if let Some(w) = simplified
            .iter()
            .find(|w| valid.iter().any(|v| !blocks(v, w)))
        {
            return Err(MwpError::Internal(format!(
                "choice vector does not avoid witness {:?}",
                w
            )));
        }
        Ok(Choices { valid, index })
    }

    /// Choices over `index` indices where nothing avoids infinity.
    pub fn infinite(index: usize) -> Choices {
        Choices {
            valid: Vec::new(),
            index,
        }
    }

    /// Restore from the per-vector lists stored in result files.
    pub fn from_vectors(valid: Vec<Vec<Vec<u8>>>) -> Choices {
        let index = valid.first().map_or(0, Vec::len);
        let valid = valid
            .into_iter()
            .map(|v| v.into_iter().map(|s| s.into_iter().collect()).collect())
            .collect();
        Choices { valid, index }
    }

    pub fn vectors(&self) -> &[Vector] {
        &self.valid
    }

    /// Number of choice indices.
    pub fn index(&self) -> usize {
        self.index
    }

    /// No choice avoids infinity.
    pub fn is_infinite(&self) -> bool {
        self.valid.is_empty()
    }

    /// First value of every set in the first vector.
    pub fn first(&self) -> Option<Vec<u8>> {
        let vector = self.valid.first()?;
        vector.iter().map(|s| s.iter().next().copied()).collect()
    }

    /// Values allowed at `index` by at least one vector.
    pub fn allowed_at(&self, index: usize) -> BTreeSet<u8> {
        self.valid
            .iter()
            .filter_map(|v| v.get(index))
            .flatten()
            .copied()
            .collect()
    }

    /// Number of (not necessarily distinct) choice vectors the boxes span.
    pub fn n_bounds(&self) -> u128 {
        self.valid
            .iter()
            .map(|v| v.iter().fold(1u128, |acc, s| acc.saturating_mul(s.len() as u128)))
            .fold(0u128, u128::saturating_add)
    }

    /// True when the choices (possibly a prefix) fit inside some vector.
    pub fn is_valid(&self, choices: &[u8]) -> bool {
        self.valid.iter().any(|v| {
            choices.len() <= v.len() && choices.iter().zip(v).all(|(c, set)| set.contains(c))
        })
    }

    /// Choices allowed by both `self` and `other`.
    pub fn intersection(&self, other: &Choices) -> Choices {
        let mut valid: Vec<Vector> = Vec::new();
        for a in &self.valid {
            for b in &other.valid {
                let meet: Vector = a.iter().zip(b).map(|(x, y)| x & y).collect();
                if meet.iter().all(|s| !s.is_empty()) && !valid.contains(&meet) {
                    valid.push(meet);
                }
            }
        }
        Choices {
            valid: keep_maximal(valid),
            index: self.index.max(other.index),
        }
    }

    /// Intersection of several choice sets; `None` for an empty input.
    pub fn reduce_all<'a>(choices: impl IntoIterator<Item = &'a Choices>) -> Option<Choices> {
        choices
            .into_iter()
            .fold(None, |acc: Option<Choices>, c| match acc {
                None => Some(c.clone()),
                Some(acc) => Some(acc.intersection(c)),
            })
    }
}

impl fmt::Display for Choices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vectors: Vec<String> = self
            .valid
            .iter()
            .map(|v| {
                let sets: Vec<String> = v
                    .iter()
                    .map(|s| {
                        let values: Vec<String> = s.iter().map(u8::to_string).collect();
                        format!("[{}]", values.join(","))
                    })
                    .collect();
                format!("[{}]", sets.join(","))
            })
            .collect();
        write!(f, "{}", vectors.join(" "))
    }
}

/// The vector avoids the witness: some delta's value is not allowed.
fn blocks(vector: &Vector, witness: &Witness) -> bool {
    witness
        .iter()
        .any(|d| vector.get(d.index).map_or(true, |s| !s.contains(&d.value)))
}

// ============================================================================
// Simplification
// ============================================================================

/// Shrink a witness set without changing the choice vectors it covers.
///
/// Repeats until stable:
/// - drop witnesses that contain another witness,
/// - replace a group of witnesses equal up to the value at one index, with
///   values covering the whole domain, by the group's common part,
/// - when singleton witnesses exclude all values but one at an index, drop
///   that remaining delta from longer witnesses.
pub fn simplify(domain: &[u8], witnesses: BTreeSet<Witness>) -> BTreeSet<Witness> {
    let mut current = subsume(witnesses);
    loop {
        let saturated = subsume(saturate(domain, &current));
        let next = subsume(except_one(domain, saturated));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Remove every witness that is a strict superset of another one.
fn subsume(witnesses: BTreeSet<Witness>) -> BTreeSet<Witness> {
    let mut by_len: Vec<Witness> = witnesses.into_iter().collect();
    by_len.sort_by_key(Vec::len);
    let mut kept: Vec<Witness> = Vec::new();
    for w in by_len {
        if !kept.iter().any(|k| is_subset(k, &w)) {
            kept.push(w);
        }
    }
    kept.into_iter().collect()
}

fn is_subset(small: &[Delta], large: &[Delta]) -> bool {
    small.iter().all(|d| large.binary_search(d).is_ok())
}

fn saturate(domain: &[u8], witnesses: &BTreeSet<Witness>) -> BTreeSet<Witness> {
    let mut result = witnesses.clone();
    for w in witnesses {
        for (pos, delta) in w.iter().enumerate() {
            let mut rest = w.clone();
            rest.remove(pos);
            let covered = domain.iter().all(|&value| {
                let mut sibling = rest.clone();
                sibling.insert(pos, Delta::new(value, delta.index));
                witnesses.contains(&sibling)
            });
            if covered {
                result.insert(rest);
            }
        }
    }
    result
}

fn except_one(domain: &[u8], witnesses: BTreeSet<Witness>) -> BTreeSet<Witness> {
    let singles: Vec<Delta> = witnesses
        .iter()
        .filter(|w| w.len() == 1)
        .map(|w| w[0])
        .collect();
    let indices: BTreeSet<usize> = singles.iter().map(|d| d.index).collect();
    let forced: Vec<Delta> = indices
        .into_iter()
        .filter_map(|index| {
            let mut remaining = domain
                .iter()
                .filter(|&&v| !singles.contains(&Delta::new(v, index)));
            match (remaining.next(), remaining.next()) {
                (Some(&v), None) => Some(Delta::new(v, index)),
                _ => None,
            }
        })
        .collect();
    if forced.is_empty() {
        return witnesses;
    }
    witnesses
        .into_iter()
        .map(|w| {
            if w.len() > 1 {
                w.into_iter().filter(|d| !forced.contains(d)).collect()
            } else {
                w
            }
        })
        .collect()
}

// ============================================================================
// Vector construction
// ============================================================================

/// Enumerate the maximal boxes of `domain^index` that avoid every witness.
///
/// A box avoids a witness when it excludes the value of one of its deltas.
/// The search walks the witnesses in order, branching only on witnesses the
/// current box does not avoid yet, and never empties an index.
pub fn build_vectors(domain: &[u8], index: usize, witnesses: &BTreeSet<Witness>) -> Vec<Vector> {
    let full: BTreeSet<u8> = domain.iter().copied().collect();
    let mut ordered: Vec<&Witness> = witnesses.iter().collect();
    ordered.sort_by_key(|w| w.len());

    let mut vector = vec![full; index];
    let mut found = Vec::new();
    search(&ordered, 0, &mut vector, &mut found);

    let mut valid = keep_maximal(found);
    valid.sort();
    debug!(vectors = valid.len(), "built choice vectors");
    valid
}

fn search(witnesses: &[&Witness], next: usize, vector: &mut Vector, found: &mut Vec<Vector>) {
    let open = witnesses[next..]
        .iter()
        .position(|w| !blocks(vector, w))
        .map(|p| next + p);
    let Some(at) = open else {
        found.push(vector.clone());
        return;
    };
    for d in witnesses[at].iter() {
        if vector[d.index].len() > 1 {
            vector[d.index].remove(&d.value);
            search(witnesses, at + 1, vector, found);
            vector[d.index].insert(d.value);
        }
    }
}

/// `a` allows every choice `b` allows.
fn contains(a: &Vector, b: &Vector) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| y.is_subset(x))
}

fn keep_maximal(vectors: Vec<Vector>) -> Vec<Vector> {
    let mut kept: Vec<Vector> = Vec::new();
    for v in vectors {
        if kept.iter().any(|k| contains(k, &v)) {
            continue;
        }
        kept.retain(|k| !contains(&v, k));
        kept.push(v);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(deltas: &[(u8, usize)]) -> Witness {
        let mut v: Witness = deltas.iter().map(|&(value, i)| Delta::new(value, i)).collect();
        v.sort();
        v
    }

    fn set(values: &[u8]) -> BTreeSet<u8> {
        values.iter().copied().collect()
    }

    #[test]
    fn subsume_keeps_shortest() {
        let ws: BTreeSet<_> = [w(&[(0, 0)]), w(&[(0, 0), (1, 1)]), w(&[(2, 1)])].into();
        let kept = subsume(ws);
        assert_eq!(kept, [w(&[(0, 0)]), w(&[(2, 1)])].into());
    }

    #[test]
    fn saturate_front_and_end() {
        let front: BTreeSet<_> = [
            w(&[(0, 0), (2, 1), (1, 4)]),
            w(&[(1, 0), (2, 1), (1, 4)]),
            w(&[(2, 0), (2, 1), (1, 4)]),
        ]
        .into();
        assert_eq!(simplify(&[0, 1, 2], front), [w(&[(2, 1), (1, 4)])].into());

        let end: BTreeSet<_> = [
            w(&[(2, 1), (1, 4), (0, 5)]),
            w(&[(2, 1), (1, 4), (1, 5)]),
            w(&[(2, 1), (1, 4), (2, 5)]),
        ]
        .into();
        assert_eq!(simplify(&[0, 1, 2], end), [w(&[(2, 1), (1, 4)])].into());
    }

    #[test]
    fn except_one_drops_forced_delta() {
        let ws: BTreeSet<_> = [w(&[(0, 0)]), w(&[(1, 0)]), w(&[(2, 0), (2, 1), (1, 4)])].into();
        let simplified = simplify(&[0, 1, 2], ws);
        assert!(simplified.contains(&w(&[(2, 1), (1, 4)])));
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn no_witnesses_allows_everything() {
        let c = Choices::generate(&[0, 1, 2], 2, []).unwrap();
        assert_eq!(c.vectors(), &[vec![set(&[0, 1, 2]), set(&[0, 1, 2])]]);
        assert_eq!(c.n_bounds(), 9);
    }

    #[test]
    fn unconditional_witness_is_infinite() {
        let c = Choices::generate(&[0, 1, 2], 0, [vec![]]).unwrap();
        assert!(c.is_infinite());
        assert_eq!(c.first(), None);
    }

    #[test]
    fn witness_outside_range_is_internal_error() {
        let err = Choices::generate(&[0, 1, 2], 1, [w(&[(0, 1)])]).unwrap_err();
        assert!(matches!(err, MwpError::Internal(_)));
    }

    #[test]
    fn blocks_each_witness() {
        let ws = [w(&[(0, 0), (1, 1)]), w(&[(2, 0)]), w(&[(1, 1), (0, 2)])];
        let c = Choices::generate(&[0, 1, 2], 3, ws.clone()).unwrap();
        for v in c.vectors() {
            for witness in &ws {
                assert!(blocks(v, witness));
            }
        }
    }

    #[test]
    fn intersection_of_boxes() {
        let a = Choices::from_vectors(vec![vec![vec![0, 1], vec![0, 2]]]);
        let b = Choices::from_vectors(vec![vec![vec![1], vec![1, 2]]]);
        let c = Choices::from_vectors(vec![vec![vec![1], vec![1]]]);
        assert_eq!(a.intersection(&b), Choices::from_vectors(vec![vec![vec![1], vec![2]]]));
        assert!(a.intersection(&c).is_infinite());
        assert_eq!(Choices::reduce_all([&b, &c]), Some(c.clone()));
        assert_eq!(Choices::reduce_all(std::iter::empty()), None);
    }

    #[test]
    fn serde_shape() {
        let c = Choices::from_vectors(vec![vec![vec![0, 1, 2], vec![1, 2]]]);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "[[[0,1,2],[1,2]]]");
        let back: Choices = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert_eq!(back.index(), 2);
    }
}
