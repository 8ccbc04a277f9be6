//! mwp-bounds: per-variable polynomial bounds read off a scalar matrix.
//!
//! The bound of a variable `x` after the program is `max(X, Y) + Z`, where
//! `X` are the sources flowing into `x` with scalar `m`, `Y` the sum of the
//! `w` sources and `Z` the product of the `p` sources.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::algebra::{Scalar, ScalarMatrix};

/// Bound of a single variable, as three variable sets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MwpBound {
    /// Variables under `max`
    pub x: BTreeSet<String>,
    /// Variables summed
    pub y: BTreeSet<String>,
    /// Variables multiplied
    pub z: BTreeSet<String>,
}

impl MwpBound {
    /// Record a source flowing in with `scalar`; `o` and `i` add nothing.
    pub fn append(&mut self, scalar: Scalar, variable: &str) {
        let set = match scalar {
            Scalar::M => &mut self.x,
            Scalar::W => &mut self.y,
            Scalar::P => &mut self.z,
            Scalar::O | Scalar::I => return,
        };
        set.insert(variable.to_string());
    }

    /// Restore from the `m;w;p` form, e.g. `x,y;;z`.
    pub fn parse(triple: &str) -> MwpBound {
        let mut parts = triple.split(';').map(|part| {
            part.split(',')
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
        });
        MwpBound {
            x: parts.next().unwrap_or_default(),
            y: parts.next().unwrap_or_default(),
            z: parts.next().unwrap_or_default(),
        }
    }

    /// The `m;w;p` form.
    pub fn triple(&self) -> String {
        [&self.x, &self.y, &self.z]
            .iter()
            .map(|set| set.iter().cloned().collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() && self.y.is_empty() && self.z.is_empty()
    }

    /// Bound expression; `compact` drops the `0` in `max(..,0)`.
    pub fn expression(&self, compact: bool) -> String {
        let join = |set: &BTreeSet<String>, sep: &str| set.iter().cloned().collect::<Vec<_>>().join(sep);
        let x = join(&self.x, ",");
        let y = join(&self.y, "+");
        let z = join(&self.z, "*");

        let single = |s: &str, len: usize| {
            if compact {
                if len > 1 {
                    format!("max({})", s)
                } else {
                    s.to_string()
                }
            } else if len > 1 || !self.z.is_empty() {
                format!("max({},0)", s)
            } else {
                s.to_string()
            }
        };

        let term = match (self.x.is_empty(), self.y.is_empty()) {
            (false, false) => Some(format!("max({},{})", x, y)),
            (false, true) => Some(single(&x, self.x.len())),
            (true, false) => Some(single(&y, self.y.len())),
            (true, true) => None,
        };
        match term {
            Some(term) if self.z.is_empty() => term,
            Some(term) => format!("{}+{}", term, z),
            None if self.z.is_empty() => "0".to_string(),
            None => z,
        }
    }

    /// `x′ ≤ …`, or `x′≤…` when compact.
    pub fn poly(&self, variable: &str, compact: bool) -> String {
        let le = if compact { "≤" } else { " ≤ " };
        format!("{}′{}{}", variable, le, self.expression(compact))
    }
}

impl From<String> for MwpBound {
    fn from(triple: String) -> Self {
        MwpBound::parse(&triple)
    }
}

impl From<MwpBound> for String {
    fn from(bound: MwpBound) -> Self {
        bound.triple()
    }
}

impl fmt::Display for MwpBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression(false))
    }
}

/// Bounds of every variable of a relation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bound {
    bounds: IndexMap<String, MwpBound>,
}

impl Bound {
    const LAND: &'static str = "∧";

    /// One bound per column of the matrix.
    pub fn calculate(matrix: &ScalarMatrix) -> Bound {
        let bounds = matrix
            .variables
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let mut bound = MwpBound::default();
                for (source, scalar) in matrix.column(col) {
                    bound.append(scalar, source);
                }
                (name.clone(), bound)
            })
            .collect();
        Bound { bounds }
    }

    pub fn get(&self, variable: &str) -> Option<&MwpBound> {
        self.bounds.get(variable)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.bounds.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MwpBound)> + '_ {
        self.bounds.iter()
    }

    /// All bounds joined by `∧`.
    ///
    /// `significant` hides variables bounded only by themselves.
    pub fn show(&self, compact: bool, significant: bool) -> String {
        self.bounds
            .iter()
            .filter(|(k, v)| !significant || **k != v.expression(compact))
            .map(|(k, v)| v.poly(k, compact))
            .collect::<Vec<_>>()
            .join(&format!(" {} ", Self::LAND))
    }
}

impl FromIterator<(String, MwpBound)> for Bound {
    fn from_iter<T: IntoIterator<Item = (String, MwpBound)>>(iter: T) -> Self {
        Bound {
            bounds: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show(false, false))
    }
}
