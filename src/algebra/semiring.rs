//! The mwp growth semiring.
//!
//! Five scalars ordered `o < m < w < p < i` describe how a variable's value
//! can flow into another one:
//!
//! - `o`: no dependency
//! - `m`: maximum (no growth)
//! - `w`: weak polynomial dependency
//! - `p`: polynomial dependency
//! - `i`: no polynomial bound (infinity)
//!
//! Sum is the maximum. Product treats `m` as the unit, `o` as an annihilator
//! for everything but `i`, and `i` as absorbing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MwpError;

/// A commutative semiring with a total order.
///
/// Only the operations the matrix algebra needs: the identities and the two
/// operators. `Scalar` is the one implementation; tests use the trait to state
/// the laws generically.
pub trait Semiring: Copy + Eq + Ord + fmt::Debug {
    /// Additive identity: x ⊕ 0 = x
    fn zero() -> Self;

    /// Multiplicative identity: x ⊗ 1 = x
    fn one() -> Self;

    /// Semiring addition (⊕)
    fn add(&self, other: &Self) -> Self;

    /// Semiring multiplication (⊗)
    fn mul(&self, other: &Self) -> Self;

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    fn is_one(&self) -> bool {
        *self == Self::one()
    }
}

/// A single mwp scalar. The derived order is the semiring order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Scalar {
    #[default]
    #[serde(rename = "o")]
    O,
    #[serde(rename = "m")]
    M,
    #[serde(rename = "w")]
    W,
    #[serde(rename = "p")]
    P,
    #[serde(rename = "i")]
    I,
}

impl Scalar {
    /// All scalars in increasing order.
    pub const ALL: [Scalar; 5] = [Scalar::O, Scalar::M, Scalar::W, Scalar::P, Scalar::I];

    pub fn as_char(self) -> char {
        match self {
            Scalar::O => 'o',
            Scalar::M => 'm',
            Scalar::W => 'w',
            Scalar::P => 'p',
            Scalar::I => 'i',
        }
    }

    pub fn is_infinite(self) -> bool {
        self == Scalar::I
    }
}

impl Semiring for Scalar {
    #[inline]
    fn zero() -> Self {
        Scalar::O
    }

    #[inline]
    fn one() -> Self {
        Scalar::M
    }

    #[inline]
    fn add(&self, other: &Self) -> Self {
        (*self).max(*other)
    }

    #[inline]
    fn mul(&self, other: &Self) -> Self {
        match (*self, *other) {
            (Scalar::I, _) | (_, Scalar::I) => Scalar::I,
            (Scalar::O, _) | (_, Scalar::O) => Scalar::O,
            (a, b) => a.max(b),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for Scalar {
    type Error = MwpError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'o' => Ok(Scalar::O),
            'm' => Ok(Scalar::M),
            'w' => Ok(Scalar::W),
            'p' => Ok(Scalar::P),
            'i' => Ok(Scalar::I),
            other => Err(MwpError::UnknownScalar(other)),
        }
    }
}

impl FromStr for Scalar {
    type Err = MwpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Scalar::try_from(c),
            (Some(c), Some(_)) => Err(MwpError::UnknownScalar(c)),
            (None, _) => Err(MwpError::UnknownScalar(' ')),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Scalar::*;

    #[test]
    fn product_table() {
        // o absorbs everything except i
        assert_eq!(O.mul(&M), O);
        assert_eq!(O.mul(&P), O);
        assert_eq!(O.mul(&I), I);
        assert_eq!(I.mul(&O), I);
        // m is the unit
        assert_eq!(M.mul(&W), W);
        assert_eq!(P.mul(&M), P);
        // w and p act as max
        assert_eq!(W.mul(&P), P);
        assert_eq!(W.mul(&W), W);
    }

    #[test]
    fn sum_is_max() {
        for a in Scalar::ALL {
            for b in Scalar::ALL {
                assert_eq!(a.add(&b), a.max(b));
            }
        }
    }

    #[test]
    fn parse_letters() {
        assert_eq!("w".parse::<Scalar>().unwrap(), W);
        assert!(matches!(Scalar::try_from('x'), Err(MwpError::UnknownScalar('x'))));
        assert!("mw".parse::<Scalar>().is_err());
    }
}
