//! The mwp algebra: scalars, monomials, polynomials, matrices and relations.

pub mod matrix;
pub mod monomial;
pub mod polynomial;
pub mod relation;
pub mod semiring;

pub use matrix::Matrix;
pub use monomial::{Delta, Monomial};
pub use polynomial::Polynomial;
pub use relation::{Relation, ScalarMatrix};
pub use semiring::{Scalar, Semiring};
