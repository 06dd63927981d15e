//! The dialect tag used to dispatch extractor/provisioner/container
//! behavior, plus the [`TypeNormalizer`] that canonicalizes a single
//! dialect's own alias spellings for a type so two differently-spelled but
//! identical types don't show up as drift.
//!
//! Cross-dialect type equivalence (e.g. treating Postgres `int` and MySQL
//! `int` as "the same" when comparing across vendors) is explicitly out of
//! scope: the normalizer only resolves aliases *within* one dialect's own
//! catalog spellings.

mod dialect;
mod normalizer;

pub use dialect::Dialect;
pub use normalizer::TypeNormalizer;
