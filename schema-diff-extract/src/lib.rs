//! One extractor per dialect, each reading the vendor system catalog and
//! normalizing vendor-specific quirks into a uniform [`SchemaModel`].
//!
//! The hard, dialect-specific work lives in the per-dialect submodules
//! (gated behind feature flags mirroring their real driver dependency);
//! the retry/timeout/progress-event/validation machinery they all share
//! lives once in [`framework`].

pub mod error;
pub mod framework;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mssql")]
pub mod mssql;

#[cfg(feature = "oracle")]
pub mod oracle;

#[cfg(feature = "db2")]
pub mod db2;

pub use error::ExtractError;
