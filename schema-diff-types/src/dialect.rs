use serde::{Deserialize, Serialize};

/// Selects the extractor, provisioning profile, and container startup
/// options for one side of a comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    Postgres,
    MySql,
    Mssql,
    Oracle,
    Db2,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Mssql => "mssql",
            Dialect::Oracle => "oracle",
            Dialect::Db2 => "db2",
        }
    }

    /// The default container image used when this dialect's side is
    /// provisioned from a script rather than a live URL.
    pub fn default_image(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres:16",
            Dialect::MySql => "mysql:8.0",
            Dialect::Mssql => "mcr.microsoft.com/mssql/server:2022-latest",
            Dialect::Oracle => "gvenzl/oracle-xe:21-slim",
            Dialect::Db2 => "icr.io/db2_community/db2:11.5.8.0",
        }
    }

    /// Default readiness timeout for container startup; Oracle XE's first
    /// pull-and-init is far slower than the others.
    pub fn default_readiness_timeout_secs(self) -> u64 {
        match self {
            Dialect::Oracle => 600,
            _ => 120,
        }
    }
}
