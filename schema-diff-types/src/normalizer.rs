use crate::Dialect;
use schema_diff_model::TypeSpec;

/// Canonicalizes a single dialect's own alias spellings for a base type
/// (e.g. Postgres's catalog can report `int4`, `integer`, or `int` for the
/// same underlying type depending on which view produced the string) before
/// two [`TypeSpec`]s are compared.
///
/// This performs no cross-dialect mapping: comparing a Postgres `int` to a
/// MySQL `int` is outside this type's job, and outside this tool's scope
/// entirely (spec Non-goals).
#[derive(Clone, Copy, Debug)]
pub struct TypeNormalizer {
    dialect: Dialect,
}

impl TypeNormalizer {
    pub fn new(dialect: Dialect) -> Self {
        TypeNormalizer { dialect }
    }

    /// True if `a` and `b` denote the same type once this dialect's own
    /// alias spellings are canonicalized. Length/precision/scale/unsigned
    /// are always compared verbatim: a changed length is always drift.
    pub fn equivalent(&self, a: &TypeSpec, b: &TypeSpec) -> bool {
        self.canonicalize(a) == self.canonicalize(b)
    }

    fn canonicalize(&self, tpe: &TypeSpec) -> TypeSpec {
        let mut canonical = tpe.clone();
        canonical.base = self.canonical_base(&tpe.base);
        if let Some(element) = &tpe.element {
            canonical.element = Some(Box::new(self.canonicalize(element)));
        }
        canonical
    }

    fn canonical_base(&self, base: &str) -> String {
        let lowered = base.to_lowercase();
        let alias_table: &[(&str, &str)] = match self.dialect {
            Dialect::Postgres => POSTGRES_ALIASES,
            Dialect::MySql => MYSQL_ALIASES,
            Dialect::Mssql => MSSQL_ALIASES,
            Dialect::Oracle => ORACLE_ALIASES,
            Dialect::Db2 => DB2_ALIASES,
        };

        alias_table
            .iter()
            .find(|(alias, _)| *alias == lowered)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(lowered)
    }
}

const POSTGRES_ALIASES: &[(&str, &str)] = &[
    ("int4", "integer"),
    ("int", "integer"),
    ("int8", "bigint"),
    ("int2", "smallint"),
    ("float4", "real"),
    ("float8", "double precision"),
    ("bool", "boolean"),
    ("varchar", "character varying"),
    ("char", "character"),
    ("decimal", "numeric"),
    ("timestamptz", "timestamp with time zone"),
    ("timetz", "time with time zone"),
];

const MYSQL_ALIASES: &[(&str, &str)] = &[
    ("integer", "int"),
    ("numeric", "decimal"),
    ("bool", "tinyint"),
    ("boolean", "tinyint"),
    ("dec", "decimal"),
];

const MSSQL_ALIASES: &[(&str, &str)] = &[("numeric", "decimal"), ("rowversion", "timestamp")];

const ORACLE_ALIASES: &[(&str, &str)] = &[("varchar", "varchar2"), ("number", "number")];

const DB2_ALIASES: &[(&str, &str)] = &[("int", "integer"), ("dec", "decimal")];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_alias_spellings_are_equivalent() {
        let normalizer = TypeNormalizer::new(Dialect::Postgres);
        let a = TypeSpec::new("int4");
        let b = TypeSpec::new("integer");
        assert!(normalizer.equivalent(&a, &b));
    }

    #[test]
    fn length_change_is_never_equivalent() {
        let normalizer = TypeNormalizer::new(Dialect::Postgres);
        let a = TypeSpec::new("varchar").with_length(100);
        let b = TypeSpec::new("varchar").with_length(200);
        assert!(!normalizer.equivalent(&a, &b));
    }

    #[test]
    fn mysql_boolean_alias_resolves_to_tinyint() {
        let normalizer = TypeNormalizer::new(Dialect::MySql);
        let a = TypeSpec::new("boolean");
        let b = TypeSpec::new("tinyint");
        assert!(normalizer.equivalent(&a, &b));
    }
}
