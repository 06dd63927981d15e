use serde::{Deserialize, Serialize};

/// A canonical, dialect-neutral description of a column's data type.
///
/// `base` is always lowercased; everything else is optional because most
/// types only use a subset of these fields (e.g. `int` has neither length
/// nor precision, `varchar` has a length, `numeric` has precision+scale).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSpec {
    pub base: String,
    pub length: Option<u64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
    /// The element type for array/collection types (e.g. Postgres `int[]`).
    pub element: Option<Box<TypeSpec>>,
}

impl TypeSpec {
    pub fn new(base: impl Into<String>) -> Self {
        TypeSpec {
            base: base.into().to_lowercase(),
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            element: None,
        }
    }

    pub fn with_length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_precision_scale(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn array_of(element: TypeSpec) -> Self {
        TypeSpec {
            base: "array".to_string(),
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            element: Some(Box::new(element)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_lowercased() {
        let tpe = TypeSpec::new("VARCHAR").with_length(255);
        assert_eq!(tpe.base, "varchar");
        assert_eq!(tpe.length, Some(255));
    }

    #[test]
    fn equality_is_structural() {
        let a = TypeSpec::new("numeric").with_precision_scale(10, 2);
        let b = TypeSpec::new("NUMERIC").with_precision_scale(10, 2);
        assert_eq!(a, b);
    }
}
