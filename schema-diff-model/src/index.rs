use crate::signature::{self, Signature};
use serde::{Deserialize, Serialize};

/// Normalized index method, spanning the union of what the five dialects
/// expose. `Regular`/`FunctionBased` are used by dialects (Oracle, DB2) whose
/// catalog does not distinguish a storage method the way Postgres/MySQL do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexType {
    BTree,
    Hash,
    Gin,
    Gist,
    Brin,
    SpGist,
    Clustered,
    Nonclustered,
    Bitmap,
    FunctionBased,
    Regular,
}

impl IndexType {
    pub fn as_token(self) -> &'static str {
        match self {
            IndexType::BTree => "BTREE",
            IndexType::Hash => "HASH",
            IndexType::Gin => "GIN",
            IndexType::Gist => "GIST",
            IndexType::Brin => "BRIN",
            IndexType::SpGist => "SPGIST",
            IndexType::Clustered => "CLUSTERED",
            IndexType::Nonclustered => "NONCLUSTERED",
            IndexType::Bitmap => "BITMAP",
            IndexType::FunctionBased => "FUNCTION-BASED",
            IndexType::Regular => "REGULAR",
        }
    }
}

/// A table-level index. Like [`Constraint`](crate::Constraint), `name` is
/// advisory: uniqueness is part of the signature, the name is not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub index_type: IndexType,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>, unique: bool, index_type: IndexType) -> Self {
        Index {
            name: name.into(),
            columns,
            unique,
            index_type,
        }
    }
}

impl Signature for Index {
    fn signature(&self) -> String {
        signature::index_signature(&self.columns, self.index_type.as_token(), self.unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniqueness_is_part_of_signature() {
        let a = Index::new("ix_a", vec!["email".into()], true, IndexType::BTree);
        let b = Index::new("ix_b", vec!["email".into()], false, IndexType::BTree);
        assert_ne!(a.signature(), b.signature());
    }

    #[test]
    fn name_is_not_part_of_signature() {
        let a = Index::new("ix_a", vec!["email".into()], true, IndexType::BTree);
        let b = Index::new("ix_b", vec!["email".into()], true, IndexType::BTree);
        assert_eq!(a.signature(), b.signature());
    }
}
