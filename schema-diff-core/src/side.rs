use std::path::PathBuf;

/// One side of a comparison: either a local SQL script, provisioned into a
/// freshly started ephemeral container, or a live connection to an
/// already-running database.
#[derive(Clone, Debug)]
pub enum SideSpec {
    Script {
        path: PathBuf,
        /// Overrides the dialect's default container image when set.
        image: Option<String>,
    },
    Live {
        url: String,
        user: Option<String>,
        password: Option<String>,
    },
}
