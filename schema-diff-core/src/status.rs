/// The three-valued outcome of a comparison run. `ERROR` is never
/// constructed by [`crate::run_comparison`] directly: it is what a caller
/// reports when the `Result` is `Err`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Identical,
    DifferencesFound,
}

impl Status {
    pub fn from_diff(diff: &schema_diff_compare::DiffTree) -> Self {
        if diff.is_empty() {
            Status::Identical
        } else {
            Status::DifferencesFound
        }
    }
}
