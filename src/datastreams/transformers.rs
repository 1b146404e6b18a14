use crate::domain::{Result, SubjectRecord};

/// Turns one raw source entry into one normalized subject record.
///
/// Implementations read their configuration once, at construction, and keep
/// no state between calls.
pub trait Transformer {
    type Input: ?Sized;

    /// Registry name used by pipeline presets
    const NAME: &'static str;

    fn apply(&self, entry: &Self::Input) -> Result<SubjectRecord>;
}
