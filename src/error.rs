use thiserror::Error;

/// Typed failures the pipeline distinguishes from generic I/O errors.
///
/// Degenerate regression fits are not listed here: they are recovered in
/// place with a fallback residual spread and surfaced through
/// `FittedModel::sigma_fallback` so callers can log them.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// A required input column/field is absent. Fatal for that computation;
    /// never silently substituted.
    #[error("missing required input: {0}")]
    MissingData(String),

    /// Prediction-time feature set differs from the training-time set.
    /// Fail fast instead of zero-filling.
    #[error("feature mismatch: model expects {expected:?}, caller supplied {got:?}")]
    FeatureAlignment {
        expected: Vec<String>,
        got: Vec<String>,
    },

    /// A team label no source mapping can canonicalize. The affected record
    /// is dropped and counted; the batch continues.
    #[error("unresolvable team code: {0:?}")]
    UnresolvableTeamCode(String),
}
