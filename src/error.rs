/// Errors raised by network construction, initialization and training.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid hyperparameters or incompatible layer widths.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network has not been initialized")]
    NotInitialized,

    /// Batch or tensor dimensionality disagreement.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// A label the output layer does not know about, or the wrong kind of label.
    #[error("label mismatch: {0}")]
    LabelMismatch(String),
}

impl Error {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
