use thiserror::Error;

/// Errors raised by the quiz engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Answer input contained something other than digits
    #[error("answers may only contain digits, got {0:?}")]
    InvalidInput(String),

    /// Text that does not name a difficulty, operator or time band
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
}
