pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parser configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Failed to compile pattern: {0}")]
    Pattern(#[from] Box<fancy_regex::Error>),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Repair pass `{pass}` failed: {reason}")]
    Repair { pass: &'static str, reason: String },
}

impl From<fancy_regex::Error> for Error {
    fn from(error: fancy_regex::Error) -> Self {
        Self::Pattern(Box::new(error))
    }
}

#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        if std::mem::discriminant(self) != std::mem::discriminant(other) {
            return false;
        }

        // Good enough for testing purposes
        format!("{self:?}") == format!("{other:?}")
    }
}
