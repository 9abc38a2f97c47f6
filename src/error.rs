use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// An operator or planner setting was built without a required component.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The operator shape is valid but cannot be lowered by the cost-based path.
    #[error("Planner fallback: {0}")]
    PlannerFallback(String),

    /// Internal consistency violation detected while lowering.
    #[error("Internal planner error: {0}")]
    Internal(String),

    #[error("Parameter error: {0}")]
    Parameter(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn error_code(&self) -> i32 {
        match self {
            Error::Configuration(_) => -13,
            Error::PlannerFallback(_) => -20,
            Error::Internal(_) => -21,
            Error::Parameter(_) => -22,
            Error::Serialization(_) => -8,
            Error::Io(_) => -1,
        }
    }

    /// Only a fallback lets the caller switch to another plan-generation strategy.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PlannerFallback(_))
    }

    /// Planner defects, as opposed to errors caused by the statement itself.
    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal(_) | Error::Configuration(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fallback_is_recoverable() {
        assert!(Error::PlannerFallback("right join".into()).is_recoverable());
        assert!(!Error::Internal("bad inner".into()).is_recoverable());
        assert!(!Error::Configuration("no index".into()).is_recoverable());
    }

    #[test]
    fn test_internal_kinds() {
        assert!(Error::Internal("x".into()).is_internal());
        assert!(Error::Configuration("x".into()).is_internal());
        assert!(!Error::PlannerFallback("x".into()).is_internal());
        assert!(!Error::Parameter("x".into()).is_internal());
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            Error::Configuration(String::new()).error_code(),
            Error::PlannerFallback(String::new()).error_code(),
            Error::Internal(String::new()).error_code(),
            Error::Parameter(String::new()).error_code(),
            Error::Serialization(String::new()).error_code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
