use thiserror::Error;

/// Everything `generate` can fail with. Errors are values; no stage panics
/// on bad input and no partially built map ever escapes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The configuration was rejected before any stage ran.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The starting-position placer exhausted its spacing retries.
    #[error("no valid starting positions after {attempts} attempts")]
    StartingPositionsImpossible { attempts: u32 },

    /// The finished map violated at least one output invariant.
    #[error("map validation failed: {}", issues.join("; "))]
    ValidationFailed { issues: Vec<String> },

    /// The caller's cancellation token was observed set.
    #[error("generation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = GenerationError::InvalidConfig {
            reason: "width too small".into(),
        };
        assert!(err.to_string().contains("width too small"));
    }

    #[test]
    fn validation_issues_joined() {
        let err = GenerationError::ValidationFailed {
            issues: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "map validation failed: a; b");
    }
}
