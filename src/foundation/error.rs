use std::fmt;

/// Convenience result type used across the placement engine.
pub type MockupResult<T> = Result<T, MockupError>;

/// Top-level error taxonomy for placement calls.
///
/// Every variant is recoverable at the orchestrator boundary; the caller gets a
/// structured failure, never a panic.
#[derive(thiserror::Error, Debug)]
pub enum MockupError {
    /// No marker pixels (or no marker component above the speckle threshold).
    #[error("no placement region detected")]
    NoRegionDetected,

    /// The destination quadrilateral has (near) zero area or crosses itself.
    #[error("degenerate quad: {0}")]
    DegenerateQuad(String),

    /// Transform coefficients or mapped corners are not finite.
    #[error("unsupported transform: {0}")]
    UnsupportedTransform(String),

    /// Every attempted strategy failed; one entry per strategy.
    #[error("all placement methods failed: {}", FailureList(.0))]
    AllMethodsFailed(Vec<StrategyFailure>),

    /// The canvas is larger than the configured per-request scan budget.
    #[error("scan budget exceeded: {pixels} pixels > budget {budget}")]
    ScanBudgetExceeded {
        /// Pixels the scan would have touched.
        pixels: u64,
        /// Configured maximum.
        budget: u64,
    },

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Image decode/encode failures.
    #[error("codec error: {0}")]
    Codec(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why one strategy of an auto run failed.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StrategyFailure {
    /// Method name, e.g. `marker-region`.
    pub method: String,
    /// Display form of the strategy's error.
    pub reason: String,
}

struct FailureList<'a>(&'a [StrategyFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.method, failure.reason)?;
        }
        Ok(())
    }
}

impl MockupError {
    /// Build a [`MockupError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MockupError::DegenerateQuad`] value.
    pub fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateQuad(msg.into())
    }

    /// Build a [`MockupError::UnsupportedTransform`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedTransform(msg.into())
    }

    /// Build a [`MockupError::Codec`] value.
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::Codec(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MockupError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            MockupError::degenerate("x")
                .to_string()
                .contains("degenerate quad:")
        );
        assert!(
            MockupError::unsupported("x")
                .to_string()
                .contains("unsupported transform:")
        );
        assert!(MockupError::codec("x").to_string().contains("codec error:"));
    }

    #[test]
    fn all_methods_failed_lists_every_reason() {
        let err = MockupError::AllMethodsFailed(vec![
            StrategyFailure {
                method: "marker-region".to_string(),
                reason: "no placement region detected".to_string(),
            },
            StrategyFailure {
                method: "quad-transform".to_string(),
                reason: "no transform layer declared".to_string(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("marker-region: no placement region detected"));
        assert!(msg.contains("; quad-transform: no transform layer declared"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = MockupError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
