//! Load Errors
//!
//! One variant per pipeline stage. Every variant carries the underlying cause
//! so the entry point can log the full chain before exiting.

use thiserror::Error;

pub type LoadResult<T> = std::result::Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid configuration: {0:#}")]
    Config(#[source] anyhow::Error),

    #[error("Error reading source: {0:#}")]
    Source(#[source] anyhow::Error),

    #[error("Error transforming rows: {0:#}")]
    Transform(#[source] anyhow::Error),

    #[error("Error creating batches of data: {0:#}")]
    Batch(#[source] anyhow::Error),

    #[error("Error writing to graph store: {0:#}")]
    Write(#[source] anyhow::Error),
}

impl LoadError {
    /// Short stage name, used as a structured log field.
    pub fn stage(&self) -> &'static str {
        match self {
            LoadError::Config(_) => "config",
            LoadError::Source(_) => "source",
            LoadError::Transform(_) => "transform",
            LoadError::Batch(_) => "batch",
            LoadError::Write(_) => "write",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_message_includes_cause_chain() {
        let cause = anyhow!("connection reset").context("Failed to run vertex batch 3");
        let err = LoadError::Write(cause);

        assert_eq!(
            err.to_string(),
            "Error writing to graph store: Failed to run vertex batch 3: connection reset"
        );
        assert_eq!(err.stage(), "write");
    }

    #[test]
    fn test_source_is_preserved() {
        let err = LoadError::Source(anyhow!("missing column ID"));
        let source = std::error::Error::source(&err).expect("source should be set");

        assert_eq!(source.to_string(), "missing column ID");
    }
}
