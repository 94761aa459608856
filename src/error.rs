use thiserror::Error;

/// Errors that cross the pipeline boundary.
///
/// Geometry never produces one of these: degenerate contours, empty masks and
/// failed angle math all degrade to "no hand" or zero fingers for that frame.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The capture device could not be opened, went away, or returned a frame
    /// that could not be decoded. The run must be restarted explicitly.
    #[error("frame acquisition failed: {context}")]
    Acquisition { context: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start pipeline worker")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("pipeline worker terminated abnormally")]
    WorkerPanicked,
}

impl PipelineError {
    /// Wrap an `anyhow` chain from a capture backend, keeping every cause.
    pub fn acquisition(err: &anyhow::Error) -> Self {
        Self::Acquisition {
            context: format!("{err:#}"),
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn acquisition_keeps_the_cause_chain() {
        let err = std::fs::read("/nonexistent/camera0")
            .context("Failed to open camera")
            .unwrap_err();
        let wrapped = PipelineError::acquisition(&err);
        let text = wrapped.to_string();
        assert!(text.starts_with("frame acquisition failed: Failed to open camera"));
        assert!(text.contains(':'));
    }
}
