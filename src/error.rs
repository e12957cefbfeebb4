use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Input resolution error: {0}")]
    Resolution(String),

    #[error("Audio extraction error: {0}")]
    Extraction(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Translation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Batch cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Item-scoped errors are caught at the item boundary and the batch
    /// moves on to the next input. Everything else unwinds the run.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            PipelineError::Resolution(_)
                | PipelineError::Extraction(_)
                | PipelineError::Transcription(_)
                | PipelineError::Translation(_)
                | PipelineError::BackendUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_scoped_classification() {
        assert!(PipelineError::Resolution("gone".to_string()).is_item_scoped());
        assert!(PipelineError::BackendUnavailable("timeout".to_string()).is_item_scoped());
        assert!(!PipelineError::Config("bad document".to_string()).is_item_scoped());
        assert!(!PipelineError::Cancelled.is_item_scoped());
    }
}
