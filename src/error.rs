pub type StimvisResult<T> = Result<T, StimvisError>;

/// Fatal error taxonomy for an export invocation.
///
/// `Encoding` and `Assembly` deliberately leave intermediate segment files on
/// disk so the operator can retry with `--resume-segment`.
#[derive(thiserror::Error, Debug)]
pub enum StimvisError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("resume error: {0}")]
    Resume(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("assembly error: {0}")]
    Assembly(String),

    #[error("metadata error: {0}")]
    Metadata(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StimvisError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn resume(msg: impl Into<String>) -> Self {
        Self::Resume(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::Assembly(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }
}
