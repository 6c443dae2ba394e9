pub type OvertintResult<T> = Result<T, OvertintError>;

#[derive(thiserror::Error, Debug)]
pub enum OvertintError {
    /// Malformed mask payload: bad base64, corrupt compressed stream, or a
    /// bitstream too short for the declared shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Collaborator call failed or returned an error payload.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Caller contract violation: missing render target or base buffer,
    /// mismatched dimensions, invalid style values.
    #[error("precondition error: {0}")]
    Precondition(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OvertintError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// True for the failures the session survives: the affected segment simply
    /// fails to highlight and other segments remain usable.
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Fetch(_))
    }
}
