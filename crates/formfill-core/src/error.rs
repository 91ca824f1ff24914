use thiserror::Error;

#[derive(Error, Debug)]
pub enum FillError {
    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Document has no interactive form")]
    NoForm,

    #[error("Document form contains no fields")]
    EmptyForm,

    #[error("XFA forms are not supported")]
    XfaUnsupported,

    #[error("PDF operation failed: {0}")]
    Operation(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl FillError {
    /// True for problems in the submitted document itself, as opposed to
    /// failures while processing it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FillError::Parse(_)
                | FillError::NoForm
                | FillError::EmptyForm
                | FillError::XfaUnsupported
        )
    }
}
