#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("remote store endpoint is not configured")]
    ConfigurationMissing,
    #[error("remedy source unavailable ({location}): {reason}")]
    SourceUnavailable { location: String, reason: String },
    #[error("remote store request failed: {0}")]
    RemoteFailure(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no active patient")]
    NoActivePatient,
    #[error("no visit at history index {index} (history has {len} visits)")]
    HistoryIndex { index: usize, len: usize },
}

impl DeskError {
    /// Message suitable for showing to the operator at the front desk.
    pub fn user_message(&self) -> String {
        match self {
            Self::ConfigurationMissing => {
                "Store URL required: set the remote store endpoint before searching or saving patients."
                    .into()
            }
            Self::SourceUnavailable { reason, .. } => format!("Error loading remedies: {reason}"),
            Self::RemoteFailure(reason) => format!("Connection error: {reason}"),
            Self::InvalidInput(reason) => reason.clone(),
            Self::NoActivePatient => "Please search or register a patient first.".into(),
            Self::HistoryIndex { .. } => "That visit is no longer in the history.".into(),
        }
    }
}

impl From<frontdesk_types::TextError> for DeskError {
    fn from(e: frontdesk_types::TextError) -> Self {
        Self::InvalidInput(e.to_string())
    }
}

pub type DeskResult<T> = std::result::Result<T, DeskError>;
