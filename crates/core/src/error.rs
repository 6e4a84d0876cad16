use crate::constants::UNKNOWN_ERROR_MESSAGE;

#[derive(Debug, thiserror::Error)]
pub enum GlucoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{0}")]
    Validation(String),
    #[error(
        "record API request failed (status {code}): {detail}",
        code = .status.map(|s| s.to_string()).unwrap_or_else(|| "n/a".into()),
        detail = .message.as_deref().unwrap_or(UNKNOWN_ERROR_MESSAGE)
    )]
    Api {
        status: Option<u16>,
        message: Option<String>,
    },
    #[error("record API unreachable: {0}")]
    Transport(String),
    #[error("failed to decode record API response: {0}")]
    Decode(String),
    #[error("invalid drug catalog: {0}")]
    Catalog(String),
    #[error("patient {0} not found")]
    NotFound(i64),
    #[error("an authenticated session is required")]
    Unauthorized,
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GlucoError {
    /// The single message shown to the user when an operation fails.
    ///
    /// API failures surface the server-provided message when there is one; everything else
    /// falls back to the error's own text.
    pub fn user_message(&self) -> String {
        match self {
            GlucoError::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            GlucoError::Api { .. } => UNKNOWN_ERROR_MESSAGE.to_owned(),
            GlucoError::Transport(detail) | GlucoError::Decode(detail) if detail.is_empty() => {
                UNKNOWN_ERROR_MESSAGE.to_owned()
            }
            other => other.to_string(),
        }
    }
}

impl From<gluco_types::TextError> for GlucoError {
    fn from(err: gluco_types::TextError) -> Self {
        GlucoError::InvalidInput(err.to_string())
    }
}

pub type GlucoResult<T> = std::result::Result<T, GlucoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_prefer_the_server_message() {
        let err = GlucoError::Api {
            status: Some(500),
            message: Some("Duplicate medical record number".into()),
        };
        assert_eq!(err.user_message(), "Duplicate medical record number");
        assert!(err.to_string().contains("status 500"));
    }

    #[test]
    fn api_errors_without_message_fall_back_to_generic_text() {
        let err = GlucoError::Api {
            status: None,
            message: Some("   ".into()),
        };
        assert_eq!(err.user_message(), "An unknown error occurred");
        assert_eq!(
            GlucoError::Transport(String::new()).user_message(),
            "An unknown error occurred"
        );
    }
}
