#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("Could not extract a file ID from the URL: {0}")]
    MalformedReference(String),

    #[error("Unsupported MIME type: {0}")]
    UnsupportedFormat(String),

    #[error("Drive service error ({status}): {message}")]
    RemoteService { status: u16, message: String },

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriveError::UnsupportedFormat("image/png".to_string());
        assert_eq!(err.to_string(), "Unsupported MIME type: image/png");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DriveError = io_err.into();
        assert!(matches!(err, DriveError::Io(_)));
    }

    #[test]
    fn test_remote_service_display() {
        let err = DriveError::RemoteService {
            status: 404,
            message: "File not found".to_string(),
        };
        assert_eq!(err.to_string(), "Drive service error (404): File not found");
    }
}
