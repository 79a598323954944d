//! Unified error handling for the hearth CLI
//!
//! Every failure surfaces as a [`HearthError`] carrying a unique code so a
//! user report can be traced to the failing subsystem without a stack trace.

use std::fmt;
use thiserror::Error;

/// Unified Result type for all hearth operations
pub type Result<T> = std::result::Result<T, HearthError>;

/// Error codes for hearth operations
///
/// Each error has a unique code in the format `HXXX` where:
/// - H1XX: Authentication errors
/// - H2XX: Network and API errors
/// - H3XX: File and I/O errors
/// - H4XX: Configuration errors
/// - H5XX: Validation and input errors
/// - H6XX: Object storage and upload errors
/// - H7XX: Document persistence errors
/// - H9XX: Internal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (H1XX)
    /// H101: Authentication failed
    AuthenticationFailed,
    /// H102: Bad user credentials
    InvalidCredentials,
    /// H103: Session expired
    SessionExpired,
    /// H104: No stored session
    SessionNotFound,

    // Network (H2XX)
    /// H201: HTTP request failed
    HttpError,
    /// H202: API returned error response
    ApiError,
    /// H203: Invalid API response format
    InvalidResponse,

    // File/IO (H3XX)
    /// H301: File read error
    FileReadError,
    /// H302: File write error
    FileWriteError,

    // Configuration (H4XX)
    /// H401: Configuration error
    ConfigError,
    /// H402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (H5XX)
    /// H501: Invalid input
    InvalidInput,
    /// H502: Validation failed
    ValidationFailed,
    /// H503: Discounted price not below regular price
    PriceOrdering,
    /// H504: Too many images selected
    TooManyImages,

    // Storage/Upload (H6XX)
    /// H601: Upload failed
    UploadFailed,
    /// H602: Upload cancelled
    UploadCancelled,
    /// H603: Object delete failed
    DeleteFailed,

    // Persistence (H7XX)
    /// H701: Document write failed
    PersistenceFailed,
    /// H702: Listing not found
    ListingNotFound,
    /// H703: User profile not found
    ProfileNotFound,

    // Internal (H9XX)
    /// H901: Internal error
    InternalError,
    /// H902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::InvalidCredentials => 102,
            ErrorCode::SessionExpired => 103,
            ErrorCode::SessionNotFound => 104,

            ErrorCode::HttpError => 201,
            ErrorCode::ApiError => 202,
            ErrorCode::InvalidResponse => 203,

            ErrorCode::FileReadError => 301,
            ErrorCode::FileWriteError => 302,

            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,
            ErrorCode::PriceOrdering => 503,
            ErrorCode::TooManyImages => 504,

            ErrorCode::UploadFailed => 601,
            ErrorCode::UploadCancelled => 602,
            ErrorCode::DeleteFailed => 603,

            ErrorCode::PersistenceFailed => 701,
            ErrorCode::ListingNotFound => 702,
            ErrorCode::ProfileNotFound => 703,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.code())
    }
}

/// Main error type for all hearth operations
#[derive(Error, Debug)]
pub enum HearthError {
    /// Authentication failed; session state is left unchanged
    #[error("[{code}] Authentication failed: {message}")]
    Authentication { code: ErrorCode, message: String },

    /// API error with HTTP status
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    /// HTTP/network error
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// File or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config { code: ErrorCode, message: String },

    /// Validation error, reported inline and correctable by the user
    #[error("[{code}] {message}")]
    Validation { code: ErrorCode, message: String },

    /// Upload error; the whole batch was aborted
    #[error("[{code}] Upload failed: {message}")]
    Upload { code: ErrorCode, message: String },

    /// Document write or read error
    #[error("[{code}] Persistence error: {message}")]
    Persistence { code: ErrorCode, message: String },

    /// Serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization { code: ErrorCode, message: String },

    /// Internal error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },
}

impl HearthError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
        }
    }

    pub fn invalid_credentials() -> Self {
        Self::Authentication {
            code: ErrorCode::InvalidCredentials,
            message: "Bad user credentials".to_string(),
        }
    }

    pub fn session_not_found() -> Self {
        Self::Authentication {
            code: ErrorCode::SessionNotFound,
            message: "Not logged in. Run `hearth login` first.".to_string(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
        }
    }

    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
        }
    }

    pub fn price_ordering() -> Self {
        Self::Validation {
            code: ErrorCode::PriceOrdering,
            message: "Discounted price needs to be less than the regular price".to_string(),
        }
    }

    pub fn too_many_images(max: usize) -> Self {
        Self::Validation {
            code: ErrorCode::TooManyImages,
            message: format!("You can only upload a maximum of {} images", max),
        }
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            code: ErrorCode::UploadFailed,
            message: message.into(),
        }
    }

    pub fn upload_cancelled() -> Self {
        Self::Upload {
            code: ErrorCode::UploadCancelled,
            message: "transfer cancelled".to_string(),
        }
    }

    pub fn delete_failed(message: impl Into<String>) -> Self {
        Self::Upload {
            code: ErrorCode::DeleteFailed,
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            code: ErrorCode::PersistenceFailed,
            message: message.into(),
        }
    }

    pub fn listing_not_found(id: &str) -> Self {
        Self::Persistence {
            code: ErrorCode::ListingNotFound,
            message: format!("Listing '{}' does not exist", id),
        }
    }

    pub fn profile_not_found(id: &str) -> Self {
        Self::Persistence {
            code: ErrorCode::ProfileNotFound,
            message: format!("No profile document for user '{}'", id),
        }
    }

    pub fn file_read(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::FileReadError,
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    /// The error code attached to this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. }
            | Self::Api { code, .. }
            | Self::Network { code, .. }
            | Self::Io { code, .. }
            | Self::Config { code, .. }
            | Self::Validation { code, .. }
            | Self::Upload { code, .. }
            | Self::Persistence { code, .. }
            | Self::Serialization { code, .. }
            | Self::Internal { code, .. } => *code,
        }
    }
}

impl From<reqwest::Error> for HearthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<std::io::Error> for HearthError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::FileReadError,
            context: "IO error".to_string(),
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for HearthError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<validator::ValidationErrors> for HearthError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::validation(err.to_string())
    }
}
