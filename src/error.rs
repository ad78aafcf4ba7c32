//! Error types for Tipcast.

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Tip error: {0}")]
    Tip(#[from] TipError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Turn error: {0}")]
    Turn(#[from] TurnError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to read service account key {path}: {reason}")]
    KeyFile { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Tip selection errors.
#[derive(Debug, thiserror::Error)]
pub enum TipError {
    /// A selection that requires at least one tip found none.
    #[error("no tips available (category: {category:?})")]
    NotFound { category: Option<String> },

    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Notification dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The service-account token exchange failed. Fatal for the whole
    /// dispatch invocation — no deliveries are attempted without a token.
    #[error("credential exchange failed: {0}")]
    CredentialExchange(String),

    /// A single subscriber's delivery failed. Recorded per subscriber,
    /// never raised to the invocation's overall result.
    #[error("delivery to {user_id} failed: {reason}")]
    Delivery { user_id: String, reason: String },

    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Turn-routing errors.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("unknown intent: {0}")]
    UnknownIntent(String),

    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("store error: {0}")]
    Store(#[from] DatabaseError),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
