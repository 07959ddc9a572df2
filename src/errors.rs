use thiserror::Error;

/// Authentication failures surfaced to the person signing in.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed email address: {0}")]
    MalformedEmail(String),
    #[error("Password is required")]
    MissingPassword,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email already registered")]
    EmailInUse,
    #[error("Password too weak: {0}")]
    WeakPassword(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Authentication is not configured")]
    Unavailable,
    #[error("Authentication failed: {0}")]
    Provider(String),
}

impl AuthError {
    /// Short line suitable for showing under a sign-in form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MalformedEmail(_) => "Please enter a valid email address.".into(),
            AuthError::MissingPassword => "Please enter your password.".into(),
            AuthError::InvalidCredentials => "Incorrect email or password.".into(),
            AuthError::EmailInUse => "An account with this email already exists.".into(),
            AuthError::WeakPassword(_) => "Password should be at least 6 characters.".into(),
            AuthError::Network(_) => "Network error, please check your connection.".into(),
            AuthError::Unavailable => {
                "Sign-in is unavailable in offline mode. Try demo mode instead.".into()
            }
            AuthError::Provider(message) => format!("Authentication failed: {message}"),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Failures reading from or writing to the ledger backends.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("No signed-in identity")]
    NoIdentity,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Document {collection}/{id} not found")]
    DocumentNotFound { collection: String, id: String },
    #[error("Invalid record {collection}/{id}: {reason}")]
    Decode {
        collection: String,
        id: String,
        reason: String,
    },
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
    #[error("Write rejected: {0}")]
    Write(String),
    #[error("Live query closed")]
    FeedClosed,
}

impl StoreError {
    /// Whether repeating the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Write(_) | StoreError::FeedClosed
        )
    }
}

/// Failures talking to the generative endpoint. Never leaves the advisory client.
#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("No valid API key configured")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Request timed out")]
    Timeout,
}

impl From<serde_json::Error> for AdvisoryError {
    fn from(err: serde_json::Error) -> Self {
        AdvisoryError::MalformedResponse(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
}
