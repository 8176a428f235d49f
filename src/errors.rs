//! Standardized error types following the `error-authgate-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when PORT cannot be parsed
    #[error("error-authgate-config-1 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-authgate-config-2 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when boolean string cannot be parsed
    #[error(
        "error-authgate-config-3 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when a precedence order cannot be parsed
    #[error("error-authgate-config-4 Failed to parse order '{0}': {1}")]
    OrderParsingFailed(String, std::num::ParseIntError),

    /// Error when the configured client list is not valid JSON
    #[error("error-authgate-config-5 Failed to parse OAuth client list: {0}")]
    ClientsParsingFailed(String),

    /// Error when the client list file cannot be read
    #[error("error-authgate-config-6 Unable to read OAuth client file '{0}': {1}")]
    ClientsFileUnreadable(String, std::io::Error),

    /// Error when a configured client has no identifier
    #[error("error-authgate-config-7 OAuth client at position {0} has a blank clientId")]
    BlankClientId(usize),

    /// Error when two configured clients share an identifier
    #[error("error-authgate-config-8 OAuth client '{0}' is configured more than once")]
    DuplicateClientId(String),

    /// Error when a required path is blank
    #[error("error-authgate-config-9 {0} must not be blank")]
    BlankPath(String),

    /// Error when a path does not start with a slash
    #[error("error-authgate-config-10 {0} must start with '/': '{1}'")]
    RelativePath(String, String),

    /// Error when the login page collides with a route served by this server
    #[error("error-authgate-config-11 LOGIN_PAGE '{0}' collides with a built-in route")]
    ReservedPath(String),

    /// Error when two security tiers are given the same precedence
    #[error("error-authgate-config-12 Security tiers must have distinct orders, both are {0}")]
    AmbiguousTierOrder(i32),

    /// Error when the token cleanup interval is not a whole number of seconds
    #[error("error-authgate-config-13 Failed to parse token cleanup interval '{0}': {1}")]
    IntervalParsingFailed(String, std::num::ParseIntError),
}

/// Errors raised while reconciling configured clients with the client store
#[derive(Debug, Error)]
pub enum ClientRegistryError {
    /// The configured client list carries the same id twice
    #[error("error-authgate-registry-1 Client '{0}' is configured more than once")]
    DuplicateClientId(String),

    /// Listing existing clients failed
    #[error("error-authgate-registry-2 Unable to list stored clients: {0}")]
    ListFailed(#[source] StorageError),

    /// Removing a stale stored client failed
    #[error("error-authgate-registry-3 Unable to remove stored client '{client_id}': {source}")]
    DeleteFailed {
        client_id: String,
        #[source]
        source: StorageError,
    },

    /// Inserting a configured client failed
    #[error("error-authgate-registry-4 Unable to insert client '{client_id}': {source}")]
    InsertFailed {
        client_id: String,
        #[source]
        source: StorageError,
    },
}

/// Database/storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when database connection fails
    #[error("error-authgate-storage-1 Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when data serialization fails
    #[error("error-authgate-storage-2 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when database operation fails
    #[error("error-authgate-storage-3 Database error: {0}")]
    DatabaseError(String),

    /// Error when data validation fails
    #[error("error-authgate-storage-4 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-authgate-storage-5 Not found: {0}")]
    NotFound(String),

    /// Error when a record with the same key already exists
    #[error("error-authgate-storage-6 Duplicate key: {0}")]
    Conflict(String),
}
