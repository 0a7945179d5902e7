use thiserror::Error;

/// Error types for lead assignment operations
///
/// "No agent available" is deliberately absent: it is a normal outcome,
/// reported through [`crate::routing::AssignmentOutcome`], not a failure.
///
/// # Examples
///
/// ```
/// use leadroute_engine::{LeadEngineError, Result};
///
/// fn check_amount(amount: f64) -> Result<()> {
///     if amount < 0.0 {
///         return Err(LeadEngineError::invalid_lead("amount must not be negative"));
///     }
///     Ok(())
/// }
///
/// match check_amount(-5.0) {
///     Err(LeadEngineError::InvalidLead(msg)) => println!("rejected: {}", msg),
///     other => println!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum LeadEngineError {
    /// Malformed lead input, rejected before scoring
    ///
    /// # Examples
    /// - Negative or non-finite amount
    /// - Blank loan purpose
    #[error("Invalid lead: {0}")]
    InvalidLead(String),

    /// An agent record that cannot be scored or stored
    ///
    /// During assignment this only ever excludes the one agent; it is
    /// returned to callers of admin operations such as `upsert_agent`.
    #[error("Malformed agent record {agent_id}: {reason}")]
    MalformedAgent {
        agent_id: String,
        reason: String,
    },

    /// Requested agent or record could not be located
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to create something that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A lease was completed twice, expired, or never existed
    #[error("Lease not found: {0}")]
    LeaseNotFound(String),

    /// Database operation errors
    ///
    /// Connection failures, SQL errors, migration and transaction problems.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration validation and parsing errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON encoding/decoding of stored columns or roster files
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeadEngineError {
    /// Create an invalid lead error
    pub fn invalid_lead(msg: impl Into<String>) -> Self {
        Self::InvalidLead(msg.into())
    }

    /// Create a malformed agent error
    pub fn malformed_agent(agent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAgent {
            agent_id: agent_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether the failure came from caller input rather than the system
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLead(_) | Self::NotFound(_) | Self::AlreadyExists(_) | Self::LeaseNotFound(_)
        )
    }
}

impl From<sqlx::Error> for LeadEngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => LeadEngineError::NotFound(err.to_string()),
            _ => LeadEngineError::Database(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for LeadEngineError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        LeadEngineError::Database(format!("migration failed: {}", err))
    }
}

impl From<serde_json::Error> for LeadEngineError {
    fn from(err: serde_json::Error) -> Self {
        LeadEngineError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LeadEngineError {
    fn from(err: toml::de::Error) -> Self {
        LeadEngineError::Configuration(err.to_string())
    }
}

/// Result type for lead engine operations
pub type Result<T> = std::result::Result<T, LeadEngineError>;
