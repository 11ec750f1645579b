//! Error types for the plugin lifecycle.

use std::fmt;

/// Failure reported by a host operation or by a release action.
///
/// Host calls (showing a message, creating a terminal, ...) and the release
/// action of a [`Disposable`](crate::Disposable) both report failure with this
/// type. It carries only a message; the host owns the real error surface.
///
/// # Examples
///
/// ```rust
/// use plugin_lifecycle::HostError;
///
/// let err = HostError::new("terminal backend unavailable");
/// assert_eq!(err.message(), "terminal backend unavailable");
/// assert_eq!(err.to_string(), "Host error: terminal backend unavailable");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    message: String,
}

impl HostError {
    /// Creates a new host error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message passed at construction.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Host error: {}", self.message)
    }
}

impl std::error::Error for HostError {}

/// Lifecycle errors
///
/// Represents the error conditions that can occur while activating a plugin,
/// draining its registry, or loading configuration.
///
/// # Examples
///
/// ```rust
/// use plugin_lifecycle::{LifecycleError, HostError};
///
/// let failed = LifecycleError::ReleaseFailed {
///     label: "command:hello".to_string(),
///     message: "already unregistered".to_string(),
/// };
/// assert_eq!(
///     failed.to_string(),
///     "Release of command:hello failed: already unregistered"
/// );
///
/// let host: LifecycleError = HostError::new("boom").into();
/// assert!(matches!(host, LifecycleError::Host(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// `activate` was called on a plugin that is already active or deactivated
    AlreadyActivated,
    /// The plugin's activation routine reported failure
    ActivationFailed(String),
    /// A release action returned an error
    ReleaseFailed { label: String, message: String },
    /// A release action panicked
    ReleasePanicked { label: String, message: String },
    /// A host operation failed
    Host(HostError),
    /// Configuration could not be loaded or was invalid
    Config(String),
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::AlreadyActivated => write!(f, "Plugin was already activated"),
            LifecycleError::ActivationFailed(msg) => write!(f, "Activation failed: {}", msg),
            LifecycleError::ReleaseFailed { label, message } => {
                write!(f, "Release of {} failed: {}", label, message)
            }
            LifecycleError::ReleasePanicked { label, message } => {
                write!(f, "Release of {} panicked: {}", label, message)
            }
            LifecycleError::Host(err) => write!(f, "{}", err),
            LifecycleError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::Host(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HostError> for LifecycleError {
    fn from(err: HostError) -> Self {
        LifecycleError::Host(err)
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;
