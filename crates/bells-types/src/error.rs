use thiserror::Error;

/// The closed error taxonomy of the plugin layer.
///
/// Every failure surfaced to application code is one of these kinds.
/// Ledger-reported errors keep the ledger's message text verbatim, so
/// callers can match on [`ErrorKind`] and compare messages literally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PluginError {
    /// A caller-supplied transfer or message failed local validation, or the
    /// ledger reported an `InvalidBodyError` (or another 400).
    #[error("{0}")]
    InvalidFields(String),

    /// The ledger reported a `NoSubscriptionsError` (422).
    #[error("{0}")]
    NoSubscriptions(String),

    /// Any other unsuccessful ledger response.
    #[error("{0}")]
    NotAccepted(String),

    /// An account lookup returned 404.
    #[error("{0}")]
    AccountNotFound(String),

    /// An operation that requires an established connection was called on a
    /// disconnected plugin. The operation name is interpolated verbatim.
    #[error("Must be connected before {0} can be called")]
    NotConnected(String),

    /// An unclassified transport failure (connection refused, timeout,
    /// unreadable response). Never silently retried at this layer.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Discriminant-only view of [`PluginError`] for matching in tests and
/// caller dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidFields,
    NoSubscriptions,
    NotAccepted,
    AccountNotFound,
    NotConnected,
    Transport,
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFields(_) => ErrorKind::InvalidFields,
            Self::NoSubscriptions(_) => ErrorKind::NoSubscriptions,
            Self::NotAccepted(_) => ErrorKind::NotAccepted,
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::NotConnected(_) => ErrorKind::NotConnected,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Guard error for an operation invoked before `connect()`.
    pub fn not_connected(operation: &str) -> Self {
        Self::NotConnected(operation.to_string())
    }
}

pub type PluginResult<T> = Result<T, PluginError>;
