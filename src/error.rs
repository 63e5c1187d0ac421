// src/error.rs

use std::fmt;
use std::sync::Arc;

use ethers::contract::ContractError;
use ethers::providers::{Middleware, ProviderError};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Failure taxonomy for every chain-facing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Integrity or unexpected failures. Always logged at highest severity,
    /// always surfaced to the user.
    Critical,
    /// A user-initiated write was rejected or reverted.
    Transaction,
    /// Network, node, or contract-availability failures.
    Connection,
    /// A read-only call's function selector was not recognized by the
    /// deployed bytecode (ABI/contract version mismatch).
    ViewFunction,
    /// Anything unclassified.
    Unknown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("{0}")]
    Critical(String),
    #[error("{0}")]
    Transaction(String),
    #[error("{0}")]
    Connection(String),
    #[error("{0}")]
    ViewFunction(String),
    #[error("{0}")]
    Unknown(String),
}

impl ChainError {
    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Critical => ChainError::Critical(message),
            ErrorKind::Transaction => ChainError::Transaction(message),
            ErrorKind::Connection => ChainError::Connection(message),
            ErrorKind::ViewFunction => ChainError::ViewFunction(message),
            ErrorKind::Unknown => ChainError::Unknown(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::Critical(_) => ErrorKind::Critical,
            ChainError::Transaction(_) => ErrorKind::Transaction,
            ChainError::Connection(_) => ErrorKind::Connection,
            ChainError::ViewFunction(_) => ErrorKind::ViewFunction,
            ChainError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ChainError::Critical(m)
            | ChainError::Transaction(m)
            | ChainError::Connection(m)
            | ChainError::ViewFunction(m)
            | ChainError::Unknown(m) => m,
        }
    }

    /// Substring-based classification, the compatibility layer over error
    /// sources that only expose a message. Falls back to `default` when no
    /// rule matches.
    pub fn classify(message: impl Into<String>, default: ErrorKind) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if lower.contains("selector was not recognized") {
            ErrorKind::ViewFunction
        } else if lower.contains("user rejected") {
            ErrorKind::Transaction
        } else if lower.contains("network") || lower.contains("connect") {
            ErrorKind::Connection
        } else {
            default
        };

        Self::with_kind(kind, message)
    }

    /// Map a provider error into the taxonomy. Transport-level failures are
    /// connection errors unless the message says otherwise.
    pub fn from_provider(err: ProviderError) -> Self {
        match &err {
            ProviderError::JsonRpcClientError(_) | ProviderError::HTTPError(_) => {
                Self::classify(err.to_string(), ErrorKind::Connection)
            }
            _ => Self::classify(err.to_string(), ErrorKind::Unknown),
        }
    }

    /// Map a contract-call error into the taxonomy. Reverts carry the
    /// contract's reason string and default to transaction errors.
    pub fn from_contract<M: Middleware>(err: ContractError<M>, default: ErrorKind) -> Self {
        match &err {
            ContractError::Revert(_) => Self::classify(err.to_string(), ErrorKind::Transaction),
            ContractError::ContractNotDeployed => {
                ChainError::Connection("smart contract not deployed".to_string())
            }
            _ => Self::classify(err.to_string(), default),
        }
    }
}

type Notifier = Arc<dyn Fn(&str) + Send + Sync>;

/// Logs classified errors at a severity matching their kind and optionally
/// forwards user-facing messages to a notifier (the UI toast seam).
///
/// ViewFunction errors are logged only in development mode and are never
/// forwarded to the notifier.
#[derive(Clone)]
pub struct Reporter {
    development: bool,
    notifier: Option<Notifier>,
}

impl Reporter {
    pub fn new(development: bool) -> Self {
        Self {
            development,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Log the error and return the resolved human-readable message so
    /// callers can fulfill their own rejection contracts with it.
    pub fn report(&self, err: &ChainError) -> String {
        let message = err.message().to_string();

        match err.kind() {
            ErrorKind::Critical => error!("critical error: {}", message),
            ErrorKind::Transaction => warn!("transaction error: {}", message),
            ErrorKind::Connection => error!("connection error: {}", message),
            ErrorKind::ViewFunction => {
                if self.development {
                    debug!("view function error: {}", message);
                }
            }
            ErrorKind::Unknown => error!("unknown error: {}", message),
        }

        if err.kind() != ErrorKind::ViewFunction {
            if let Some(notifier) = &self.notifier {
                notifier(&message);
            }
        }

        message
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("development", &self.development)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn classifies_selector_errors_as_view_function() {
        let err = ChainError::classify(
            "call revert exception; function selector was not recognized",
            ErrorKind::Unknown,
        );
        assert_eq!(err.kind(), ErrorKind::ViewFunction);
    }

    #[test]
    fn classifies_user_rejection_as_transaction() {
        let err = ChainError::classify("user rejected transaction", ErrorKind::Unknown);
        assert_eq!(err.kind(), ErrorKind::Transaction);
    }

    #[test]
    fn classifies_network_failures_as_connection() {
        let err = ChainError::classify("could not detect network", ErrorKind::Unknown);
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err = ChainError::classify("failed to connect to node", ErrorKind::Unknown);
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn unmatched_messages_use_the_default_kind() {
        let err = ChainError::classify("something exploded", ErrorKind::Critical);
        assert_eq!(err.kind(), ErrorKind::Critical);

        let err = ChainError::classify("something exploded", ErrorKind::Unknown);
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn report_returns_the_message_and_notifies() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let reporter = Reporter::new(true).with_notifier(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        });

        let message = reporter.report(&ChainError::Connection("node unreachable".into()));
        assert_eq!(message, "node unreachable");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);

        // ViewFunction errors never reach the notifier.
        reporter.report(&ChainError::ViewFunction("selector mismatch".into()));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
