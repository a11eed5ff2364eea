//! Exchange error types.

use crate::types::ExecutionPlan;
use std::fmt;

/// Errors that can occur within the exchange core.
///
/// The HTTP boundary maps these onto status codes; the library itself is
/// transport-agnostic.
#[derive(Debug)]
#[non_exhaustive]
pub enum ExchangeError {
    /// A caller-supplied value failed shape, range, or parse validation.
    InvalidArgument {
        /// Description of the rejected value.
        message: String,
    },

    /// An order violated a data-model invariant on acceptance.
    InvalidOrder {
        /// Description of the violated invariant.
        message: String,
    },

    /// The requested entity does not exist.
    NotFound {
        /// The kind of entity ("market", "order", "trade").
        resource: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// No admin credential was presented.
    Unauthorized,

    /// The presented admin credential did not match.
    Forbidden,

    /// RSV signature verification failed against the supplied public key.
    BadSignature {
        /// Why verification failed.
        reason: String,
    },

    /// An operation conflicted with current state (terminal-state transition,
    /// duplicate fill, re-broadcast of a settled trade).
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// The book cannot cover the requested size.
    InsufficientLiquidity {
        /// The partial plan that was computed before the book ran out.
        plan: Box<ExecutionPlan>,
    },

    /// The plan's slippage exceeds the caller's budget.
    SlippageExceeded {
        /// The full plan whose slippage was over budget.
        plan: Box<ExecutionPlan>,
    },

    /// Settlement is not configured (missing contract id or operator key).
    SettlementDisabled,

    /// The chain node rejected the settlement transaction.
    SettlementRejected {
        /// The node's response body.
        body: String,
    },

    /// A failure in the hot store or its durable mirror.
    Store {
        /// Underlying error message.
        message: String,
    },

    /// An unexpected internal failure.
    Internal {
        /// Underlying error message.
        message: String,
    },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::InvalidArgument { message } => {
                write!(f, "invalid argument: {message}")
            }
            ExchangeError::InvalidOrder { message } => write!(f, "invalid order: {message}"),
            ExchangeError::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            ExchangeError::Unauthorized => write!(f, "missing admin credential"),
            ExchangeError::Forbidden => write!(f, "admin credential mismatch"),
            ExchangeError::BadSignature { reason } => write!(f, "bad signature: {reason}"),
            ExchangeError::Conflict { message } => write!(f, "conflict: {message}"),
            ExchangeError::InsufficientLiquidity { plan } => {
                write!(
                    f,
                    "insufficient liquidity: {} of {} covered",
                    plan.filled_size(),
                    plan.total_size
                )
            }
            ExchangeError::SlippageExceeded { plan } => {
                write!(f, "slippage exceeds max: {} bps", plan.slippage_bps)
            }
            ExchangeError::SettlementDisabled => write!(f, "settlement is not configured"),
            ExchangeError::SettlementRejected { body } => {
                write!(f, "settlement rejected by node: {body}")
            }
            ExchangeError::Store { message } => write!(f, "store error: {message}"),
            ExchangeError::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for ExchangeError {}

impl From<rusqlite::Error> for ExchangeError {
    fn from(err: rusqlite::Error) -> Self {
        ExchangeError::Store {
            message: err.to_string(),
        }
    }
}

impl ExchangeError {
    /// Shorthand for an [`ExchangeError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        ExchangeError::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for an [`ExchangeError::InvalidOrder`].
    pub fn invalid_order(message: impl Into<String>) -> Self {
        ExchangeError::InvalidOrder {
            message: message.into(),
        }
    }

    /// Shorthand for an [`ExchangeError::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        ExchangeError::Conflict {
            message: message.into(),
        }
    }

    /// The execution plan attached to router failures, if any.
    pub fn plan(&self) -> Option<&ExecutionPlan> {
        match self {
            ExchangeError::InsufficientLiquidity { plan }
            | ExchangeError::SlippageExceeded { plan } => Some(plan),
            _ => None,
        }
    }
}
