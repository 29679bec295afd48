//! Closed failure taxonomy for the session engine.
//!
//! Raw wallet-provider and ledger-service failures never cross this module's
//! boundary unclassified: every exit path is a [`ClassifiedError`] with a
//! short title and a human-readable message. Classification is total and
//! never panics.

use serde::{Deserialize, Serialize};

/// EIP-1193 user rejection.
const CODE_USER_REJECTED: i64 = 4001;
/// JSON-RPC: a permission request is already pending in the wallet.
const CODE_REQUEST_PENDING: i64 = -32002;
/// JSON-RPC: method not found / not permitted.
const CODE_UNSUPPORTED_METHOD: i64 = -32601;

/// Marker the ledger service embeds in nested failure data when a contract
/// reverts with a typed error.
const REVERT_MARKER: &str = "custom error";

const GENERIC_TITLE: &str = "Error - Please check your wallet and try again";

/// Raw failure shape reported by the wallet provider transport.
///
/// Mirrors the JSON-RPC error object: an optional numeric code, a message,
/// and optional nested structured data carrying its own message (used by
/// contract reverts). Any of the fields may be absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub code: Option<i64>,
    pub message: String,
    pub data: Option<FailureData>,
}

/// Nested structured failure payload (`data` on the raw error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureData {
    pub message: String,
}

impl ProviderFailure {
    /// Failure with only a message (no code, no nested data).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Failure with a JSON-RPC code and message.
    pub fn coded(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    /// Failure carrying nested structured data, as seen on contract reverts.
    pub fn with_data(message: impl Into<String>, data_message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
            data: Some(FailureData {
                message: data_message.into(),
            }),
        }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.message.is_empty() {
            return write!(f, "{}", self.message);
        }
        match self.code {
            Some(code) => write!(f, "provider error (code {code})"),
            None => write!(f, "provider error"),
        }
    }
}

impl std::error::Error for ProviderFailure {}

/// The closed set of failure kinds surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No wallet provider is present in the environment.
    NoProvider,
    /// The provider reported an empty account list.
    NoAccounts,
    /// The provider is connected to a chain other than the configured one.
    ChainMismatch,
    /// The user declined the request in the wallet (EIP-1193 4001).
    UserRejected,
    /// A wallet permission request is already open (-32002).
    RequestAlreadyPending,
    /// The provider does not support or permit the method (-32601).
    UnsupportedMethod,
    /// The contract reverted with a typed error.
    ContractRejected,
    /// User input did not parse as a positive amount.
    InvalidAmount,
    /// The referenced item or balance is not available to act on.
    NotAvailable,
    /// Anything the rules above do not recognize.
    Unknown,
}

/// A fully classified failure: kind plus the user-facing title and message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{title}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    /// No wallet provider is present in the environment.
    pub fn no_provider() -> Self {
        Self::new(
            ErrorKind::NoProvider,
            "Error - No wallet provider detected",
            "Install a wallet provider and reload to continue.",
        )
    }

    /// The provider returned an empty account list.
    pub fn no_accounts() -> Self {
        Self::new(
            ErrorKind::NoAccounts,
            GENERIC_TITLE,
            "The wallet is locked or no accounts have been authorized.",
        )
    }

    /// The active chain differs from the configured one; names the chain the
    /// session expects so the user knows where to switch.
    pub fn chain_mismatch(expected_chain_name: &str) -> Self {
        Self::new(
            ErrorKind::ChainMismatch,
            GENERIC_TITLE,
            format!("Is your wallet connected to {expected_chain_name}?"),
        )
    }

    /// User input rejected before any submission was made.
    pub fn invalid_amount(detail: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidAmount,
            "Error - Invalid bid amount",
            detail.to_string(),
        )
    }

    /// The referenced item or balance cannot be acted on right now.
    pub fn not_available(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAvailable, GENERIC_TITLE, message)
    }

    /// A second user action was attempted while another one is still
    /// awaiting finality. Nothing is queued; the user re-triggers.
    pub fn action_in_flight() -> Self {
        Self::new(
            ErrorKind::RequestAlreadyPending,
            GENERIC_TITLE,
            "Another request is still being processed. Wait for it to finish.",
        )
    }

    /// Confirmation wait exceeded the configured budget. The transaction may
    /// still land; the user must check the wallet before re-triggering.
    pub fn confirmation_timeout(waited_ms: u64) -> Self {
        Self::new(
            ErrorKind::Unknown,
            GENERIC_TITLE,
            format!("No confirmation after {waited_ms} ms. Check your wallet before retrying."),
        )
    }
}

/// Map a raw provider failure into the closed taxonomy.
///
/// Rules are applied in priority order; the numeric code wins over nested
/// revert data, which wins over the plain message.
pub fn classify(raw: &ProviderFailure) -> ClassifiedError {
    match raw.code {
        Some(CODE_USER_REJECTED) => {
            return ClassifiedError::new(
                ErrorKind::UserRejected,
                GENERIC_TITLE,
                "Connection request has been rejected.",
            );
        }
        Some(CODE_REQUEST_PENDING) => {
            return ClassifiedError::new(
                ErrorKind::RequestAlreadyPending,
                GENERIC_TITLE,
                raw.to_string(),
            );
        }
        Some(CODE_UNSUPPORTED_METHOD) => {
            return ClassifiedError::new(
                ErrorKind::UnsupportedMethod,
                GENERIC_TITLE,
                "Permissions needed to continue.",
            );
        }
        _ => {}
    }

    if let Some(data) = &raw.data {
        if let Some(reason) = revert_reason(&data.message) {
            return ClassifiedError::new(
                ErrorKind::ContractRejected,
                "Error - Contract rejected the request",
                reason,
            );
        }
    }

    ClassifiedError::new(ErrorKind::Unknown, GENERIC_TITLE, raw.to_string())
}

/// Extract and prettify the revert reason from nested failure data.
///
/// Returns `None` when the marker is absent. The reason identifier is
/// camel-case split for display (`NotEnoughFunds` becomes
/// `Not Enough Funds`).
fn revert_reason(data_message: &str) -> Option<String> {
    let (_, after) = data_message.split_once(REVERT_MARKER)?;
    let raw = after
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim_end_matches("()");
    if raw.is_empty() {
        return None;
    }
    Some(split_camel_case(raw))
}

/// Insert spaces before interior uppercase letters.
fn split_camel_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    let mut prev: Option<char> = None;
    for c in ident.chars() {
        if c.is_ascii_uppercase() {
            if let Some(p) = prev {
                if !p.is_whitespace() && !p.is_ascii_uppercase() {
                    out.push(' ');
                }
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}
