//! Centralized Error Handling Module
//!
//! Every classified failure carries a unique code so that logs, CLI output
//! and API responses agree on what went wrong.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx: owner address / name problems (abort before any read)
//! - RPC_xxx: transport problems (recovered per pair during scans)
//! - CFG_xxx: configuration problems
//! - SCAN_xxx: decoding problems
//! - REVOKE_xxx: revoke action problems

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// True for errors raised while interpreting the owner input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InputEmpty | ErrorCode::InputInvalidAddress | ErrorCode::InputNameNotFound
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input Errors
    // ============================================
    /// Nothing was entered
    InputEmpty,
    /// Not a valid hex address (length, characters or checksum)
    InputInvalidAddress,
    /// Name could not be resolved to an address
    InputNameNotFound,

    // ============================================
    // RPC Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC request timeout
    RpcTimeout,
    /// RPC rate limited (HTTP 429 / -32005)
    RpcRateLimited,
    /// RPC returned error response
    RpcError,
    /// No RPC endpoints configured
    RpcNoEndpoints,
    /// Response could not be parsed
    RpcInvalidResponse,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Chain id not in the registry
    ConfigUnsupportedChain,
    /// No requested chain has both tokens and spenders
    ConfigNoTargets,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// No signing key configured
    ConfigMissingSigner,

    // ============================================
    // Scan Errors
    // ============================================
    /// Return data did not decode
    ScanDecodeFailed,

    // ============================================
    // Revoke Errors
    // ============================================
    /// No connected signing account
    RevokeNotConnected,
    /// Connected account is not the scanned owner
    RevokeAccountMismatch,
    /// Wallet refused to switch network
    RevokeSwitchRejected,
    /// Submission failed (rejection, revert, RPC error)
    RevokeSubmitFailed,
    /// Finding no longer present in the result list
    RevokeFindingNotFound,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputEmpty => "INPUT_EMPTY",
            Self::InputInvalidAddress => "INPUT_INVALID_ADDRESS",
            Self::InputNameNotFound => "INPUT_NAME_NOT_FOUND",

            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcTimeout => "RPC_TIMEOUT",
            Self::RpcRateLimited => "RPC_RATE_LIMITED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcNoEndpoints => "RPC_NO_ENDPOINTS",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            Self::ConfigUnsupportedChain => "CFG_UNSUPPORTED_CHAIN",
            Self::ConfigNoTargets => "CFG_NO_TARGETS",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigMissingSigner => "CFG_MISSING_SIGNER",

            Self::ScanDecodeFailed => "SCAN_DECODE_FAILED",

            Self::RevokeNotConnected => "REVOKE_NOT_CONNECTED",
            Self::RevokeAccountMismatch => "REVOKE_ACCOUNT_MISMATCH",
            Self::RevokeSwitchRejected => "REVOKE_SWITCH_REJECTED",
            Self::RevokeSubmitFailed => "REVOKE_SUBMIT_FAILED",
            Self::RevokeFindingNotFound => "REVOKE_FINDING_NOT_FOUND",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InputEmpty
            | Self::InputInvalidAddress
            | Self::ConfigInvalidValue
            | Self::ConfigUnsupportedChain => 400,
            Self::RevokeAccountMismatch | Self::RevokeNotConnected => 403,
            Self::InputNameNotFound | Self::RevokeFindingNotFound => 404,
            Self::RevokeSwitchRejected => 409,
            Self::ConfigNoTargets => 422,
            Self::RpcRateLimited => 429,
            Self::RpcConnectionFailed | Self::RpcTimeout | Self::RpcError => 502,
            Self::ConfigMissingSigner => 503,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RpcTimeout | Self::RpcRateLimited | Self::RpcConnectionFailed
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Empty owner input
    pub fn input_empty() -> Self {
        Self::new(ErrorCode::InputEmpty, "empty address")
    }

    /// Invalid owner address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputInvalidAddress, msg)
    }

    /// Name did not resolve
    pub fn name_not_found(name: &str) -> Self {
        Self::new(
            ErrorCode::InputNameNotFound,
            format!("could not resolve name '{}'", name),
        )
    }

    /// RPC connection failed
    pub fn rpc_connection_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcConnectionFailed, msg)
    }

    /// RPC timeout
    pub fn rpc_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcTimeout, msg)
    }

    /// RPC rate limited
    pub fn rpc_rate_limited() -> Self {
        Self::new(ErrorCode::RpcRateLimited, "Rate limited (HTTP 429)")
    }

    /// RPC error response
    pub fn rpc_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcError, msg)
    }

    /// Unsupported chain
    pub fn unsupported_chain(chain_id: u64) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedChain,
            format!("Unsupported chain_id: {}", chain_id),
        )
    }

    /// Nothing configured to scan
    pub fn no_targets() -> Self {
        Self::new(
            ErrorCode::ConfigNoTargets,
            "No tokens or spenders configured for the requested chains",
        )
    }

    /// Missing signing key
    pub fn missing_signer() -> Self {
        Self::new(
            ErrorCode::ConfigMissingSigner,
            "No signer configured (set ALLOWANCE_WATCH_PRIVATE_KEY)",
        )
    }

    /// Return data did not decode
    pub fn decode_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ScanDecodeFailed, msg)
    }

    /// Revoke refused: nothing connected
    pub fn not_connected() -> Self {
        Self::new(ErrorCode::RevokeNotConnected, "Connect a wallet first")
    }

    /// Revoke refused: wrong account
    pub fn account_mismatch() -> Self {
        Self::new(
            ErrorCode::RevokeAccountMismatch,
            "Connect the same wallet you scanned",
        )
    }

    /// Revoke aborted: network switch rejected
    pub fn switch_rejected(chain_name: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RevokeSwitchRejected,
            format!("Please switch wallet to {}: {}", chain_name, reason.into()),
        )
    }

    /// Revoke submission failed
    pub fn submit_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RevokeSubmitFailed,
            format!("Revoke failed: {}", reason.into()),
        )
    }

    /// Revoke target not in the current results
    pub fn finding_not_found() -> Self {
        Self::new(
            ErrorCode::RevokeFindingNotFound,
            "No matching approval in the current results",
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Rate limit detection
// ============================================

/// True when an error (or any error it wraps) signals rate limiting
pub fn is_rate_limited(err: &eyre::Report) -> bool {
    if err
        .chain()
        .filter_map(|e| e.downcast_ref::<AppError>())
        .any(|e| e.code == ErrorCode::RpcRateLimited)
    {
        return true;
    }
    looks_rate_limited(&err.to_string())
}

/// Heuristic match on a failure message
pub fn looks_rate_limited(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests")
}

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        let err = match err.downcast::<AppError>() {
            Ok(app) => return app,
            Err(err) => err,
        };
        if is_rate_limited(&err) {
            return Self::rpc_rate_limited();
        }
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::RpcTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::RpcError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::RpcInvalidResponse, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::rpc_timeout("Connection timed out");
        assert_eq!(err.code, ErrorCode::RpcTimeout);
        assert_eq!(err.code_str(), "RPC_TIMEOUT");
        assert_eq!(err.to_string(), "[RPC_TIMEOUT] Connection timed out");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::RpcTimeout.is_retryable());
        assert!(ErrorCode::RpcRateLimited.is_retryable());
        assert!(!ErrorCode::InputInvalidAddress.is_retryable());
        assert!(!ErrorCode::RevokeAccountMismatch.is_retryable());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::InputInvalidAddress.http_status(), 400);
        assert_eq!(ErrorCode::RevokeAccountMismatch.http_status(), 403);
        assert_eq!(ErrorCode::RpcRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::Unknown.http_status(), 500);
    }

    #[test]
    fn test_input_error_classification() {
        assert!(AppError::input_empty().is_input_error());
        assert!(AppError::name_not_found("nobody.eth").is_input_error());
        assert!(!AppError::no_targets().is_input_error());
    }

    #[test]
    fn test_rate_limit_detection_through_report() {
        let report = eyre::Report::new(AppError::rpc_rate_limited());
        assert!(is_rate_limited(&report));

        let wrapped = report.wrap_err("eth_call failed");
        assert!(is_rate_limited(&wrapped));

        assert!(looks_rate_limited("HTTP error: 429 Too Many Requests"));
        assert!(!looks_rate_limited("execution reverted"));
    }

    #[test]
    fn test_report_conversion_keeps_rate_limit() {
        let report = eyre::Report::new(AppError::rpc_rate_limited());
        let app: AppError = report.into();
        assert_eq!(app.code, ErrorCode::RpcRateLimited);
    }
}
