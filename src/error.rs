/// Error Handling Module
///
/// Unified error handling for the authentication core:
/// 1. Control Flow Errors (Result-based)
/// 2. Domain-Specific Error Types (avoiding ball of mud)
/// 3. Caller-Facing Outcome Translation (no raw crypto/store errors leak)
/// 4. Structured Error Logging with expected/anomalous separation

use std::error::Error as StdError;
use std::fmt;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains suspicious content", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and token verification errors
///
/// `TokenExpired` is an expected, non-anomalous outcome. `TokenReused` is
/// security-relevant and logged distinctly from ordinary failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenMalformed,
    InvalidSignature,
    WrongTokenType,
    TokenReused,
    AccountNotFound,
    EmailTaken,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenMalformed => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::WrongTokenType => write!(f, "Token type does not match expected kind"),
            AuthError::TokenReused => write!(f, "Refresh token has already been redeemed"),
            AuthError::AccountNotFound => write!(f, "Account no longer exists"),
            AuthError::EmailTaken => write!(f, "Email already registered"),
        }
    }
}

impl StdError for AuthError {}

/// Persistent store errors (refresh ledger and user store)
///
/// Infrastructure failures are retryable and must never be conflated with
/// an authentication rejection.
#[derive(Debug)]
pub enum LedgerError {
    Unavailable(String),
    Timeout,
    Query(String),
    Duplicate(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            LedgerError::Timeout => write!(f, "Store operation timed out"),
            LedgerError::Query(msg) => write!(f, "Store query error: {}", msg),
            LedgerError::Duplicate(msg) => write!(f, "Duplicate entry: {}", msg),
        }
    }
}

impl StdError for LedgerError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
    ParseError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "Config parse error: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

/// Central error type that all core errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Ledger(LedgerError),
    Config(ConfigError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Ledger(e) => write!(f, "{}", e),
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

// ============================================================================
// FROM IMPLEMENTATIONS (Control Flow Error Conversion)
// ============================================================================

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => LedgerError::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                LedgerError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db_err)
                if db_err.message().contains("duplicate key")
                    || db_err.message().contains("unique constraint") =>
            {
                LedgerError::Duplicate(db_err.message().to_string())
            }
            _ => LedgerError::Query(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Ledger(LedgerError::from(err))
    }
}

// ============================================================================
// 3. CALLER-FACING OUTCOME TRANSLATION
// ============================================================================

/// The only shapes callers above this core ever see.
///
/// Infrastructure failures are retryable; every authentication failure
/// collapses to `Unauthenticated` so external responses stay uniform and
/// non-revealing (expired vs revoked vs forged stays an internal
/// distinction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Unauthenticated,
    RetryLater,
}

impl AppError {
    /// Translate an internal error into its caller-facing outcome
    pub fn outcome(&self) -> AuthOutcome {
        match self {
            AppError::Ledger(LedgerError::Unavailable(_))
            | AppError::Ledger(LedgerError::Timeout)
            | AppError::Ledger(LedgerError::Query(_)) => AuthOutcome::RetryLater,
            AppError::Internal(_) | AppError::Config(_) => AuthOutcome::RetryLater,
            _ => AuthOutcome::Unauthenticated,
        }
    }

    /// Uniform, non-revealing message for external callers
    pub fn public_message(&self) -> &'static str {
        match self.outcome() {
            AuthOutcome::RetryLater => "Service temporarily unavailable",
            _ => "Invalid session",
        }
    }
}

// ============================================================================
// 4. STRUCTURED ERROR LOGGING
// ============================================================================

impl AppError {
    /// Log with severity matched to expectedness.
    ///
    /// Expired tokens are routine and stay at debug. Signature/type failures
    /// are anomalous. Token reuse carries a `security_event` field so it can
    /// be alerted on separately from ordinary auth noise.
    pub fn log(&self, operation: &str) {
        match self {
            AppError::Auth(AuthError::TokenExpired) => {
                tracing::debug!(operation, "Expired token presented");
            }
            AppError::Auth(AuthError::TokenReused) => {
                tracing::warn!(
                    operation,
                    security_event = "refresh_token_reuse",
                    "Refresh token reuse detected; family revoked"
                );
            }
            AppError::Auth(
                AuthError::TokenMalformed | AuthError::InvalidSignature | AuthError::WrongTokenType,
            ) => {
                tracing::warn!(operation, error = %self, "Token verification anomaly");
            }
            AppError::Auth(e) => {
                tracing::warn!(operation, error = %e, "Authentication failure");
            }
            AppError::Validation(e) => {
                tracing::warn!(operation, error = %e, "Validation error");
            }
            AppError::Ledger(e) => {
                tracing::error!(operation, error = %e, "Store error");
            }
            AppError::Config(e) => {
                tracing::error!(operation, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(operation, error = %msg, "Internal error");
            }
        }
    }
}
