use thiserror::Error;

/// Errors surfaced by token creation, the ModHex codec, persistence, and
/// OTP generation.
///
/// Codec errors are returned to the immediate caller; state errors
/// propagate out of [`crate::Token::generate`] and
/// [`crate::Token::generate_otp`] so callers always observe them at the
/// API call they invoked. The library never substitutes a default token
/// or a zero OTP on error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// The platform RNG refused to produce bytes. Fatal; not retried.
    #[error("platform entropy source unavailable")]
    Entropy,

    /// Input to the ModHex decoder was not valid ModHex. Recoverable;
    /// the caller must supply well-formed input.
    #[error("invalid modhex input: {reason}")]
    InvalidEncoding {
        /// What made the input undecodable.
        reason: String,
    },

    /// The session counter has reached its ceiling. The token is spent
    /// and must be discarded and regenerated; retrying with the same
    /// token fails identically.
    #[error("session counter exhausted, token must be regenerated")]
    CounterExhausted,

    /// A persisted record failed an internal consistency check, e.g.
    /// truncated or corrupted bytes handed to deserialization. Should
    /// not occur under correct usage.
    #[error("malformed token state: {reason}")]
    MalformedState {
        /// Which consistency check failed.
        reason: String,
    },
}
