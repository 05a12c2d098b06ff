use thiserror::Error;

/// Per-message failure. Never propagates past the message it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The headers did not match the provider's signature, so the body was
    /// never scanned.
    #[error("message headers do not match any known bounce signature")]
    NotRecognized,
    /// The signature matched but no recipient line was found in the
    /// delivery-status section.
    #[error("no recipient address found in the delivery-status section")]
    NoRecipients,
}
