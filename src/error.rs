//! Error types for service-dispatch.
//!
//! Two families live here:
//!
//! - [`ContractError`] - raised while registering handlers. These describe a
//!   malformed handler shape or REST declaration and should stop service
//!   initialization.
//! - [`ServiceError`] - raised while serving a request (routing, decoding,
//!   the handler itself, encoding).

use thiserror::Error;

/// Boxed error returned by application handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registration-time diagnostics.
///
/// Every check of the handler validator maps to exactly one variant, so the
/// registering code can tell which position of its handler is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// The descriptor does not describe a function at all.
    #[error("Input is not a function")]
    NotAFunction,

    /// Handlers take exactly one argument.
    #[error("Need one argument: *struct")]
    ArgumentCount,

    /// The argument is passed by value instead of as an owned record.
    #[error("Argument must be a *pointer* to a struct")]
    ArgumentNotPointer,

    /// The argument is not a record type.
    #[error("Argument must be a pointer to *struct*")]
    ArgumentNotStruct,

    /// Unary handlers return a message and an error.
    #[error("Need 2 return values: message and error")]
    ReplyCount,

    #[error("1st return value must be a *pointer* to a struct or an interface")]
    ReplyNotPointer,

    #[error("1st return value must be a pointer to a *struct* or an interface")]
    ReplyNotStruct,

    #[error("2nd return value has to implement error, but is: {0}")]
    ReplyErrorMissing(String),

    /// Streaming handlers return an output channel, a close channel and an error.
    #[error("Need 3 return values: chan message, chan bool and error")]
    StreamCount,

    #[error("1st return value must be a channel")]
    StreamNotChannel,

    #[error("1st return value must be a channel of a *pointer* to a struct")]
    StreamItemNotPointer,

    #[error("1st return value must be a channel of a pointer to a *struct*")]
    StreamItemNotStruct,

    #[error("2nd return value must be a channel")]
    CloseNotChannel,

    #[error("2nd return value must be a boolean channel")]
    CloseNotBool,

    #[error("3rd return value has to implement error, but is: {0}")]
    StreamErrorMissing(String),

    /// REST routes only accept GET, POST and PUT.
    #[error("invalid REST method")]
    InvalidRestMethod,

    #[error("earliest supported API level must be greater or equal to 3")]
    UnsupportedApiLevel,

    #[error("input argument must be a struct")]
    GetInputNotStruct,

    #[error("only byte slices and int are supported")]
    GetFieldUnsupported,

    #[error("number of fields must be 0 or 1")]
    GetFieldCount,

    /// The path pattern derived from the namespace and resource did not compile.
    #[error("invalid REST path pattern: {0}")]
    InvalidPathPattern(String),
}

/// Request-time error type for all dispatch operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A registration failed validation.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// No handler is registered under the requested route key.
    #[error("The requested message hasn't been registered: {0}")]
    RouteNotRegistered(String),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// JSON serialization error (REST replies).
    #[error("JSON encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),

    /// JSON deserialization error (REST payloads).
    #[error("JSON decode error: {0}")]
    JsonDecode(#[source] serde_json::Error),

    /// Error returned by the application handler, passed through untouched.
    #[error("{0}")]
    Handler(BoxError),

    /// The stream forwarder task panicked or was aborted.
    #[error("stream forwarder failed: {0}")]
    Forwarder(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// Whether this error happened while encoding a reply.
    pub fn is_encode(&self) -> bool {
        matches!(self, Self::MsgPackEncode(_) | Self::JsonEncode(_))
    }

    /// Whether this error happened while decoding a request payload.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::MsgPackDecode(_) | Self::JsonDecode(_))
    }
}

/// Result type alias using ServiceError.
pub type Result<T> = std::result::Result<T, ServiceError>;
