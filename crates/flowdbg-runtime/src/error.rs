use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugError {
    #[error("malformed method context: {0}")]
    MalformedSnapshot(&'static str),
    #[error("a channel is already bound to this session")]
    ChannelAlreadyBound,
    #[error("a debug session is already open for connection {0}")]
    DuplicateConnection(String),
    #[error("tenant {tenant} already has {limit} open debug sessions")]
    TenantSessionLimit { tenant: String, limit: usize },
}
