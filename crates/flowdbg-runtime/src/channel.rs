use std::io;

use crate::session::StoppedEvent;

/// Outbound half of the client connection that owns a debug session.
///
/// Framing and encoding belong to the transport; the session only identifies the connection
/// in diagnostics and hands it fully built events.
pub trait DebugChannel: Send + Sync {
    /// Stable identifier of the underlying connection.
    fn id(&self) -> &str;

    /// Deliver a "stopped" notification to the client.
    fn send_stopped(&self, event: &StoppedEvent) -> io::Result<()>;
}

impl<C: DebugChannel + ?Sized> DebugChannel for std::sync::Arc<C> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn send_stopped(&self, event: &StoppedEvent) -> io::Result<()> {
        (**self).send_stopped(event)
    }
}
