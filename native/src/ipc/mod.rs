// IPC client for the JShell pipe server running inside the target process.
// One blocking request/response exchange per connection.

pub mod pipe;
pub mod protocol;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use pipe::PipeConnector;
pub use protocol::{normalize_script, strip_end_marker, HANDSHAKE_GO_AHEAD, HANDSHAKE_READY};
pub use transport::{ChannelTransport, Connector, OpenError, PipeStream};
