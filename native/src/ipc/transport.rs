// Channel transport: bounded-retry acquisition plus raw write/read over
// whichever stream the connector hands out.

use crate::error::{BridgeError, Result};
use log::{debug, error, warn};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Why a single open attempt failed.
#[derive(Debug)]
pub enum OpenError {
    /// Every server instance is busy; worth retrying shortly.
    Busy,
    Failed(io::Error),
}

/// An open duplex byte stream.
pub trait PipeStream: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever the peer sent, at most `max_bytes`.
    fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Vec<u8>>;

    fn shutdown(&mut self) -> io::Result<()>;
}

/// Opens streams by channel name.
pub trait Connector: Send + Sync {
    fn open(&self, name: &str) -> std::result::Result<Box<dyn PipeStream>, OpenError>;
}

/// Owner of the single channel handle.
pub struct ChannelTransport {
    connector: Arc<dyn Connector>,
    handle: Option<Box<dyn PipeStream>>,
    max_attempts: u32,
    retry_delay: Duration,
    read_buffer_size: usize,
}

impl ChannelTransport {
    pub fn new(
        connector: Arc<dyn Connector>,
        max_attempts: u32,
        retry_delay: Duration,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            connector,
            handle: None,
            max_attempts: max_attempts.max(1),
            retry_delay,
            read_buffer_size,
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Open `name`, retrying while the server reports busy.
    pub fn acquire(&mut self, name: &str) -> Result<()> {
        if self.handle.is_some() {
            warn!("[IPC] Acquire called with a live handle - releasing it first");
            self.release();
        }

        for attempt in 1..=self.max_attempts {
            match self.connector.open(name) {
                Ok(stream) => {
                    debug!("[IPC] Opened {} on attempt {}", name, attempt);
                    self.handle = Some(stream);
                    return Ok(());
                }
                Err(OpenError::Busy) => {
                    debug!(
                        "[IPC] {} busy (attempt {}/{})",
                        name, attempt, self.max_attempts
                    );
                    if attempt < self.max_attempts {
                        thread::sleep(self.retry_delay);
                    }
                }
                Err(OpenError::Failed(source)) => {
                    error!("[IPC] Could not open {}: {}", name, source);
                    return Err(BridgeError::ChannelOpen {
                        name: name.to_string(),
                        source,
                    });
                }
            }
        }

        Err(BridgeError::ChannelUnavailable {
            name: name.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Close the handle if present. Close errors are logged, never raised.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.handle.take() {
            if let Err(e) = stream.shutdown() {
                warn!("[IPC] Error closing pipe: {}", e);
            }
        }
    }

    /// Write the whole buffer. I/O failure is `Ok(false)`.
    pub fn write(&mut self, bytes: &[u8]) -> Result<bool> {
        let stream = self.handle.as_mut().ok_or(BridgeError::PipeNotReady)?;
        match stream.write_all(bytes) {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("[IPC] Error writing to pipe: {}", e);
                Ok(false)
            }
        }
    }

    /// Read one reply with the configured buffer size.
    pub fn read(&mut self) -> Result<Option<Vec<u8>>> {
        let max = self.read_buffer_size;
        self.read_up_to(max)
    }

    /// Read up to `max_bytes`. I/O failure is `Ok(None)`.
    pub fn read_up_to(&mut self, max_bytes: usize) -> Result<Option<Vec<u8>>> {
        let stream = self.handle.as_mut().ok_or(BridgeError::PipeNotReady)?;
        match stream.read_chunk(max_bytes) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                error!("[IPC] Error reading from pipe: {}", e);
                Ok(None)
            }
        }
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        self.release();
    }
}
