// Production connector on Tokio: Windows named pipes, Unix domain sockets
// elsewhere. Calls are blocking; each one drives the shared runtime.

use super::protocol::END_MARKER;
use super::transport::{Connector, OpenError, PipeStream};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Runtime;

/// Opens the JShell pipe through a private Tokio runtime.
pub struct PipeConnector {
    runtime: Arc<Runtime>,
    read_timeout: Option<Duration>,
}

impl PipeConnector {
    pub fn new(read_timeout: Option<Duration>) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("jshell-pipe")
            .enable_all()
            .build()?;

        Ok(Self {
            runtime: Arc::new(runtime),
            read_timeout,
        })
    }

    fn wrap<S>(&self, stream: S) -> Box<dyn PipeStream>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        Box::new(TokioStream {
            runtime: Arc::clone(&self.runtime),
            stream,
            read_timeout: self.read_timeout,
        })
    }
}

#[cfg(windows)]
impl Connector for PipeConnector {
    fn open(&self, name: &str) -> Result<Box<dyn PipeStream>, OpenError> {
        use tokio::net::windows::named_pipe::ClientOptions;
        use windows::Win32::Foundation::ERROR_PIPE_BUSY;

        // Registering the handle needs the runtime's reactor.
        let _guard = self.runtime.enter();
        match ClientOptions::new().read(true).write(true).open(name) {
            Ok(client) => Ok(self.wrap(client)),
            Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY.0 as i32) => Err(OpenError::Busy),
            Err(e) => Err(OpenError::Failed(e)),
        }
    }
}

#[cfg(unix)]
impl Connector for PipeConnector {
    fn open(&self, name: &str) -> Result<Box<dyn PipeStream>, OpenError> {
        use tokio::net::UnixStream;

        match self.runtime.block_on(UnixStream::connect(name)) {
            Ok(stream) => Ok(self.wrap(stream)),
            // Listener backlog full.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(OpenError::Busy),
            Err(e) => Err(OpenError::Failed(e)),
        }
    }
}

struct TokioStream<S> {
    runtime: Arc<Runtime>,
    stream: S,
    read_timeout: Option<Duration>,
}

impl<S> PipeStream for TokioStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = &mut self.stream;
        self.runtime.block_on(async {
            stream.write_all(bytes).await?;
            stream.flush().await
        })
    }

    fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        let read = read_reply(&mut self.stream, max_bytes);

        match self.read_timeout {
            // The timer has to be created inside the runtime context.
            Some(limit) => self.runtime.block_on(async move {
                tokio::time::timeout(limit, read).await.map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no reply within {:?}", limit),
                    )
                })?
            }),
            None => self.runtime.block_on(read),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        let stream = &mut self.stream;
        self.runtime.block_on(stream.shutdown())
    }
}

/// Read until the reply ends with the end marker, the buffer is full or the
/// server closes after sending something.
async fn read_reply<S>(stream: &mut S, max_bytes: usize) -> io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; max_bytes];
    let mut filled = 0;

    while filled < max_bytes {
        let count = stream.read(&mut buffer[filled..]).await?;
        if count == 0 {
            if filled == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "pipe closed by server",
                ));
            }
            break;
        }
        filled += count;
        if buffer[..filled].ends_with(END_MARKER.as_bytes()) {
            break;
        }
    }

    buffer.truncate(filled);
    Ok(buffer)
}
