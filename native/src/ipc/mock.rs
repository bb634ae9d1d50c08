// In-memory pipe server used by unit tests. Records every transport call.

use super::protocol::HANDSHAKE_READY;
use super::transport::{Connector, OpenError, PipeStream};
use std::io;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open(usize),
    Write(usize, String),
    Read(usize),
    Close(usize),
}

type Responder = dyn Fn(&str) -> Option<String> + Send + Sync;

pub struct MockServer {
    pub log: Arc<Mutex<Vec<Event>>>,
    pub live: Arc<AtomicIsize>,
    next_id: AtomicUsize,
    handshake_reply: String,
    responder: Arc<Responder>,
    fail_payload_write: bool,
}

impl MockServer {
    /// Server answering `GO_AHEAD<END>` and then `responder(payload)<END>`.
    /// A `None` from the responder is a read failure.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            live: Arc::new(AtomicIsize::new(0)),
            next_id: AtomicUsize::new(0),
            handshake_reply: "GO_AHEAD<END>".to_string(),
            responder: Arc::new(responder),
            fail_payload_write: false,
        }
    }

    pub fn echo() -> Self {
        Self::new(|payload| Some(format!("{}<END>", payload)))
    }

    pub fn with_handshake_reply(mut self, reply: &str) -> Self {
        self.handshake_reply = reply.to_string();
        self
    }

    pub fn failing_payload_write(mut self) -> Self {
        self.fail_payload_write = true;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    /// Payloads written after the handshake, in order.
    pub fn payloads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(_, text) if text != HANDSHAKE_READY => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl Connector for MockServer {
    fn open(&self, _name: &str) -> Result<Box<dyn PipeStream>, OpenError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Event::Open(id));
        Ok(Box::new(MockStream {
            id,
            log: Arc::clone(&self.log),
            live: Arc::clone(&self.live),
            handshake_reply: self.handshake_reply.clone(),
            responder: Arc::clone(&self.responder),
            fail_payload_write: self.fail_payload_write,
            last_written: None,
        }))
    }
}

struct MockStream {
    id: usize,
    log: Arc<Mutex<Vec<Event>>>,
    live: Arc<AtomicIsize>,
    handshake_reply: String,
    responder: Arc<Responder>,
    fail_payload_write: bool,
    last_written: Option<String>,
}

impl PipeStream for MockStream {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(bytes).to_string();
        self.log
            .lock()
            .unwrap()
            .push(Event::Write(self.id, text.clone()));
        if self.fail_payload_write && text != HANDSHAKE_READY {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write refused"));
        }
        self.last_written = Some(text);
        Ok(())
    }

    fn read_chunk(&mut self, max_bytes: usize) -> io::Result<Vec<u8>> {
        self.log.lock().unwrap().push(Event::Read(self.id));
        let reply = match self.last_written.take().as_deref() {
            Some(HANDSHAKE_READY) => Some(self.handshake_reply.clone()),
            Some(payload) => (self.responder)(payload),
            None => None,
        };
        match reply {
            Some(text) => {
                let mut bytes = text.into_bytes();
                bytes.truncate(max_bytes);
                Ok(bytes)
            }
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "no reply")),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(Event::Close(self.id));
        Ok(())
    }
}
