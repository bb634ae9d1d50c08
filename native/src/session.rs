//! Protocol session: the one place that talks to the pipe.
//!
//! Every query runs acquire, handshake, transmit, read and release while
//! holding the transport lock, so exchanges from different threads never
//! interleave and no handle outlives a query.

use crate::config::BridgeConfig;
use crate::decode::{self, Value};
use crate::error::{BridgeError, Result};
use crate::ipc::protocol::{self, HANDSHAKE_GO_AHEAD, HANDSHAKE_READY};
use crate::ipc::{ChannelTransport, Connector, PipeConnector};
use crate::logging;
use crate::prelude;
use crate::process::{PayloadLoader, ProcessLocator};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

static SHARED_SESSION: OnceCell<Arc<Session>> = OnceCell::new();

/// Process-wide session, built by `init` on first use only.
pub fn shared<F>(init: F) -> Result<Arc<Session>>
where
    F: FnOnce() -> Result<Arc<Session>>,
{
    SHARED_SESSION.get_or_try_init(init).map(Arc::clone)
}

/// The process-wide session, if one has been built.
pub fn try_shared() -> Option<Arc<Session>> {
    SHARED_SESSION.get().cloned()
}

pub struct Session {
    config: BridgeConfig,
    transport: Mutex<ChannelTransport>,
    initialized: AtomicBool,
    exchanges: AtomicU64,
}

pub struct SessionBuilder {
    config: BridgeConfig,
    connector: Option<Arc<dyn Connector>>,
    locator: Option<Box<dyn ProcessLocator>>,
    loader: Option<Box<dyn PayloadLoader>>,
}

impl SessionBuilder {
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn locator(mut self, locator: impl ProcessLocator + 'static) -> Self {
        self.locator = Some(Box::new(locator));
        self
    }

    pub fn loader(mut self, loader: impl PayloadLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Build the session and run the best-effort start-up.
    ///
    /// Start-up failures are logged and leave a degraded session; only a
    /// failure to create the pipe runtime is returned.
    pub fn build(self) -> Result<Arc<Session>> {
        let connector = match self.connector {
            Some(connector) => connector,
            None => Arc::new(
                PipeConnector::new(self.config.read_timeout()).map_err(BridgeError::Runtime)?,
            ),
        };

        let transport = ChannelTransport::new(
            connector,
            self.config.connect_retries,
            self.config.retry_delay(),
            self.config.read_buffer_size,
        );

        let session = Arc::new(Session {
            config: self.config,
            transport: Mutex::new(transport),
            initialized: AtomicBool::new(false),
            exchanges: AtomicU64::new(0),
        });

        session.start(self.locator.as_deref(), self.loader.as_deref());
        Ok(session)
    }
}

impl Session {
    pub fn builder(config: BridgeConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            connector: None,
            locator: None,
            loader: None,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether start-up has run. Degraded sessions also report true.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Completed handshake and transmit cycles.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    pub fn is_channel_open(&self) -> bool {
        self.lock_transport().is_open()
    }

    /// Evaluate `script` remotely and decode the reply.
    ///
    /// `Ok(None)` means the exchange hit a transport I/O failure.
    pub fn query(&self, script: &str) -> Result<Option<Value>> {
        let raw = self.query_raw(script)?;
        Ok(decode::decode_response(raw.as_deref()))
    }

    /// Evaluate `script` remotely and return the undecoded reply.
    pub fn query_raw(&self, script: &str) -> Result<Option<String>> {
        let payload = protocol::normalize_script(script);
        let started = Instant::now();

        let mut transport = self.lock_transport();
        transport.acquire(&self.config.pipe_name)?;
        let outcome = self.exchange(&mut transport, &payload);
        transport.release();
        drop(transport);

        match &outcome {
            Ok(Some(reply)) => debug!(
                "[SESSION] {:?} -> {:?} in {:?}",
                payload,
                reply,
                started.elapsed()
            ),
            Ok(None) => warn!("[SESSION] No reply for {:?} (transport failure)", payload),
            Err(e) => warn!("[SESSION] Query {:?} failed: {}", payload, e),
        }
        outcome
    }

    fn exchange(&self, transport: &mut ChannelTransport, payload: &str) -> Result<Option<String>> {
        if !transport.write(HANDSHAKE_READY.as_bytes())? {
            return Ok(None);
        }

        let reply = match transport.read()? {
            Some(bytes) => protocol::reply_text(&bytes),
            None => return Ok(None),
        };
        if reply != HANDSHAKE_GO_AHEAD {
            return Err(BridgeError::HandshakeFailed { received: reply });
        }

        if !transport.write(payload.as_bytes())? {
            return Ok(None);
        }
        let response = transport.read()?.map(|bytes| protocol::reply_text(&bytes));

        self.exchanges.fetch_add(1, Ordering::Relaxed);
        Ok(response)
    }

    fn lock_transport(&self) -> std::sync::MutexGuard<'_, ChannelTransport> {
        // A panic mid-query cannot leave a handle behind: acquire releases first.
        self.transport.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start(&self, locator: Option<&dyn ProcessLocator>, loader: Option<&dyn PayloadLoader>) {
        let started = Instant::now();
        info!("[INIT] Starting session on {}", self.config.pipe_name);

        self.inject(locator, loader);

        if self.config.run_prelude {
            let sent = self.run_prelude();
            debug!("[INIT] Prelude sent {} statements", sent);
        } else {
            info!("[INIT] Prelude disabled");
        }

        self.initialized.store(true, Ordering::Release);
        info!("[INIT] Session ready in {:?}", started.elapsed());
    }

    fn inject(&self, locator: Option<&dyn ProcessLocator>, loader: Option<&dyn PayloadLoader>) {
        let Some(locator) = locator else {
            info!("[INIT] No process locator - assuming the pipe server is already running");
            return;
        };

        let pid = match locator.locate() {
            Ok(pid) => pid,
            Err(e) => {
                logging::log_critical_error("Process Discovery", &e.to_string());
                return;
            }
        };
        info!("[INIT] Found target process PID: {}", pid);

        let Some(payload) = self.config.payload_path.as_deref() else {
            debug!("[INIT] No payload configured - skipping injection");
            return;
        };
        let Some(loader) = loader else {
            warn!(
                "[INIT] Payload {:?} configured but no loader attached - load it into process {} externally",
                payload, pid
            );
            return;
        };

        match loader.load(payload, pid) {
            Ok(true) => info!("[INIT] Loaded {:?} into process {}", payload, pid),
            Ok(false) => logging::log_critical_error(
                "Payload Injection",
                &format!("Loader rejected {:?} for process {}", payload, pid),
            ),
            Err(e) => logging::log_critical_error("Payload Injection", &e.to_string()),
        }
    }

    /// Send the start-up statements in order, stopping at the first error.
    fn run_prelude(&self) -> usize {
        let mut sent = 0;
        for statement in prelude::statements() {
            if let Err(e) = self.query_raw(statement) {
                logging::log_critical_error(
                    "Session Prelude",
                    &format!("Statement {} failed, session degraded: {}", sent + 1, e),
                );
                break;
            }
            sent += 1;
        }
        sent
    }
}
