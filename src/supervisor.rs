//! Connection Supervisor
//!
//! Owns the single persistent session to the control plane. On any
//! connection loss the supervisor blocks background work and retries with a
//! fixed 1-second delay, indefinitely; after every successful
//! (re)connection it re-registers all exposed services before serving
//! further calls. While no session exists the service façade is unreachable
//! because there is nothing to deliver calls.

use crate::error::TransportError;
use crate::events::EventEnvelope;
use crate::service::{Dispatcher, SERVICE_NAMES};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Identity used when logging in to the control plane.
pub const LOGIN_NAME: &str = "etcgen";

/// Delay between reconnection attempts. Fixed, no backoff, no retry cap:
/// availability is prioritized over resource conservation for a node-local
/// daemon whose control plane is essential.
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Connection life cycle. Initial state is `Disconnected`; there is no
/// terminal state, the supervisor runs for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// An inbound message from an established session.
#[derive(Debug, Clone)]
pub enum Inbound {
    Call {
        id: u64,
        method: String,
        args: Value,
    },
    Logout,
}

/// One established control-plane session.
pub trait Session: Send {
    fn login(&mut self, service: &str) -> Result<(), TransportError>;
    fn register_service(&mut self, name: &str) -> Result<(), TransportError>;
    fn emit_event(&mut self, name: &str, data: &Value) -> Result<(), TransportError>;
    /// Block until the next inbound call or logout.
    fn next_call(&mut self) -> Result<Inbound, TransportError>;
    fn reply(&mut self, id: u64, result: &Value) -> Result<(), TransportError>;
    fn reply_error(&mut self, id: u64, message: &str) -> Result<(), TransportError>;
}

/// Factory for control-plane sessions.
pub trait Transport: Send {
    fn connect(&self) -> Result<Box<dyn Session>, TransportError>;
}

/// Cooperative shutdown flag, checked between connection attempts and after
/// a disconnect.
#[derive(Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Observable handle on the supervisor's connection state.
#[derive(Clone)]
pub struct StateHandle(Arc<Mutex<ConnectionState>>);

impl StateHandle {
    pub fn get(&self) -> ConnectionState {
        *self.0.lock()
    }
}

pub struct Supervisor {
    transport: Box<dyn Transport>,
    dispatcher: Dispatcher,
    events: Receiver<EventEnvelope>,
    retry_delay: Duration,
    ready_file: Option<PathBuf>,
    state: Arc<Mutex<ConnectionState>>,
    shutdown: ShutdownFlag,
    initial_generation_done: bool,
}

impl Supervisor {
    pub fn new(
        transport: Box<dyn Transport>,
        dispatcher: Dispatcher,
        events: Receiver<EventEnvelope>,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            events,
            retry_delay: RETRY_DELAY,
            ready_file: None,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            shutdown,
            initial_generation_done: false,
        }
    }

    /// Override the fixed retry delay (tests).
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// File touched once connected and the initial generation is done;
    /// consumed by an external process supervisor as a readiness signal.
    pub fn with_ready_file(mut self, ready_file: Option<PathBuf>) -> Self {
        self.ready_file = ready_file;
        self
    }

    pub fn state_handle(&self) -> StateHandle {
        StateHandle(self.state.clone())
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    /// Run until shutdown is requested: connect, serve, reconnect on loss.
    pub fn run(&mut self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            let Some(mut session) = self.establish() else {
                self.set_state(ConnectionState::Disconnected);
                return;
            };
            self.set_state(ConnectionState::Connected);
            info!("connected to control plane");

            if !self.initial_generation_done {
                self.dispatcher.facade().generate_all();
                self.forward_events(session.as_mut());
                self.mark_ready();
                self.initial_generation_done = true;
            }

            match self.serve(session.as_mut()) {
                TransportError::Logout => info!("control plane requested logout"),
                err => warn!(error = %err, "connection to control plane lost"),
            }
            self.set_state(ConnectionState::Disconnected);
            if self.shutdown.is_requested() {
                return;
            }
        }
    }

    /// Retry until a session is established and every service is
    /// registered. Returns `None` only on shutdown.
    fn establish(&mut self) -> Option<Box<dyn Session>> {
        loop {
            if self.shutdown.is_requested() {
                return None;
            }
            match self.transport.connect() {
                Ok(mut session) => match Self::initialize(session.as_mut()) {
                    Ok(()) => return Some(session),
                    Err(err) => {
                        warn!(error = %err, "cannot initialize control-plane session, retrying in 1 second");
                    }
                },
                Err(err) => {
                    warn!(error = %err, "cannot connect to control plane, retrying in 1 second");
                }
            }
            std::thread::sleep(self.retry_delay);
        }
    }

    /// Log in and (re-)register all exposed services on a fresh session.
    fn initialize(session: &mut dyn Session) -> Result<(), TransportError> {
        session.login(LOGIN_NAME)?;
        for name in SERVICE_NAMES {
            session.register_service(name)?;
            info!(service = %name, "registered service");
        }
        Ok(())
    }

    /// Serve inbound calls until the session dies; returns the terminating
    /// error.
    fn serve(&mut self, session: &mut dyn Session) -> TransportError {
        loop {
            match session.next_call() {
                Ok(Inbound::Call { id, method, args }) => {
                    let sent = match self.dispatcher.dispatch(&method, &args) {
                        Ok(result) => session.reply(id, &result),
                        Err(err) => session.reply_error(id, &err.to_string()),
                    };
                    if let Err(err) = sent {
                        return err;
                    }
                    self.forward_events(session);
                }
                Ok(Inbound::Logout) => return TransportError::Logout,
                Err(err) => return err,
            }
        }
    }

    /// Drain pending `file_generated` events into the live session.
    /// Events that cannot be sent are dropped with a warning; the next
    /// disconnect is detected by `serve`.
    fn forward_events(&self, session: &mut dyn Session) {
        for envelope in self.events.try_iter() {
            if let Err(err) = session.emit_event(&envelope.name, &envelope.data) {
                warn!(event = %envelope.name, error = %err, "failed to emit event, dropping");
                return;
            }
        }
    }

    fn mark_ready(&self) {
        let Some(path) = &self.ready_file else {
            return;
        };
        if let Err(err) = std::fs::write(path, b"") {
            error!(path = %path.display(), error = %err, "cannot write ready file");
        } else {
            info!(path = %path.display(), "daemon ready");
        }
    }
}
