//! Connection supervision: fixed-interval retries, state transitions, and
//! re-registration of every service after a reconnect, before further
//! calls are served.

use etcgen::engine::{Engine, GenerationContext};
use etcgen::error::TransportError;
use etcgen::events::EventBus;
use etcgen::groups::TomlGroupStore;
use etcgen::index::{FileIndex, IndexHandle};
use etcgen::render::builtin_registry;
use etcgen::service::{Dispatcher, ServiceFacade};
use etcgen::supervisor::{
    ConnectionState, Inbound, Session, ShutdownFlag, Supervisor, Transport,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn dispatcher(root: &TempDir) -> (Dispatcher, Receiver<etcgen::events::EventEnvelope>) {
    let registry = builtin_registry(BTreeMap::new());
    let (events, receiver) = EventBus::new_pair();
    let ctx = Arc::new(GenerationContext {
        root: root.path().to_path_buf(),
        plugin_dirs: vec![],
        index: IndexHandle::new(FileIndex::default()),
        registry,
        groups: Arc::new(TomlGroupStore::from_groups(Vec::new())),
        events,
    });
    (Dispatcher::new(ServiceFacade::new(Engine::new(ctx))), receiver)
}

enum Step {
    Refuse,
    Serve(Vec<Result<Inbound, TransportError>>),
}

struct ScriptedSession {
    inbound: VecDeque<Result<Inbound, TransportError>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl Session for ScriptedSession {
    fn login(&mut self, service: &str) -> Result<(), TransportError> {
        self.log.lock().push(format!("login:{}", service));
        Ok(())
    }

    fn register_service(&mut self, name: &str) -> Result<(), TransportError> {
        self.log.lock().push(format!("register:{}", name));
        Ok(())
    }

    fn emit_event(&mut self, name: &str, _data: &Value) -> Result<(), TransportError> {
        self.log.lock().push(format!("event:{}", name));
        Ok(())
    }

    fn next_call(&mut self) -> Result<Inbound, TransportError> {
        self.inbound
            .pop_front()
            .unwrap_or(Err(TransportError::ConnectionClosed))
    }

    fn reply(&mut self, id: u64, _result: &Value) -> Result<(), TransportError> {
        self.log.lock().push(format!("reply:{}", id));
        Ok(())
    }

    fn reply_error(&mut self, id: u64, message: &str) -> Result<(), TransportError> {
        self.log.lock().push(format!("error:{}:{}", id, message));
        Ok(())
    }
}

struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    log: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    shutdown: ShutdownFlag,
}

impl Transport for ScriptedTransport {
    fn connect(&self) -> Result<Box<dyn Session>, TransportError> {
        self.attempts.lock().push(Instant::now());
        match self.steps.lock().pop_front() {
            Some(Step::Serve(inbound)) => {
                self.log.lock().push("connected".to_string());
                Ok(Box::new(ScriptedSession {
                    inbound: inbound.into(),
                    log: self.log.clone(),
                }))
            }
            Some(Step::Refuse) => Err(TransportError::ConnectionClosed),
            None => {
                self.shutdown.request();
                Err(TransportError::ConnectionClosed)
            }
        }
    }
}

struct Harness {
    log: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    supervisor: Supervisor,
    _root: TempDir,
}

fn harness(steps: Vec<Step>, retry_delay: Duration) -> Harness {
    let root = TempDir::new().unwrap();
    let (dispatcher, events) = dispatcher(&root);
    let shutdown = ShutdownFlag::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let transport = ScriptedTransport {
        steps: Mutex::new(steps.into()),
        log: log.clone(),
        attempts: attempts.clone(),
        shutdown: shutdown.clone(),
    };
    let supervisor = Supervisor::new(Box::new(transport), dispatcher, events, shutdown)
        .with_retry_delay(retry_delay);
    Harness {
        log,
        attempts,
        supervisor,
        _root: root,
    }
}

fn call(id: u64, method: &str) -> Result<Inbound, TransportError> {
    Ok(Inbound::Call {
        id,
        method: method.to_string(),
        args: Value::Null,
    })
}

#[test]
fn transport_error_triggers_reconnect_and_reregistration() {
    let mut h = harness(
        vec![
            Step::Serve(vec![call(1, "etcgen.generation.list_groups")]),
            Step::Serve(vec![call(2, "etcgen.generation.list_managed_files")]),
        ],
        Duration::from_millis(5),
    );
    h.supervisor.run();

    let log = h.log.lock().clone();
    let second_connect = log.iter().rposition(|l| l == "connected").unwrap();
    let reply_two = log.iter().position(|l| l == "reply:2").unwrap();
    let registrations_after_reconnect = log[second_connect..reply_two]
        .iter()
        .filter(|l| l.starts_with("register:"))
        .count();

    // Both services are re-registered on the new session before the next
    // call is answered.
    assert_eq!(registrations_after_reconnect, 2);
    assert!(log.contains(&"reply:1".to_string()));
}

#[test]
fn connect_attempts_are_spaced_by_the_retry_delay() {
    let delay = Duration::from_millis(40);
    let mut h = harness(
        vec![Step::Refuse, Step::Refuse, Step::Refuse, Step::Serve(vec![])],
        delay,
    );
    h.supervisor.run();

    let attempts = h.attempts.lock().clone();
    assert!(attempts.len() >= 4);
    for pair in attempts[..4].windows(2) {
        assert!(
            pair[1].duration_since(pair[0]) >= delay,
            "retries must wait out the fixed delay"
        );
    }
}

#[test]
fn state_is_connected_while_serving_and_disconnected_after_loss() {
    struct BlockingSession {
        trigger: std::sync::mpsc::Receiver<()>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Session for BlockingSession {
        fn login(&mut self, _service: &str) -> Result<(), TransportError> {
            Ok(())
        }

        fn register_service(&mut self, name: &str) -> Result<(), TransportError> {
            self.log.lock().push(format!("register:{}", name));
            Ok(())
        }

        fn emit_event(&mut self, _name: &str, _data: &Value) -> Result<(), TransportError> {
            Ok(())
        }

        fn next_call(&mut self) -> Result<Inbound, TransportError> {
            // Hold the session open until the test injects a failure.
            let _ = self.trigger.recv();
            Err(TransportError::ConnectionClosed)
        }

        fn reply(&mut self, _id: u64, _result: &Value) -> Result<(), TransportError> {
            Ok(())
        }

        fn reply_error(&mut self, _id: u64, _message: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct OneSessionTransport {
        trigger: Mutex<Option<std::sync::mpsc::Receiver<()>>>,
        log: Arc<Mutex<Vec<String>>>,
        shutdown: ShutdownFlag,
    }

    impl Transport for OneSessionTransport {
        fn connect(&self) -> Result<Box<dyn Session>, TransportError> {
            match self.trigger.lock().take() {
                Some(trigger) => Ok(Box::new(BlockingSession {
                    trigger,
                    log: self.log.clone(),
                })),
                None => {
                    self.shutdown.request();
                    Err(TransportError::ConnectionClosed)
                }
            }
        }
    }

    let root = TempDir::new().unwrap();
    let (dispatcher, events) = dispatcher(&root);
    let shutdown = ShutdownFlag::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = std::sync::mpsc::channel();
    let transport = OneSessionTransport {
        trigger: Mutex::new(Some(rx)),
        log: log.clone(),
        shutdown: shutdown.clone(),
    };
    let mut supervisor = Supervisor::new(Box::new(transport), dispatcher, events, shutdown)
        .with_retry_delay(Duration::from_millis(5));
    let state = supervisor.state_handle();
    assert_eq!(state.get(), ConnectionState::Disconnected);

    let worker = std::thread::spawn(move || supervisor.run());

    let deadline = Instant::now() + Duration::from_secs(5);
    while state.get() != ConnectionState::Connected {
        assert!(Instant::now() < deadline, "never reached Connected");
        std::thread::sleep(Duration::from_millis(1));
    }

    tx.send(()).unwrap();
    worker.join().unwrap();

    assert_eq!(state.get(), ConnectionState::Disconnected);
    assert_eq!(
        log.lock()
            .iter()
            .filter(|l| l.starts_with("register:"))
            .count(),
        2
    );
}
