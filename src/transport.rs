//! Control-plane transport: newline-delimited JSON over a Unix domain
//! socket.
//!
//! Deliberately minimal. Each line is one frame; outbound frames carry
//! login, service registration, events and call replies, inbound frames
//! carry calls and the logout signal. Read EOF or any I/O error surfaces as
//! a transport error and drives the supervisor's reconnect loop.

use crate::error::TransportError;
use crate::supervisor::{Inbound, Session, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Connects to the control plane over a Unix domain socket.
pub struct UnixTransport {
    socket: PathBuf,
}

impl UnixTransport {
    pub fn new(socket: PathBuf) -> Self {
        Self { socket }
    }
}

impl Transport for UnixTransport {
    fn connect(&self) -> Result<Box<dyn Session>, TransportError> {
        let stream = UnixStream::connect(&self.socket)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Box::new(UnixSession { reader, stream }))
    }
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    Login { service: &'a str },
    RegisterService { name: &'a str },
    Event { name: &'a str, data: &'a Value },
    Reply { id: u64, result: &'a Value },
    Error { id: u64, message: &'a str },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum InboundFrame {
    Call {
        id: u64,
        method: String,
        #[serde(default)]
        args: Value,
    },
    Logout,
}

struct UnixSession {
    reader: BufReader<UnixStream>,
    stream: UnixStream,
}

impl UnixSession {
    fn send(&mut self, frame: &OutboundFrame) -> Result<(), TransportError> {
        let mut line =
            serde_json::to_string(frame).map_err(|e| TransportError::Protocol(e.to_string()))?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<InboundFrame, TransportError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        serde_json::from_str(line.trim_end())
            .map_err(|e| TransportError::Protocol(format!("bad frame: {}", e)))
    }
}

impl Session for UnixSession {
    fn login(&mut self, service: &str) -> Result<(), TransportError> {
        self.send(&OutboundFrame::Login { service })
    }

    fn register_service(&mut self, name: &str) -> Result<(), TransportError> {
        self.send(&OutboundFrame::RegisterService { name })
    }

    fn emit_event(&mut self, name: &str, data: &Value) -> Result<(), TransportError> {
        self.send(&OutboundFrame::Event { name, data })
    }

    fn next_call(&mut self) -> Result<Inbound, TransportError> {
        match self.read_frame()? {
            InboundFrame::Call { id, method, args } => Ok(Inbound::Call { id, method, args }),
            InboundFrame::Logout => Ok(Inbound::Logout),
        }
    }

    fn reply(&mut self, id: u64, result: &Value) -> Result<(), TransportError> {
        self.send(&OutboundFrame::Reply { id, result })
    }

    fn reply_error(&mut self, id: u64, message: &str) -> Result<(), TransportError> {
        self.send(&OutboundFrame::Error { id, message })
    }
}
