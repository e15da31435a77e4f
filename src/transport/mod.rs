#![forbid(unsafe_code)]

//! Blocking command transports.
//!
//! A [`Transport`] sends one raw command with byte-array arguments and returns the
//! server reply. [`resp::RedisTransport`] speaks RESP over TCP;
//! [`RecordingTransport`] keeps commands in memory for dry runs and tests.

pub mod resp;

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::bulk::{BEGIN_MARKER, BULK_COMMAND};

pub use resp::{RedisOptions, RedisTransport};

/// Errors raised while exchanging a command with the server.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The server answered with an error reply.
    #[error("server error: {0}")]
    Server(String),
    /// The server reply could not be parsed.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// A server reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Simple status string such as `OK`.
    Status(String),
    /// Error reply nested inside an array.
    Error(String),
    /// Integer reply.
    Integer(i64),
    /// Bulk string reply.
    Bulk(Vec<u8>),
    /// Array reply.
    Array(Vec<Reply>),
    /// Null bulk string or null array.
    Nil,
}

impl Reply {
    /// Integer payload, if this is an integer reply.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{s}"),
            Reply::Error(s) => write!(f, "(error) {s}"),
            Reply::Integer(v) => write!(f, "(integer) {v}"),
            Reply::Bulk(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Reply::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Reply::Nil => write!(f, "(nil)"),
        }
    }
}

/// Blocking "send raw command with byte-array arguments".
pub trait Transport {
    /// Sends `name` with `args` and waits for the reply. Error replies map to
    /// [`TransportError::Server`].
    fn send_command(&mut self, name: &str, args: &[Bytes]) -> Result<Reply, TransportError>;

    /// Whether `key` exists on the server.
    fn key_exists(&mut self, key: &str) -> Result<bool, TransportError> {
        let reply = self.send_command("EXISTS", &[Bytes::copy_from_slice(key.as_bytes())])?;
        integer_reply(&reply).map(|n| n > 0)
    }

    /// Deletes `key`, returning whether it existed.
    fn delete_key(&mut self, key: &str) -> Result<bool, TransportError> {
        let reply = self.send_command("DEL", &[Bytes::copy_from_slice(key.as_bytes())])?;
        integer_reply(&reply).map(|n| n > 0)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_command(&mut self, name: &str, args: &[Bytes]) -> Result<Reply, TransportError> {
        (**self).send_command(name, args)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_command(&mut self, name: &str, args: &[Bytes]) -> Result<Reply, TransportError> {
        (**self).send_command(name, args)
    }
}

fn integer_reply(reply: &Reply) -> Result<i64, TransportError> {
    reply
        .as_integer()
        .ok_or_else(|| TransportError::Protocol(format!("expected integer reply, got {reply}")))
}

/// A command captured by [`RecordingTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedCommand {
    /// Command name.
    pub name: String,
    /// Arguments as sent.
    pub args: Vec<Bytes>,
}

impl RecordedCommand {
    /// Summed argument length.
    pub fn payload_len(&self) -> usize {
        self.args.iter().map(Bytes::len).sum()
    }
}

/// In-memory transport that records commands instead of sending them.
///
/// Bulk commands are answered the way the server reports them
/// (`"<n> nodes created, <m> relations created"`), key commands with `0`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    commands: Vec<RecordedCommand>,
    fail_at: Option<usize>,
}

impl RecordingTransport {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `index`-th command (zero-based) fail with a server error.
    pub fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Commands received so far, including a failed one.
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Consumes the recorder, returning its commands.
    pub fn into_commands(self) -> Vec<RecordedCommand> {
        self.commands
    }

    fn synthesize(name: &str, args: &[Bytes]) -> Reply {
        match name {
            BULK_COMMAND => {
                let skip = match args.get(1) {
                    Some(arg) if arg.as_ref() == BEGIN_MARKER.as_bytes() => 2,
                    _ => 1,
                };
                let count = |idx: usize| {
                    args.get(idx)
                        .and_then(|arg| std::str::from_utf8(arg).ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(0)
                };
                Reply::Bulk(
                    format!(
                        "{} nodes created, {} relations created",
                        count(skip),
                        count(skip + 1)
                    )
                    .into_bytes(),
                )
            }
            "EXISTS" | "DEL" => Reply::Integer(0),
            _ => Reply::Status("OK".into()),
        }
    }
}

impl Transport for RecordingTransport {
    fn send_command(&mut self, name: &str, args: &[Bytes]) -> Result<Reply, TransportError> {
        let index = self.commands.len();
        self.commands.push(RecordedCommand {
            name: name.to_string(),
            args: args.to_vec(),
        });
        if self.fail_at == Some(index) {
            return Err(TransportError::Server(format!(
                "injected failure at command {index}"
            )));
        }
        Ok(Self::synthesize(name, args))
    }
}
