//! RESP2 framing over a blocking stream.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use super::{Reply, Transport, TransportError};

/// Arguments above this size are written straight to the socket instead of being
/// staged with the frame headers.
const STAGE_LIMIT: usize = 64 * 1024;
const MAX_REPLY_DEPTH: usize = 16;
/// Largest bulk string accepted in a reply; matches the server's default
/// `proto-max-bulk-len`.
const MAX_BULK_REPLY: usize = 512 * 1024 * 1024;

/// Connection settings for [`RedisTransport::connect`].
#[derive(Clone, Debug)]
pub struct RedisOptions {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// ACL user name sent with `AUTH`.
    pub username: Option<String>,
    /// Password sent with `AUTH` after connecting.
    pub password: Option<String>,
    /// Limit on establishing the TCP connection.
    pub connect_timeout: Option<Duration>,
    /// Socket read/write timeout; `None` blocks indefinitely.
    pub io_timeout: Option<Duration>,
}

impl Default for RedisOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            username: None,
            password: None,
            connect_timeout: Some(Duration::from_secs(5)),
            io_timeout: None,
        }
    }
}

/// Writes `name` and `args` as a RESP array of bulk strings.
pub fn write_command<W: Write>(out: &mut W, name: &str, args: &[Bytes]) -> io::Result<()> {
    let mut staged = BytesMut::with_capacity(128);
    staged.put_slice(format!("*{}\r\n", args.len() + 1).as_bytes());
    put_bulk_header(&mut staged, name.len());
    staged.put_slice(name.as_bytes());
    staged.put_slice(b"\r\n");
    for arg in args {
        put_bulk_header(&mut staged, arg.len());
        if arg.len() > STAGE_LIMIT {
            out.write_all(&staged)?;
            staged.clear();
            out.write_all(arg)?;
        } else {
            staged.put_slice(arg);
        }
        staged.put_slice(b"\r\n");
    }
    out.write_all(&staged)?;
    out.flush()
}

fn put_bulk_header(staged: &mut BytesMut, len: usize) {
    staged.put_slice(format!("${len}\r\n").as_bytes());
}

/// Reads one reply. Error replies are returned as [`Reply::Error`].
pub fn read_reply<R: BufRead>(input: &mut R) -> Result<Reply, TransportError> {
    read_reply_at(input, 0)
}

fn read_reply_at<R: BufRead>(input: &mut R, depth: usize) -> Result<Reply, TransportError> {
    if depth > MAX_REPLY_DEPTH {
        return Err(TransportError::Protocol("reply nesting too deep".into()));
    }
    let line = read_line(input)?;
    let (kind, rest) = line
        .split_first()
        .ok_or_else(|| TransportError::Protocol("empty reply line".into()))?;
    match kind {
        b'+' => Ok(Reply::Status(String::from_utf8_lossy(rest).into_owned())),
        b'-' => Ok(Reply::Error(String::from_utf8_lossy(rest).into_owned())),
        b':' => parse_int(rest).map(Reply::Integer),
        b'$' => {
            let len = parse_int(rest)?;
            if len < 0 {
                return Ok(Reply::Nil);
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|len| *len <= MAX_BULK_REPLY)
                .ok_or_else(|| TransportError::Protocol(format!("bulk length {len} too large")))?;
            // grows with the bytes actually received rather than the declared length
            let mut body = Vec::with_capacity((len + 2).min(STAGE_LIMIT));
            input.by_ref().take(len as u64 + 2).read_to_end(&mut body)?;
            if body.len() < len + 2 {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside bulk reply",
                )));
            }
            if !body.ends_with(b"\r\n") {
                return Err(TransportError::Protocol(
                    "bulk string missing terminator".into(),
                ));
            }
            body.truncate(len);
            Ok(Reply::Bulk(body))
        }
        b'*' => {
            let count = parse_int(rest)?;
            if count < 0 {
                return Ok(Reply::Nil);
            }
            let mut items = Vec::with_capacity(count.min(64) as usize);
            for _ in 0..count {
                items.push(read_reply_at(input, depth + 1)?);
            }
            Ok(Reply::Array(items))
        }
        other => Err(TransportError::Protocol(format!(
            "unknown reply type byte 0x{other:02x}"
        ))),
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut line = Vec::new();
    let read = input.read_until(b'\n', &mut line)?;
    if read == 0 {
        return Err(TransportError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before reply",
        )));
    }
    if !line.ends_with(b"\r\n") {
        return Err(TransportError::Protocol("reply line not CRLF terminated".into()));
    }
    line.truncate(line.len() - 2);
    Ok(line)
}

fn parse_int(raw: &[u8]) -> Result<i64, TransportError> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            TransportError::Protocol(format!(
                "invalid integer '{}'",
                String::from_utf8_lossy(raw)
            ))
        })
}

/// RESP client over a blocking stream, TCP by default.
#[derive(Debug)]
pub struct RedisTransport<S = TcpStream> {
    stream: BufReader<S>,
}

impl RedisTransport<TcpStream> {
    /// Connects and authenticates according to `opts`.
    pub fn connect(opts: &RedisOptions) -> Result<Self, TransportError> {
        let addrs: Vec<SocketAddr> = (opts.host.as_str(), opts.port).to_socket_addrs()?.collect();
        let mut last_err = None;
        let mut connected = None;
        for addr in addrs {
            let attempt = match opts.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(err) => last_err = Some(err),
            }
        }
        let stream = match connected {
            Some(stream) => stream,
            None => {
                return Err(TransportError::Io(last_err.unwrap_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no address resolved for {}", opts.host),
                    )
                })))
            }
        };
        stream.set_nodelay(true)?;
        stream.set_read_timeout(opts.io_timeout)?;
        stream.set_write_timeout(opts.io_timeout)?;
        debug!(host = %opts.host, port = opts.port, "connected");

        let mut transport = Self::from_stream(stream);
        if let Some(password) = &opts.password {
            let mut args = Vec::with_capacity(2);
            if let Some(user) = &opts.username {
                args.push(Bytes::copy_from_slice(user.as_bytes()));
            }
            args.push(Bytes::copy_from_slice(password.as_bytes()));
            transport.send_command("AUTH", &args)?;
        }
        Ok(transport)
    }
}

impl<S: Read + Write> RedisTransport<S> {
    /// Wraps an already connected stream.
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }
}

impl<S: Read + Write> Transport for RedisTransport<S> {
    fn send_command(&mut self, name: &str, args: &[Bytes]) -> Result<Reply, TransportError> {
        write_command(self.stream.get_mut(), name, args)?;
        match read_reply(&mut self.stream)? {
            Reply::Error(message) => Err(TransportError::Server(message)),
            reply => Ok(reply),
        }
    }
}
