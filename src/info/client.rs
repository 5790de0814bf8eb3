//! Async client for the node's info protocol.
//!
//! Every message is an 8-byte header followed by a text body:
//!
//! ```text
//! [version=2][type=1][48-bit big-endian body length] body
//! ```
//!
//! Requests list one command per line; replies carry `command\tvalue` lines.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::InfoError;

const PROTO_VERSION: u8 = 2;
const MSG_TYPE_INFO: u8 = 1;
const HEADER_LEN: usize = 8;

/// Upper bound on a single reply body (64 MiB).
const MAX_BODY_LEN: u64 = 64 * 1024 * 1024;

/// One open connection to a node. Not shared across scrapes.
pub struct InfoConnection {
    stream: TcpStream,
    timeout: Duration,
}

impl InfoConnection {
    /// Open a TCP connection, bounded by `timeout`.
    pub async fn connect(addr: &str, timeout_after: Duration) -> Result<Self, InfoError> {
        let stream = timeout(timeout_after, TcpStream::connect(addr))
            .await
            .map_err(|_| InfoError::Timeout(timeout_after.as_millis() as u64))??;
        stream.set_nodelay(true).ok();
        debug!("connected to {addr}");

        Ok(Self {
            stream,
            timeout: timeout_after,
        })
    }

    /// Send `commands` in one message and return command → raw value.
    pub async fn request(&mut self, commands: &[&str]) -> Result<HashMap<String, String>, InfoError> {
        let limit = self.timeout;
        timeout(limit, self.round_trip(commands))
            .await
            .map_err(|_| InfoError::Timeout(limit.as_millis() as u64))?
    }

    /// Send a single command and return its value.
    pub async fn request_one(&mut self, command: &str) -> Result<String, InfoError> {
        let mut reply = self.request(&[command]).await?;
        reply
            .remove(command)
            .ok_or_else(|| InfoError::MissingReply(command.to_string()))
    }

    async fn round_trip(&mut self, commands: &[&str]) -> Result<HashMap<String, String>, InfoError> {
        self.stream.write_all(&encode_request(commands)).await?;

        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let len = decode_header(&header)?;

        let mut body = vec![0u8; len as usize];
        self.stream.read_exact(&mut body).await?;
        let body = String::from_utf8(body).map_err(|_| InfoError::NotUtf8)?;

        Ok(decode_reply(&body))
    }
}

/// Build a complete request message.
pub fn encode_request(commands: &[&str]) -> Vec<u8> {
    let body: String = commands.iter().map(|c| format!("{c}\n")).collect();
    let mut msg = Vec::with_capacity(HEADER_LEN + body.len());
    msg.extend_from_slice(&encode_header(body.len() as u64));
    msg.extend_from_slice(body.as_bytes());
    msg
}

pub fn encode_header(len: u64) -> [u8; HEADER_LEN] {
    let mut header = len.to_be_bytes();
    header[0] = PROTO_VERSION;
    header[1] = MSG_TYPE_INFO;
    header
}

/// Validate a header and return the body length it announces.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<u64, InfoError> {
    if header[0] != PROTO_VERSION || header[1] != MSG_TYPE_INFO {
        return Err(InfoError::BadHeader {
            version: header[0],
            kind: header[1],
        });
    }
    let mut len = *header;
    len[0] = 0;
    len[1] = 0;
    let len = u64::from_be_bytes(len);
    if len > MAX_BODY_LEN {
        return Err(InfoError::TooLarge(len));
    }
    Ok(len)
}

/// Split a reply body into command → value. Lines without a tab are a
/// bare command echo with an empty value.
pub fn decode_reply(body: &str) -> HashMap<String, String> {
    body.split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('\t') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}
