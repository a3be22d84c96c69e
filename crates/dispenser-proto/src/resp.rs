//! A strict RESP2 subset (spec §6.1): requests are arrays of bulk strings,
//! replies are simple strings, integers, bulk strings, or errors. No maps,
//! sets, doubles, booleans, or RESP3 push types.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtoError;

/// A reply frame, one of the four RESP2 types this service ever sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+<text>\r\n` — used only for `ping`'s `PONG`.
    Simple(String),
    /// `:<n>\r\n` — `hset`'s accepted-field count, `del`'s 0/1.
    Integer(i64),
    /// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` when `None` — `get`, `info`.
    Bulk(Option<Vec<u8>>),
    /// `-<kind> <message>\r\n` — any failed command.
    Error { kind: String, message: String },
}

impl Frame {
    pub fn bulk(s: impl Into<String>) -> Self {
        Self::Bulk(Some(s.into().into_bytes()))
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Simple(s) => format!("+{s}\r\n").into_bytes(),
            Self::Integer(n) => format!(":{n}\r\n").into_bytes(),
            Self::Bulk(Some(bytes)) => {
                let mut out = format!("${}\r\n", bytes.len()).into_bytes();
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
                out
            }
            Self::Bulk(None) => b"$-1\r\n".to_vec(),
            Self::Error { kind, message } => {
                let sanitized = message.replace(['\r', '\n'], " ");
                format!("-{kind} {sanitized}\r\n").into_bytes()
            }
        }
    }
}

impl From<ProtoError> for Frame {
    fn from(err: ProtoError) -> Self {
        Self::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r\n")
        .or_else(|| line.strip_suffix(b"\n"))
        .unwrap_or(line)
}

fn parse_len(bytes: &[u8], expect: u8) -> Result<usize, ProtoError> {
    let (&tag, rest) = bytes.split_first().ok_or_else(|| ProtoError::Framing {
        reason: "empty header line".to_string(),
    })?;
    if tag != expect {
        return Err(ProtoError::Framing {
            reason: format!("expected '{}' header, got {:?}", expect as char, tag as char),
        });
    }
    std::str::from_utf8(rest)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| ProtoError::Framing {
            reason: "malformed length prefix".to_string(),
        })
}

/// Reads one request: a RESP array of bulk strings, returned as raw byte
/// strings (command name first). Returns `Ok(None)` on a clean EOF before
/// any bytes of the next request arrive.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Vec<Vec<u8>>>, ProtoError>
where
    R: AsyncBufRead + Unpin,
{
    let mut header = Vec::new();
    let read = reader
        .read_until(b'\n', &mut header)
        .await
        .map_err(|err| ProtoError::Framing { reason: err.to_string() })?;
    if read == 0 {
        return Ok(None);
    }

    let count = parse_len(trim_crlf(&header), b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut bulk_header = Vec::new();
        let read = reader
            .read_until(b'\n', &mut bulk_header)
            .await
            .map_err(|err| ProtoError::Framing { reason: err.to_string() })?;
        if read == 0 {
            return Err(ProtoError::Framing {
                reason: "connection closed mid-request".to_string(),
            });
        }
        let len = parse_len(trim_crlf(&bulk_header), b'$')?;

        let mut payload = vec![0u8; len + 2];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|err| ProtoError::Framing { reason: err.to_string() })?;
        payload.truncate(len);
        args.push(payload);
    }

    Ok(Some(args))
}

/// Writes and flushes one reply frame.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&frame.encode())
        .await
        .map_err(|err| ProtoError::Framing { reason: err.to_string() })?;
    writer
        .flush()
        .await
        .map_err(|err| ProtoError::Framing { reason: err.to_string() })
}
