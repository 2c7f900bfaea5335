//! Binary codec for encoding and decoding OSC 1.0 messages.
//!
//! Wire format:
//! ```text
//! [address:osc-string][type-tags:osc-string][arg0][arg1]...
//! ```
//! An *osc-string* is the UTF-8 bytes followed by at least one NUL byte,
//! padded with NULs to a multiple of 4 bytes.  The type-tag string starts
//! with `,` and has one character per argument.  `i` and `f` arguments are
//! 4-byte big-endian values; `T` and `F` booleans carry no payload bytes.
//!
//! Only the subset of OSC needed to talk to the chatbox endpoints is
//! supported: no bundles, blobs, or 64-bit types.

use thiserror::Error;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the field being read.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// An osc-string has no NUL terminator before the end of the buffer.
    #[error("unterminated string starting at offset {offset}")]
    MissingTerminator { offset: usize },

    /// The address pattern does not start with `/`.
    #[error("invalid address pattern: {0:?}")]
    InvalidAddress(String),

    /// The type-tag string does not start with `,`.
    #[error("malformed type tag string: {0:?}")]
    MalformedTypeTags(String),

    /// A type tag outside the supported subset was encountered.
    #[error("unsupported type tag: {0:?}")]
    UnsupportedTypeTag(char),

    /// An osc-string does not hold valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A string argument contains an interior NUL, which OSC cannot represent.
    #[error("string argument contains an interior NUL byte")]
    EmbeddedNul,
}

/// A single OSC argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    /// 32-bit big-endian integer (`i`).
    Int(i32),
    /// 32-bit big-endian IEEE 754 float (`f`).
    Float(f32),
    /// NUL-terminated, 4-byte aligned UTF-8 string (`s`).
    Str(String),
    /// Boolean encoded purely in the type tag (`T` / `F`).
    Bool(bool),
}

impl OscArg {
    /// Returns the type-tag character describing this argument.
    pub fn type_tag(&self) -> char {
        match self {
            OscArg::Int(_) => 'i',
            OscArg::Float(_) => 'f',
            OscArg::Str(_) => 's',
            OscArg::Bool(true) => 'T',
            OscArg::Bool(false) => 'F',
        }
    }
}

/// An OSC message: an address pattern plus an ordered argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<OscArg>,
}

impl OscMessage {
    /// Creates a message for `address` with the given arguments.
    pub fn new(address: impl Into<String>, args: Vec<OscArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Returns the full type-tag string, including the leading comma.
    pub fn type_tags(&self) -> String {
        std::iter::once(',')
            .chain(self.args.iter().map(OscArg::type_tag))
            .collect()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes an [`OscMessage`] into a freshly allocated byte vector.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidAddress`] if the address does not start
/// with `/`, or [`ProtocolError::EmbeddedNul`] if any string contains a NUL.
///
/// # Examples
///
/// ```rust
/// use chatbox_core::protocol::osc::{decode_message, encode_message, OscArg, OscMessage};
///
/// let msg = OscMessage::new("/chatbox/typing", vec![OscArg::Bool(true)]);
/// let bytes = encode_message(&msg).unwrap();
/// let (decoded, consumed) = decode_message(&bytes).unwrap();
/// assert_eq!(decoded, msg);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_message(msg: &OscMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::with_capacity(encoded_len_hint(msg));
    encode_message_into(msg, &mut buf)?;
    Ok(buf)
}

/// Encodes an [`OscMessage`] by appending to `buf`.
///
/// This lets a sender reuse one allocation across many messages.  On error
/// `buf` is truncated back to its original length.
///
/// # Errors
///
/// Same as [`encode_message`].
pub fn encode_message_into(msg: &OscMessage, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
    let start = buf.len();
    let result = write_message(msg, buf);
    if result.is_err() {
        buf.truncate(start);
    }
    result
}

/// Decodes one [`OscMessage`] from the beginning of `bytes`.
///
/// Returns the message and the number of bytes consumed.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(OscMessage, usize), ProtocolError> {
    let (address, mut offset) = read_osc_string(bytes, 0)?;
    if !address.starts_with('/') {
        return Err(ProtocolError::InvalidAddress(address));
    }

    let (tags, tags_end) = read_osc_string(bytes, offset)?;
    offset = tags_end;
    if !tags.starts_with(',') {
        return Err(ProtocolError::MalformedTypeTags(tags));
    }

    let mut args = Vec::with_capacity(tags.len() - 1);
    for tag in tags[1..].chars() {
        let arg = match tag {
            'i' => {
                let raw = read_4(bytes, offset)?;
                offset += 4;
                OscArg::Int(i32::from_be_bytes(raw))
            }
            'f' => {
                let raw = read_4(bytes, offset)?;
                offset += 4;
                OscArg::Float(f32::from_be_bytes(raw))
            }
            's' => {
                let (s, end) = read_osc_string(bytes, offset)?;
                offset = end;
                OscArg::Str(s)
            }
            'T' => OscArg::Bool(true),
            'F' => OscArg::Bool(false),
            other => return Err(ProtocolError::UnsupportedTypeTag(other)),
        };
        args.push(arg);
    }

    Ok((OscMessage { address, args }, offset))
}

// ── Encoding helpers ──────────────────────────────────────────────────────────

fn write_message(msg: &OscMessage, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
    if !msg.address.starts_with('/') {
        return Err(ProtocolError::InvalidAddress(msg.address.clone()));
    }
    write_osc_string(buf, &msg.address)?;
    write_osc_string(buf, &msg.type_tags())?;

    for arg in &msg.args {
        match arg {
            OscArg::Int(v) => buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Float(v) => buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Str(s) => write_osc_string(buf, s)?,
            OscArg::Bool(_) => {} // encoded in the type tag only
        }
    }
    Ok(())
}

/// Writes `s` followed by 1–4 NUL bytes so the total length is 4-aligned.
fn write_osc_string(buf: &mut Vec<u8>, s: &str) -> Result<(), ProtocolError> {
    if s.as_bytes().contains(&0) {
        return Err(ProtocolError::EmbeddedNul);
    }
    buf.extend_from_slice(s.as_bytes());
    let padding = 4 - (s.len() % 4);
    buf.extend(std::iter::repeat(0u8).take(padding));
    Ok(())
}

fn encoded_len_hint(msg: &OscMessage) -> usize {
    let strings: usize = msg
        .args
        .iter()
        .map(|a| match a {
            OscArg::Str(s) => padded_len(s.len()),
            OscArg::Int(_) | OscArg::Float(_) => 4,
            OscArg::Bool(_) => 0,
        })
        .sum();
    padded_len(msg.address.len()) + padded_len(msg.args.len() + 1) + strings
}

fn padded_len(len: usize) -> usize {
    (len / 4 + 1) * 4
}

// ── Decoding helpers ──────────────────────────────────────────────────────────

/// Reads an osc-string at `offset`.  Returns the string and the 4-aligned
/// offset of the byte following its padding.
fn read_osc_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if offset >= buf.len() {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 4,
            available: buf.len(),
        });
    }
    let nul = buf[offset..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(ProtocolError::MissingTerminator { offset })?;
    let s = std::str::from_utf8(&buf[offset..offset + nul])
        .map_err(|_| ProtocolError::InvalidUtf8 { offset })?
        .to_string();

    let end = offset + padded_len(nul);
    if end > buf.len() {
        return Err(ProtocolError::InsufficientData {
            needed: end,
            available: buf.len(),
        });
    }
    Ok((s, end))
}

fn read_4(buf: &[u8], offset: usize) -> Result<[u8; 4], ProtocolError> {
    if buf.len() < offset + 4 {
        return Err(ProtocolError::InsufficientData {
            needed: offset + 4,
            available: buf.len(),
        });
    }
    Ok([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
