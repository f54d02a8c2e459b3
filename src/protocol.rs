//! Binary key-value wire protocol
//!
//! Every request and response starts with a 24-byte fixed header followed by
//! extras, key, and value sections. All integers are big-endian.
//!
//! ```text
//! Header (24 bytes):
//! +-------+--------+---------+--------+-----------+------------------+
//! | magic | opcode | key len | extras | data type | partition/status |
//! +-------+--------+---------+--------+-----------+------------------+
//! | 1B    | 1B     | 2B      | 1B     | 1B        | 2B               |
//! +-------+--------+---------+--------+-----------+------------------+
//! | total body length: 4B    | opaque: 4B         | cas: 8B          |
//! +--------------------------+--------------------+------------------+
//! ```
//!
//! The total body length covers extras + key + value. Query responses carry
//! a sequence of u32 length-prefixed rows in the value section.

use std::fmt;

use tokio::io::AsyncReadExt;

use crate::error::KvError;
use crate::pool::OperationBuilder;

/// Magic byte for requests
pub const REQUEST_MAGIC: u8 = 0x80;

/// Magic byte for responses
pub const RESPONSE_MAGIC: u8 = 0x81;

/// Fixed header size for requests and responses
pub const HEADER_LEN: usize = 24;

/// Extras length for upsert requests (flags u32 + expiry u32)
pub const UPSERT_EXTRAS_LEN: u8 = 8;

/// Request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Fetch a document by key
    Get = 0x00,
    /// Create or replace a document
    Upsert = 0x01,
    /// Delete a document by key
    Remove = 0x04,
    /// Liveness probe, no body
    Noop = 0x0a,
    /// Feature negotiation performed once per connection
    Hello = 0x1f,
    /// Bind the connection to a bucket
    SelectBucket = 0x89,
    /// Cluster-level query; response rows are length-prefixed
    Query = 0xf0,
}

impl OpCode {
    /// Decode an opcode from its wire value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Get),
            0x01 => Some(Self::Upsert),
            0x04 => Some(Self::Remove),
            0x0a => Some(Self::Noop),
            0x1f => Some(Self::Hello),
            0x89 => Some(Self::SelectBucket),
            0xf0 => Some(Self::Query),
            _ => None,
        }
    }

    /// Get the wire value for this opcode
    #[must_use]
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable name, used in logs and timeout errors
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Upsert => "upsert",
            Self::Remove => "remove",
            Self::Noop => "noop",
            Self::Hello => "hello",
            Self::SelectBucket => "select-bucket",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    KeyNotFound,
    KeyExists,
    ValueTooLarge,
    InvalidArguments,
    NotStored,
    UnknownCommand,
    Busy,
    TemporaryFailure,
    /// A status this client version does not recognize
    Unknown(u16),
}

impl Status {
    /// Decode a status from its wire value
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => Self::Success,
            0x0001 => Self::KeyNotFound,
            0x0002 => Self::KeyExists,
            0x0003 => Self::ValueTooLarge,
            0x0004 => Self::InvalidArguments,
            0x0005 => Self::NotStored,
            0x0081 => Self::UnknownCommand,
            0x0085 => Self::Busy,
            0x0086 => Self::TemporaryFailure,
            other => Self::Unknown(other),
        }
    }

    /// Get the wire value for this status
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Success => 0x0000,
            Self::KeyNotFound => 0x0001,
            Self::KeyExists => 0x0002,
            Self::ValueTooLarge => 0x0003,
            Self::InvalidArguments => 0x0004,
            Self::NotStored => 0x0005,
            Self::UnknownCommand => 0x0081,
            Self::Busy => 0x0085,
            Self::TemporaryFailure => 0x0086,
            Self::Unknown(v) => v,
        }
    }

    /// Check if this status indicates success
    #[must_use]
    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::KeyNotFound => write!(f, "key not found"),
            Self::KeyExists => write!(f, "key exists"),
            Self::ValueTooLarge => write!(f, "value too large"),
            Self::InvalidArguments => write!(f, "invalid arguments"),
            Self::NotStored => write!(f, "not stored"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::Busy => write!(f, "busy"),
            Self::TemporaryFailure => write!(f, "temporary failure"),
            Self::Unknown(v) => write!(f, "unknown status 0x{:04x}", v),
        }
    }
}

/// A request frame borrowed from caller-owned sections
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub opcode: OpCode,
    pub partition: u16,
    pub opaque: u32,
    pub cas: u64,
    pub extras: &'a [u8],
    pub key: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> Request<'a> {
    /// Build a request with empty extras, key, and value
    #[must_use]
    pub const fn new(opcode: OpCode) -> Self {
        Self {
            opcode,
            partition: 0,
            opaque: 0,
            cas: 0,
            extras: &[],
            key: &[],
            value: &[],
        }
    }

    /// Total encoded size of this request including the header
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.extras.len() + self.key.len() + self.value.len()
    }

    /// Serialize the full frame into `builder`
    ///
    /// # Errors
    ///
    /// Returns an error if the key or extras exceed their header field ranges.
    pub fn encode_into(&self, builder: &mut OperationBuilder) -> Result<(), KvError> {
        let key_len = u16::try_from(self.key.len()).map_err(|_| KvError::Protocol {
            detail: format!("key length {} exceeds u16", self.key.len()),
        })?;
        let extras_len = u8::try_from(self.extras.len()).map_err(|_| KvError::Protocol {
            detail: format!("extras length {} exceeds u8", self.extras.len()),
        })?;
        let body_len = u32::try_from(self.extras.len() + self.key.len() + self.value.len())
            .map_err(|_| KvError::Protocol {
                detail: "body length exceeds u32".to_string(),
            })?;

        builder.reserve(self.encoded_len());
        builder.put_u8(REQUEST_MAGIC);
        builder.put_u8(self.opcode.as_u8());
        builder.put_u16(key_len);
        builder.put_u8(extras_len);
        builder.put_u8(0); // data type, reserved
        builder.put_u16(self.partition);
        builder.put_u32(body_len);
        builder.put_u32(self.opaque);
        builder.put_u64(self.cas);
        builder.extend_from_slice(self.extras);
        builder.extend_from_slice(self.key);
        builder.extend_from_slice(self.value);
        Ok(())
    }
}

/// Parsed response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub opcode: OpCode,
    pub status: Status,
    pub key_len: u16,
    pub extras_len: u8,
    pub body_len: u32,
    pub opaque: u32,
    pub cas: u64,
}

impl ResponseHeader {
    /// Parse a response header from its 24-byte wire form
    ///
    /// # Errors
    ///
    /// Returns an error on a bad magic byte, unknown opcode, or a body
    /// length inconsistent with the key and extras lengths.
    pub fn parse(raw: &[u8; HEADER_LEN]) -> Result<Self, KvError> {
        if raw[0] != RESPONSE_MAGIC {
            return Err(KvError::Protocol {
                detail: format!("bad response magic 0x{:02x}", raw[0]),
            });
        }
        let opcode = OpCode::from_u8(raw[1]).ok_or_else(|| KvError::Protocol {
            detail: format!("unknown opcode 0x{:02x}", raw[1]),
        })?;
        let key_len = u16::from_be_bytes([raw[2], raw[3]]);
        let extras_len = raw[4];
        let status = Status::from_u16(u16::from_be_bytes([raw[6], raw[7]]));
        let body_len = u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]);
        let opaque = u32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]);
        let cas = u64::from_be_bytes([
            raw[16], raw[17], raw[18], raw[19], raw[20], raw[21], raw[22], raw[23],
        ]);

        if (body_len as usize) < key_len as usize + extras_len as usize {
            return Err(KvError::Protocol {
                detail: format!(
                    "body length {} smaller than extras {} + key {}",
                    body_len, extras_len, key_len
                ),
            });
        }

        Ok(Self {
            opcode,
            status,
            key_len,
            extras_len,
            body_len,
            opaque,
            cas,
        })
    }

    /// Serialize this header into its 24-byte wire form
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        raw[0] = RESPONSE_MAGIC;
        raw[1] = self.opcode.as_u8();
        raw[2..4].copy_from_slice(&self.key_len.to_be_bytes());
        raw[4] = self.extras_len;
        raw[6..8].copy_from_slice(&self.status.as_u16().to_be_bytes());
        raw[8..12].copy_from_slice(&self.body_len.to_be_bytes());
        raw[12..16].copy_from_slice(&self.opaque.to_be_bytes());
        raw[16..24].copy_from_slice(&self.cas.to_be_bytes());
        raw
    }

    /// Offset of the value section within the body
    #[must_use]
    #[inline]
    pub fn value_offset(&self) -> usize {
        self.extras_len as usize + self.key_len as usize
    }
}

/// A decoded response: header plus the body bytes in a rented builder
pub struct Response {
    pub header: ResponseHeader,
    body: OperationBuilder,
}

impl Response {
    /// The extras section of the body
    #[must_use]
    pub fn extras(&self) -> &[u8] {
        &self.body[..self.header.extras_len as usize]
    }

    /// The value section of the body
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.body[self.header.value_offset()..]
    }

    /// Copy the value section out of the pooled builder
    #[must_use]
    pub fn value_to_vec(&self) -> Vec<u8> {
        self.value().to_vec()
    }
}

/// Read one response frame from `stream`, using `body` for the body bytes
///
/// The header is read into a stack buffer; the body is read into the rented
/// builder, which travels with the returned [`Response`] and goes back to its
/// pool when the response is dropped.
///
/// # Errors
///
/// Returns an error on I/O failure or a malformed header.
pub async fn read_response<R>(stream: &mut R, mut body: OperationBuilder) -> Result<Response, KvError>
where
    R: AsyncReadExt + Unpin,
{
    let mut raw = [0u8; HEADER_LEN];
    stream.read_exact(&mut raw).await?;
    let header = ResponseHeader::parse(&raw)?;

    body.clear();
    body.resize(header.body_len as usize, 0);
    if header.body_len > 0 {
        stream.read_exact(&mut body[..]).await?;
    }

    Ok(Response { header, body })
}

/// Encode upsert extras (flags + expiry seconds)
#[must_use]
pub fn upsert_extras(flags: u32, expiry_secs: u32) -> [u8; UPSERT_EXTRAS_LEN as usize] {
    let mut extras = [0u8; UPSERT_EXTRAS_LEN as usize];
    extras[..4].copy_from_slice(&flags.to_be_bytes());
    extras[4..].copy_from_slice(&expiry_secs.to_be_bytes());
    extras
}

/// Decode a query response value into its length-prefixed rows
///
/// # Errors
///
/// Returns an error if a row prefix points past the end of the body.
pub fn decode_rows(value: &[u8]) -> Result<Vec<Vec<u8>>, KvError> {
    let mut rows = Vec::new();
    let mut offset = 0usize;

    while offset < value.len() {
        if offset + 4 > value.len() {
            return Err(KvError::Protocol {
                detail: "truncated row length prefix".to_string(),
            });
        }
        let len = u32::from_be_bytes([
            value[offset],
            value[offset + 1],
            value[offset + 2],
            value[offset + 3],
        ]) as usize;
        offset += 4;

        if offset + len > value.len() {
            return Err(KvError::Protocol {
                detail: format!("row length {} exceeds remaining body", len),
            });
        }
        rows.push(value[offset..offset + len].to_vec());
        offset += len;
    }

    Ok(rows)
}

/// Encode rows into a query response value (length-prefixed)
#[must_use]
pub fn encode_rows(rows: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = rows.iter().map(|r| 4 + r.len()).sum();
    let mut out = Vec::with_capacity(total);
    for row in rows {
        out.extend_from_slice(&(row.len() as u32).to_be_bytes());
        out.extend_from_slice(row);
    }
    out
}
