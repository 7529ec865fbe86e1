//! # State Tokens
//!
//! Converts a [`GreetingDocument`] to and from a URL-safe token that can be
//! embedded in a link fragment (`#data=<token>`).
//!
//! ## Formats
//!
//! | Format | Pipeline | Alphabet |
//! |--------|----------|----------|
//! | `Escaped` | JSON → `encodeURIComponent` escaping → base64 (padded) | `A-Z a-z 0-9 + / =` |
//! | `Compressed` | JSON → zlib → base64url (no padding), prefixed `z.` | `A-Z a-z 0-9 - _` |
//!
//! `Escaped` is what links have always used. `Compressed` tokens are a
//! fraction of the size for text-heavy greetings. `decode` accepts both; the
//! `z.` prefix cannot occur in an escaped token since `.` is outside the
//! standard base64 alphabet.
//!
//! Decoding never panics and never touches an existing document: any problem
//! yields [`GreetcardError::Decode`].

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::document::GreetingDocument;
use crate::error::GreetcardError;

/// Default cap on token length (characters).
pub const DEFAULT_MAX_TOKEN_LEN: usize = 2 * 1024 * 1024;

/// Prefix marking a compressed token.
pub const COMPRESSED_PREFIX: &str = "z.";

/// Upper bound on inflated JSON, so a tiny token can't expand without limit.
const MAX_INFLATED_BYTES: u64 = 64 * 1024 * 1024;

/// Characters `encodeURIComponent` leaves alone: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Token encoding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenFormat {
    #[default]
    Escaped,
    Compressed,
}

impl std::str::FromStr for TokenFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "escaped" | "plain" => Ok(TokenFormat::Escaped),
            "compressed" | "zlib" => Ok(TokenFormat::Compressed),
            _ => Err(format!("Unknown token format '{}' (escaped, compressed)", s)),
        }
    }
}

/// Encoder/decoder for state tokens with a length limit.
#[derive(Debug, Clone, Copy)]
pub struct TokenCodec {
    pub format: TokenFormat,
    pub max_len: usize,
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self {
            format: TokenFormat::Escaped,
            max_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }
}

impl TokenCodec {
    pub fn new(format: TokenFormat, max_len: usize) -> Self {
        Self { format, max_len }
    }

    /// Encode a document, failing with `PayloadTooLarge` instead of
    /// producing a token longer than `max_len`.
    pub fn encode(&self, doc: &GreetingDocument) -> Result<String, GreetcardError> {
        let json = serde_json::to_string(doc)
            .map_err(|e| GreetcardError::Decode(format!("Failed to serialize document: {}", e)))?;

        let token = match self.format {
            TokenFormat::Escaped => STANDARD.encode(escape_component(&json)),
            TokenFormat::Compressed => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
                encoder.write_all(json.as_bytes())?;
                let compressed = encoder.finish()?;
                format!("{}{}", COMPRESSED_PREFIX, URL_SAFE_NO_PAD.encode(compressed))
            }
        };

        if token.len() > self.max_len {
            return Err(GreetcardError::PayloadTooLarge {
                len: token.len(),
                max: self.max_len,
            });
        }
        Ok(token)
    }

    /// Decode a token in either format.
    pub fn decode(&self, token: &str) -> Result<GreetingDocument, GreetcardError> {
        if token.len() > self.max_len {
            return Err(GreetcardError::PayloadTooLarge {
                len: token.len(),
                max: self.max_len,
            });
        }
        if token.is_empty() {
            return Err(GreetcardError::Decode("empty token".to_string()));
        }

        let json = match token.strip_prefix(COMPRESSED_PREFIX) {
            Some(body) => inflate(body)?,
            None => unescape(token)?,
        };

        serde_json::from_str(&json)
            .map_err(|e| GreetcardError::Decode(format!("not a greeting document: {}", e)))
    }
}

/// Escape a string the way `encodeURIComponent` does.
pub fn escape_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

fn unescape(token: &str) -> Result<String, GreetcardError> {
    let bytes = STANDARD
        .decode(token)
        .map_err(|e| GreetcardError::Decode(format!("invalid base64: {}", e)))?;
    let escaped = std::str::from_utf8(&bytes)
        .map_err(|_| GreetcardError::Decode("escaped payload is not ASCII".to_string()))?;
    percent_decode_str(escaped)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| GreetcardError::Decode("escaped payload is not valid UTF-8".to_string()))
}

fn inflate(body: &str) -> Result<String, GreetcardError> {
    let compressed = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| GreetcardError::Decode(format!("invalid base64url: {}", e)))?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| GreetcardError::Decode(format!("corrupt compressed token: {}", e)))?;
    if json.len() as u64 > MAX_INFLATED_BYTES {
        return Err(GreetcardError::Decode("compressed token expands too far".to_string()));
    }

    String::from_utf8(json)
        .map_err(|_| GreetcardError::Decode("compressed payload is not valid UTF-8".to_string()))
}
