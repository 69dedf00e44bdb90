use std::fmt::{self, Write as _};
use std::io::{self, Read};

use crate::reader::LittleEndianReader;
use crate::tokens::TokenDictionary;

pub const TOKEN_I32: u16 = 12;
pub const TOKEN_FIXED3: u16 = 13;
pub const TOKEN_BOOL_OR_STRING: u16 = 14;
pub const TOKEN_QUOTED: u16 = 15;
pub const TOKEN_U32: u16 = 20;
pub const TOKEN_UNQUOTED: u16 = 23;
pub const TOKEN_I64: u16 = 359;
pub const TOKEN_U64: u16 = 668;

/// One decoded unit of the binary gamestate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryToken<'d> {
    I32(i32),
    /// Fixed point value scaled by 1000.
    Fixed3(i32),
    Bool(bool),
    Unquoted(String),
    Quoted(String),
    U32(u32),
    UnquotedAlt(String),
    I64(i64),
    U64(u64),
    Symbol(&'d str),
    Unknown(u16),
}

impl fmt::Display for BinaryToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}"),
            Self::Fixed3(v) => {
                let sign = if *v < 0 { "-" } else { "" };
                let abs = v.unsigned_abs();
                write!(f, "{sign}{}.{:03}", abs / 1000, abs % 1000)
            }
            Self::Bool(true) => f.write_str("yes"),
            Self::Bool(false) => f.write_str("no"),
            Self::Unquoted(s) | Self::UnquotedAlt(s) => f.write_str(s),
            Self::Quoted(s) => write!(f, "\"{s}\""),
            Self::U32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Symbol(name) => f.write_str(name),
            Self::Unknown(id) => write!(f, "UNKNOWN_TOKEN_{id}"),
        }
    }
}

#[derive(Debug)]
pub enum DecodeError {
    /// The stream ended inside a token payload.
    Truncated {
        offset: u64,
        token: u16,
        field: &'static str,
    },
    InvalidUtf8 {
        offset: u64,
        token: u16,
    },
    Io(io::Error),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                offset,
                token,
                field,
            } => write!(
                f,
                "stream truncated at byte {offset} while reading {field} of token {token}"
            ),
            Self::InvalidUtf8 { offset, token } => {
                write!(f, "invalid UTF-8 string payload at byte {offset} in token {token}")
            }
            Self::Io(e) => write!(f, "read failed: {e}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Lazy token stream over a binary gamestate positioned after its header.
///
/// Yields `Err` at most once; the iterator is fused after a failure because
/// byte alignment is lost for everything that follows.
pub struct BinaryTokens<'d, R> {
    reader: LittleEndianReader<R>,
    tokens: &'d TokenDictionary,
    failed: bool,
}

impl<'d, R: Read> BinaryTokens<'d, R> {
    pub fn new(reader: LittleEndianReader<R>, tokens: &'d TokenDictionary) -> Self {
        Self {
            reader,
            tokens,
            failed: false,
        }
    }

    fn next_token(&mut self) -> Result<Option<BinaryToken<'d>>, DecodeError> {
        let Some(id) = self.reader.try_read_u16().map_err(DecodeError::Io)? else {
            return Ok(None);
        };

        let tokens: &'d TokenDictionary = self.tokens;
        let token = match id {
            TOKEN_I32 => BinaryToken::I32(self.field(id, "i32", |r| r.read_i32())?),
            TOKEN_FIXED3 => BinaryToken::Fixed3(self.field(id, "fixed point", |r| r.read_i32())?),
            TOKEN_BOOL_OR_STRING => {
                let first = self.field(id, "bool", |r| r.read_u8())?;
                match first {
                    0 => BinaryToken::Bool(false),
                    1 => BinaryToken::Bool(true),
                    low => {
                        let high = self.field(id, "string length", |r| r.read_u8())?;
                        let len = u16::from_le_bytes([low, high]);
                        BinaryToken::Unquoted(self.string(id, len)?)
                    }
                }
            }
            TOKEN_QUOTED => {
                let len = self.field(id, "string length", |r| r.read_u16())?;
                BinaryToken::Quoted(self.string(id, len)?)
            }
            TOKEN_U32 => BinaryToken::U32(self.field(id, "u32", |r| r.read_u32())?),
            TOKEN_UNQUOTED => {
                let len = self.field(id, "string length", |r| r.read_u16())?;
                BinaryToken::UnquotedAlt(self.string(id, len)?)
            }
            TOKEN_I64 => BinaryToken::I64(self.field(id, "i64", |r| r.read_i64())?),
            TOKEN_U64 => BinaryToken::U64(self.field(id, "u64", |r| r.read_u64())?),
            other => match tokens.get(other) {
                Some(name) => BinaryToken::Symbol(name),
                None => BinaryToken::Unknown(other),
            },
        };
        Ok(Some(token))
    }

    fn field<T>(
        &mut self,
        token: u16,
        field: &'static str,
        read: impl FnOnce(&mut LittleEndianReader<R>) -> io::Result<T>,
    ) -> Result<T, DecodeError> {
        let offset = self.reader.position();
        read(&mut self.reader).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => DecodeError::Truncated {
                offset,
                token,
                field,
            },
            _ => DecodeError::Io(e),
        })
    }

    fn string(&mut self, token: u16, len: u16) -> Result<String, DecodeError> {
        let offset = self.reader.position();
        let bytes = self.field(token, "string payload", |r| r.read_bytes(len as usize))?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset, token })
    }
}

impl<'d, R: Read> Iterator for BinaryTokens<'d, R> {
    type Item = Result<BinaryToken<'d>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Decodes a whole binary gamestate into the raw, space-separated filestring.
///
/// `header_len` is only used to report absolute byte offsets in errors.
pub fn decode_to_filestring<R: Read>(
    reader: R,
    header_len: u64,
    tokens: &TokenDictionary,
) -> Result<String, DecodeError> {
    let stream = BinaryTokens::new(LittleEndianReader::with_offset(reader, header_len), tokens);
    let mut out = String::new();
    let mut count = 0usize;
    let mut unknown = 0usize;

    for token in stream {
        let token = token?;
        if matches!(token, BinaryToken::Unknown(_)) {
            unknown += 1;
        }
        if count > 0 {
            out.push(' ');
        }
        write!(out, "{token}").expect("writing to String cannot fail");
        count += 1;
    }

    tracing::debug!(tokens = count, unknown, bytes = out.len(), "decoded binary gamestate");
    Ok(out)
}
