use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::binary::decode_to_filestring;
use crate::date::decorate;
use crate::diff::{DiffTree, diff};
use crate::parser::parse_document;
use crate::tokens::TokenDictionary;

use super::error::{CoreError, CoreErrorCode};
use super::types::{Encoding, LoadedSave, SaveSummary};

pub const MAGIC_LEN: usize = 7;
pub const BINARY_MAGIC: &[u8; MAGIC_LEN] = b"HOI4bin";
pub const TEXT_MAGIC: &[u8; MAGIC_LEN] = b"HOI4txt";

const MAGIC_PREFIX: &[u8] = b"HOI4";

/// Entry point for loading and comparing saves.
///
/// Cloning is cheap; the token dictionary is shared.
#[derive(Debug, Clone)]
pub struct Engine {
    tokens: Arc<TokenDictionary>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Uses the process-wide dictionary, or an empty one if none was installed.
    pub fn new() -> Self {
        Self {
            tokens: TokenDictionary::global(),
        }
    }

    pub fn with_tokens(tokens: Arc<TokenDictionary>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenDictionary {
        &self.tokens
    }

    pub fn detect_encoding(bytes: &[u8]) -> Result<Encoding, CoreError> {
        match bytes.get(..MAGIC_LEN) {
            Some(magic) if magic == BINARY_MAGIC => Ok(Encoding::Binary),
            Some(magic) if magic == TEXT_MAGIC => Ok(Encoding::Text),
            Some(magic) if magic.starts_with(MAGIC_PREFIX) => Err(CoreError::new(
                CoreErrorCode::UnknownEncoding,
                format!(
                    "unrecognized format marker {:?}",
                    String::from_utf8_lossy(magic)
                ),
            )),
            _ => Ok(Encoding::Unmarked),
        }
    }

    /// Decodes raw save bytes into the canonical filestring.
    pub fn canonical_filestring(&self, bytes: &[u8]) -> Result<(Encoding, String), CoreError> {
        let encoding = Self::detect_encoding(bytes)?;
        let raw = match encoding {
            Encoding::Binary => {
                if self.tokens.is_empty() {
                    tracing::warn!("no token dictionary loaded; symbols decode as UNKNOWN_TOKEN_*");
                }
                decode_to_filestring(&bytes[MAGIC_LEN..], MAGIC_LEN as u64, &self.tokens)?
            }
            Encoding::Text => std::str::from_utf8(&bytes[MAGIC_LEN..])
                .map_err(|e| {
                    CoreError::new(
                        CoreErrorCode::Decode,
                        format!("text save is not valid UTF-8: {e}"),
                    )
                })?
                .to_string(),
            Encoding::Unmarked => std::str::from_utf8(bytes)
                .map_err(|e| {
                    CoreError::new(
                        CoreErrorCode::UnknownEncoding,
                        format!("input has no format marker and is not UTF-8 text: {e}"),
                    )
                })?
                .to_string(),
        };
        Ok((encoding, decorate(&raw)))
    }

    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<LoadedSave, CoreError> {
        let bytes = bytes.as_ref();
        let _span = tracing::debug_span!("open", bytes = bytes.len()).entered();

        let (encoding, filestring) = self.canonical_filestring(bytes)?;
        let document = parse_document(&filestring);
        tracing::debug!(
            encoding = encoding.as_str(),
            entries = document.item_count().unwrap_or(0),
            "parsed save document"
        );

        Ok(LoadedSave {
            encoding,
            filestring,
            document,
        })
    }

    pub fn open_path(&self, path: &Path) -> Result<LoadedSave, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        self.open_bytes(bytes)
    }

    /// Loads `path` on a background thread. The handle yields the same result
    /// [`Engine::open_path`] would.
    pub fn spawn_open(&self, path: impl Into<PathBuf>) -> JoinHandle<Result<LoadedSave, CoreError>> {
        let engine = self.clone();
        let path = path.into();
        thread::spawn(move || engine.open_path(&path))
    }

    /// Diffs `old` against `new`.
    pub fn compare<'a>(
        &self,
        old: &'a LoadedSave,
        new: &'a LoadedSave,
    ) -> Result<DiffTree<'a>, CoreError> {
        let _span = tracing::debug_span!("compare").entered();
        diff(&old.document, &new.document)
    }
}

impl LoadedSave {
    pub fn summary(&self) -> SaveSummary {
        let top_level_scalar = |key: &str| {
            self.document
                .get(key)
                .and_then(|v| v.as_scalar())
                .map(str::to_string)
        };
        SaveSummary {
            encoding: self.encoding,
            filestring_bytes: self.filestring.len(),
            top_level_entries: self.document.item_count().unwrap_or(0),
            unknown_tokens: self.filestring.matches("UNKNOWN_TOKEN_").count(),
            invalid_dates: self.filestring.matches("INVALID_DATE_").count(),
            date: top_level_scalar("date"),
            player: top_level_scalar("player"),
        }
    }
}
