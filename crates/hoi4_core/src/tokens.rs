use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::core_api::{CoreError, CoreErrorCode};

static GLOBAL_TOKENS: OnceLock<Arc<TokenDictionary>> = OnceLock::new();

/// Read-only mapping from binary token ids to their canonical symbol names.
///
/// The table ships as a data asset next to the game install, one
/// `<id> <symbol>` pair per line. Ids may be decimal or `0x`-prefixed hex and
/// `#` starts a comment. Lines that do not parse are skipped; the first
/// definition of an id wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDictionary {
    source: Option<PathBuf>,
    entries: HashMap<u16, String>,
}

impl TokenDictionary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let entries = parse_token_entries(&String::from_utf8_lossy(&bytes));
        if entries.is_empty() {
            return Err(CoreError::new(
                CoreErrorCode::TokenDictionary,
                format!("no token definitions could be parsed from {}", path.display()),
            ));
        }

        tracing::debug!(path = %path.display(), count = entries.len(), "loaded token dictionary");
        Ok(Self {
            source: Some(path.to_path_buf()),
            entries,
        })
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            source: None,
            entries: parse_token_entries(text),
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<String>,
    {
        let mut entries = HashMap::new();
        for (id, name) in pairs {
            entries.entry(id).or_insert_with(|| name.into());
        }
        Self {
            source: None,
            entries,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn get(&self, id: u16) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installs the process-wide dictionary. Succeeds once; later calls fail
    /// because the table is never replaced after startup.
    pub fn install_global(self) -> Result<(), CoreError> {
        GLOBAL_TOKENS.set(Arc::new(self)).map_err(|_| {
            CoreError::new(
                CoreErrorCode::TokenDictionary,
                "token dictionary is already installed for this process",
            )
        })
    }

    /// Returns the process-wide dictionary, or an empty one if none was
    /// installed (every symbol then decodes as `UNKNOWN_TOKEN_<id>`).
    pub fn global() -> Arc<TokenDictionary> {
        GLOBAL_TOKENS
            .get()
            .cloned()
            .unwrap_or_else(|| Arc::new(TokenDictionary::empty()))
    }
}

fn parse_token_entries(text: &str) -> HashMap<u16, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut parts = line.split_whitespace();
        let (Some(id), Some(name)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Some(id) = parse_token_id(id) else {
            continue;
        };
        out.entry(id).or_insert_with(|| name.to_string());
    }
    out
}

fn parse_token_id(raw: &str) -> Option<u16> {
    match raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}
