//! Decoding, parsing and structural diffing of Hearts of Iron IV save files.
//!
//! A save is loaded through [`Engine`]: binary saves are decoded to text with
//! the [`TokenDictionary`], dates are rewritten, and the canonical text is
//! parsed into a [`Value`] document. Two documents are compared with
//! [`diff`].

pub mod binary;
pub mod core_api;
pub mod date;
pub mod diff;
pub mod lexer;
pub mod parser;
pub mod reader;
pub mod tokens;
pub mod tree;
pub mod value;

pub use core_api::{CoreError, CoreErrorCode, Encoding, Engine, LoadedSave, SaveSummary};
pub use diff::{DiffNode, DiffStatus, DiffSummary, DiffTree, NodeId, diff};
pub use tokens::TokenDictionary;
pub use tree::{AnyTree, DisplayTree, DocumentTree, filter, search_pattern};
pub use value::{Value, ValueMap};
