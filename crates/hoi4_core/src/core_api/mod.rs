mod engine;
mod error;
mod types;

pub use engine::{BINARY_MAGIC, Engine, MAGIC_LEN, TEXT_MAGIC};
pub use error::{CoreError, CoreErrorCode};
pub use types::{Encoding, LoadedSave, SaveSummary};
