use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use hoi4_core::core_api::{BINARY_MAGIC, CoreErrorCode, Encoding, Engine};
use hoi4_core::{DiffStatus, TokenDictionary, Value};

const EQUALS: u16 = 0x0001;
const OPEN: u16 = 0x0003;
const CLOSE: u16 = 0x0004;
const PLAYER: u16 = 0x2c8f;
const DATE: u16 = 0x2c90;
const COUNTRIES: u16 = 0x2c91;
const POLITICAL_POWER: u16 = 0x2c92;
const IS_AI: u16 = 0x2c93;

fn dictionary() -> Arc<TokenDictionary> {
    Arc::new(TokenDictionary::from_pairs([
        (EQUALS, "="),
        (OPEN, "{"),
        (CLOSE, "}"),
        (PLAYER, "player"),
        (DATE, "date"),
        (COUNTRIES, "countries"),
        (POLITICAL_POWER, "political_power"),
        (IS_AI, "is_ai"),
    ]))
}

/// Builds a binary save body token by token.
struct BinarySave {
    bytes: Vec<u8>,
}

impl BinarySave {
    fn new() -> Self {
        Self {
            bytes: BINARY_MAGIC.to_vec(),
        }
    }

    fn sym(mut self, id: u16) -> Self {
        self.bytes.extend_from_slice(&id.to_le_bytes());
        self
    }

    fn i32(self, v: i32) -> Self {
        let mut s = self.sym(12);
        s.bytes.extend_from_slice(&v.to_le_bytes());
        s
    }

    fn fixed3(self, v: i32) -> Self {
        let mut s = self.sym(13);
        s.bytes.extend_from_slice(&v.to_le_bytes());
        s
    }

    fn boolean(self, v: bool) -> Self {
        let mut s = self.sym(14);
        s.bytes.push(u8::from(v));
        s
    }

    fn quoted(self, text: &str) -> Self {
        let mut s = self.sym(15);
        s.bytes.extend_from_slice(&(text.len() as u16).to_le_bytes());
        s.bytes.extend_from_slice(text.as_bytes());
        s
    }

    fn build(self) -> Vec<u8> {
        self.bytes
    }
}

fn sample_binary(power: i32) -> Vec<u8> {
    BinarySave::new()
        .sym(PLAYER)
        .sym(EQUALS)
        .quoted("ENG")
        .sym(DATE)
        .sym(EQUALS)
        .i32(60_759_371)
        .sym(COUNTRIES)
        .sym(EQUALS)
        .sym(OPEN)
        .quoted("ENG")
        .sym(EQUALS)
        .sym(OPEN)
        .sym(POLITICAL_POWER)
        .sym(EQUALS)
        .fixed3(power)
        .sym(IS_AI)
        .sym(EQUALS)
        .boolean(false)
        .sym(CLOSE)
        .sym(CLOSE)
        .build()
}

fn temp_output_path(prefix: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "hoi4_save_{prefix}_{}_{}.{}",
        std::process::id(),
        nanos,
        extension
    ))
}

#[test]
fn binary_save_decodes_dates_and_unquotes_keys() {
    let engine = Engine::with_tokens(dictionary());
    let save = engine
        .open_bytes(sample_binary(12_345))
        .expect("binary save should load");

    assert_eq!(save.encoding, Encoding::Binary);
    assert_eq!(
        save.filestring,
        "player = \"ENG\" date = \"1936.1.1.12\" countries = { ENG = { \
         political_power = 12.345 is_ai = no } }"
    );
    assert_eq!(
        save.document
            .get_path("countries -> ENG -> political_power")
            .and_then(Value::as_scalar),
        Some("12.345")
    );
    assert_eq!(
        save.document.get("date").and_then(Value::as_scalar),
        Some("1936.1.1.12")
    );
}

#[test]
fn unknown_symbols_stay_visible() {
    let engine = Engine::with_tokens(dictionary());
    let bytes = BinarySave::new()
        .sym(PLAYER)
        .sym(EQUALS)
        .sym(0x7777)
        .build();
    let save = engine.open_bytes(bytes).expect("binary save should load");

    assert_eq!(
        save.document.get("player").and_then(Value::as_scalar),
        Some("UNKNOWN_TOKEN_30583")
    );
    assert_eq!(save.summary().unknown_tokens, 1);
}

#[test]
fn truncated_binary_payload_is_fatal() {
    let engine = Engine::with_tokens(dictionary());
    let mut bytes = sample_binary(1_000);
    // Cut inside the payload of the trailing bool.
    bytes.truncate(bytes.len() - 5);

    let err = engine
        .open_bytes(&bytes)
        .expect_err("truncated payload must fail");
    assert_eq!(err.code, CoreErrorCode::Decode);
    assert!(err.message.contains("truncated"), "{}", err.message);
}

#[test]
fn text_and_unmarked_saves_parse_identically() {
    let engine = Engine::with_tokens(dictionary());
    let body = "player=\"ENG\"\ndate=\"1936.1.1.12\"\ncountries={\n\tENG={ ai=yes capital }\n}\n";

    let text = engine
        .open_bytes(format!("HOI4txt\n{body}"))
        .expect("text save should load");
    let unmarked = engine.open_bytes(body).expect("unmarked save should load");

    assert_eq!(text.encoding, Encoding::Text);
    assert_eq!(unmarked.encoding, Encoding::Unmarked);
    assert_eq!(text.document, unmarked.document);
    assert_eq!(
        text.document
            .get_path("countries.ENG.capital")
            .and_then(Value::as_scalar),
        Some("true")
    );
}

#[test]
fn invalid_dates_are_counted() {
    let engine = Engine::with_tokens(dictionary());
    let save = engine
        .open_bytes("HOI4txt\ndate = 999999999999 expire = 5")
        .expect("text save should load");

    let summary = save.summary();
    assert_eq!(summary.invalid_dates, 1);
    assert_eq!(summary.date.as_deref(), Some("INVALID_DATE_999999999999"));
    assert_eq!(
        save.document.get("expire").and_then(Value::as_scalar),
        Some("5")
    );
}

#[test]
fn compare_reports_binary_changes() {
    let engine = Engine::with_tokens(dictionary());
    let old = engine
        .open_bytes(sample_binary(10_000))
        .expect("old save should load");
    let new = engine
        .open_bytes(sample_binary(12_500))
        .expect("new save should load");

    let tree = engine.compare(&old, &new).expect("compare should succeed");
    let changed: Vec<(String, DiffStatus)> = tree
        .iter()
        .filter(|(_, n)| n.status != DiffStatus::Unchanged)
        .map(|(id, n)| (tree.path(id), n.status))
        .collect();

    assert_eq!(
        changed,
        vec![
            ("countries".to_string(), DiffStatus::Modified),
            ("countries -> ENG".to_string(), DiffStatus::Modified),
            (
                "countries -> ENG -> political_power".to_string(),
                DiffStatus::Modified
            ),
        ]
    );
    assert_eq!(tree.summary().changed(), 3);
}

#[test]
fn spawn_open_loads_on_a_worker_thread() {
    let path = temp_output_path("spawn_open", "hoi4");
    fs::write(&path, sample_binary(500)).expect("failed to write fixture");

    let engine = Engine::with_tokens(dictionary());
    let save = engine
        .spawn_open(&path)
        .join()
        .expect("worker thread panicked")
        .expect("save should load");
    assert_eq!(save.encoding, Encoding::Binary);
    assert_eq!(save.summary().player.as_deref(), Some("ENG"));

    let _ = fs::remove_file(&path);
}

#[test]
fn diffs_run_on_scoped_threads() {
    let engine = Engine::with_tokens(dictionary());
    let (old, new) = thread::scope(|scope| {
        let a = scope.spawn(|| engine.open_bytes(sample_binary(1)));
        let b = scope.spawn(|| engine.open_bytes(sample_binary(2)));
        (
            a.join().expect("worker panicked").expect("old save"),
            b.join().expect("worker panicked").expect("new save"),
        )
    });

    let summary = thread::scope(|scope| {
        scope
            .spawn(|| engine.compare(&old, &new).map(|tree| tree.summary()))
            .join()
            .expect("worker panicked")
    })
    .expect("compare should succeed");
    assert_eq!(summary.modified, 3);
}
