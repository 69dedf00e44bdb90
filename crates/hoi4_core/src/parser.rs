use std::collections::VecDeque;

use crate::lexer::{LexToken, Lexer};
use crate::value::{Value, ValueMap, strip_quotes};

/// Value recorded for a key that has no `= value` after it.
pub const FLAG_VALUE: &str = "true";

const LOOKAHEAD: usize = 2;

/// Forward-only cursor shared by every nested block parse, with a two-token
/// lookahead buffer so block disambiguation never consumes input.
pub struct TokenCursor<'a> {
    lexer: Lexer<'a>,
    buffered: VecDeque<LexToken<'a>>,
}

impl<'a> TokenCursor<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            buffered: VecDeque::with_capacity(LOOKAHEAD),
        }
    }

    pub fn next_token(&mut self) -> Option<LexToken<'a>> {
        self.buffered.pop_front().or_else(|| self.lexer.next())
    }

    /// Looks `n` tokens ahead (`n < 2`) without consuming anything.
    pub fn peek(&mut self, n: usize) -> Option<LexToken<'a>> {
        debug_assert!(n < LOOKAHEAD);
        while self.buffered.len() <= n {
            let token = self.lexer.next()?;
            self.buffered.push_back(token);
        }
        self.buffered.get(n).copied()
    }
}

/// Parses a whole filestring. The root is an implicit block without braces,
/// so an ordinary save yields a [`Value::Map`].
pub fn parse_document(filestring: &str) -> Value {
    let mut cursor = TokenCursor::new(Lexer::new(filestring));
    parse_block(&mut cursor)
}

/// Parses one block from a cursor positioned just inside it and consumes
/// through its closing brace. A stream that ends early closes the block.
pub fn parse_block(cursor: &mut TokenCursor<'_>) -> Value {
    match cursor.peek(0) {
        None => return Value::Map(ValueMap::new()),
        Some(LexToken::Close) => {
            cursor.next_token();
            return Value::Map(ValueMap::new());
        }
        Some(_) => {}
    }

    match cursor.peek(1) {
        // With a single token left there is nothing to tell a list from a
        // dict, so it is read as a one-item list.
        None => {
            let only = cursor.next_token().map_or("", |t| t.as_str());
            Value::List(vec![Value::scalar(strip_quotes(only))])
        }
        Some(LexToken::Equals) => Value::Map(parse_dict(cursor)),
        Some(_) => Value::List(parse_list(cursor)),
    }
}

fn parse_list(cursor: &mut TokenCursor<'_>) -> Vec<Value> {
    let mut items = Vec::new();
    while let Some(token) = cursor.next_token() {
        match token {
            LexToken::Open => items.push(parse_block(cursor)),
            LexToken::Close => break,
            other => items.push(Value::scalar(strip_quotes(other.as_str()))),
        }
    }
    items
}

fn parse_dict(cursor: &mut TokenCursor<'_>) -> ValueMap {
    let mut map = ValueMap::new();

    'entries: loop {
        let mut key = match cursor.next_token() {
            None | Some(LexToken::Close) => break,
            Some(token) => token,
        };

        // Keys not followed by `=` are flags; the unexpected token is the
        // next key.
        loop {
            match cursor.next_token() {
                None => break 'entries,
                Some(LexToken::Equals) => break,
                Some(LexToken::Close) => {
                    insert(&mut map, key, Value::scalar(FLAG_VALUE));
                    break 'entries;
                }
                Some(next) => {
                    insert(&mut map, key, Value::scalar(FLAG_VALUE));
                    key = next;
                }
            }
        }

        match cursor.next_token() {
            None | Some(LexToken::Close) => break,
            Some(LexToken::Open) => {
                let value = parse_block(cursor);
                insert(&mut map, key, value);
            }
            Some(token) => insert(&mut map, key, Value::scalar(strip_quotes(token.as_str()))),
        }
    }

    map
}

fn insert(map: &mut ValueMap, key: LexToken<'_>, value: Value) {
    map.insert(strip_quotes(key.as_str()).to_string(), value);
}
