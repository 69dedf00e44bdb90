/// A lexical token of the block syntax, borrowing from the filestring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexToken<'a> {
    /// A double-quoted run, quotes included.
    Quoted(&'a str),
    Open,
    Close,
    Equals,
    Bare(&'a str),
}

impl<'a> LexToken<'a> {
    pub fn as_str(&self) -> &'a str {
        match *self {
            Self::Quoted(s) | Self::Bare(s) => s,
            Self::Open => "{",
            Self::Close => "}",
            Self::Equals => "=",
        }
    }
}

/// Lazy tokenizer over a filestring. Lexing is pure, so a fresh
/// [`Lexer::new`] over the same text yields the same tokens again.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Length of the quoted run starting at the current position, if it is
    /// terminated.
    fn quoted_len(&self) -> Option<usize> {
        let bytes = self.src[self.pos..].as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => return Some(i + 1),
                _ => i += 1,
            }
        }
        None
    }

    /// Length of the bare run at the current position, scanning from `skip`
    /// bytes in.
    fn bare_len(&self, skip: usize) -> usize {
        let rest = &self.src[self.pos + skip..];
        skip + rest
            .char_indices()
            .find(|&(_, c)| c.is_whitespace() || is_structural(c))
            .map_or(rest.len(), |(idx, _)| idx)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let first = *self.src.as_bytes().get(self.pos)?;

        let token = match first {
            b'"' => match self.quoted_len() {
                Some(len) => {
                    let text = &self.src[self.pos..self.pos + len];
                    self.pos += len;
                    return Some(LexToken::Quoted(text));
                }
                None => None,
            },
            b'{' => Some(LexToken::Open),
            b'}' => Some(LexToken::Close),
            b'=' => Some(LexToken::Equals),
            _ => None,
        };
        if let Some(token) = token {
            self.pos += 1;
            return Some(token);
        }

        // An unterminated quote lexes as an ordinary bare run; the leading
        // quote itself is never structural so the run is at least one byte.
        let len = self.bare_len(usize::from(first == b'"'));
        let text = &self.src[self.pos..self.pos + len];
        self.pos += len;
        Some(LexToken::Bare(text))
    }
}

fn is_structural(c: char) -> bool {
    matches!(c, '{' | '}' | '=')
}

/// Lexes a whole filestring. Mostly useful for tests and diagnostics; the
/// parser consumes the lazy [`Lexer`] directly.
pub fn tokenize(src: &str) -> Vec<LexToken<'_>> {
    Lexer::new(src).collect()
}

#[cfg(test)]
mod tests {
    use super::{LexToken, Lexer, tokenize};

    #[test]
    fn quoted_strings_keep_their_quotes() {
        assert_eq!(
            tokenize(r#"outlook = "Allied Victory""#),
            vec![
                LexToken::Bare("outlook"),
                LexToken::Equals,
                LexToken::Quoted("\"Allied Victory\""),
            ]
        );
    }

    #[test]
    fn structural_characters_split_bare_runs() {
        assert_eq!(
            tokenize("a=1 b={x}"),
            vec![
                LexToken::Bare("a"),
                LexToken::Equals,
                LexToken::Bare("1"),
                LexToken::Bare("b"),
                LexToken::Equals,
                LexToken::Open,
                LexToken::Bare("x"),
                LexToken::Close,
            ]
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_the_string() {
        assert_eq!(
            tokenize(r#"name="say \"hi\"" next"#),
            vec![
                LexToken::Bare("name"),
                LexToken::Equals,
                LexToken::Quoted(r#""say \"hi\"""#),
                LexToken::Bare("next"),
            ]
        );
    }

    #[test]
    fn unterminated_quote_falls_back_to_bare_run() {
        assert_eq!(
            tokenize("a = \"broken value"),
            vec![
                LexToken::Bare("a"),
                LexToken::Equals,
                LexToken::Bare("\"broken"),
                LexToken::Bare("value"),
            ]
        );
    }

    #[test]
    fn multibyte_text_and_mixed_whitespace() {
        assert_eq!(
            tokenize("\tname=Zürich\r\n\u{3000}x"),
            vec![
                LexToken::Bare("name"),
                LexToken::Equals,
                LexToken::Bare("Zürich"),
                LexToken::Bare("x"),
            ]
        );
    }

    #[test]
    fn relexing_is_repeatable() {
        let src = "a = { 1 2 }";
        let first: Vec<_> = Lexer::new(src).collect();
        let second: Vec<_> = Lexer::new(src).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \n\t ").is_empty());
    }
}
