//! Parsed token representation of one file's source.
//!
//! A [`TokenStream`] is the mutable in-memory form fixers operate on. The
//! lexer is lossless: `render` reproduces the input byte for byte, so the
//! content hash of an untouched stream equals the hash of the raw file
//! content and the skip cache can compare the two directly.
//!
//! A stream lives for exactly one file's processing and is dropped when the
//! per-file algorithm returns.

use sha2::{Digest, Sha256};

/// Stable content hash over source text (hex-encoded SHA-256).
pub fn code_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One lexical unit.
///
/// A token with empty content is a placeholder left behind by a fixer;
/// placeholders render as nothing and are dropped by
/// [`TokenStream::compact`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    content: String,
}

impl Token {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_placeholder(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_whitespace(&self) -> bool {
        !self.content.is_empty() && self.content.chars().all(char::is_whitespace)
    }

    /// Case-insensitive comparison, for keyword matching.
    pub fn equals_ignore_case(&self, other: &str) -> bool {
        self.content.eq_ignore_ascii_case(other)
    }
}

/// The parsed, mutable representation of one file's source.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    changed: bool,
}

impl TokenStream {
    /// Parse source text into a stream. Pure: equal input yields an equal
    /// stream, and no state outlives the returned value.
    pub fn parse(source: &str) -> Self {
        Self { tokens: lex(source), changed: false }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    /// Replace the content of the token at `index`, marking the stream
    /// changed. Out-of-range indexes are ignored.
    pub fn overwrite(&mut self, index: usize, content: impl Into<String>) {
        if let Some(token) = self.tokens.get_mut(index) {
            token.content = content.into();
            self.changed = true;
        }
    }

    /// Turn the token at `index` into a placeholder, marking the stream
    /// changed.
    pub fn erase(&mut self, index: usize) {
        self.overwrite(index, "");
    }

    /// Erase every token in `start..=end`.
    pub fn erase_range(&mut self, start: usize, end: usize) {
        for index in start..=end.min(self.tokens.len().saturating_sub(1)) {
            self.erase(index);
        }
    }

    /// Whether any mutation happened since the last [`clear_changed`].
    ///
    /// Note this flags mutation, not semantic change: two fixers reverting
    /// each other both set it. The authoritative change signal is the
    /// content hash.
    ///
    /// [`clear_changed`]: TokenStream::clear_changed
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    /// Drop placeholder tokens so the next fixer sees a compacted stream.
    pub fn compact(&mut self) {
        self.tokens.retain(|token| !token.is_placeholder());
    }

    /// Regenerate source text from the current tokens.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            out.push_str(&token.content);
        }
        out
    }

    /// Content hash of the rendered code. Stable for equal semantic content:
    /// placeholders render as nothing, so an erased-then-compacted stream
    /// and a freshly parsed one hash identically.
    pub fn content_hash(&self) -> String {
        code_hash(&self.render())
    }
}

fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        let end = if c == '"' || c == '\'' {
            lex_string(source, &mut chars, c)
        } else if c.is_whitespace() {
            lex_run(source, &mut chars, |c| c.is_whitespace())
        } else if is_word_char(c) {
            lex_run(source, &mut chars, is_word_char)
        } else {
            chars.next();
            start + c.len_utf8()
        };
        tokens.push(Token::new(&source[start..end]));
    }

    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn lex_run(
    source: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    accept: fn(char) -> bool,
) -> usize {
    let mut end = source.len();
    while let Some(&(index, c)) = chars.peek() {
        if accept(c) {
            chars.next();
            end = index + c.len_utf8();
        } else {
            return index;
        }
    }
    end
}

/// A quoted literal becomes a single token so delimiters inside strings do
/// not confuse fixers or the linter. An unterminated literal runs to the end
/// of input; whether that is acceptable is the linter's call, not the
/// lexer's.
fn lex_string(
    source: &str,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
) -> usize {
    chars.next();
    let mut escaped = false;
    while let Some((index, c)) = chars.next() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return index + c.len_utf8();
        }
    }
    source.len()
}
