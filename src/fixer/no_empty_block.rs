//! Removal of empty control-structure bodies.
//!
//! `if ($foo) {}` contributes nothing and is removed — but only when the
//! condition is side-effect-free. A condition containing calls, property or
//! array access, operators, or anything else that could observably execute
//! is left alone: `if (foo()) {}` still runs `foo()`.

use std::path::Path;

use super::{FixError, Fixer};
use crate::tokens::TokenStream;

const BLOCK_KEYWORDS: &[&str] = &["if", "elseif", "while", "for", "foreach", "switch"];
const CHAIN_KEYWORDS: &[&str] = &["else", "elseif", "catch", "finally"];

/// Removes control structures whose body is an empty block.
#[derive(Debug, Default, Clone)]
pub struct NoEmptyBlockFixer;

impl NoEmptyBlockFixer {
    pub fn new() -> Self {
        Self
    }
}

impl Fixer for NoEmptyBlockFixer {
    fn name(&self) -> &str {
        "no_empty_block"
    }

    fn is_candidate(&self, tokens: &TokenStream) -> bool {
        tokens.iter().any(|token| token.content() == "{")
    }

    fn fix(&self, _path: &Path, tokens: &mut TokenStream) -> Result<(), FixError> {
        let mut index = 0;
        while index < tokens.len() {
            if content(tokens, index) == "{" {
                if let Some(close) = empty_block_close(tokens, index) {
                    try_remove_construct(tokens, index, close);
                    index = close;
                }
            }
            index += 1;
        }
        Ok(())
    }
}

fn content(tokens: &TokenStream, index: usize) -> &str {
    tokens.get(index).map(|t| t.content()).unwrap_or("")
}

/// Index of the `}` closing an empty block opened at `open`, if the block
/// is empty.
fn empty_block_close(tokens: &TokenStream, open: usize) -> Option<usize> {
    let close = next_meaningful(tokens, open)?;
    (content(tokens, close) == "}").then_some(close)
}

fn next_meaningful(tokens: &TokenStream, from: usize) -> Option<usize> {
    ((from + 1)..tokens.len())
        .find(|&i| tokens.get(i).is_some_and(|t| !t.is_placeholder() && !t.is_whitespace()))
}

fn prev_meaningful(tokens: &TokenStream, from: usize) -> Option<usize> {
    (0..from)
        .rev()
        .find(|&i| tokens.get(i).is_some_and(|t| !t.is_placeholder() && !t.is_whitespace()))
}

fn try_remove_construct(tokens: &mut TokenStream, open: usize, close: usize) {
    let Some(before) = prev_meaningful(tokens, open) else {
        return;
    };

    if content(tokens, before) == ")" {
        remove_keyword_construct(tokens, before, close);
    } else if tokens.get(before).is_some_and(|t| t.equals_ignore_case("do")) {
        remove_do_while(tokens, before, close);
    }
}

/// Handle `keyword (condition) {}`.
fn remove_keyword_construct(tokens: &mut TokenStream, close_paren: usize, close_brace: usize) {
    let Some(open_paren) = matching_open_paren(tokens, close_paren) else {
        return;
    };
    let Some(keyword) = prev_meaningful(tokens, open_paren) else {
        return;
    };
    let is_block_keyword = BLOCK_KEYWORDS
        .iter()
        .any(|k| tokens.get(keyword).is_some_and(|t| t.equals_ignore_case(k)));
    if !is_block_keyword {
        return;
    }

    // removing the construct must not orphan a following chain member
    if let Some(after) = next_meaningful(tokens, close_brace) {
        let chained = CHAIN_KEYWORDS
            .iter()
            .any(|k| tokens.get(after).is_some_and(|t| t.equals_ignore_case(k)));
        if chained {
            return;
        }
    }

    if !condition_is_pure(tokens, open_paren, close_paren) {
        return;
    }

    tokens.erase_range(keyword, close_brace);
}

/// Handle `do {} while (condition);`.
fn remove_do_while(tokens: &mut TokenStream, do_keyword: usize, close_brace: usize) {
    let Some(while_keyword) = next_meaningful(tokens, close_brace) else {
        return;
    };
    if !tokens
        .get(while_keyword)
        .is_some_and(|t| t.equals_ignore_case("while"))
    {
        return;
    }
    let Some(open_paren) = next_meaningful(tokens, while_keyword) else {
        return;
    };
    if content(tokens, open_paren) != "(" {
        return;
    }
    let Some(close_paren) = matching_close_paren(tokens, open_paren) else {
        return;
    };
    let Some(semicolon) = next_meaningful(tokens, close_paren) else {
        return;
    };
    if content(tokens, semicolon) != ";" {
        return;
    }

    if !condition_is_pure(tokens, open_paren, close_paren) {
        return;
    }

    tokens.erase_range(do_keyword, semicolon);
}

fn matching_open_paren(tokens: &TokenStream, close: usize) -> Option<usize> {
    let mut depth = 1usize;
    for index in (0..close).rev() {
        match content(tokens, index) {
            ")" => depth += 1,
            "(" => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn matching_close_paren(tokens: &TokenStream, open: usize) -> Option<usize> {
    let mut depth = 1usize;
    for index in (open + 1)..tokens.len() {
        match content(tokens, index) {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// A condition is side-effect-free when every meaningful token between the
/// parentheses is a plain variable, a scalar literal, or a bare boolean /
/// null keyword. Anything else (calls, member access, operators, array
/// offsets) may observably execute and keeps the construct alive.
fn condition_is_pure(tokens: &TokenStream, open_paren: usize, close_paren: usize) -> bool {
    ((open_paren + 1)..close_paren).all(|index| {
        let Some(token) = tokens.get(index) else {
            return true;
        };
        if token.is_placeholder() || token.is_whitespace() {
            return true;
        }
        let text = token.content();
        text.starts_with('$')
            || text.starts_with('"')
            || text.starts_with('\'')
            || text.chars().next().is_some_and(|c| c.is_ascii_digit())
            || ["true", "false", "null"].iter().any(|k| token.equals_ignore_case(k))
    })
}
