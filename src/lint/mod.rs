//! Syntax validation of source text before and after fixing.
//!
//! The engine never writes content that fails to lint: input is checked
//! before any fixer runs, and output is checked again after fixing. The
//! bundled [`TokenLinter`] validates delimiter balance over the parsed
//! token stream; a real deployment can inject a full language linter behind
//! the same trait.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tokens::TokenStream;

/// Structured linting failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct LintingError {
    pub message: String,
}

impl LintingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Outcome of linting one source text, precomputed so the per-file
/// algorithm can gate on it without re-linting.
pub type LintingResult = Result<(), LintingError>;

/// Linter collaborator.
pub trait Linter: Send + Sync {
    fn lint_source(&self, source: &str) -> LintingResult;
}

/// Structural linter checking that `()`, `{}` and `[]` are balanced over
/// the parsed token stream. String literals are single tokens, so
/// delimiters inside them are ignored.
#[derive(Debug, Default, Clone)]
pub struct TokenLinter;

impl Linter for TokenLinter {
    fn lint_source(&self, source: &str) -> LintingResult {
        let stream = TokenStream::parse(source);
        let mut stack: Vec<&str> = Vec::new();

        for token in stream.iter() {
            match token.content() {
                open @ ("(" | "{" | "[") => stack.push(open),
                close @ (")" | "}" | "]") => {
                    let expected = match close {
                        ")" => "(",
                        "}" => "{",
                        _ => "[",
                    };
                    if stack.pop() != Some(expected) {
                        return Err(LintingError::new(format!(
                            "unexpected closing delimiter `{close}`"
                        )));
                    }
                }
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(LintingError::new(format!(
                "unclosed delimiter `{open}`"
            )));
        }

        Ok(())
    }
}
