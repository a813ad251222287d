//! Fixer contract and pipeline dispatch.
//!
//! A fixer is a single rewrite rule transforming a parsed token stream in
//! place. The pipeline distinguishes two tiers: trusted fixers, pre-filtered
//! by the pipeline owner and always invoked, and externally supplied fixers,
//! which have unknown cost and safety and are asked `supports` /
//! `is_candidate` before being handed a mutable stream. The tier is fixed
//! when the collection is built, not re-discovered per file.

pub mod name_validator;
pub mod no_empty_block;

pub use name_validator::FixerNameValidator;
pub use no_empty_block::NoEmptyBlockFixer;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::tokens::TokenStream;

/// Fault raised by a fixer.
#[derive(Debug, Error)]
pub enum FixError {
    /// Hard parse fault: the stream can no longer be interpreted. The whole
    /// file's change set is abandoned and reported as a lint error.
    #[error("parse fault: {0}")]
    Parse(String),
    /// Any other fault during fixing, reported as an exception error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single rewrite rule applied to a parsed token stream in place.
pub trait Fixer: Send + Sync {
    /// Rule identifier, used in applied-fixer lists and cache signatures.
    fn name(&self) -> &str;

    /// Apply the rule. Mutations go through the stream's API, which marks
    /// it changed.
    fn fix(&self, path: &Path, tokens: &mut TokenStream) -> Result<(), FixError>;

    /// Whether this fixer is willing to run on the given file at all.
    fn supports(&self, _path: &Path) -> bool {
        true
    }

    /// Cheap pre-check against the parsed stream before fixing.
    fn is_candidate(&self, _tokens: &TokenStream) -> bool {
        true
    }
}

/// Eligibility tier of a fixer in the pipeline.
#[derive(Clone)]
pub enum FixerEntry {
    /// Pre-filtered by the pipeline owner; capability checks are skipped.
    Trusted(Arc<dyn Fixer>),
    /// Externally supplied; asked `supports`/`is_candidate` per file.
    External(Arc<dyn Fixer>),
}

impl FixerEntry {
    pub fn trusted(fixer: impl Fixer + 'static) -> Self {
        Self::Trusted(Arc::new(fixer))
    }

    pub fn external(fixer: impl Fixer + 'static) -> Self {
        Self::External(Arc::new(fixer))
    }

    pub fn fixer(&self) -> &dyn Fixer {
        match self {
            Self::Trusted(fixer) | Self::External(fixer) => fixer.as_ref(),
        }
    }

    /// Whether capability queries gate this fixer's invocation.
    pub fn must_check(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl std::fmt::Debug for FixerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tier = if self.must_check() { "external" } else { "trusted" };
        write!(f, "FixerEntry({tier}: {})", self.fixer().name())
    }
}
