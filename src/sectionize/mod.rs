//! Heading-driven sectionizing of flat HTML exports.
//!
//! The pipeline is normalize → scan headings → partition → fold into a
//! tree → extract footnotes per node → emit pre-order into an [`OutputSink`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cli::{FootnoteFormat, FootnoteScope};

mod emit;
mod footnotes;
mod headings;
mod normalize;
mod tree;

pub use emit::{EmitStats, OutputSink, emit_tree};
pub use headings::locate;
pub use normalize::Normalizer;
pub use tree::{SectionNode, SectionTree, Sectionizer};

use footnotes::*;
use headings::*;

/// A heading element name such as `h2`, compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeadingLevel(String);

impl HeadingLevel {
    pub fn new(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            bail!("heading level must not be empty");
        }
        if !tag.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            bail!("heading level must be a bare tag name: {tag}");
        }
        Ok(Self(tag.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn matches(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

impl FromStr for HeadingLevel {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
