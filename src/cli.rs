use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::sectionize::HeadingLevel;

#[derive(Parser, Debug)]
#[command(
    name = "wp2epub",
    version,
    about = "Convert a flat blog HTML export into a sectioned EPUB"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Convert(ConvertArgs),
    Outline(OutlineArgs),
}

/// Options shared by every command that sectionizes an input document.
#[derive(Args, Debug, Clone)]
pub struct SectionArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Heading tags, outermost first.
    #[arg(
        long = "levels",
        value_delimiter = ',',
        default_values = ["h2", "h3", "h4", "h5", "h6"]
    )]
    pub levels: Vec<HeadingLevel>,

    /// Remove `<br>` elements instead of keeping them.
    #[arg(long, alias = "br", default_value_t = false)]
    pub strip_line_breaks: bool,

    #[arg(long, value_enum, default_value_t = FootnoteFormat::InlineAside)]
    pub footnote_format: FootnoteFormat,

    #[arg(long, value_enum, default_value_t = FootnoteScope::Document)]
    pub footnote_scope: FootnoteScope,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub section: SectionArgs,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub author: String,

    #[arg(long, default_value = "en")]
    pub language: String,

    /// Replaces the built-in stylesheet.
    #[arg(long)]
    pub stylesheet: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OutlineArgs {
    #[command(flatten)]
    pub section: SectionArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Where the body of an extracted footnote ends up.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FootnoteFormat {
    /// `<aside>` placed right after its reference.
    InlineAside,
    /// Reference points into a dedicated notes document per section.
    SeparateCollection,
}

impl FootnoteFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InlineAside => "inline-aside",
            Self::SeparateCollection => "separate-collection",
        }
    }
}

/// Span over which footnote numbers stay contiguous.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FootnoteScope {
    Document,
    /// Numbering restarts at 1 for every top-level section.
    Section,
}

impl FootnoteScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Section => "section",
        }
    }
}
