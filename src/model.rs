use serde::Serialize;

use crate::cli::{FootnoteFormat, FootnoteScope};
use crate::sectionize::HeadingLevel;

#[derive(Debug, Clone, Serialize)]
pub struct ConvertPaths {
    pub input_path: String,
    pub output_path: String,
    pub stylesheet_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertOptions {
    pub heading_levels: Vec<HeadingLevel>,
    pub strip_line_breaks: bool,
    pub footnote_format: FootnoteFormat,
    pub footnote_scope: FootnoteScope,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertCounts {
    pub source_bytes: usize,
    pub normalized_bytes: usize,
    pub preamble_bytes: usize,
    pub top_level_sections: usize,
    pub sections_emitted: usize,
    pub footnotes_extracted: usize,
    pub footnote_collections: usize,
    pub documents_packaged: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConvertRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub dry_run: bool,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub engine_version: String,
    pub source_sha256: String,
    pub paths: ConvertPaths,
    pub options: ConvertOptions,
    pub counts: ConvertCounts,
    pub warnings: Vec<String>,
}

/// One line of `outline --json`.
#[derive(Debug, Clone, Serialize)]
pub struct OutlineEntry {
    pub depth: usize,
    pub level: HeadingLevel,
    pub title: String,
    pub file_name: String,
    pub heading_start: usize,
    pub own_bytes: usize,
    pub subtree_bytes: usize,
    pub footnotes: Vec<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlineReport {
    pub input_path: String,
    pub source_sha256: String,
    pub options: ConvertOptions,
    pub level_counts: Vec<LevelCount>,
    pub preamble_bytes: usize,
    pub sections: Vec<OutlineEntry>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelCount {
    pub level: HeadingLevel,
    pub count: usize,
}
