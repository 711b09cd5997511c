pub mod convert;
pub mod outline;

use anyhow::Result;
use tracing::info;

use crate::cli::SectionArgs;
use crate::model::ConvertOptions;
use crate::sectionize::{Normalizer, SectionTree, Sectionizer};
use crate::util::{SourceText, read_source_text};

/// Source file carried through normalization and sectionizing.
pub struct PreparedSource {
    pub source: SourceText,
    pub normalized: String,
    pub sectionizer: Sectionizer,
    pub tree: SectionTree,
}

pub fn prepare_source(args: &SectionArgs) -> Result<PreparedSource> {
    let source = read_source_text(&args.input)?;
    info!(
        input = %args.input.display(),
        bytes = source.byte_count,
        sha256 = %source.sha256,
        "read source document"
    );

    let (normalized, sectionizer, tree) = sectionize_text(args, &source.text)?;

    Ok(PreparedSource {
        source,
        normalized,
        sectionizer,
        tree,
    })
}

pub fn sectionize_text(
    args: &SectionArgs,
    text: &str,
) -> Result<(String, Sectionizer, SectionTree)> {
    let normalizer = Normalizer::new()?;
    let normalized = normalizer.normalize(text, args.strip_line_breaks);

    let sectionizer = Sectionizer::new(
        args.levels.clone(),
        args.footnote_format,
        args.footnote_scope,
    )?;
    let tree = sectionizer.sectionize(&normalized);
    info!(
        sections = tree.node_count(),
        top_level = tree.sections.len(),
        footnotes = tree.footnote_count(),
        warnings = tree.warnings.len(),
        "sectionized source document"
    );

    Ok((normalized, sectionizer, tree))
}

pub fn convert_options(args: &SectionArgs) -> ConvertOptions {
    ConvertOptions {
        heading_levels: args.levels.clone(),
        strip_line_breaks: args.strip_line_breaks,
        footnote_format: args.footnote_format,
        footnote_scope: args.footnote_scope,
    }
}

/// Shared flags in the form they were given on the command line.
pub fn render_section_flags(args: &SectionArgs) -> Vec<String> {
    let mut flags = vec!["--input".to_string(), args.input.display().to_string()];

    let levels = args
        .levels
        .iter()
        .map(|level| level.as_str())
        .collect::<Vec<&str>>()
        .join(",");
    flags.push("--levels".to_string());
    flags.push(levels);

    if args.strip_line_breaks {
        flags.push("--strip-line-breaks".to_string());
    }
    flags.push("--footnote-format".to_string());
    flags.push(args.footnote_format.as_str().to_string());
    flags.push("--footnote-scope".to_string());
    flags.push(args.footnote_scope.as_str().to_string());

    flags
}
