use std::fs;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ConvertArgs;
use crate::commands::{PreparedSource, convert_options, prepare_source, render_section_flags};
use crate::epub::{BookMetadata, EpubBook};
use crate::model::{ConvertCounts, ConvertPaths, ConvertRunManifest};
use crate::sectionize::{EmitStats, emit_tree};
use crate::util::{utc_compact_string, utc_string, write_json_pretty};

pub fn run(args: ConvertArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = utc_string(started_ts);
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    info!(
        input = %args.section.input.display(),
        output = %args.output.display(),
        run_id = %run_id,
        "starting convert"
    );

    let prepared = prepare_source(&args.section)?;
    for warning in &prepared.tree.warnings {
        warn!(warning = %warning, "sectionizing produced a warning");
    }

    if prepared.tree.is_empty() && !args.dry_run {
        bail!(
            "no <{}> headings found in {}; refusing to write an empty book",
            args.section.levels[0],
            args.section.input.display()
        );
    }

    let stylesheet = match &args.stylesheet {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read stylesheet: {}", path.display()))?,
        ),
        None => None,
    };

    let (book, stats) = build_book(&args, &prepared, stylesheet, started_at.clone())?;

    if args.dry_run {
        info!(
            sections = stats.sections,
            footnotes = stats.footnotes,
            documents = book.document_count(),
            "dry-run: skipping epub write"
        );
    } else {
        book.write(&args.output)?;
        info!(
            path = %args.output.display(),
            documents = book.document_count(),
            "wrote epub"
        );
    }

    if let Some(manifest_path) = &args.manifest_path {
        let manifest = build_manifest(&args, &prepared, &book, stats, run_id, started_at);
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote convert manifest");
    }

    info!(
        sections = stats.sections,
        footnotes = stats.footnotes,
        footnote_collections = stats.footnote_collections,
        "convert completed"
    );

    Ok(())
}

fn build_book(
    args: &ConvertArgs,
    prepared: &PreparedSource,
    stylesheet: Option<String>,
    modified: String,
) -> Result<(EpubBook, EmitStats)> {
    let metadata = BookMetadata {
        title: args.title.clone(),
        author: args.author.clone(),
        language: args.language.clone(),
        identifier: format!("urn:sha256:{}", prepared.source.sha256),
        modified,
    };

    let mut book = EpubBook::new(metadata);
    if let Some(stylesheet) = stylesheet {
        book = book.with_stylesheet(stylesheet);
    }

    let stats = emit_tree(
        &prepared.tree,
        prepared.sectionizer.footnote_format(),
        &mut book,
    )
    .with_context(|| format!("failed to assemble book from {}", args.section.input.display()))?;

    Ok((book, stats))
}

fn build_manifest(
    args: &ConvertArgs,
    prepared: &PreparedSource,
    book: &EpubBook,
    stats: EmitStats,
    run_id: String,
    started_at: String,
) -> ConvertRunManifest {
    ConvertRunManifest {
        manifest_version: 1,
        run_id,
        status: if args.dry_run { "dry-run" } else { "completed" }.to_string(),
        dry_run: args.dry_run,
        started_at,
        updated_at: utc_string(Utc::now()),
        command: render_convert_command(args),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        source_sha256: prepared.source.sha256.clone(),
        paths: ConvertPaths {
            input_path: args.section.input.display().to_string(),
            output_path: args.output.display().to_string(),
            stylesheet_path: args
                .stylesheet
                .as_ref()
                .map(|path| path.display().to_string()),
        },
        options: convert_options(&args.section),
        counts: ConvertCounts {
            source_bytes: prepared.source.byte_count,
            normalized_bytes: prepared.normalized.len(),
            preamble_bytes: prepared.tree.preamble.len(),
            top_level_sections: prepared.tree.sections.len(),
            sections_emitted: stats.sections,
            footnotes_extracted: stats.footnotes,
            footnote_collections: stats.footnote_collections,
            documents_packaged: book.document_count(),
        },
        warnings: prepared.tree.warnings.clone(),
    }
}

fn render_convert_command(args: &ConvertArgs) -> String {
    let mut command = vec!["wp2epub".to_string(), "convert".to_string()];
    command.extend(render_section_flags(&args.section));

    command.push("--output".to_string());
    command.push(args.output.display().to_string());
    command.push("--title".to_string());
    command.push(args.title.clone());
    command.push("--author".to_string());
    command.push(args.author.clone());
    command.push("--language".to_string());
    command.push(args.language.clone());

    if let Some(path) = &args.stylesheet {
        command.push("--stylesheet".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_path {
        command.push("--manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if args.dry_run {
        command.push("--dry-run".to_string());
    }

    command.join(" ")
}
