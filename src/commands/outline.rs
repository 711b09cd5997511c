use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::OutlineArgs;
use crate::commands::{PreparedSource, convert_options, prepare_source};
use crate::model::{LevelCount, OutlineEntry, OutlineReport};
use crate::sectionize::locate;

pub fn run(args: OutlineArgs) -> Result<()> {
    let prepared = prepare_source(&args.section)?;
    for warning in &prepared.tree.warnings {
        warn!(warning = %warning, "sectionizing produced a warning");
    }

    let report = build_report(&args, &prepared);
    for count in &report.level_counts {
        info!(level = %count.level, count = count.count, "located headings");
    }

    if args.json {
        write_json_report(&report)
    } else {
        write_text_report(&report)
    }
}

fn build_report(args: &OutlineArgs, prepared: &PreparedSource) -> OutlineReport {
    let level_counts = prepared
        .sectionizer
        .levels()
        .iter()
        .map(|level| LevelCount {
            level: level.clone(),
            count: locate(&prepared.normalized, level).len(),
        })
        .collect();

    let front_matter = prepared.tree.front_matter.iter().map(|node| (0, node));
    let sections = front_matter
        .chain(prepared.tree.preorder())
        .map(|(depth, node)| OutlineEntry {
            depth,
            level: node.level.clone(),
            title: node.title.clone(),
            file_name: node.file_name.clone(),
            heading_start: node.heading.start,
            own_bytes: node.own.end - node.own.start,
            subtree_bytes: node.full_content.len(),
            footnotes: node.footnotes.iter().map(|entry| entry.number).collect(),
        })
        .collect();

    OutlineReport {
        input_path: args.section.input.display().to_string(),
        source_sha256: prepared.source.sha256.clone(),
        options: convert_options(&args.section),
        level_counts,
        preamble_bytes: prepared.tree.preamble.len(),
        sections,
        warnings: prepared.tree.warnings.clone(),
    }
}

fn write_json_report(report: &OutlineReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, report)
        .context("failed to serialize outline json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_report(report: &OutlineReport) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    write_outline_text(&mut output, report)?;
    output.flush()?;
    Ok(())
}

fn write_outline_text<W: Write>(output: &mut W, report: &OutlineReport) -> Result<()> {
    writeln!(output, "Input: {}", report.input_path)?;
    let counts = report
        .level_counts
        .iter()
        .map(|count| format!("{}={}", count.level, count.count))
        .collect::<Vec<String>>()
        .join(" ");
    writeln!(output, "Headings: {counts}")?;
    writeln!(output, "Preamble bytes: {}", report.preamble_bytes)?;
    writeln!(output, "Sections: {}", report.sections.len())?;

    for entry in &report.sections {
        let title = if entry.title.is_empty() {
            "(untitled)"
        } else {
            &entry.title
        };
        write!(
            output,
            "{}{}\t<{}>\t{}",
            "  ".repeat(entry.depth),
            title,
            entry.level,
            entry.file_name
        )?;
        if !entry.footnotes.is_empty() {
            write!(output, "\tfootnotes={}", entry.footnotes.len())?;
        }
        writeln!(output)?;
    }

    for warning in &report.warnings {
        writeln!(output, "warning: {warning}")?;
    }

    Ok(())
}
