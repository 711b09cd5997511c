use super::*;

/// Receives sectionized documents, one call per node, parents first.
pub trait OutputSink {
    /// Opaque handle the sink hands back for parenting later nodes.
    type NodeId;

    fn add_node(
        &mut self,
        parent: Option<&Self::NodeId>,
        body: &str,
        title: &str,
        file_name: &str,
    ) -> Result<Self::NodeId>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmitStats {
    pub sections: usize,
    pub footnotes: usize,
    pub footnote_collections: usize,
}

/// Feeds the tree to `sink` depth-first, pre-order, front matter first. A
/// node's notes document, if any, follows the node's whole subtree. The
/// first sink error aborts.
pub fn emit_tree<S: OutputSink>(
    tree: &SectionTree,
    format: FootnoteFormat,
    sink: &mut S,
) -> Result<EmitStats> {
    let mut stats = EmitStats::default();
    if let Some(front_matter) = &tree.front_matter {
        emit_node(front_matter, None, format, sink, &mut stats)?;
    }
    for section in &tree.sections {
        emit_node(section, None, format, sink, &mut stats)?;
    }
    Ok(stats)
}

fn emit_node<S: OutputSink>(
    node: &SectionNode,
    parent: Option<&S::NodeId>,
    format: FootnoteFormat,
    sink: &mut S,
    stats: &mut EmitStats,
) -> Result<()> {
    let id = sink
        .add_node(parent, &node.body(), &node.title, &node.file_name)
        .with_context(|| {
            format!(
                "output sink rejected section '{}' ({})",
                node.title, node.file_name
            )
        })?;
    stats.sections += 1;
    stats.footnotes += node.footnotes.len();
    debug!(
        title = %node.title,
        file = %node.file_name,
        footnotes = node.footnotes.len(),
        "emitted section"
    );

    for child in &node.children {
        emit_node(child, Some(&id), format, sink, stats)?;
    }

    if format == FootnoteFormat::SeparateCollection && !node.footnotes.is_empty() {
        let notes_file = notes_file_name(&node.file_name);
        let body = render_collection(&node.footnotes, &node.file_name);
        sink.add_node(
            Some(&id),
            &body,
            &notes_title(&node.title),
            &notes_file,
        )
        .with_context(|| format!("output sink rejected notes document {notes_file}"))?;
        stats.footnote_collections += 1;
    }

    Ok(())
}

fn notes_title(title: &str) -> String {
    if title.is_empty() {
        "Notes".to_string()
    } else {
        format!("Notes: {title}")
    }
}
