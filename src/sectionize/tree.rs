use super::*;

#[derive(Debug, Clone, Serialize)]
pub struct SectionNode {
    pub title: String,
    pub level: HeadingLevel,
    /// Suggested document name, unique within one tree.
    pub file_name: String,
    /// Text between the heading element and the next heading of any
    /// configured level, with footnote shorthand rewritten. Headings of
    /// levels outside the configured sequence stay inside it.
    pub own_content: String,
    /// Note references lifted out of the heading markup; rendered ahead of
    /// `own_content` in the emitted body.
    pub heading_notes: String,
    /// Heading start through the end of this node's subtree, untouched.
    #[serde(skip)]
    pub full_content: String,
    pub heading: Span,
    /// Source range of `own_content` before footnote rewriting.
    pub own: Span,
    pub footnotes: Vec<FootnoteEntry>,
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    /// Document body handed to the output sink.
    pub fn body(&self) -> String {
        format!("{}{}", self.heading_notes, self.own_content)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SectionTree {
    /// Text before the first top-level heading, unmodified.
    pub preamble: String,
    /// Untitled node carrying a non-blank preamble; emitted ahead of
    /// `sections` as `section_0000.xhtml`.
    pub front_matter: Option<SectionNode>,
    pub sections: Vec<SectionNode>,
    pub warnings: Vec<String>,
}

impl SectionTree {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Nodes with their depth (0 for top-level sections), pre-order.
    pub fn preorder(&self) -> Vec<(usize, &SectionNode)> {
        let mut ordered = Vec::new();
        let mut pending: Vec<(usize, &SectionNode)> =
            self.sections.iter().rev().map(|node| (0, node)).collect();

        while let Some((depth, node)) = pending.pop() {
            ordered.push((depth, node));
            pending.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        }

        ordered
    }

    /// Every emitted node, front matter included.
    pub fn node_count(&self) -> usize {
        usize::from(self.front_matter.is_some()) + self.preorder().len()
    }

    pub fn footnote_count(&self) -> usize {
        self.front_matter
            .iter()
            .chain(self.preorder().into_iter().map(|(_, node)| node))
            .map(|node| node.footnotes.len())
            .sum()
    }
}

/// Builds a [`SectionTree`] from normalized markup for a fixed sequence of
/// heading levels.
#[derive(Debug)]
pub struct Sectionizer {
    levels: Vec<HeadingLevel>,
    scope: FootnoteScope,
    extractor: FootnoteExtractor,
    markup_tag: Regex,
}

#[derive(Debug)]
struct SectionDraft {
    rank: usize,
    title: String,
    heading: Span,
    inner: Span,
    own: Span,
    end: usize,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl Sectionizer {
    pub fn new(
        levels: Vec<HeadingLevel>,
        format: FootnoteFormat,
        scope: FootnoteScope,
    ) -> Result<Self> {
        if levels.is_empty() {
            bail!("at least one heading level is required");
        }
        for (index, level) in levels.iter().enumerate() {
            if levels[..index].contains(level) {
                bail!("heading level '{level}' is listed more than once");
            }
        }

        Ok(Self {
            levels,
            scope,
            extractor: FootnoteExtractor::new(format)?,
            markup_tag: Regex::new(r"<[^>]*>").context("failed to compile markup tag regex")?,
        })
    }

    pub fn levels(&self) -> &[HeadingLevel] {
        &self.levels
    }

    pub fn footnote_format(&self) -> FootnoteFormat {
        self.extractor.format()
    }

    pub fn sectionize(&self, text: &str) -> SectionTree {
        let matches = scan_headings(text, &self.levels);
        let Some(first_top) = matches.iter().position(|found| found.rank == 0) else {
            let message = format!("no <{}> headings found", self.levels[0]);
            warn!(level = %self.levels[0], "no top-level headings found");
            return SectionTree {
                preamble: text.to_string(),
                front_matter: None,
                sections: Vec::new(),
                warnings: vec![message],
            };
        };

        // Deeper headings ahead of the first top-level one stay in the preamble.
        let matches = &matches[first_top..];
        let spans = matches.iter().map(|found| found.span).collect::<Vec<Span>>();
        let mut segments = partition(text, &spans, true).into_iter().peekable();

        let mut tree = SectionTree::default();
        let mut next_number = 1;
        if let Some(orphan) = segments.next_if(Segment::is_orphan) {
            tree.preamble = orphan.text.to_string();
            if !orphan.text.trim().is_empty() {
                info!(
                    chars = orphan.text.len(),
                    "introductory text precedes the first heading; keeping it as front matter"
                );
                let (node, after) = self.front_matter(orphan.text, next_number);
                next_number = after;
                tree.front_matter = Some(node);
            }
        }

        let drafts = self.fold_segments(text, matches, segments, &mut tree.warnings);

        let roots = (0..drafts.len()).filter(|&index| drafts[index].parent.is_none());
        for index in roots {
            let start = match self.scope {
                FootnoteScope::Document => next_number,
                FootnoteScope::Section => 1,
            };
            let (node, after) = self.build_node(text, &drafts, index, start);
            next_number = after;
            tree.sections.push(node);
        }

        debug!(
            sections = tree.node_count(),
            footnotes = tree.footnote_count(),
            "sectionized document"
        );
        tree
    }

    /// Stack fold: a heading closes every open node of equal or deeper rank
    /// and nests under whatever remains open.
    fn fold_segments<'a>(
        &self,
        text: &str,
        matches: &[HeadingMatch],
        segments: impl Iterator<Item = Segment<'a>>,
        warnings: &mut Vec<String>,
    ) -> Vec<SectionDraft> {
        let mut drafts: Vec<SectionDraft> = Vec::with_capacity(matches.len());
        let mut open: Vec<usize> = Vec::new();

        for (found, segment) in matches.iter().zip(segments) {
            while let Some(&top) = open.last() {
                if drafts[top].rank < found.rank {
                    break;
                }
                drafts[top].end = segment.start;
                open.pop();
            }

            let level = &self.levels[found.rank];
            let title = self.heading_title(&self.extractor.strip(&text[found.inner.range()]));

            if !found.terminated {
                warn!(level = %level, offset = found.span.start, "heading element is never closed");
                warnings.push(format!(
                    "unterminated <{level}> at byte {}",
                    found.span.start
                ));
            }
            if title.is_empty() {
                warn!(level = %level, offset = found.span.start, "heading has no extractable title");
                warnings.push(format!(
                    "<{level}> at byte {} has no title",
                    found.span.start
                ));
            }

            let parent = open.last().copied();
            let index = drafts.len();
            if let Some(parent) = parent {
                if !title.is_empty() && drafts[parent].title == title {
                    warn!(title = %title, "section repeats its parent title; possible duplicate");
                    warnings.push(format!("section '{title}' repeats its parent title"));
                }
                drafts[parent].children.push(index);
            }
            drafts.push(SectionDraft {
                rank: found.rank,
                title,
                heading: found.span,
                inner: found.inner,
                own: Span {
                    start: found.span.end,
                    end: segment.end(),
                },
                end: text.len(),
                parent,
                children: Vec::new(),
            });
            open.push(index);
        }

        drafts
    }

    fn front_matter(&self, preamble: &str, next_number: u32) -> (SectionNode, u32) {
        let file_name = section_file_name(0);
        let extraction = self.extractor.extract(preamble, next_number, &file_name);

        let node = SectionNode {
            title: String::new(),
            level: self.levels[0].clone(),
            file_name,
            own_content: extraction.text,
            heading_notes: String::new(),
            full_content: preamble.to_string(),
            heading: Span { start: 0, end: 0 },
            own: Span {
                start: 0,
                end: preamble.len(),
            },
            footnotes: extraction.footnotes,
            children: Vec::new(),
        };
        (node, extraction.next_number)
    }

    /// Extracts footnotes for `index` (heading first, then own content) and
    /// then its children, threading the next footnote number through and
    /// returning it.
    fn build_node(
        &self,
        text: &str,
        drafts: &[SectionDraft],
        index: usize,
        next_number: u32,
    ) -> (SectionNode, u32) {
        let draft = &drafts[index];
        let file_name = section_file_name(index + 1);
        let heading = self
            .extractor
            .extract(&text[draft.inner.range()], next_number, &file_name);
        let heading_notes = heading
            .footnotes
            .iter()
            .map(|entry| render_marker(entry, self.extractor.format()))
            .collect::<String>();
        let extraction =
            self.extractor
                .extract(&text[draft.own.range()], heading.next_number, &file_name);

        let mut footnotes = heading.footnotes;
        footnotes.extend(extraction.footnotes);

        let mut next_number = extraction.next_number;
        let mut children = Vec::with_capacity(draft.children.len());
        for &child in &draft.children {
            let (node, after) = self.build_node(text, drafts, child, next_number);
            next_number = after;
            children.push(node);
        }

        let node = SectionNode {
            title: draft.title.clone(),
            level: self.levels[draft.rank].clone(),
            file_name,
            own_content: extraction.text,
            heading_notes,
            full_content: text[draft.heading.start..draft.end].to_string(),
            heading: draft.heading,
            own: draft.own,
            footnotes,
            children,
        };
        (node, next_number)
    }

    fn heading_title(&self, markup: &str) -> String {
        let stripped = self.markup_tag.replace_all(markup, "");
        decode_basic_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

pub fn section_file_name(ordinal: usize) -> String {
    format!("section_{ordinal:04}.xhtml")
}

fn decode_basic_entities(input: &str) -> String {
    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
