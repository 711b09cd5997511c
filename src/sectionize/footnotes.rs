use super::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FootnoteEntry {
    pub number: u32,
    pub anchor_id: String,
    pub reference_id: String,
    /// Shorthand payload, markup passed through untouched.
    pub body: String,
    /// Document that holds the `anchor_id` target.
    pub scope_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootnoteExtraction {
    pub text: String,
    pub footnotes: Vec<FootnoteEntry>,
    /// First number not yet allocated; feed it to the next extraction in the
    /// same numbering scope.
    pub next_number: u32,
}

/// Rewrites `((...))` shorthand into anchored note references.
#[derive(Debug)]
pub struct FootnoteExtractor {
    shorthand: Regex,
    format: FootnoteFormat,
}

impl FootnoteExtractor {
    pub fn new(format: FootnoteFormat) -> Result<Self> {
        Ok(Self {
            shorthand: Regex::new(r"\(\((.*?)\)\)")
                .context("failed to compile footnote shorthand regex")?,
            format,
        })
    }

    pub fn format(&self) -> FootnoteFormat {
        self.format
    }

    /// Drops every shorthand occurrence, payload included.
    pub fn strip(&self, text: &str) -> String {
        self.shorthand.replace_all(text, "").into_owned()
    }

    /// Numbers occurrences left to right starting at `next_number`.
    /// `file_name` is the document the rewritten text will live in.
    pub fn extract(&self, text: &str, next_number: u32, file_name: &str) -> FootnoteExtraction {
        let scope_file = match self.format {
            FootnoteFormat::InlineAside => file_name.to_string(),
            FootnoteFormat::SeparateCollection => notes_file_name(file_name),
        };

        let mut footnotes = Vec::new();
        let mut number = next_number;
        let rewritten = self
            .shorthand
            .replace_all(text, |captures: &Captures<'_>| {
                let entry = FootnoteEntry {
                    number,
                    anchor_id: anchor_id(number),
                    reference_id: reference_id(number),
                    body: captures
                        .get(1)
                        .map_or("", |value| value.as_str())
                        .to_string(),
                    scope_file: scope_file.clone(),
                };
                number += 1;

                let marker = render_marker(&entry, self.format);
                footnotes.push(entry);
                marker
            })
            .into_owned();

        FootnoteExtraction {
            text: rewritten,
            footnotes,
            next_number: number,
        }
    }
}

pub fn anchor_id(number: u32) -> String {
    format!("footnote_{number}")
}

pub fn reference_id(number: u32) -> String {
    format!("ref_{number}")
}

/// `section_0003.xhtml` → `section_0003_notes.xhtml`.
pub fn notes_file_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map_or(file_name, |(stem, _)| stem);
    format!("{stem}_notes.xhtml")
}

/// Markup that replaces one shorthand occurrence.
pub fn render_marker(entry: &FootnoteEntry, format: FootnoteFormat) -> String {
    let reference = format!(
        r#"<sup><a href="{}#{}" epub:type="noteref" id="{}">{}</a></sup>"#,
        entry.scope_file, entry.anchor_id, entry.reference_id, entry.number
    );

    match format {
        FootnoteFormat::InlineAside => format!(
            r#"{reference}<aside id="{}" epub:type="footnote">{}</aside>"#,
            entry.anchor_id, entry.body
        ),
        FootnoteFormat::SeparateCollection => reference,
    }
}

/// Body of a notes document; each entry links back to its reference in
/// `node_file`.
pub fn render_collection(footnotes: &[FootnoteEntry], node_file: &str) -> String {
    footnotes
        .iter()
        .map(|entry| {
            format!(
                r#"<p id="{}"><a href="{}#{}">{}</a>: {}</p>"#,
                entry.anchor_id, node_file, entry.reference_id, entry.number, entry.body
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}
