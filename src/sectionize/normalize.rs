use super::*;

/// Cleans raw CMS exports before heading scanning.
#[derive(Debug)]
pub struct Normalizer {
    line_break_element: Regex,
    line_terminator: Regex,
    footnote_shorthand: Regex,
    paragraph_tag: Regex,
}

impl Normalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            line_break_element: Regex::new(r"(?i)<br\s*/?>")
                .context("failed to compile line-break element regex")?,
            line_terminator: Regex::new(r"\r\n|\r|\n")
                .context("failed to compile line terminator regex")?,
            footnote_shorthand: Regex::new(r"\(\((.*?)\)\)")
                .context("failed to compile footnote shorthand regex")?,
            paragraph_tag: Regex::new(r"(?i)</?p(?:\s[^>]*)?>")
                .context("failed to compile paragraph tag regex")?,
        })
    }

    /// Heading and footnote matching downstream assumes single-line input.
    pub fn normalize(&self, raw: &str, strip_line_breaks: bool) -> String {
        let mut text = raw
            .replace("&nbsp;", " ")
            .replace("&#160;", " ")
            .replace('\u{00a0}', " ");

        if strip_line_breaks {
            text = self.line_break_element.replace_all(&text, "").into_owned();
        }

        let text = self.line_terminator.replace_all(&text, " ");

        self.footnote_shorthand
            .replace_all(&text, |captures: &Captures<'_>| {
                let payload = captures.get(1).map_or("", |value| value.as_str());
                format!("(({}))", self.paragraph_tag.replace_all(payload, ""))
            })
            .into_owned()
    }
}
