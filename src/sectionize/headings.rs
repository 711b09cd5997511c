use std::ops::Range;

use super::*;

/// Half-open byte range `[start, end)` over the normalized buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }
}

/// One heading element found by [`scan_headings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingMatch {
    /// Index of the matched level in the configured sequence.
    pub rank: usize,
    /// Opening tag through closing tag.
    pub span: Span,
    /// Markup between the opening and closing tags.
    pub inner: Span,
    /// False when the closing tag never appeared; `span` then covers only the
    /// opening tag.
    pub terminated: bool,
}

/// A slice of the buffer starting at a heading (or at 0 for the orphan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub start: usize,
    pub heading: Option<Span>,
}

impl Segment<'_> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_orphan(&self) -> bool {
        self.heading.is_none()
    }
}

/// Every element of `level` in `text`, in document order.
pub fn locate(text: &str, level: &HeadingLevel) -> Vec<Span> {
    scan_headings(text, std::slice::from_ref(level))
        .into_iter()
        .map(|found| found.span)
        .collect()
}

/// Cuts `text` at every span start. Zero spans yield nothing, even with
/// `include_orphan` set.
pub fn partition<'a>(text: &'a str, spans: &[Span], include_orphan: bool) -> Vec<Segment<'a>> {
    let Some(first) = spans.first() else {
        return Vec::new();
    };

    let mut segments = Vec::with_capacity(spans.len() + 1);
    if include_orphan && first.start > 0 {
        segments.push(Segment {
            text: &text[..first.start],
            start: 0,
            heading: None,
        });
    }

    for (index, span) in spans.iter().enumerate() {
        let end = spans.get(index + 1).map_or(text.len(), |next| next.start);
        segments.push(Segment {
            text: &text[span.start..end],
            start: span.start,
            heading: Some(*span),
        });
    }

    segments
}

/// Single pass over tag boundaries collecting elements of every level.
///
/// Inside an open heading only tags of that same element are counted, so
/// nested same-level headings close at the matching outer tag and other
/// heading tags become part of the title markup.
pub fn scan_headings(text: &str, levels: &[HeadingLevel]) -> Vec<HeadingMatch> {
    let mut matches = Vec::new();
    let mut pos = 0;

    loop {
        let mut open: Option<OpenHeading> = None;

        while let Some(offset) = text[pos..].find('<') {
            let start = pos + offset;
            match read_tag(text, start) {
                Tag::Skip { end } => pos = end,
                Tag::Open {
                    name,
                    end,
                    self_closing,
                } => {
                    pos = end;
                    if self_closing {
                        continue;
                    }
                    match open.as_mut() {
                        Some(heading) => {
                            if levels[heading.rank].matches(name) {
                                heading.depth += 1;
                            }
                        }
                        None => {
                            if let Some(rank) = levels.iter().position(|level| level.matches(name))
                            {
                                open = Some(OpenHeading {
                                    rank,
                                    start,
                                    inner_start: end,
                                    depth: 1,
                                });
                            }
                        }
                    }
                }
                Tag::Close { name, end } => {
                    pos = end;
                    let Some(heading) = open.as_mut() else {
                        continue;
                    };
                    if !levels[heading.rank].matches(name) {
                        continue;
                    }
                    heading.depth -= 1;
                    if heading.depth == 0 {
                        matches.push(HeadingMatch {
                            rank: heading.rank,
                            span: Span {
                                start: heading.start,
                                end,
                            },
                            inner: Span {
                                start: heading.inner_start,
                                end: start,
                            },
                            terminated: true,
                        });
                        open = None;
                    }
                }
            }
        }

        // Unterminated element: keep the opening tag as its span and rescan
        // the rest of the buffer as ordinary content. Each unterminated
        // heading costs one extra pass over the remaining text, so k of them
        // bound the scan at O(n * k).
        let Some(heading) = open else {
            break;
        };
        matches.push(HeadingMatch {
            rank: heading.rank,
            span: Span {
                start: heading.start,
                end: heading.inner_start,
            },
            inner: Span {
                start: heading.inner_start,
                end: heading.inner_start,
            },
            terminated: false,
        });
        pos = heading.inner_start;
    }

    matches
}

#[derive(Debug)]
struct OpenHeading {
    rank: usize,
    start: usize,
    inner_start: usize,
    depth: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum Tag<'a> {
    Open {
        name: &'a str,
        end: usize,
        self_closing: bool,
    },
    Close {
        name: &'a str,
        end: usize,
    },
    /// Comments, declarations, stray `<` and anything else we step over.
    Skip {
        end: usize,
    },
}

/// Reads the tag starting at `start` (which must point at `<`).
fn read_tag(text: &str, start: usize) -> Tag<'_> {
    let bytes = text.as_bytes();
    let stray = Tag::Skip { end: start + 1 };

    if text[start..].starts_with("<!--") {
        return match text[start + 4..].find("-->") {
            Some(offset) => Tag::Skip {
                end: start + 4 + offset + 3,
            },
            None => stray,
        };
    }

    let closing = bytes.get(start + 1) == Some(&b'/');
    let name_start = if closing { start + 2 } else { start + 1 };
    let name_end = bytes[name_start.min(bytes.len())..]
        .iter()
        .position(|byte| !byte.is_ascii_alphanumeric())
        .map_or(bytes.len(), |offset| name_start + offset);

    if name_end <= name_start {
        return stray;
    }

    match bytes.get(name_end) {
        Some(byte) if byte.is_ascii_whitespace() || *byte == b'>' || *byte == b'/' => {}
        _ => return stray,
    }

    let Some(end) = find_tag_end(bytes, name_end) else {
        return stray;
    };

    let name = &text[name_start..name_end];
    if closing {
        Tag::Close { name, end }
    } else {
        Tag::Open {
            name,
            end,
            self_closing: bytes[end - 2] == b'/',
        }
    }
}

/// Position just past the `>` closing a tag, skipping quoted attribute values.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (offset, &byte) in bytes[from..].iter().enumerate() {
        match quote {
            Some(delimiter) if byte == delimiter => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'>' => return Some(from + offset + 1),
            None => {}
        }
    }
    None
}
