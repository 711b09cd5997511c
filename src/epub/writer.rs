use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use quick_xml::escape::escape;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::sectionize::OutputSink;
use crate::util::ensure_directory;

const MIMETYPE: &str = "application/epub+zip";
const NAV_FILE: &str = "nav.xhtml";
const NCX_FILE: &str = "toc.ncx";
const STYLESHEET_FILE: &str = "styles.css";
const PACKAGE_FILE: &str = "content.opf";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

pub const DEFAULT_STYLESHEET: &str = r#"body {
  font-family: Arial, sans-serif;
  line-height: 1.6;
  margin: 0;
  padding: 0;
  white-space: pre-wrap;
}
h1, h2, h3, h4, h5, h6 {
  font-family: Georgia, serif;
  line-height: 1.4;
  margin-top: 1em;
  margin-bottom: 0.5em;
}
h1 { font-size: 2em; border-bottom: 2px solid #000; }
h2 { font-size: 1.75em; border-bottom: 1px solid #000; }
h3 { font-size: 1.5em; }
h4 { font-size: 1.25em; }
h5 { font-size: 1em; }
h6 { font-size: 0.875em; }
p { margin: 0.5em 0; }
a { color: #007bff; text-decoration: none; }
aside[epub|type~="footnote"] { font-size: 0.875em; }
"#;

#[derive(Debug, Clone)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub language: String,
    /// Unique identifier, e.g. `urn:sha256:<source hash>`.
    pub identifier: String,
    /// `dcterms:modified`, formatted `YYYY-MM-DDThh:mm:ssZ`.
    pub modified: String,
}

/// Handle returned by [`EpubBook::add_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(usize);

#[derive(Debug, Clone)]
struct BookDocument {
    parent: Option<DocumentId>,
    depth: usize,
    title: String,
    file_name: String,
    body: String,
}

/// In-memory book that collects documents through [`OutputSink`] and is
/// packaged with [`EpubBook::write`].
#[derive(Debug)]
pub struct EpubBook {
    metadata: BookMetadata,
    stylesheet: String,
    documents: Vec<BookDocument>,
}

impl EpubBook {
    pub fn new(metadata: BookMetadata) -> Self {
        Self {
            metadata,
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            documents: Vec::new(),
        }
    }

    pub fn with_stylesheet(mut self, stylesheet: String) -> Self {
        self.stylesheet = stylesheet;
        self
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            ensure_directory(parent)?;
        }

        let file = File::create(path)
            .with_context(|| format!("failed to create epub file: {}", path.display()))?;
        self.write_to(file)
            .with_context(|| format!("failed to write epub file: {}", path.display()))?;
        Ok(())
    }

    /// Packages the book into any seekable writer and hands the writer back.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Readers sniff the first entry; it must be the uncompressed mimetype.
        zip.start_file("mimetype", stored)
            .context("failed to start mimetype entry")?;
        zip.write_all(MIMETYPE.as_bytes())
            .context("failed to write mimetype entry")?;

        let mut entries = vec![
            ("META-INF/container.xml".to_string(), CONTAINER_XML.to_string()),
            (format!("OEBPS/{PACKAGE_FILE}"), self.render_package()),
            (format!("OEBPS/{NAV_FILE}"), self.render_nav()),
            (format!("OEBPS/{NCX_FILE}"), self.render_ncx()),
            (format!("OEBPS/{STYLESHEET_FILE}"), self.stylesheet.clone()),
        ];
        entries.extend(self.documents.iter().map(|document| {
            (
                format!("OEBPS/{}", document.file_name),
                self.render_document(document),
            )
        }));

        for (name, contents) in entries {
            zip.start_file(name.as_str(), deflated)
                .with_context(|| format!("failed to start archive entry {name}"))?;
            zip.write_all(contents.as_bytes())
                .with_context(|| format!("failed to write archive entry {name}"))?;
            debug!(entry = %name, bytes = contents.len(), "wrote archive entry");
        }

        zip.finish().context("failed to finalize epub archive")
    }

    /// Document indices in reading order: each document followed by its
    /// subtree, children in insertion order.
    fn reading_order(&self) -> Vec<usize> {
        let children = self.child_lists();
        let mut ordered = Vec::with_capacity(self.documents.len());
        let mut pending = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, document)| document.parent.is_none())
            .map(|(index, _)| index)
            .rev()
            .collect::<Vec<usize>>();

        while let Some(index) = pending.pop() {
            ordered.push(index);
            pending.extend(children[index].iter().rev());
        }

        ordered
    }

    fn child_lists(&self) -> Vec<Vec<usize>> {
        let mut children = vec![Vec::new(); self.documents.len()];
        for (index, document) in self.documents.iter().enumerate() {
            if let Some(DocumentId(parent)) = document.parent {
                children[parent].push(index);
            }
        }
        children
    }

    fn render_document(&self, document: &BookDocument) -> String {
        let title = escape(document.title.as_str());
        let heading = if document.title.is_empty() {
            String::new()
        } else {
            let rank = (document.depth + 1).min(6);
            format!("<h{rank}>{title}</h{rank}>\n")
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
<head>
<title>{title}</title>
<link rel="stylesheet" type="text/css" href="{STYLESHEET_FILE}"/>
</head>
<body>
{heading}{body}
</body>
</html>
"#,
            lang = escape(self.metadata.language.as_str()),
            body = document.body,
        )
    }

    fn render_package(&self) -> String {
        let mut opf = String::new();
        opf.push_str(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
"#,
        );
        opf.push_str(&format!(
            "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
            escape(self.metadata.identifier.as_str())
        ));
        opf.push_str(&format!(
            "    <dc:title>{}</dc:title>\n",
            escape(self.metadata.title.as_str())
        ));
        opf.push_str(&format!(
            "    <dc:language>{}</dc:language>\n",
            escape(self.metadata.language.as_str())
        ));
        if !self.metadata.author.is_empty() {
            opf.push_str(&format!(
                "    <dc:creator>{}</dc:creator>\n",
                escape(self.metadata.author.as_str())
            ));
        }
        opf.push_str(&format!(
            "    <meta property=\"dcterms:modified\">{}</meta>\n",
            escape(self.metadata.modified.as_str())
        ));

        opf.push_str("  </metadata>\n  <manifest>\n");
        opf.push_str(&format!(
            "    <item id=\"nav\" href=\"{NAV_FILE}\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n"
        ));
        opf.push_str(&format!(
            "    <item id=\"ncx\" href=\"{NCX_FILE}\" media-type=\"application/x-dtbncx+xml\"/>\n"
        ));
        opf.push_str(&format!(
            "    <item id=\"css\" href=\"{STYLESHEET_FILE}\" media-type=\"text/css\"/>\n"
        ));
        for (index, document) in self.documents.iter().enumerate() {
            opf.push_str(&format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                manifest_id(index),
                escape(document.file_name.as_str())
            ));
        }

        opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
        for index in self.reading_order() {
            opf.push_str(&format!(
                "    <itemref idref=\"{}\"/>\n",
                manifest_id(index)
            ));
        }
        opf.push_str("  </spine>\n</package>\n");
        opf
    }

    fn render_nav(&self) -> String {
        let children = self.child_lists();
        let roots = self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, document)| document.parent.is_none())
            .map(|(index, _)| index)
            .collect::<Vec<usize>>();

        let mut nav = String::new();
        nav.push_str(&format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head>
<title>{}</title>
</head>
<body>
<nav epub:type="toc" id="toc">
"#,
            escape(self.metadata.title.as_str())
        ));
        self.push_nav_list(&mut nav, &roots, &children);
        nav.push_str("</nav>\n</body>\n</html>\n");
        nav
    }

    fn push_nav_list(&self, nav: &mut String, indices: &[usize], children: &[Vec<usize>]) {
        if indices.is_empty() {
            return;
        }
        nav.push_str("<ol>\n");
        for &index in indices {
            let document = &self.documents[index];
            nav.push_str(&format!(
                "<li><a href=\"{}\">{}</a>",
                escape(document.file_name.as_str()),
                escape(display_title(document))
            ));
            if !children[index].is_empty() {
                nav.push('\n');
                self.push_nav_list(nav, &children[index], children);
            }
            nav.push_str("</li>\n");
        }
        nav.push_str("</ol>\n");
    }

    fn render_ncx(&self) -> String {
        let children = self.child_lists();
        let play_order = self.reading_order();

        let mut ncx = String::new();
        ncx.push_str(&format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
  </head>
  <docTitle><text>{}</text></docTitle>
  <navMap>
"#,
            escape(self.metadata.identifier.as_str()),
            escape(self.metadata.title.as_str())
        ));
        for index in self
            .documents
            .iter()
            .enumerate()
            .filter(|(_, document)| document.parent.is_none())
            .map(|(index, _)| index)
        {
            self.push_nav_point(&mut ncx, index, &children, &play_order);
        }
        ncx.push_str("  </navMap>\n</ncx>\n");
        ncx
    }

    fn push_nav_point(
        &self,
        ncx: &mut String,
        index: usize,
        children: &[Vec<usize>],
        play_order: &[usize],
    ) {
        let document = &self.documents[index];
        let order = play_order
            .iter()
            .position(|&candidate| candidate == index)
            .map_or(index + 1, |position| position + 1);

        ncx.push_str(&format!(
            "<navPoint id=\"nav-{order}\" playOrder=\"{order}\"><navLabel><text>{}</text></navLabel><content src=\"{}\"/>\n",
            escape(display_title(document)),
            escape(document.file_name.as_str())
        ));
        for &child in &children[index] {
            self.push_nav_point(ncx, child, children, play_order);
        }
        ncx.push_str("</navPoint>\n");
    }
}

impl OutputSink for EpubBook {
    type NodeId = DocumentId;

    fn add_node(
        &mut self,
        parent: Option<&DocumentId>,
        body: &str,
        title: &str,
        file_name: &str,
    ) -> Result<DocumentId> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            bail!("document '{title}' has no file name");
        }
        if file_name.starts_with('/') || file_name.split('/').any(|part| part == "..") {
            bail!("document file name must stay inside the package: {file_name}");
        }
        if [NAV_FILE, NCX_FILE, STYLESHEET_FILE, PACKAGE_FILE].contains(&file_name) {
            bail!("document file name is reserved: {file_name}");
        }
        if self
            .documents
            .iter()
            .any(|document| document.file_name == file_name)
        {
            bail!("duplicate document file name: {file_name}");
        }

        let depth = match parent {
            Some(DocumentId(index)) => {
                self.documents
                    .get(*index)
                    .with_context(|| format!("unknown parent document id {index}"))?
                    .depth
                    + 1
            }
            None => 0,
        };

        self.documents.push(BookDocument {
            parent: parent.copied(),
            depth,
            title: title.to_string(),
            file_name: file_name.to_string(),
            body: body.to_string(),
        });
        Ok(DocumentId(self.documents.len() - 1))
    }
}

fn manifest_id(index: usize) -> String {
    format!("doc-{:04}", index + 1)
}

fn display_title(document: &BookDocument) -> &str {
    if document.title.is_empty() {
        &document.file_name
    } else {
        &document.title
    }
}
