use std::io::{Cursor, Read};

use zip::ZipArchive;

use super::*;
use crate::cli::{FootnoteFormat, FootnoteScope};
use crate::sectionize::{HeadingLevel, OutputSink, Sectionizer, emit_tree};

fn metadata() -> BookMetadata {
    BookMetadata {
        title: "Fish & Chips".to_string(),
        author: "A. Writer".to_string(),
        language: "nb".to_string(),
        identifier: "urn:sha256:abc123".to_string(),
        modified: "2026-10-19T12:00:00Z".to_string(),
    }
}

fn package(book: &EpubBook) -> ZipArchive<Cursor<Vec<u8>>> {
    let cursor = book.write_to(Cursor::new(Vec::new())).expect("write epub");
    ZipArchive::new(Cursor::new(cursor.into_inner())).expect("read epub back")
}

fn entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
    let mut contents = String::new();
    archive
        .by_name(name)
        .expect("archive entry")
        .read_to_string(&mut contents)
        .expect("utf-8 entry");
    contents
}

#[test]
fn mimetype_is_first_and_stored() {
    let mut book = EpubBook::new(metadata());
    book.add_node(None, "<p>x</p>", "One", "section_0001.xhtml")
        .expect("add node");

    let mut archive = package(&book);
    let first = archive.by_index(0).expect("first entry");
    assert_eq!(first.name(), "mimetype");
    assert_eq!(first.compression(), zip::CompressionMethod::Stored);
    drop(first);

    assert_eq!(entry(&mut archive, "mimetype"), "application/epub+zip");
    assert!(entry(&mut archive, "META-INF/container.xml").contains("OEBPS/content.opf"));
}

#[test]
fn package_lists_metadata_manifest_and_spine() {
    let mut book = EpubBook::new(metadata());
    let parent = book
        .add_node(None, "<p>a</p>", "One", "section_0001.xhtml")
        .expect("add node");
    book.add_node(Some(&parent), "<p>b</p>", "Two", "section_0002.xhtml")
        .expect("add child");

    let mut archive = package(&book);
    let opf = entry(&mut archive, "OEBPS/content.opf");

    assert!(opf.contains("<dc:title>Fish &amp; Chips</dc:title>"));
    assert!(opf.contains("<dc:creator>A. Writer</dc:creator>"));
    assert!(opf.contains("<dc:identifier id=\"BookId\">urn:sha256:abc123</dc:identifier>"));
    assert!(opf.contains("<meta property=\"dcterms:modified\">2026-10-19T12:00:00Z</meta>"));
    assert!(opf.contains("href=\"section_0002.xhtml\""));
    assert!(opf.contains("properties=\"nav\""));

    let first = opf.find("idref=\"doc-0001\"").expect("first itemref");
    let second = opf.find("idref=\"doc-0002\"").expect("second itemref");
    assert!(first < second);
}

#[test]
fn documents_render_heading_by_depth_with_stylesheet_link() {
    let mut book = EpubBook::new(metadata()).with_stylesheet("p { color: red; }".to_string());
    let parent = book
        .add_node(None, "<p>a</p>", "One", "section_0001.xhtml")
        .expect("add node");
    book.add_node(Some(&parent), "<p>b</p>", "Sub <One>", "section_0002.xhtml")
        .expect("add child");

    let mut archive = package(&book);
    let child = entry(&mut archive, "OEBPS/section_0002.xhtml");

    assert!(child.contains("<h2>Sub &lt;One&gt;</h2>"));
    assert!(child.contains("<p>b</p>"));
    assert!(child.contains("href=\"styles.css\""));
    assert!(child.contains("xmlns:epub=\"http://www.idpf.org/2007/ops\""));
    assert_eq!(entry(&mut archive, "OEBPS/styles.css"), "p { color: red; }");
}

#[test]
fn nav_nests_children_under_parents() {
    let mut book = EpubBook::new(metadata());
    let one = book
        .add_node(None, "", "One", "section_0001.xhtml")
        .expect("add node");
    book.add_node(Some(&one), "", "One.A", "section_0002.xhtml")
        .expect("add child");
    book.add_node(None, "", "Two", "section_0003.xhtml")
        .expect("add node");

    let mut archive = package(&book);
    let nav = entry(&mut archive, "OEBPS/nav.xhtml");

    assert!(nav.contains(
        "<li><a href=\"section_0001.xhtml\">One</a>\n<ol>\n<li><a href=\"section_0002.xhtml\">One.A</a></li>\n</ol>\n</li>"
    ));
    assert!(nav.contains("<li><a href=\"section_0003.xhtml\">Two</a></li>"));

    let ncx = entry(&mut archive, "OEBPS/toc.ncx");
    assert!(ncx.contains("playOrder=\"3\""));
    assert!(ncx.contains("<content src=\"section_0003.xhtml\"/>"));
}

#[test]
fn add_node_rejects_bad_file_names_and_unknown_parents() {
    let mut book = EpubBook::new(metadata());
    let one = book
        .add_node(None, "", "One", "section_0001.xhtml")
        .expect("add node");

    assert!(book.add_node(None, "", "Dup", "section_0001.xhtml").is_err());
    assert!(book.add_node(None, "", "Blank", "  ").is_err());
    assert!(book.add_node(None, "", "Escape", "../x.xhtml").is_err());
    assert!(book.add_node(None, "", "Reserved", "nav.xhtml").is_err());

    let mut other = EpubBook::new(metadata());
    other
        .add_node(None, "", "A", "a.xhtml")
        .expect("add node");
    other
        .add_node(None, "", "B", "b.xhtml")
        .expect("add node");
    let foreign = other
        .add_node(None, "", "C", "c.xhtml")
        .expect("add node");
    assert!(book.add_node(Some(&foreign), "", "Orphan", "x.xhtml").is_err());

    assert_eq!(book.document_count(), 1);
    assert!(book.add_node(Some(&one), "", "Child", "child.xhtml").is_ok());
}

#[test]
fn sectionized_tree_packages_notes_documents() {
    let levels = ["h2", "h3"]
        .iter()
        .map(|tag| HeadingLevel::new(tag).expect("level"))
        .collect::<Vec<HeadingLevel>>();
    let sectionizer = Sectionizer::new(
        levels,
        FootnoteFormat::SeparateCollection,
        FootnoteScope::Document,
    )
    .expect("sectionizer");
    let tree = sectionizer.sectionize("<h2>A</h2>text((note one))<h3>B</h3>more");

    let mut book = EpubBook::new(metadata());
    let stats = emit_tree(&tree, FootnoteFormat::SeparateCollection, &mut book).expect("emit");
    assert_eq!(stats.footnote_collections, 1);
    assert_eq!(book.document_count(), 3);

    let mut archive = package(&book);
    let section = entry(&mut archive, "OEBPS/section_0001.xhtml");
    assert!(section.contains("href=\"section_0001_notes.xhtml#footnote_1\""));

    let notes = entry(&mut archive, "OEBPS/section_0001_notes.xhtml");
    assert!(notes.contains("<h2>Notes: A</h2>"));
    assert!(notes.contains("<p id=\"footnote_1\"><a href=\"section_0001.xhtml#ref_1\">1</a>: note one</p>"));

    let opf = entry(&mut archive, "OEBPS/content.opf");
    let child = opf.find("idref=\"doc-0002\"").expect("child itemref");
    let notes_ref = opf.find("idref=\"doc-0003\"").expect("notes itemref");
    assert!(child < notes_ref);
}

#[test]
fn preamble_and_heading_notes_reach_the_archive() {
    let levels = ["h2"]
        .iter()
        .map(|tag| HeadingLevel::new(tag).expect("level"))
        .collect::<Vec<HeadingLevel>>();
    let sectionizer =
        Sectionizer::new(levels, FootnoteFormat::InlineAside, FootnoteScope::Document)
            .expect("sectionizer");
    let tree = sectionizer
        .sectionize("<p>Welcome, this is the foreword((pf))</p><h2>A((src))</h2>x");

    let mut book = EpubBook::new(metadata());
    emit_tree(&tree, FootnoteFormat::InlineAside, &mut book).expect("emit");
    assert_eq!(book.document_count(), 2);

    let mut archive = package(&book);
    let front = entry(&mut archive, "OEBPS/section_0000.xhtml");
    assert!(front.contains("<p>Welcome, this is the foreword<sup>"));
    assert!(front.contains(r#"<aside id="footnote_1" epub:type="footnote">pf</aside>"#));

    let section = entry(&mut archive, "OEBPS/section_0001.xhtml");
    assert!(section.contains("<h1>A</h1>"));
    assert!(section.contains(r#"<aside id="footnote_2" epub:type="footnote">src</aside>"#));

    let nav = entry(&mut archive, "OEBPS/nav.xhtml");
    assert!(!nav.contains("(("));
    let opf = entry(&mut archive, "OEBPS/content.opf");
    let front_ref = opf.find("href=\"section_0000.xhtml\"").expect("front matter item");
    let section_ref = opf.find("href=\"section_0001.xhtml\"").expect("section item");
    assert!(front_ref < section_ref);
}
