//! EPUB 3 packaging for sectionized documents.

mod writer;

#[cfg(test)]
mod tests;

pub use writer::{BookMetadata, EpubBook};
