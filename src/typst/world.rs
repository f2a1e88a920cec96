//! A single-source Typst `World` over a shared font set.
//!
//! - One in-memory main file per compile; no imports, packages or binary assets.
//! - Fonts are loaded once into a [`FontSet`] and borrowed by every world built from it.
//! - `font(index)` indexes the same vector the `FontBook` was built from, so the two stay
//!   aligned.

use std::{fs, path::PathBuf};

use fontdb::{Database, Source as FontSource};
use log::debug;
use typst::{
    Library, LibraryExt,
    diag::{FileError, FileResult},
    foundations::{Bytes, Datetime},
    layout::PagedDocument,
    syntax::{FileId, Source, VirtualPath},
    text::{Font, FontBook},
    utils::LazyHash,
};

use crate::tex::TexError;

/// Parsed fonts plus the book Typst selects faces from.
pub struct FontSet {
    book: LazyHash<FontBook>,
    fonts: Vec<Font>,
}

impl FontSet {
    /// System fonts discovered through `fontdb`, followed by the fonts embedded in
    /// `typst-assets` (New Computer Modern Math among them).
    pub fn system() -> Self {
        let mut fonts = load_system_fonts();
        let system = fonts.len();
        fonts.extend(embedded_fonts());
        debug!(
            "typst fonts: {system} system face(s), {} embedded",
            fonts.len() - system
        );
        Self::from_fonts(fonts)
    }

    /// Only the embedded fonts: identical output on every machine.
    pub fn embedded() -> Self {
        Self::from_fonts(embedded_fonts().collect())
    }

    fn from_fonts(fonts: Vec<Font>) -> Self {
        let book = FontBook::from_fonts(fonts.iter());
        Self {
            book: LazyHash::new(book),
            fonts,
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// File-backed faces only; unreadable or unparsable faces are skipped.
fn load_system_fonts() -> Vec<Font> {
    let mut db = Database::new();
    db.load_system_fonts();

    let mut fonts = Vec::new();
    for face in db.faces() {
        let (path, index) = match &face.source {
            FontSource::File(p) => (p.clone(), face.index),
            _ => continue,
        };
        let Ok(bytes) = fs::read(&path) else {
            continue;
        };
        if let Some(font) = Font::new(Bytes::new(bytes), index) {
            fonts.push(font);
        }
    }
    fonts
}

fn embedded_fonts() -> impl Iterator<Item = Font> {
    typst_assets::fonts().filter_map(|data| Font::new(Bytes::new(data), 0))
}

/// World for one compile: the main source plus borrowed library and fonts.
pub struct TypstWorld<'a> {
    library: &'a LazyHash<Library>,
    fonts: &'a FontSet,
    main: FileId,
    source: Source,
}

impl<'a> TypstWorld<'a> {
    pub fn new(library: &'a LazyHash<Library>, fonts: &'a FontSet, text: String) -> Self {
        let main = FileId::new(None, VirtualPath::new("main.typ"));
        Self {
            library,
            fonts,
            main,
            source: Source::new(main, text),
        }
    }

    /// The main source; spans in the compiled document resolve against it.
    pub fn main_source(&self) -> &Source {
        &self.source
    }

    pub fn compile(&self) -> Result<PagedDocument, TexError> {
        let warned = typst::compile::<PagedDocument>(self);
        for w in &warned.warnings {
            debug!("typst warning: {}", w.message);
        }
        warned.output.map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| e.message.to_string()).collect();
            TexError::Typst(messages.join("; "))
        })
    }
}

impl typst::World for TypstWorld<'_> {
    fn library(&self) -> &LazyHash<Library> {
        self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.fonts.book
    }

    fn main(&self) -> FileId {
        self.main
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main {
            Ok(self.source.clone())
        } else {
            Err(FileError::NotFound(PathBuf::from("<memory>")))
        }
    }

    fn file(&self, _id: FileId) -> FileResult<Bytes> {
        Err(FileError::NotFound(PathBuf::from("<memory>")))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        None
    }
}

/// The standard library every world borrows.
pub fn library() -> LazyHash<Library> {
    LazyHash::new(Library::default())
}
