//! Forward-only record stream over a map-data export
//!
//! Decodes the source file node-by-node without loading the whole document,
//! filtering to one record kind per pass and yielding each matching element
//! with its fully materialized children. Peak memory is bounded by one
//! record's subtree, never by the file size.
//!
//! A stream is single-pass and non-restartable; the pipeline opens a fresh
//! stream for every record kind it imports.

use mapdepot_common::{ImportError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read buffer size for the underlying file
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// The three record kinds a source file can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// A geolocated point (`node` element)
    Point,
    /// An ordered chain of point references (`way` element)
    Path,
    /// A collection of point/path/group references with roles (`relation` element)
    Group,
}

impl RecordKind {
    /// All kinds, in import order
    pub const ALL: [RecordKind; 3] = [RecordKind::Point, RecordKind::Path, RecordKind::Group];

    /// The element name this kind uses in the source file
    pub fn element_name(self) -> &'static str {
        match self {
            RecordKind::Point => "node",
            RecordKind::Path => "way",
            RecordKind::Group => "relation",
        }
    }

    /// Match an element name from the source file against the record kinds
    pub fn from_element_name(name: &[u8]) -> Option<Self> {
        match name {
            b"node" => Some(RecordKind::Point),
            b"way" => Some(RecordKind::Path),
            b"relation" => Some(RecordKind::Group),
            _ => None,
        }
    }

    /// The destination collection for this kind
    pub fn collection_name(self) -> &'static str {
        match self {
            RecordKind::Point => "points",
            RecordKind::Path => "paths",
            RecordKind::Group => "groups",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.element_name())
    }
}

/// One decoded record: its kind, attributes, and immediate child elements
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub kind: RecordKind,
    /// Attribute key/value pairs in document order
    pub attributes: Vec<(String, String)>,
    /// Immediate children (tag, reference, and member elements) in document order
    pub children: Vec<RawChild>,
}

impl RawRecord {
    /// Look up an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A child element of a record, materialized with its attributes
#[derive(Debug, Clone)]
pub struct RawChild {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl RawChild {
    /// Look up an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Lazy, finite, single-pass sequence of raw records of one kind
///
/// Wrapper elements, bounding-box metadata, and records of other kinds are
/// skipped without materialization.
pub struct RecordStream {
    reader: Reader<BufReader<File>>,
    kind: RecordKind,
    buf: Vec<u8>,
}

impl RecordStream {
    /// Open a fresh stream over `path`, filtered to `kind`
    pub fn open(path: impl AsRef<Path>, kind: RecordKind) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = Reader::from_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file));

        Ok(Self {
            reader,
            kind,
            buf: Vec::with_capacity(8192),
        })
    }

    /// Advance the cursor to the next matching record, or None at end of file
    fn read_next(&mut self) -> Result<Option<RawRecord>> {
        loop {
            self.buf.clear();
            // The event borrows the read buffer, so its attributes are copied
            // out before the cursor advances into the record's subtree.
            let (attributes, has_children) = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(ref element)) => {
                    if RecordKind::from_element_name(element.name().as_ref()) != Some(self.kind) {
                        continue;
                    }
                    (collect_attributes(element)?, true)
                },
                Ok(Event::Empty(ref element)) => {
                    if RecordKind::from_element_name(element.name().as_ref()) != Some(self.kind) {
                        continue;
                    }
                    (collect_attributes(element)?, false)
                },
                Ok(Event::Eof) => return Ok(None),
                Ok(_) => continue,
                Err(e) => return Err(ImportError::source_format(e.to_string())),
            };

            let children = if has_children {
                self.materialize_children()?
            } else {
                Vec::new()
            };

            return Ok(Some(RawRecord {
                kind: self.kind,
                attributes,
                children,
            }));
        }
    }

    /// Materialize the immediate children of the record element just entered
    ///
    /// Runs until the record's end tag. Grandchildren are not collected but
    /// their depth is tracked so the cursor leaves the subtree balanced.
    fn materialize_children(&mut self) -> Result<Vec<RawChild>> {
        let mut children = Vec::new();
        let mut depth = 0usize;
        let mut buf = Vec::with_capacity(512);

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref element)) => {
                    if depth == 0 {
                        children.push(child_from(element)?);
                    }
                    depth += 1;
                },
                Ok(Event::Empty(ref element)) => {
                    if depth == 0 {
                        children.push(child_from(element)?);
                    }
                },
                Ok(Event::End(_)) => {
                    if depth == 0 {
                        return Ok(children);
                    }
                    depth -= 1;
                },
                Ok(Event::Eof) => {
                    return Err(ImportError::source_format(format!(
                        "unexpected end of file inside a {} record",
                        self.kind
                    )));
                },
                Ok(_) => {},
                Err(e) => return Err(ImportError::source_format(e.to_string())),
            }
        }
    }
}

impl Iterator for RecordStream {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}

/// Decode a child element into an owned [`RawChild`]
fn child_from(element: &BytesStart<'_>) -> Result<RawChild> {
    Ok(RawChild {
        name: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
        attributes: collect_attributes(element)?,
    })
}

/// Decode an element's attributes into owned key/value pairs, document order
fn collect_attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
    let mut attributes = Vec::new();

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| ImportError::source_format(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| ImportError::source_format(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(attributes)
}
