//! Forward-only, depth-first cursors over an XML event stream.
//!
//! A [`XmlWalker`] owns the `quick-xml` reader. Cursors are views over one
//! nesting level (or, for descendant cursors, a whole subtree) of that single
//! stream: advancing a cursor skips whatever is left of the element it last
//! returned, and a child cursor borrows its parent mutably so the parent
//! cannot move until the child is dropped. Nothing is ever revisited.
//!
//! Elements are returned with their attributes already unescaped and owned.

use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{CoverageError, Result};

/// A start (or empty) element.
#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    depth: usize,
}

impl Element {
    fn from_start(e: &BytesStart<'_>, depth: usize) -> std::result::Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::InvalidAttr)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self { name, attrs, depth })
    }

    pub fn local_name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Nesting depth; the document element is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Which elements a cursor yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFilter {
    Any,
    Named(&'static str),
}

impl ElementFilter {
    fn accepts(&self, element: &Element) -> bool {
        match self {
            ElementFilter::Any => true,
            ElementFilter::Named(name) => element.local_name() == *name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Children,
    Descendants,
}

enum Step {
    Open(Element),
    Leaf(Element),
    Close,
    Eof,
}

/// Owner of the underlying event stream.
pub struct XmlWalker<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
}

impl<R: BufRead> XmlWalker<R> {
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            depth: 0,
        }
    }

    /// Cursor over the document element(s).
    pub fn root(&mut self) -> Cursor<'_, R> {
        Cursor {
            walker: self,
            level: 0,
            scope: Scope::Children,
            filter: ElementFilter::Any,
            current: None,
            done: false,
        }
    }

    fn xml_err(&self, source: quick_xml::Error) -> CoverageError {
        CoverageError::Xml {
            source,
            position: self.reader.buffer_position(),
        }
    }

    fn next_step(&mut self) -> Result<Step> {
        loop {
            self.buf.clear();
            let step = match self.reader.read_event_into(&mut self.buf) {
                Err(e) => Err(e),
                Ok(Event::Start(ref e)) => Element::from_start(e, self.depth).map(Step::Open),
                Ok(Event::Empty(ref e)) => Element::from_start(e, self.depth).map(Step::Leaf),
                Ok(Event::End(_)) => Ok(Step::Close),
                Ok(Event::Eof) => Ok(Step::Eof),
                Ok(_) => continue,
            };
            let step = step.map_err(|e| self.xml_err(e))?;
            match step {
                Step::Open(_) => self.depth += 1,
                Step::Close => self.depth = self.depth.saturating_sub(1),
                Step::Eof if self.depth > 0 => {
                    return Err(CoverageError::malformed(format!(
                        "unexpected end of document at position {} ({} element(s) left open)",
                        self.reader.buffer_position(),
                        self.depth
                    )));
                }
                _ => {}
            }
            return Ok(step);
        }
    }
}

/// The last element a cursor returned.
#[derive(Debug, Clone, Copy)]
struct Current {
    depth: usize,
    has_content: bool,
}

/// A forward-only iterator over the elements at one level (or one subtree).
pub struct Cursor<'w, R> {
    walker: &'w mut XmlWalker<R>,
    level: usize,
    scope: Scope,
    filter: ElementFilter,
    current: Option<Current>,
    done: bool,
}

impl<R: BufRead> Cursor<'_, R> {
    /// Move to the next matching element. Returns `None` once the enclosing
    /// element has been closed (or the document ended).
    pub fn advance(&mut self) -> Result<Option<Element>> {
        if self.done {
            return Ok(None);
        }
        loop {
            match self.walker.next_step()? {
                Step::Open(element) => {
                    if self.wants(&element) {
                        self.current = Some(Current {
                            depth: element.depth,
                            has_content: true,
                        });
                        return Ok(Some(element));
                    }
                }
                Step::Leaf(element) => {
                    if self.wants(&element) {
                        self.current = Some(Current {
                            depth: element.depth,
                            has_content: false,
                        });
                        return Ok(Some(element));
                    }
                }
                Step::Close => {
                    if self.walker.depth < self.level {
                        return Ok(self.finish());
                    }
                }
                Step::Eof => return Ok(self.finish()),
            }
        }
    }

    /// Replace the filter for subsequent calls to [`Cursor::advance`].
    pub fn set_filter(&mut self, filter: ElementFilter) {
        self.filter = filter;
    }

    /// Cursor over the direct children of the element last returned.
    pub fn children(&mut self, filter: ElementFilter) -> Cursor<'_, R> {
        self.descend(Scope::Children, filter)
    }

    /// Cursor over every element below the element last returned.
    pub fn descendants(&mut self, filter: ElementFilter) -> Cursor<'_, R> {
        self.descend(Scope::Descendants, filter)
    }

    fn descend(&mut self, scope: Scope, filter: ElementFilter) -> Cursor<'_, R> {
        // The element must still be open: a leaf, or one whose end tag was
        // already consumed by an earlier child cursor, has nothing left.
        let (level, done) = match self.current {
            Some(cur) if cur.has_content && self.walker.depth > cur.depth => (cur.depth + 1, false),
            Some(cur) => (cur.depth + 1, true),
            None => (self.level + 1, true),
        };
        Cursor {
            walker: &mut *self.walker,
            level,
            scope,
            filter,
            current: None,
            done,
        }
    }

    fn wants(&self, element: &Element) -> bool {
        let in_scope = match self.scope {
            Scope::Children => element.depth == self.level,
            Scope::Descendants => element.depth >= self.level,
        };
        in_scope && self.filter.accepts(element)
    }

    fn finish(&mut self) -> Option<Element> {
        self.done = true;
        self.current = None;
        None
    }
}
