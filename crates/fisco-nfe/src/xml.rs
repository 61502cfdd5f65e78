//! # Owned XML Element Tree
//!
//! A small DOM built from `quick_xml` events. Names are stored without
//! namespace prefixes, so `nfe:infNFe` and `infNFe` resolve alike.
//!
//! Lookups never fail: [`Element::child`] is the one "first child with
//! this name, or absent" primitive and every path accessor is built on it.

use fisco_core::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// An XML element with its attributes, text, and child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<Element, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(Element::open(e)?),
                Ok(Event::Empty(ref e)) => {
                    let element = Element::open(e)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(ref e)) => {
                    let text = e.unescape().map_err(malformed)?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    let text = std::str::from_utf8(e).map_err(malformed)?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(text);
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ParseError::Malformed("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(malformed(e)),
            }
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::Malformed(format!(
                "unexpected end of document inside <{}>",
                open.name
            )));
        }
        root.ok_or_else(|| ParseError::Malformed("document has no root element".into()))
    }

    fn open(start: &BytesStart<'_>) -> Result<Element, ParseError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(malformed)?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// Local name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by local name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text content, absent when empty.
    pub fn text(&self) -> Option<&str> {
        let t = self.text.trim();
        (!t.is_empty()).then_some(t)
    }

    /// First child element named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All child elements named `name`, in document order.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child element of any name.
    pub fn first_element(&self) -> Option<&Element> {
        self.children.first()
    }

    /// Follow a path of child names.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Text at the end of a path of child names.
    pub fn text_at(&self, path: &[&str]) -> Option<&str> {
        self.find(path).and_then(Element::text)
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn malformed(e: impl std::fmt::Display) -> ParseError {
    ParseError::Malformed(e.to_string())
}
