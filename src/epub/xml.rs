//! Just enough of an XML element tree for package documents.
//!
//! Names are kept exactly as written (`dc:title`, `opf:role`); structural
//! lookups compare local names so the package's namespace prefixes do not
//! matter, while metadata templates compare qualified names.

use std::io;
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::errors::IllFormedError;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name as written, including any prefix.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Value of the attribute with exactly this qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of an attribute, or `None` when absent or empty.
    pub fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Every element below this one, depth-first in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.elements().collect::<Vec<_>>().into_iter().rev().collect(),
        }
    }

    /// First descendant whose local name is `local`.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.descendants().find(|e| e.local_name() == local)
    }

    /// All descendants whose local name is `local`, in document order.
    pub fn find_all<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.descendants().filter(move |e| e.local_name() == local)
    }

    /// Concatenated text of direct text children, trimmed.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::Text(t) = node {
                text.push_str(t);
            }
        }
        text.trim().to_string()
    }
}

/// Pre-order element iterator returned by [`Element::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<&'a Element> {
        let next = self.stack.pop()?;
        let children: Vec<_> = next.elements().collect();
        self.stack.extend(children.into_iter().rev());
        Some(next)
    }
}

/// Parse `content` into its root element. `path` is only used in errors.
pub fn parse(content: &str, path: &str) -> Result<Element> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    // Synthetic document node; the real root ends up as its only element child.
    let mut stack = vec![Element::new(String::new(), Vec::new())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&e, path)?),
            Ok(Event::Empty(e)) => {
                let element = start_element(&e, path)?;
                push_child(&mut stack, Node::Element(element));
            }
            Ok(Event::End(_)) => {
                // quick-xml checks that end tags match, so the stack never
                // pops the document node here
                if stack.len() > 1
                    && let Some(element) = stack.pop()
                {
                    push_child(&mut stack, Node::Element(element));
                }
            }
            Ok(Event::Text(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::CData(e)) => {
                push_text(&mut stack, &String::from_utf8_lossy(e.as_ref()));
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                if let Some(resolved) = resolve_entity(&entity) {
                    push_text(&mut stack, &resolved);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::xml(path, e)),
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.pop().map(|e| e.name).unwrap_or_default();
        return Err(Error::xml(
            path,
            quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(open)),
        ));
    }
    stack
        .pop()
        .and_then(|document| {
            document.children.into_iter().find_map(|node| match node {
                Node::Element(e) => Some(e),
                Node::Text(_) => None,
            })
        })
        .ok_or_else(|| {
            let missing =
                io::Error::new(io::ErrorKind::InvalidData, "document has no root element");
            Error::xml(path, quick_xml::Error::Io(Arc::new(missing)))
        })
}

fn start_element(e: &BytesStart<'_>, path: &str) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::xml(path, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|err| Error::xml(path, err))?;
        attributes.push((key, value.into_owned()));
    }
    Ok(Element::new(name, attributes))
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(parent) = stack.last_mut() {
        match parent.children.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => parent.children.push(Node::Text(text.to_string())),
        }
    }
}

/// Strip a namespace prefix (`dc:title` -> `title`).
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Resolve the predefined XML entities and character references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(String::from)
}
