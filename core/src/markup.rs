//! Parsed markup tree for tracker responses.
//!
//! # Design
//! An element is either a leaf carrying text or a branch carrying child
//! elements; the distinction is made once, while parsing, so the mapper never
//! has to ask "does this node have children". Text that sits between the
//! children of a branch is dropped. Attributes other than `type` carry no
//! meaning for the tracker dialect and are not kept.

use std::borrow::Cow;

use log::trace;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, TrackerError};

/// Deepest element nesting `Element::parse` accepts. The mapper, the
/// selectors and `Drop` all recurse once per level.
pub const MAX_DEPTH: usize = 256;

/// Content of an element: text for a leaf, ordered children for a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Leaf(String),
    Branch(Vec<Element>),
}

/// A node of the parsed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Value of the `type` attribute, e.g. `"integer"`.
    pub type_hint: Option<String>,
    pub content: Content,
}

impl Element {
    pub fn leaf(name: &str, text: &str) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            content: Content::Leaf(text.to_string()),
        }
    }

    pub fn branch(name: &str, children: Vec<Element>) -> Self {
        Self {
            name: name.to_string(),
            type_hint: None,
            content: Content::Branch(children),
        }
    }

    pub fn with_type(mut self, hint: &str) -> Self {
        self.type_hint = Some(hint.to_string());
        self
    }

    /// Parse a complete document and return its root element.
    pub fn parse(bytes: &[u8]) -> Result<Element> {
        let text = std::str::from_utf8(bytes).map_err(|e| unrecognized(e.to_string()))?;
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Partial> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| unrecognized(format!("{e} at byte {}", reader.error_position())))?;
            match event {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(unrecognized("more than one root element".to_string()));
                    }
                    check_depth(&stack)?;
                    stack.push(Partial::open(&start)?);
                }
                Event::Empty(start) => {
                    check_depth(&stack)?;
                    let element = Partial::open(&start)?.close();
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let partial = stack
                        .pop()
                        .ok_or_else(|| unrecognized("unbalanced closing tag".to_string()))?;
                    attach(&mut stack, &mut root, partial.close())?;
                }
                Event::Text(text) => {
                    let decoded = text.decode().map_err(|e| unrecognized(e.to_string()))?;
                    push_text(&mut stack, &decoded)?;
                }
                Event::CData(data) => {
                    let decoded = data.decode().map_err(|e| unrecognized(e.to_string()))?;
                    push_text(&mut stack, &decoded)?;
                }
                Event::GeneralRef(reference) => {
                    let resolved = match reference
                        .resolve_char_ref()
                        .map_err(|e| unrecognized(e.to_string()))?
                    {
                        Some(ch) => Cow::Owned(ch.to_string()),
                        None => {
                            let name = reference.decode().map_err(|e| unrecognized(e.to_string()))?;
                            let entity = resolve_predefined_entity(&name)
                                .ok_or_else(|| unrecognized(format!("unknown entity &{name};")))?;
                            Cow::Borrowed(entity)
                        }
                    };
                    push_text(&mut stack, &resolved)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(unrecognized(format!("unclosed element <{}>", open.name)));
        }
        root.ok_or_else(|| unrecognized("empty document".to_string()))
    }

    /// Child elements; empty for a leaf.
    pub fn children(&self) -> &[Element] {
        match &self.content {
            Content::Branch(children) => children,
            Content::Leaf(_) => &[],
        }
    }

    /// Leaf text; empty for a branch.
    pub fn text(&self) -> &str {
        match &self.content {
            Content::Leaf(text) => text,
            Content::Branch(_) => "",
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.content, Content::Leaf(_))
    }

    /// First element named `name` in document order, the receiver included.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(name))
    }

    /// Every element matching a `>`-separated child path such as
    /// `"stories > story"`, in document order. The first step may match at
    /// any depth; each later step must be a direct child of the previous.
    pub fn find_all(&self, selector: &str) -> Vec<&Element> {
        let steps: Vec<&str> = selector
            .split('>')
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .collect();
        let mut found = Vec::new();
        if let Some((first, rest)) = steps.split_first() {
            self.collect_path(first, rest, &mut found);
        }
        found
    }

    fn collect_path<'a>(&'a self, first: &str, rest: &[&str], found: &mut Vec<&'a Element>) {
        if self.name == first {
            descend(self, rest, found);
        }
        for child in self.children() {
            child.collect_path(first, rest, found);
        }
    }
}

fn descend<'a>(element: &'a Element, steps: &[&str], found: &mut Vec<&'a Element>) {
    match steps.split_first() {
        None => found.push(element),
        Some((step, rest)) => {
            for child in element.children().iter().filter(|c| c.name == *step) {
                descend(child, rest, found);
            }
        }
    }
}

/// An element whose closing tag has not been seen yet.
struct Partial {
    name: String,
    type_hint: Option<String>,
    text: String,
    children: Vec<Element>,
}

impl Partial {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut type_hint = None;
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| unrecognized(e.to_string()))?;
            if attribute.key.as_ref() == b"type" {
                let raw = String::from_utf8_lossy(&attribute.value);
                let value = unescape(&raw).map_err(|e| unrecognized(e.to_string()))?;
                type_hint = Some(value.into_owned());
            }
        }
        Ok(Self {
            name,
            type_hint,
            text: String::new(),
            children: Vec::new(),
        })
    }

    fn close(self) -> Element {
        let content = if self.children.is_empty() {
            Content::Leaf(self.text)
        } else {
            Content::Branch(self.children)
        };
        Element {
            name: self.name,
            type_hint: self.type_hint,
            content,
        }
    }
}

fn attach(stack: &mut [Partial], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(unrecognized("more than one root element".to_string()));
            }
            trace!("parsed document rooted at <{}>", element.name);
            *root = Some(element);
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Partial], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(open) => open.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err(unrecognized("text outside of the root element".to_string())),
    }
    Ok(())
}

fn check_depth(stack: &[Partial]) -> Result<()> {
    if stack.len() >= MAX_DEPTH {
        return Err(unrecognized(format!("nesting too deep (more than {MAX_DEPTH} levels)")));
    }
    Ok(())
}

fn unrecognized(detail: String) -> TrackerError {
    TrackerError::Validation(format!("unrecognized response shape: {detail}"))
}
