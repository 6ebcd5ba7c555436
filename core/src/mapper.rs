//! Tree-to-record mapping.
//!
//! # Design
//! The mapper knows nothing about stories, notes or projects: the caller
//! picks the subtree, the mapper walks it. Leaves become scalars through the
//! `TypeHint` table, branches become nested records, and a later sibling with
//! the same name replaces an earlier one.

use log::trace;

use crate::error::{Result, TrackerError};
use crate::markup::{Content, Element};
use crate::record::{Record, Value};

/// Coercions recognised in a leaf's `type` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Integer,
    Text,
}

impl TypeHint {
    /// Anything other than `"integer"`, including no attribute, is text.
    pub fn from_attribute(attribute: Option<&str>) -> Self {
        match attribute {
            Some("integer") => TypeHint::Integer,
            _ => TypeHint::Text,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TypeHint::Integer => "integer",
            TypeHint::Text => "text",
        }
    }

    pub fn coerce(self, raw: &str) -> Result<Value> {
        match self {
            TypeHint::Integer => raw.parse::<i64>().map(Value::Integer).map_err(|_| TrackerError::Parse {
                hint: self.as_str(),
                value: raw.to_string(),
            }),
            TypeHint::Text => Ok(Value::Text(raw.to_string())),
        }
    }
}

/// Coerce leaf text according to its `type` attribute.
pub fn coerce(type_hint: Option<&str>, raw: &str) -> Result<Value> {
    TypeHint::from_attribute(type_hint).coerce(raw)
}

/// Map a sequence of sibling elements into one record.
pub fn map_children(children: &[Element]) -> Result<Record> {
    let mut record = Record::new();
    for child in children {
        let value = match &child.content {
            Content::Leaf(text) => coerce(child.type_hint.as_deref(), text)?,
            Content::Branch(grandchildren) => Value::Record(map_children(grandchildren)?),
        };
        if record.insert(child.name.as_str(), value).is_some() {
            trace!("<{}> repeated, keeping the last occurrence", child.name);
        }
    }
    Ok(record)
}

/// Map the children of `element`; the element's own name is not recorded.
pub fn map_element(element: &Element) -> Result<Record> {
    map_children(element.children())
}
