//! Sequence document: physical element list plus tombstones
//!
//! Edits address the *physical* array (tombstones included). The canonical
//! order is only restored by [`Document::merge`], which stable-sorts every
//! element by its [`Identifier`].

use serde::{Deserialize, Serialize};

use super::Identifier;
use crate::error::DocumentError;

/// One logical character position, alive or tombstoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: Identifier,
    #[serde(rename = "char")]
    pub value: char,
    pub deleted: bool,
}

impl Element {
    pub fn new(id: Identifier, value: char) -> Self {
        Self {
            id,
            value,
            deleted: false,
        }
    }
}

/// Replicated character sequence. Elements are never removed, only flagged.
#[derive(Debug, Clone, Default)]
pub struct Document {
    elements: Vec<Element>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `element` at physical `position`; `position == len()` appends.
    pub fn insert(&mut self, element: Element, position: usize) -> Result<(), DocumentError> {
        if position > self.elements.len() {
            return Err(self.invalid(position));
        }
        self.elements.insert(position, element);
        Ok(())
    }

    /// Tombstone the element at physical `position`.
    ///
    /// Deleting an element that is already deleted succeeds without changing
    /// anything.
    pub fn delete(&mut self, position: usize) -> Result<(), DocumentError> {
        let length = self.elements.len();
        match self.elements.get_mut(position) {
            Some(element) => {
                element.deleted = true;
                Ok(())
            }
            None => Err(DocumentError::InvalidPosition {
                position: wire_position(position),
                length,
            }),
        }
    }

    /// Restore canonical order. `sort_by` is stable, so elements with equal
    /// identifiers keep their arrival order.
    pub fn merge(&mut self) {
        self.elements.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Visible text: live characters in current physical order.
    pub fn render(&self) -> String {
        self.elements
            .iter()
            .filter(|e| !e.deleted)
            .map(|e| e.value)
            .collect()
    }

    /// Physical length, tombstones included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn visible_len(&self) -> usize {
        self.elements.iter().filter(|e| !e.deleted).count()
    }

    pub fn tombstones(&self) -> usize {
        self.elements.len() - self.visible_len()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.elements.iter().any(|e| &e.id == id)
    }

    fn invalid(&self, position: usize) -> DocumentError {
        DocumentError::InvalidPosition {
            position: wire_position(position),
            length: self.elements.len(),
        }
    }
}

impl FromIterator<Element> for Document {
    /// Collects elements in arrival order; call [`Document::merge`] afterwards.
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

/// Convert a signed wire position into a physical index.
///
/// Negative positions never address an element, so they fail the same way an
/// out-of-range index does.
pub fn physical_index(position: i64, length: usize) -> Result<usize, DocumentError> {
    usize::try_from(position).map_err(|_| DocumentError::InvalidPosition { position, length })
}

fn wire_position(position: usize) -> i64 {
    i64::try_from(position).unwrap_or(i64::MAX)
}
