//! Participant wire protocol
//!
//! ### Client → Server
//! ```json
//! {"type": "insert", "pos": 0, "char": "h"}
//! {"type": "insert", "pos": 1, "char": "i", "site": "alice", "counter": 2}
//! {"type": "delete", "pos": 0}
//! ```
//!
//! ### Server → Client
//! ```json
//! {"text": "hi"}
//! {"error": "Unknown operation type: paste"}
//! ```

use serde::{Deserialize, Serialize};

use crate::crdt::Identifier;
use crate::error::OperationError;

/// Raw inbound frame, exactly as a client sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationMessage {
    #[serde(rename = "type")]
    pub kind: String,

    /// Physical index into the element array
    #[serde(default)]
    pub pos: i64,

    #[serde(rename = "char", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<i64>,
}

impl OperationMessage {
    pub fn insert(pos: i64, value: impl Into<String>) -> Self {
        Self {
            kind: "insert".to_string(),
            pos,
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn delete(pos: i64) -> Self {
        Self {
            kind: "delete".to_string(),
            pos,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, site: impl Into<String>, counter: i64) -> Self {
        self.site = Some(site.into());
        self.counter = Some(counter);
        self
    }
}

/// A validated edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// `id` is `None` when the coordinator must mint one
    Insert {
        pos: i64,
        value: char,
        id: Option<Identifier>,
    },
    Delete {
        pos: i64,
    },
}

impl Operation {
    /// Parse and validate one text frame.
    pub fn parse(text: &str) -> Result<Self, OperationError> {
        let message: OperationMessage =
            serde_json::from_str(text).map_err(|e| OperationError::Malformed(e.to_string()))?;
        Self::try_from(message)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Insert { .. } => "insert",
            Operation::Delete { .. } => "delete",
        }
    }
}

impl TryFrom<OperationMessage> for Operation {
    type Error = OperationError;

    fn try_from(message: OperationMessage) -> Result<Self, Self::Error> {
        match message.kind.as_str() {
            "insert" => {
                let value = single_char(message.value.as_deref())
                    .ok_or_else(|| OperationError::InvalidChar(message.value.clone()))?;

                // An empty site is treated the same as an absent one; a site
                // without a counter takes counter 0.
                let id = message
                    .site
                    .filter(|s| !s.is_empty())
                    .map(|site| Identifier::new(site, message.counter.unwrap_or(0)));

                Ok(Operation::Insert {
                    pos: message.pos,
                    value,
                    id,
                })
            }
            "delete" => Ok(Operation::Delete { pos: message.pos }),
            other => Err(OperationError::UnknownType(other.to_string())),
        }
    }
}

fn single_char(value: Option<&str>) -> Option<char> {
    let mut chars = value?.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Full rendered document
    State { text: String },
    /// Sent only to the originator, and only when rejection notices are enabled
    Rejected { error: String },
}

impl ServerMessage {
    pub fn state(text: impl Into<String>) -> Self {
        ServerMessage::State { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_insert_without_id() {
        let op = Operation::parse(r#"{"type":"insert","pos":2,"char":"a"}"#).unwrap();
        assert_eq!(
            op,
            Operation::Insert {
                pos: 2,
                value: 'a',
                id: None
            }
        );
    }

    #[test]
    fn test_parse_insert_with_id() {
        let op =
            Operation::parse(r#"{"type":"insert","pos":0,"char":"é","site":"B","counter":9}"#)
                .unwrap();
        assert_eq!(
            op,
            Operation::Insert {
                pos: 0,
                value: 'é',
                id: Some(Identifier::new("B", 9))
            }
        );
    }

    #[test]
    fn test_empty_site_is_minted() {
        let op = Operation::parse(r#"{"type":"insert","char":"a","site":"","counter":4}"#).unwrap();
        assert!(matches!(op, Operation::Insert { id: None, pos: 0, .. }));
    }

    #[test]
    fn test_site_without_counter_defaults_to_zero() {
        let op = Operation::parse(r#"{"type":"insert","char":"a","site":"B"}"#).unwrap();
        assert_eq!(
            op,
            Operation::Insert {
                pos: 0,
                value: 'a',
                id: Some(Identifier::new("B", 0))
            }
        );
    }

    #[test]
    fn test_negative_counter_accepted() {
        let op =
            Operation::parse(r#"{"type":"insert","pos":0,"char":"a","site":"B","counter":-3}"#)
                .unwrap();
        assert_eq!(
            op,
            Operation::Insert {
                pos: 0,
                value: 'a',
                id: Some(Identifier::new("B", -3))
            }
        );
    }

    #[test]
    fn test_char_must_be_single() {
        for frame in [
            r#"{"type":"insert","pos":0,"char":"ab"}"#,
            r#"{"type":"insert","pos":0,"char":""}"#,
            r#"{"type":"insert","pos":0}"#,
        ] {
            assert!(
                matches!(Operation::parse(frame), Err(OperationError::InvalidChar(_))),
                "frame should be rejected: {}",
                frame
            );
        }
    }

    #[test]
    fn test_unknown_type() {
        let err = Operation::parse(r#"{"type":"paste","pos":0}"#).unwrap_err();
        assert_eq!(err, OperationError::UnknownType("paste".to_string()));
    }

    #[test]
    fn test_not_json() {
        assert!(matches!(
            Operation::parse("hello"),
            Err(OperationError::Malformed(_))
        ));
    }

    #[test]
    fn test_server_message_shape() {
        let json = serde_json::to_string(&ServerMessage::state("hi")).unwrap();
        assert_eq!(json, r#"{"text":"hi"}"#);

        let json = serde_json::to_string(&ServerMessage::Rejected {
            error: "nope".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"nope"}"#);
    }

    #[test]
    fn test_builder_matches_parse() {
        let text = serde_json::to_string(&OperationMessage::insert(1, "q").with_id("S", 3)).unwrap();
        assert_eq!(
            Operation::parse(&text).unwrap(),
            Operation::Insert {
                pos: 1,
                value: 'q',
                id: Some(Identifier::new("S", 3))
            }
        );
    }
}
