//! Typed events emitted by state mutations.
//!
//! Events are collected on the transaction [`Context`](crate::Context) and
//! discarded together with the write set when the transaction fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single string-valued event attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

/// An event emitted by a module handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type, e.g. `create_trust_registry`.
    pub kind: String,
    /// Attributes in insertion order.
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Create an event with no attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push(EventAttribute {
            key: key.into(),
            value: value.to_string(),
        });
        self
    }

    /// Look up an attribute value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for a in &self.attributes {
            write!(f, " {}={}", a.key, a.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let ev = Event::new("add_did").attr("did", "did:example:1").attr("years", 2);
        assert_eq!(ev.kind, "add_did");
        assert_eq!(ev.get("years"), Some("2"));
        assert_eq!(ev.get("missing"), None);
        assert_eq!(format!("{}", ev), "add_did did=did:example:1 years=2");
    }
}
