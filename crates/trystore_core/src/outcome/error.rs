//! Structured, composable error values.

use serde::Serialize;
use std::any::type_name;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure payload of every `Outcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultError {
    /// Caller-supplied text, rendered verbatim.
    Message(String),
    /// A native error captured at a call boundary.
    Fault { kind: String, message: String },
    /// A labelled group whose children are kept in order.
    Composite {
        label: String,
        children: Vec<ResultError>,
    },
}

/// Nested rendering of a `ResultError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorStructure {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub children: Vec<ErrorStructure>,
}

impl ResultError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Captures `err` and its source chain as a leaf labelled with its type name.
    pub fn from_fault<E: Error + ?Sized>(err: &E) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !message.contains(&cause_text) {
                message.push_str(": ");
                message.push_str(&cause_text);
            }
            source = cause.source();
        }

        Self::Fault {
            kind: short_type_name(type_name::<E>()).to_string(),
            message,
        }
    }

    pub fn composite(label: impl Into<String>, children: Vec<ResultError>) -> Self {
        Self::Composite {
            label: label.into(),
            children,
        }
    }

    /// Nests `self` under `label`.
    pub fn context(self, label: impl Into<String>) -> Self {
        Self::composite(label, vec![self])
    }

    pub fn children(&self) -> &[ResultError] {
        match self {
            Self::Composite { children, .. } => children,
            Self::Message(_) | Self::Fault { .. } => &[],
        }
    }

    /// Flat rendering: every node depth-first, joined with `"; "`.
    pub fn error_string(&self) -> String {
        let mut parts = Vec::new();
        self.collect_parts(&mut parts);
        parts.join("; ")
    }

    pub fn error_structure(&self) -> ErrorStructure {
        match self {
            Self::Message(message) => ErrorStructure {
                message: message.clone(),
                kind: None,
                children: Vec::new(),
            },
            Self::Fault { kind, message } => ErrorStructure {
                message: message.clone(),
                kind: Some(kind.clone()),
                children: Vec::new(),
            },
            Self::Composite { label, children } => ErrorStructure {
                message: label.clone(),
                kind: None,
                children: children.iter().map(Self::error_structure).collect(),
            },
        }
    }

    fn collect_parts(&self, parts: &mut Vec<String>) {
        match self {
            Self::Message(message) | Self::Fault { message, .. } => parts.push(message.clone()),
            Self::Composite { label, children } => {
                parts.push(label.clone());
                for child in children {
                    child.collect_parts(parts);
                }
            }
        }
    }
}

impl Display for ResultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error_string())
    }
}

impl Error for ResultError {}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::ResultError;
    use std::error::Error;
    use std::fmt::{Display, Formatter};

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl Display for Outer {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "outer failed")
        }
    }

    impl Display for Inner {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "disk on fire")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    impl Error for Inner {}

    #[test]
    fn fault_keeps_source_chain_and_type_label() {
        let err = ResultError::from_fault(&Outer(Inner));
        assert_eq!(
            err,
            ResultError::Fault {
                kind: "Outer".to_string(),
                message: "outer failed: disk on fire".to_string(),
            }
        );
    }

    #[test]
    fn message_renders_verbatim() {
        let err = ResultError::message("Error Message");
        assert_eq!(err.error_string(), "Error Message");
        assert!(err.children().is_empty());
    }

    #[test]
    fn composite_flattens_depth_first() {
        let err = ResultError::composite(
            "outer",
            vec![
                ResultError::message("a").context("inner"),
                ResultError::message("b"),
            ],
        );
        assert_eq!(err.error_string(), "outer; inner; a; b");
        assert_eq!(err.to_string(), err.error_string());
    }

    #[test]
    fn structure_serializes_nested_children() {
        let err = ResultError::from_fault(&Inner).context("Failed to load");
        let json = serde_json::to_value(err.error_structure()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "message": "Failed to load",
                "children": [
                    { "message": "disk on fire", "kind": "Inner", "children": [] }
                ]
            })
        );
    }
}
