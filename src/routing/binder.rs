//! Positional parameter binding.
//!
//! Tokens left after method selection are bound, in order, to the labels the
//! method leaf declares. Count constraints are checked before any label is
//! bound, so a violation never leaves partial state behind.
//!
//! With the force-parameters policy on, too few or too many tokens is an
//! [`ArityViolation`] and the caller falls back (usually a redirect). With it
//! off, binding is lenient: missing required labels bind to
//! [`Bound::Missing`], missing optional labels to [`Bound::Absent`], and
//! excess tokens stay unbound.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::routing::tokenizer::Segment;
use crate::routing::tree::ParameterLabel;

/// Value bound to one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bound {
    Present(String),
    /// Optional label with no token.
    Absent,
    /// Required label with no token (lenient mode only).
    Missing,
}

impl Bound {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Bound::Present(value) => Some(value),
            Bound::Absent | Bound::Missing => None,
        }
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bound::Present(value) => serializer.serialize_str(value),
            Bound::Absent => serializer.serialize_none(),
            Bound::Missing => serializer.serialize_bool(false),
        }
    }
}

/// Labels in declaration order with their bound values.
pub type BoundParameters = IndexMap<String, Bound>;

/// Token count outside what the method accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArityViolation {
    #[error("{given} parameters given, {required} required")]
    Missing { required: usize, given: usize },

    #[error("{given} parameters given, at most {declared} declared")]
    Excess { declared: usize, given: usize },
}

/// Bind trailing tokens to declared labels.
pub fn bind(
    labels: &[ParameterLabel],
    tokens: &[Segment],
    force: bool,
) -> Result<BoundParameters, ArityViolation> {
    let required = labels.iter().filter(|l| l.is_required()).count();
    let given = tokens.len();

    if force {
        if given < required {
            return Err(ArityViolation::Missing { required, given });
        }
        if given > labels.len() {
            return Err(ArityViolation::Excess { declared: labels.len(), given });
        }
    }

    let mut bound = BoundParameters::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        let value = match tokens.get(i) {
            Some(segment) => Bound::Present(segment.raw().to_string()),
            None if label.is_required() && force => {
                return Err(ArityViolation::Missing { required, given });
            }
            None if label.is_required() => Bound::Missing,
            None => Bound::Absent,
        };
        bound.insert(label.name().to_string(), value);
    }

    Ok(bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::tokenizer::tokenize;

    fn labels() -> Vec<ParameterLabel> {
        vec![ParameterLabel::required("id"), ParameterLabel::optional("name")]
    }

    #[test]
    fn test_required_missing() {
        let err = bind(&labels(), &[], true).unwrap_err();
        assert_eq!(err, ArityViolation::Missing { required: 1, given: 0 });
    }

    #[test]
    fn test_optional_absent() {
        let bound = bind(&labels(), &tokenize("/42"), true).unwrap();
        assert_eq!(bound["id"], Bound::Present("42".into()));
        assert_eq!(bound["name"], Bound::Absent);
        assert_eq!(bound.keys().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_all_present_keeps_case() {
        let bound = bind(&labels(), &tokenize("/42/Alice"), true).unwrap();
        assert_eq!(bound["name"].as_str(), Some("Alice"));
    }

    #[test]
    fn test_excess() {
        let err = bind(&labels(), &tokenize("/1/2/3"), true).unwrap_err();
        assert_eq!(err, ArityViolation::Excess { declared: 2, given: 3 });
    }

    #[test]
    fn test_no_labels_no_tokens() {
        assert!(bind(&[], &[], true).unwrap().is_empty());
        assert!(bind(&[], &tokenize("/x"), true).is_err());
    }

    #[test]
    fn test_lenient_mode() {
        let bound = bind(&labels(), &[], false).unwrap();
        assert_eq!(bound["id"], Bound::Missing);
        assert_eq!(bound["name"], Bound::Absent);

        let bound = bind(&labels(), &tokenize("/1/2/3"), false).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound["name"].as_str(), Some("2"));
    }

    #[test]
    fn test_serialized_sentinels() {
        let bound = bind(&labels(), &[], false).unwrap();
        let json = serde_json::to_value(&bound).unwrap();
        assert_eq!(json, serde_json::json!({"id": false, "name": null}));
    }
}
