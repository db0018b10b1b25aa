// coursepay/src/model/ids.rs

use crate::reference::REFERENCE_DELIMITER;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
  #[error("{kind} must not be empty")]
  Empty { kind: &'static str },

  #[error("{kind} '{value}' must not contain the reference delimiter '---'")]
  ContainsDelimiter { kind: &'static str, value: String },
}

fn validate(kind: &'static str, raw: String) -> Result<String, IdError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(IdError::Empty { kind });
  }
  if trimmed.contains(REFERENCE_DELIMITER) {
    return Err(IdError::ContainsDelimiter {
      kind,
      value: trimmed.to_string(),
    });
  }
  if trimmed.len() == raw.len() {
    Ok(raw)
  } else {
    Ok(trimmed.to_string())
  }
}

// Identifiers are opaque strings owned by the auth provider and the catalog.
// They only need to survive being embedded in an external reference.
macro_rules! string_id {
  ($(#[$meta:meta])* $name:ident, $kind:literal) => {
    $(#[$meta])*
    #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(try_from = "String", into = "String")]
    pub struct $name(String);

    impl $name {
      pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        validate($kind, raw.into()).map($name)
      }

      pub fn as_str(&self) -> &str {
        &self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl TryFrom<String> for $name {
      type Error = IdError;

      fn try_from(raw: String) -> Result<Self, Self::Error> {
        $name::new(raw)
      }
    }

    impl From<$name> for String {
      fn from(id: $name) -> String {
        id.0
      }
    }

    impl AsRef<str> for $name {
      fn as_ref(&self) -> &str {
        &self.0
      }
    }
  };
}

string_id!(
  /// Identifier of a buyer as issued by the authentication provider.
  UserId,
  "user id"
);

string_id!(
  /// Identifier of a course in the catalog.
  CourseId,
  "course id"
);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trims_surrounding_whitespace() {
    let id = UserId::new("  u-42 ").unwrap();
    assert_eq!(id.as_str(), "u-42");
  }

  #[test]
  fn rejects_empty_and_delimited_ids() {
    assert_eq!(CourseId::new("   "), Err(IdError::Empty { kind: "course id" }));
    assert!(matches!(
      UserId::new("a---b"),
      Err(IdError::ContainsDelimiter { kind: "user id", .. })
    ));
  }

  #[test]
  fn deserializes_through_validation() {
    let ok: CourseId = serde_json::from_str("\"rust-101\"").unwrap();
    assert_eq!(ok.to_string(), "rust-101");
    assert!(serde_json::from_str::<CourseId>("\"\"").is_err());
  }
}
