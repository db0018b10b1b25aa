// coursepay/src/reference.rs

//! The correlation key sent to the gateway at checkout and read back from it
//! on return and during sync: `"<user_id>---<course_id>"`, optionally followed
//! by `"---<disambiguator>"`.

use crate::model::{CourseId, UserId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub const REFERENCE_DELIMITER: &str = "---";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceParseError {
  #[error("external reference is empty")]
  Empty,

  #[error("external reference '{raw}' has no course segment")]
  MissingCourse { raw: String },

  #[error("external reference '{raw}' has an empty segment")]
  EmptySegment { raw: String },

  #[error("external reference '{raw}' has {segments} segments, expected 2 or 3")]
  TooManySegments { raw: String, segments: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalReference {
  user_id: UserId,
  course_id: CourseId,
  disambiguator: Option<String>,
}

impl ExternalReference {
  pub fn new(user_id: UserId, course_id: CourseId) -> Self {
    Self {
      user_id,
      course_id,
      disambiguator: None,
    }
  }

  /// Reference for one checkout attempt. The sale id keeps two attempts for the
  /// same course distinguishable on the gateway side.
  pub fn for_attempt(user_id: UserId, course_id: CourseId, sale_id: Uuid) -> Self {
    Self {
      user_id,
      course_id,
      disambiguator: Some(sale_id.simple().to_string()),
    }
  }

  pub fn parse(raw: &str) -> Result<Self, ReferenceParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
      return Err(ReferenceParseError::Empty);
    }

    let segments: Vec<&str> = raw.split(REFERENCE_DELIMITER).collect();
    if segments.len() < 2 {
      return Err(ReferenceParseError::MissingCourse { raw: raw.to_string() });
    }
    if segments.len() > 3 {
      return Err(ReferenceParseError::TooManySegments {
        raw: raw.to_string(),
        segments: segments.len(),
      });
    }
    if segments.iter().any(|s| s.trim().is_empty()) {
      return Err(ReferenceParseError::EmptySegment { raw: raw.to_string() });
    }

    // Segments come from splitting on the delimiter and are non-blank, so id
    // validation cannot fail here. Map it anyway rather than trusting that.
    let user_id = UserId::new(segments[0]).map_err(|_| ReferenceParseError::EmptySegment { raw: raw.to_string() })?;
    let course_id = CourseId::new(segments[1]).map_err(|_| ReferenceParseError::EmptySegment { raw: raw.to_string() })?;

    Ok(Self {
      user_id,
      course_id,
      disambiguator: segments.get(2).map(|s| s.trim().to_string()),
    })
  }

  pub fn user_id(&self) -> &UserId {
    &self.user_id
  }

  pub fn course_id(&self) -> &CourseId {
    &self.course_id
  }

  pub fn disambiguator(&self) -> Option<&str> {
    self.disambiguator.as_deref()
  }

  /// The checkout attempt this reference was issued for, when the
  /// disambiguator is a sale id written by `for_attempt`.
  pub fn sale_id(&self) -> Option<Uuid> {
    self.disambiguator.as_deref().and_then(|d| Uuid::parse_str(d).ok())
  }

  pub fn belongs_to(&self, user_id: &UserId) -> bool {
    &self.user_id == user_id
  }
}

impl fmt::Display for ExternalReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}{}", self.user_id, REFERENCE_DELIMITER, self.course_id)?;
    if let Some(extra) = &self.disambiguator {
      write!(f, "{}{}", REFERENCE_DELIMITER, extra)?;
    }
    Ok(())
  }
}

impl FromStr for ExternalReference {
  type Err = ReferenceParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ExternalReference::parse(s)
  }
}
