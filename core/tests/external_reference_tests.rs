// tests/external_reference_tests.rs
mod common;

use common::*;
use coursepay::{ExternalReference, ReferenceParseError};
use uuid::Uuid;

#[test]
fn test_parses_user_and_course() {
  let reference = ExternalReference::parse("U1---C1").unwrap();
  assert_eq!(reference.user_id(), &uid("U1"));
  assert_eq!(reference.course_id(), &cid("C1"));
  assert_eq!(reference.disambiguator(), None);
}

#[test]
fn test_parses_optional_disambiguator() {
  let reference = ExternalReference::parse("user-9---rust-101---3f2a").unwrap();
  assert_eq!(reference.user_id(), &uid("user-9"));
  assert_eq!(reference.course_id(), &cid("rust-101"));
  assert_eq!(reference.disambiguator(), Some("3f2a"));
  assert_eq!(reference.sale_id(), None);
}

#[test]
fn test_display_round_trips_for_checkout_attempts() {
  let sale_id = Uuid::new_v4();
  let reference = ExternalReference::for_attempt(uid("U1"), cid("C1"), sale_id);
  let rendered = reference.to_string();

  assert_eq!(rendered, format!("U1---C1---{}", sale_id.simple()));
  assert_eq!(rendered.parse::<ExternalReference>().unwrap(), reference);
  assert_eq!(rendered.parse::<ExternalReference>().unwrap().sale_id(), Some(sale_id));
  assert_eq!(ExternalReference::new(uid("U1"), cid("C1")).to_string(), "U1---C1");
}

#[test]
fn test_rejects_malformed_references() {
  assert_eq!(ExternalReference::parse(""), Err(ReferenceParseError::Empty));
  assert_eq!(ExternalReference::parse("   "), Err(ReferenceParseError::Empty));
  assert!(matches!(
    ExternalReference::parse("only-a-user"),
    Err(ReferenceParseError::MissingCourse { .. })
  ));
  assert!(matches!(
    ExternalReference::parse("U1---"),
    Err(ReferenceParseError::EmptySegment { .. })
  ));
  assert!(matches!(
    ExternalReference::parse("---C1"),
    Err(ReferenceParseError::EmptySegment { .. })
  ));
  assert!(matches!(
    ExternalReference::parse("a---b---c---d"),
    Err(ReferenceParseError::TooManySegments { segments: 4, .. })
  ));
}

#[test]
fn test_ownership_check() {
  let reference = ExternalReference::parse("U1---C1").unwrap();
  assert!(reference.belongs_to(&uid("U1")));
  assert!(!reference.belongs_to(&uid("U2")));
}
