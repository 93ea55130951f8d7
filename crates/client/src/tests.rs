use crate::client::truncate;
use crate::envelope::{Envelope, status_message};
use crate::error::ClientError;
use fitfind_core::{FitFindError, WishlistItem};

#[test]
fn test_truncate_within_limit() {
    assert_eq!(truncate("hello", 10), "hello");
}

#[test]
fn test_truncate_exceeds_limit() {
    assert_eq!(truncate("hello world", 5), "hello");
}

#[test]
fn test_truncate_unicode_boundary() {
    let s = "привет";
    let result = truncate(s, 3);
    assert!(result.len() <= 3);
}

#[test]
fn test_envelope_success_false_is_rejected() {
    let err = Envelope::parse(r#"{"success": false, "error": "Product ID is required"}"#, "t")
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref m) if m == "Product ID is required"));
}

#[test]
fn test_envelope_missing_success_is_accepted() {
    let mut envelope = Envelope::parse(r#"{"file_id": "f1"}"#, "t").unwrap();
    let file_id: String = envelope.take("file_id").unwrap();
    assert_eq!(file_id, "f1");
}

#[test]
fn test_envelope_missing_payload_key() {
    let mut envelope = Envelope::parse(r#"{"success": true}"#, "t").unwrap();
    let err = envelope.take::<WishlistItem>("item").unwrap_err();
    assert!(matches!(err, ClientError::MissingField(ref f) if f == "item"));
}

#[test]
fn test_envelope_wrong_payload_shape() {
    let mut envelope = Envelope::parse(r#"{"success": true, "item": [1, 2]}"#, "t").unwrap();
    let err = envelope.take::<WishlistItem>("item").unwrap_err();
    assert!(matches!(err, ClientError::JsonParse { .. }));
    assert!(matches!(FitFindError::from(err), FitFindError::Decode(_)));
}

#[test]
fn test_envelope_non_object_body() {
    assert!(Envelope::parse("[]", "t").is_err());
    assert!(Envelope::parse("not json", "t").is_err());
}

#[test]
fn test_envelope_page_requires_pagination() {
    let mut envelope = Envelope::parse(r#"{"success": true, "wishlist": []}"#, "t").unwrap();
    assert!(envelope.take_page::<WishlistItem>("wishlist").is_err());
}

#[test]
fn test_status_message_prefers_error_field() {
    assert_eq!(status_message(r#"{"success": false, "error": "nope"}"#), "nope");
    assert_eq!(status_message("Bad Gateway"), "Bad Gateway");
}

#[test]
fn test_rejected_already_maps_to_conflict() {
    let err: FitFindError = ClientError::Rejected("Item is already in your wishlist".to_owned()).into();
    assert!(err.is_conflict());
}

#[test]
fn test_retry_decision_comes_from_mapped_error() {
    let unavailable: FitFindError =
        ClientError::HttpStatus { code: 503, message: "down".to_owned() }.into();
    let rejected: FitFindError = ClientError::Rejected("Invalid product".to_owned()).into();
    let missing: FitFindError = ClientError::MissingField("wishlist".to_owned()).into();
    assert!(unavailable.is_retryable());
    assert!(!rejected.is_retryable());
    assert!(!missing.is_retryable());
}
