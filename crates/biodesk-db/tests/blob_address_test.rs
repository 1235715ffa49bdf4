//! Tests for the blob URL ⇄ object-name contract.
//!
//! Every stored record keeps only a blob URL; cleanup depends on recovering
//! the exact object name from it.

use biodesk_db::{blob_path_from_url, object_url, Error, ADDRESS_SCHEME_VERSION};

const BASE: &str = "https://files.example.com";

#[test]
fn test_scheme_version_is_pinned() {
    assert_eq!(ADDRESS_SCHEME_VERSION, 1);
}

#[test]
fn test_round_trip_plain_name() {
    let url = object_url(BASE, "biodesk", "0190-face.jpg");
    assert_eq!(blob_path_from_url(&url).unwrap(), "0190-face.jpg");
}

#[test]
fn test_round_trip_names_needing_encoding() {
    for name in [
        "0190-my photo.jpg",
        "0190-résumé.png",
        "0190-a+b=c&d.png",
        "0190-100%.png",
        "0190-what?.png",
        "0190-my..photo.png",
    ] {
        let url = object_url(BASE, "biodesk", name);
        assert_eq!(
            blob_path_from_url(&url).unwrap(),
            name,
            "round trip failed for {:?} via {}",
            name,
            url
        );
    }
}

#[test]
fn test_encoded_name_contains_no_raw_separators() {
    let url = object_url(BASE, "biodesk", "a b?c#d.png");
    let object_part = url.rsplit("/o/").next().unwrap();
    let encoded = object_part.split('?').next().unwrap();
    assert!(!encoded.contains(' '));
    assert!(!encoded.contains('#'));
    assert!(!encoded.contains('/'));
}

#[test]
fn test_url_without_query_is_accepted() {
    assert_eq!(
        blob_path_from_url("https://h/v0/b/bkt/o/abc.png").unwrap(),
        "abc.png"
    );
}

#[test]
fn test_extra_query_parameters_are_ignored() {
    assert_eq!(
        blob_path_from_url("https://h/v0/b/bkt/o/abc.png?alt=media&token=xyz").unwrap(),
        "abc.png"
    );
}

#[test]
fn test_bucket_named_o_uses_last_marker() {
    let url = object_url(BASE, "o", "abc.png");
    assert_eq!(url, "https://files.example.com/v0/b/o/o/abc.png?alt=media");
    assert_eq!(blob_path_from_url(&url).unwrap(), "abc.png");
}

#[test]
fn test_missing_marker_is_rejected() {
    let err = blob_path_from_url("https://h/files/abc.png").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_empty_object_segment_is_rejected() {
    assert!(matches!(
        blob_path_from_url("https://h/v0/b/bkt/o/?alt=media"),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_nested_path_after_marker_is_rejected() {
    assert!(matches!(
        blob_path_from_url("https://h/v0/b/bkt/o/dir/abc.png"),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_encoded_traversal_is_rejected() {
    // %2F decodes to '/', %2E%2E to ".."
    assert!(blob_path_from_url("https://h/v0/b/bkt/o/..%2Fetc%2Fpasswd").is_err());
    assert!(blob_path_from_url("https://h/v0/b/bkt/o/%2E%2E").is_err());
}

#[test]
fn test_invalid_utf8_encoding_is_rejected() {
    assert!(matches!(
        blob_path_from_url("https://h/v0/b/bkt/o/%FF%FE.png"),
        Err(Error::Validation(_))
    ));
}
