use chrono::{TimeZone, Utc};
use quality_core::document::{Document, DocumentError, DocumentId, Metadata, Provenance};
use quality_core::types::identifiers::{AlgorithmVersion, DocumentIdError};

fn make_doc(id: &str, content: Vec<u8>, metadata: Metadata) -> Result<Document, DocumentError> {
    Document::ingest(
        DocumentId::new(id).unwrap(),
        format!("https://example.org/{id}"),
        "example.org".to_string(),
        "policy".to_string(),
        Provenance::Collected,
        Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(),
        content,
        metadata,
    )
}

#[test]
fn invariant_utf8_rejection() {
    // Invalid UTF-8 sequence
    let invalid_bytes = vec![0, 159, 146, 150];
    let result = make_doc("doc-1", invalid_bytes, Metadata::new());
    assert!(matches!(result, Err(DocumentError::InvalidUtf8(_))));
}

#[test]
fn invariant_id_validation() {
    assert!(matches!(DocumentId::new(""), Err(DocumentIdError::Empty)));
    assert!(matches!(
        DocumentId::new("has space"),
        Err(DocumentIdError::Whitespace(_))
    ));
    let id = DocumentId::new("doc-42").unwrap();
    assert_eq!(id.as_str(), "doc-42");
}

#[test]
fn approx_tokens_is_ceil_len_over_four() {
    let empty = make_doc("doc-empty", Vec::new(), Metadata::new()).unwrap();
    assert_eq!(empty.approx_tokens(), 0);

    let one = make_doc("doc-one", b"a".to_vec(), Metadata::new()).unwrap();
    assert_eq!(one.approx_tokens(), 1);

    let six = make_doc("doc-six", b"a bbbb".to_vec(), Metadata::new()).unwrap();
    assert_eq!(six.approx_tokens(), 2);

    let eight = make_doc("doc-eight", b"abcdefgh".to_vec(), Metadata::new()).unwrap();
    assert_eq!(eight.approx_tokens(), 2);
}

#[test]
fn char_len_counts_chars_not_bytes() {
    let doc = make_doc("doc-unicode", "héllo".as_bytes().to_vec(), Metadata::new()).unwrap();
    assert_eq!(doc.char_len(), 5);
    assert_eq!(doc.content.len(), 6);
}

#[test]
fn metadata_merge_overrides_common_keys() {
    let mut extracted = Metadata::new();
    extracted.insert_string("title", "Extracted Title");
    extracted.insert_number("line_count", 47);

    let mut provided = Metadata::new();
    provided.insert_string("title", "Provided Title");

    extracted.merge(provided);

    let doc = make_doc("doc-meta", b"content".to_vec(), extracted).unwrap();
    assert_eq!(
        doc.metadata.get("title"),
        Some(&quality_core::document::MetadataValue::String(
            "Provided Title".into()
        ))
    );
    assert_eq!(
        doc.metadata.get("line_count"),
        Some(&quality_core::document::MetadataValue::Number(47))
    );
}

#[test]
fn metadata_keyword_terms_lowercase_and_split() {
    let mut metadata = Metadata::new();
    metadata.insert_string("tags", "Climate POLICY");
    metadata.insert_number("year", 2026);

    let terms = metadata.keyword_terms();
    assert_eq!(terms, vec!["climate".to_string(), "policy".to_string()]);
}

#[test]
fn algorithm_version_ordering_and_display() {
    let v1 = AlgorithmVersion::new(1);
    let v2 = v1.bump();
    assert!(v1 < v2);
    assert_eq!(v2.as_u32(), 2);
    assert_eq!(v1.to_string(), "v1");
    assert_eq!(v2.to_string(), "v2");
}
