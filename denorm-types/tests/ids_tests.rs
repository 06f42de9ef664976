use denorm_types::{DocumentId, Error};
use proptest::prelude::*;
use serde_json::{json, Value};

// ── Minting and ordering ─────────────────────────────────────────

#[test]
fn later_ids_sort_after_earlier_ones() {
    let ids: Vec<DocumentId> = (0..64).map(|_| DocumentId::new()).collect();

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());

    std::thread::sleep(std::time::Duration::from_millis(2));
    let later = DocumentId::new();
    assert!(ids.iter().all(|id| *id < later));
}

// ── Text form ────────────────────────────────────────────────────

#[test]
fn text_form_is_lowercase_hyphenated() {
    let text = DocumentId::new().to_string();
    assert_eq!(text.len(), 36);
    assert_eq!(text.matches('-').count(), 4);
    assert_eq!(text, text.to_lowercase());
}

#[test]
fn parse_accepts_uppercase_text() {
    let id = DocumentId::new();
    assert_eq!(DocumentId::parse(&id.to_string().to_uppercase()).unwrap(), id);
}

#[test]
fn malformed_text_names_the_value() {
    let err = DocumentId::parse("parent-1").unwrap_err();

    assert!(matches!(err, Error::InvalidDocumentId { ref value, .. } if value == "parent-1"));
    assert!(err.to_string().contains("`parent-1`"));
    assert!("".parse::<DocumentId>().is_err());
}

// ── Reference fields ─────────────────────────────────────────────

#[test]
fn id_is_stored_as_json_string() {
    let id = DocumentId::new();
    let stored = json!({ "parent_id": id });

    assert_eq!(stored["parent_id"], Value::String(id.to_string()));
    assert_eq!(Value::from(id), stored["parent_id"]);
    assert_eq!(serde_json::from_value::<DocumentId>(stored["parent_id"].clone()).unwrap(), id);
}

#[test]
fn from_value_reads_reference_fields() {
    let id = DocumentId::new();

    assert_eq!(DocumentId::from_value(&Value::from(id)), Some(id));
    assert_eq!(DocumentId::from_value(&Value::Null), None);
    assert_eq!(DocumentId::from_value(&json!(42)), None);
    assert_eq!(DocumentId::from_value(&json!("not an id")), None);
}

proptest! {
    #[test]
    fn arbitrary_text_never_panics(text in ".{0,48}") {
        let parsed = DocumentId::parse(&text);
        let read = DocumentId::from_value(&Value::String(text));
        prop_assert_eq!(parsed.ok(), read);
    }
}
