//! Canonical byte form of an entry's content.
//!
//! The canonical form is compact JSON (no insignificant whitespace) of
//! [`EntryContent`]: keys `id, category, thought, context, timestamp` in that
//! order, every mapping inside `context` with sorted keys, the timestamp as
//! RFC 3339 UTC with millisecond precision. Numbers use `serde_json`'s
//! shortest round-trip formatting.

use echo_types::EntryContent;

use crate::hasher::HasherError;

/// Serialize entry content to its canonical bytes.
pub fn canonical_bytes(content: &EntryContent<'_>) -> Result<Vec<u8>, HasherError> {
    serde_json::to_vec(content).map_err(|e| HasherError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_types::{context_from_json, Context, EntryId, Timestamp};
    use serde_json::json;

    #[test]
    fn exact_canonical_form() {
        let context = context_from_json(json!({"reason": "async"})).unwrap();
        let content = EntryContent {
            id: EntryId::new(1),
            category: "milestone",
            thought: "Switched to FastAPI",
            context: &context,
            timestamp: Timestamp::from_millis(1_761_573_792_481).unwrap(),
        };
        let bytes = canonical_bytes(&content).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            concat!(
                r#"{"id":1,"category":"milestone","thought":"Switched to FastAPI","#,
                r#""context":{"reason":"async"},"timestamp":"2025-10-27T14:03:12.481Z"}"#
            )
        );
    }

    #[test]
    fn context_insertion_order_is_irrelevant() {
        let mut a = Context::new();
        a.insert("zeta".into(), 1i64.into());
        a.insert("alpha".into(), 2i64.into());
        let mut b = Context::new();
        b.insert("alpha".into(), 2i64.into());
        b.insert("zeta".into(), 1i64.into());

        assert_eq!(
            canonical_bytes(&content_with(&a)).unwrap(),
            canonical_bytes(&content_with(&b)).unwrap()
        );
    }

    fn content_with(context: &Context) -> EntryContent<'_> {
        EntryContent {
            id: EntryId::FIRST,
            category: "decision",
            thought: "t",
            context,
            timestamp: Timestamp::from_millis(0).unwrap(),
        }
    }

    #[test]
    fn non_ascii_text_is_kept_verbatim() {
        let context = Context::new();
        let content = EntryContent {
            id: EntryId::FIRST,
            category: "learning",
            thought: "Mémoire 💙",
            context: &context,
            timestamp: Timestamp::from_millis(0).unwrap(),
        };
        let text = String::from_utf8(canonical_bytes(&content).unwrap()).unwrap();
        assert!(text.contains("Mémoire 💙"));
    }
}
