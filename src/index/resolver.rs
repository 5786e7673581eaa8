//! Host supplied lookup of field values that are not stored in the index.

use crate::document::FieldValue;
use crate::index::posting::DocId;

/// Resolves the value of a field for a document on demand.
///
/// The resolver is consulted when a consumer asks for a field value that is
/// not kept in a sorting vector. It is called outside of the index lock, zero
/// or more times per result, and must not mutate the index.
pub trait ValueResolver: Send + Sync {
    /// Resolve `field` for the document with internal id `doc_id` and
    /// external id `external_id`. `None` means the value is unknown.
    fn resolve(&self, field: &str, doc_id: DocId, external_id: &[u8]) -> Option<FieldValue>;
}

impl<F> ValueResolver for F
where
    F: Fn(&str, DocId, &[u8]) -> Option<FieldValue> + Send + Sync,
{
    fn resolve(&self, field: &str, doc_id: DocId, external_id: &[u8]) -> Option<FieldValue> {
        self(field, doc_id, external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_resolver() {
        let resolver = |field: &str, doc_id: DocId, external_id: &[u8]| {
            Some(FieldValue::Text(format!(
                "{field}-{doc_id}-{}",
                String::from_utf8_lossy(external_id)
            )))
        };
        assert_eq!(
            resolver.resolve("title", 3, b"doc3"),
            Some(FieldValue::from("title-3-doc3"))
        );
    }
}
