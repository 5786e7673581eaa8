use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use quarry::document::{Document, FieldValue};
use quarry::error::ErrorKind;
use quarry::index::{Index, IndexConfig, ValueResolver};
use quarry::query::{QueryNode, ResultsIterator};
use quarry::schema::{FieldOptions, TypeFlags};

fn ids(iterator: Option<ResultsIterator>) -> Vec<String> {
    iterator
        .map(|it| {
            it.external_ids()
                .unwrap()
                .into_iter()
                .map(|id| String::from_utf8(id).unwrap())
                .collect()
        })
        .unwrap_or_default()
}

fn count(index: &Index, node: &QueryNode) -> usize {
    ids(index.get_results_iterator(node).unwrap()).len()
}

#[test]
fn test_text_token_and_prefix() {
    let index = Index::create("text", None);
    index
        .create_field("f1", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();

    let mut doc = Document::simple("doc1");
    doc.add_text("f1", "hello", TypeFlags::FULLTEXT);
    index.add_document(doc).unwrap();

    let token = QueryNode::token(Some("f1"), "hello");
    assert_eq!(ids(index.get_results_iterator(&token).unwrap()), vec!["doc1"]);

    let prefix = QueryNode::prefix(Some("f1"), "hel");
    assert_eq!(ids(index.get_results_iterator(&prefix).unwrap()), vec!["doc1"]);

    assert!(index.drop_document(b"doc1").unwrap());
    assert!(!index.drop_document(b"doc1").unwrap());

    // Either the null iterator or an empty one is acceptable here.
    assert!(ids(index.get_results_iterator(&token).unwrap()).is_empty());
    assert!(ids(index.get_results_iterator(&prefix).unwrap()).is_empty());
}

#[test]
fn test_unknown_term_is_null_iterator() {
    let index = Index::create("null", None);
    index
        .create_field("f1", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();
    let mut doc = Document::simple("doc1");
    doc.add_text("f1", "hello", TypeFlags::DEFAULT);
    index.add_document(doc).unwrap();

    assert!(
        index
            .get_results_iterator(&QueryNode::token(Some("f1"), "world"))
            .unwrap()
            .is_none()
    );
    assert!(
        index
            .get_results_iterator(&QueryNode::prefix(Some("f1"), "wor"))
            .unwrap()
            .is_none()
    );
    // A negated null iterator is the whole universe.
    let not = QueryNode::negate(QueryNode::token(Some("f1"), "world"));
    assert_eq!(ids(index.get_results_iterator(&not).unwrap()), vec!["doc1"]);
}

#[test]
fn test_numeric_range() {
    let index = Index::create("numeric", None);
    index
        .create_field("f1", TypeFlags::NUMERIC, FieldOptions::NONE)
        .unwrap();
    let mut doc = Document::simple("doc1");
    doc.add_number("f1", 20.0, TypeFlags::NUMERIC);
    index.add_document(doc).unwrap();

    let inside = QueryNode::numeric_range("f1", 10.0, 30.0, true, true);
    assert_eq!(ids(index.get_results_iterator(&inside).unwrap()), vec!["doc1"]);

    let bound = QueryNode::numeric_range("f1", 20.0, 30.0, false, true);
    assert_eq!(count(&index, &bound), 1);
    let excluded = QueryNode::numeric_range("f1", 20.0, 30.0, true, true);
    assert_eq!(count(&index, &excluded), 0);
    let open = QueryNode::numeric_range("f1", f64::NEG_INFINITY, f64::INFINITY, false, false);
    assert_eq!(count(&index, &open), 1);

    let err = index
        .get_results_iterator(&QueryNode::numeric_range("missing", 0.0, 1.0, false, false))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownField);
}

#[test]
fn test_numeric_range_excludes_outside_values() {
    let index = Index::create("numeric_bounds", None);
    index
        .create_field("f1", TypeFlags::NUMERIC, FieldOptions::NONE)
        .unwrap();
    for (id, value) in [("low", 5.0), ("mid", 20.0), ("high", 35.0)] {
        let mut doc = Document::simple(id);
        doc.add_number("f1", value, TypeFlags::NUMERIC);
        index.add_document(doc).unwrap();
    }

    let inclusive = QueryNode::numeric_range("f1", 10.0, 30.0, false, false);
    assert_eq!(ids(index.get_results_iterator(&inclusive).unwrap()), vec!["mid"]);
    let exclusive = QueryNode::numeric_range("f1", 5.0, 35.0, true, true);
    assert_eq!(ids(index.get_results_iterator(&exclusive).unwrap()), vec!["mid"]);
    let edges = QueryNode::numeric_range("f1", 5.0, 35.0, false, false);
    assert_eq!(count(&index, &edges), 3);
    let below = QueryNode::numeric_range("f1", f64::NEG_INFINITY, 10.0, false, false);
    assert_eq!(ids(index.get_results_iterator(&below).unwrap()), vec!["low"]);
}

#[test]
fn test_tag_token_and_prefix() {
    let index = Index::create("tags", None);
    index
        .create_field("f1", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();
    let mut doc = Document::simple("doc1");
    doc.add_text("f1", "World", TypeFlags::TAG);
    index.add_document(doc).unwrap();

    let mut tag = QueryNode::tag("f1");
    tag.add_child(QueryNode::token(None, "world")).unwrap();
    assert_eq!(ids(index.get_results_iterator(&tag).unwrap()), vec!["doc1"]);

    let mut tag = QueryNode::tag("f1");
    tag.add_child(QueryNode::prefix(None, "wor")).unwrap();
    assert_eq!(ids(index.get_results_iterator(&tag).unwrap()), vec!["doc1"]);

    let mut tag = QueryNode::tag("f1");
    tag.add_child(QueryNode::token(None, "wor")).unwrap();
    assert!(index.get_results_iterator(&tag).unwrap().is_none());
}

#[test]
fn test_phonetic_matching_is_per_field() {
    let index = Index::create("phonetic", None);
    index
        .create_field("text1", TypeFlags::FULLTEXT, FieldOptions::PHONETIC)
        .unwrap();
    index
        .create_field("text2", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();

    let mut doc = Document::simple("doc1");
    doc.add_text("text1", "felix", TypeFlags::FULLTEXT);
    doc.add_text("text2", "felix", TypeFlags::FULLTEXT);
    index.add_document(doc).unwrap();

    let phonetic = QueryNode::token(Some("text1"), "phelix");
    assert_eq!(ids(index.get_results_iterator(&phonetic).unwrap()), vec!["doc1"]);

    let literal_only = QueryNode::token(Some("text2"), "phelix");
    assert!(index.get_results_iterator(&literal_only).unwrap().is_none());

    let exact = QueryNode::token(Some("text2"), "felix");
    assert_eq!(count(&index, &exact), 1);
}

#[test]
fn test_massive_prefix_with_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let resolver: Arc<dyn ValueResolver> = Arc::new(move |field: &str, _doc: u64, external_id: &[u8]| {
        seen.fetch_add(1, Ordering::Relaxed);
        assert_eq!(field, "f1");
        Some(FieldValue::Text(String::from_utf8_lossy(external_id).into_owned()))
    });
    let index = Index::create("massive", Some(resolver));
    index
        .create_field("f1", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();

    let docs: Vec<Document> = (0..1000)
        .map(|i| {
            Document::builder(format!("doc{i}"))
                .add_text("f1", format!("tag-{i}"))
                .build()
        })
        .collect();
    index.add_documents(docs).unwrap();

    let mut tag = QueryNode::tag("f1");
    tag.add_child(QueryNode::prefix(None, "tag-")).unwrap();
    let mut iterator = index.get_results_iterator(&tag).unwrap().unwrap();

    let mut total = 0;
    let mut last = 0;
    while let Some(hit) = iterator.next_hit().unwrap() {
        assert!(hit.doc_id > last);
        last = hit.doc_id;
        let value = iterator.current_value("f1").unwrap();
        assert_eq!(
            value,
            Some(FieldValue::Text(String::from_utf8(hit.external_id).unwrap()))
        );
        total += 1;
    }
    assert_eq!(total, 1000);
    assert_eq!(calls.load(Ordering::Relaxed), 1000);
}

#[test]
fn test_prefix_expansion_limit() {
    let config = IndexConfig::builder().max_prefix_expansions(10).build();
    let index = Index::with_config("limited", None, config).unwrap();
    index
        .create_field("f1", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();
    for i in 0..100 {
        let doc = Document::builder(format!("doc{i}"))
            .add_text("f1", format!("tag-{i}"))
            .build();
        index.add_document(doc).unwrap();
    }

    let mut tag = QueryNode::tag("f1");
    tag.add_child(QueryNode::prefix(None, "tag-")).unwrap();
    assert_eq!(count(&index, &tag), 10);
}

#[test]
fn test_prefix_intersection() {
    let index = Index::create("intersection", None);
    index
        .create_field("tag1", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();
    index
        .create_field("tag2", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();

    for i in 0..100 {
        let mut doc = Document::builder(format!("doc{i}"))
            .add_text("tag1", format!("tag1-{i}"));
        if i % 2 == 0 {
            doc = doc.add_text("tag2", format!("tag2-{i}"));
        }
        index.add_document(doc.build()).unwrap();
    }

    let mut left = QueryNode::tag("tag1");
    left.add_child(QueryNode::prefix(None, "tag1-")).unwrap();
    let mut right = QueryNode::tag("tag2");
    right.add_child(QueryNode::prefix(None, "tag2-")).unwrap();
    let mut intersect = QueryNode::intersect(false);
    intersect.add_child(left).unwrap();
    intersect.add_child(right).unwrap();

    let matched = ids(index.get_results_iterator(&intersect).unwrap());
    assert_eq!(matched.len(), 50);
    assert!(matched.iter().all(|id| {
        let n: usize = id.trim_start_matches("doc").parse().unwrap();
        n % 2 == 0
    }));
}

#[test]
fn test_lex_range() {
    let index = Index::create("lex", None);
    index
        .create_field("name", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();
    for c in b'a'..=b'y' {
        let name = format!("Mark{}", c as char);
        let doc = Document::builder(name.clone()).add_text("name", name).build();
        index.add_document(doc).unwrap();
    }

    let range = QueryNode::lex_range(Some("name"), "MarkN", "MarkX");
    let matched = ids(index.get_results_iterator(&range).unwrap());
    assert_eq!(matched.len(), 10);
    assert_eq!(matched.first().map(String::as_str), Some("Markn"));
    assert_eq!(matched.last().map(String::as_str), Some("Markw"));

    let empty = QueryNode::lex_range(Some("name"), "Zed", "Zzz");
    assert!(index.get_results_iterator(&empty).unwrap().is_none());
}

#[test]
fn test_multitype_field() {
    let index = Index::create("multi", None);
    index
        .create_field(
            "f1",
            TypeFlags::FULLTEXT | TypeFlags::TAG | TypeFlags::NUMERIC,
            FieldOptions::NONE,
        )
        .unwrap();

    // Text that does not parse is only indexed as text and tag.
    index
        .add_document(Document::builder("word").add_text("f1", "hello").build())
        .unwrap();
    index
        .add_document(Document::builder("number").add_text("f1", "42").build())
        .unwrap();

    assert_eq!(
        ids(index.get_results_iterator(&QueryNode::token(Some("f1"), "hello")).unwrap()),
        vec!["word"]
    );
    let mut tag = QueryNode::tag("f1");
    tag.add_child(QueryNode::token(None, "42")).unwrap();
    assert_eq!(ids(index.get_results_iterator(&tag).unwrap()), vec!["number"]);
    let numeric = QueryNode::numeric_range("f1", 0.0, 100.0, false, false);
    assert_eq!(ids(index.get_results_iterator(&numeric).unwrap()), vec!["number"]);

    // Explicit types must be declared on the field.
    let err = Index::create("other", None);
    err.create_field("f1", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();
    let mut mismatch = Document::simple("bad");
    mismatch.add_text("f1", "x", TypeFlags::TAG);
    assert_eq!(
        err.add_document(mismatch).unwrap_err().kind(),
        ErrorKind::FieldTypeMismatch
    );
}

#[test]
fn test_exhausted_iterator_stays_exhausted() {
    let index = Index::create("exhaust", None);
    index
        .create_field("f1", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();
    index
        .add_document(Document::builder("doc1").add_text("f1", "hello").build())
        .unwrap();

    let mut iterator = index
        .get_results_iterator(&QueryNode::token(Some("f1"), "hello"))
        .unwrap()
        .unwrap();
    assert!(iterator.next_hit().unwrap().is_some());
    assert!(iterator.next_hit().unwrap().is_none());
    assert!(iterator.is_exhausted());

    index
        .add_document(Document::builder("doc2").add_text("f1", "hello").build())
        .unwrap();
    for _ in 0..3 {
        assert!(iterator.next_hit().unwrap().is_none());
    }
    assert_eq!(iterator.doc_id(), None);
}

#[test]
fn test_field_redeclaration() {
    let index = Index::create("redeclare", None);
    let spec = index
        .create_field("f1", TypeFlags::FULLTEXT | TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();
    let generation = index.generation();

    let same = index
        .create_field("f1", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();
    assert_eq!(same, spec);
    assert_eq!(index.generation(), generation);

    let wider = index
        .create_field(
            "f1",
            TypeFlags::FULLTEXT | TypeFlags::TAG | TypeFlags::NUMERIC,
            FieldOptions::NONE,
        )
        .unwrap();
    assert!(wider.types().contains(TypeFlags::NUMERIC));
    assert!(index.generation() > generation);

    index
        .create_field("f2", TypeFlags::NUMERIC, FieldOptions::NONE)
        .unwrap();
    let err = index
        .create_field("f2", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateField);
}
