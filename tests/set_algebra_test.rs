use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use quarry::document::Document;
use quarry::index::{Index, IndexConfig};
use quarry::query::QueryNode;
use quarry::schema::{FieldOptions, TypeFlags};

const WORDS: usize = 8;
const DOCS: usize = 300;

struct Fixture {
    index: Index,
    /// Live external ids per word.
    postings: Vec<BTreeSet<String>>,
    live: BTreeSet<String>,
}

fn fixture(seed: u64) -> Fixture {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = IndexConfig::builder()
        .page_size(4)
        .auto_compaction(false)
        .build();
    let index = Index::with_config("algebra", None, config).unwrap();
    index
        .create_field("body", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();

    let mut postings = vec![BTreeSet::new(); WORDS];
    let mut live = BTreeSet::new();
    for i in 0..DOCS {
        // Zero padding keeps external id order equal to insertion order.
        let id = format!("doc{i:04}");
        let words: Vec<String> = (0..WORDS)
            .filter(|_| rng.random_range(0..3) == 0)
            .map(|w| {
                postings[w].insert(id.clone());
                format!("w{w}")
            })
            .collect();
        let doc = Document::builder(id.clone())
            .add_text("body", words.join(" "))
            .build();
        index.add_document(doc).unwrap();
        live.insert(id);
    }

    // Drop a random tenth.
    let dropped: Vec<String> = live
        .iter()
        .filter(|_| rng.random_range(0..10) == 0)
        .cloned()
        .collect();
    for id in &dropped {
        assert!(index.drop_document(id.as_bytes()).unwrap());
        live.remove(id);
        for set in &mut postings {
            set.remove(id);
        }
    }

    Fixture {
        index,
        postings,
        live,
    }
}

fn run(index: &Index, node: &QueryNode) -> Vec<String> {
    index
        .get_results_iterator(node)
        .unwrap()
        .map(|it| {
            it.external_ids()
                .unwrap()
                .into_iter()
                .map(|id| String::from_utf8(id).unwrap())
                .collect()
        })
        .unwrap_or_default()
}

fn token(w: usize) -> QueryNode {
    QueryNode::token(Some("body"), format!("w{w}"))
}

#[test]
fn test_random_unions_and_intersections() {
    for seed in 0..5 {
        let fixture = fixture(seed);
        let mut rng = StdRng::seed_from_u64(seed + 100);

        for _ in 0..20 {
            let picks: Vec<usize> = (0..rng.random_range(2..5))
                .map(|_| rng.random_range(0..WORDS))
                .collect();

            let union: BTreeSet<String> = picks
                .iter()
                .flat_map(|&w| fixture.postings[w].iter().cloned())
                .collect();
            let node = QueryNode::union_of(picks.iter().map(|&w| token(w)).collect());
            assert_eq!(run(&fixture.index, &node), union.into_iter().collect::<Vec<_>>());

            let mut intersection = fixture.postings[picks[0]].clone();
            for &w in &picks[1..] {
                intersection.retain(|id| fixture.postings[w].contains(id));
            }
            let node = QueryNode::intersect_of(picks.iter().map(|&w| token(w)).collect(), false);
            assert_eq!(
                run(&fixture.index, &node),
                intersection.into_iter().collect::<Vec<_>>()
            );
        }
    }
}

#[test]
fn test_random_negations() {
    let fixture = fixture(42);
    for w in 0..WORDS {
        let expected: Vec<String> = fixture
            .live
            .iter()
            .filter(|id| !fixture.postings[w].contains(*id))
            .cloned()
            .collect();
        assert_eq!(run(&fixture.index, &QueryNode::negate(token(w))), expected);
    }

    let everything: Vec<String> = fixture.live.iter().cloned().collect();
    assert_eq!(run(&fixture.index, &QueryNode::Wildcard), everything);
}

#[test]
fn test_results_survive_compaction() {
    let fixture = fixture(7);
    let node = QueryNode::union_of(vec![token(0), token(1)]);
    let before = run(&fixture.index, &node);

    let report = fixture.index.compact().unwrap();
    assert_eq!(
        report.documents_reclaimed,
        DOCS - fixture.live.len()
    );
    assert_eq!(run(&fixture.index, &node), before);
    assert_eq!(fixture.index.stats().tombstones, 0);
}
