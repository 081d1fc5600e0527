use sdsrag_core::types::Chunk;
use sdsrag_lexical::LexicalIndex;

fn sds_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("desmophen:0", "Wear protective gloves and eye protection when handling DESMOPHEN XP 2680.")
            .with_metadata("product_name", "DESMOPHEN XP 2680"),
        Chunk::new("bayblend:0", "BAYBLEND M750 may release hazardous decomposition products when burned.")
            .with_metadata("product_name", "BAYBLEND M750"),
        Chunk::new("baybond:0", "First aid for eye contact with BAYBOND PU 407: rinse cautiously with water.")
            .with_metadata("product_name", "BAYBOND PU 407"),
    ]
}

#[test]
fn empty_corpus_returns_empty_results() {
    let index = LexicalIndex::build(&[]).expect("build");
    let hits = index.search("gloves", 5).expect("search");
    assert!(hits.is_empty());
}

#[test]
fn returns_at_most_k_hits_with_non_increasing_scores() {
    let index = LexicalIndex::build(&sds_chunks()).expect("build");
    let hits = index.search("protective gloves eye protection", 2).expect("search");
    assert!(hits.len() <= 2);
    assert!(!hits.is_empty());
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    for (rank, hit) in hits.iter().enumerate() {
        assert_eq!(hit.rank, rank);
    }
}

#[test]
fn term_match_ranks_the_right_product_first() {
    let index = LexicalIndex::build(&sds_chunks()).expect("build");
    let hits = index.search("DESMOPHEN gloves", 3).expect("search");
    assert_eq!(hits[0].id, "desmophen:0");
}

#[test]
fn search_is_deterministic_across_invocations() {
    let index = LexicalIndex::build(&sds_chunks()).expect("build");
    let a = index.search("hazardous decomposition products", 3).expect("first");
    let b = index.search("hazardous decomposition products", 3).expect("second");
    let ids_a: Vec<_> = a.iter().map(|h| h.id.as_str()).collect();
    let ids_b: Vec<_> = b.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids_a, ids_b);
}

#[test]
fn punctuation_heavy_query_does_not_error() {
    let index = LexicalIndex::build(&sds_chunks()).expect("build");
    let hits = index.search("\"gloves\" AND (eye: protection", 3).expect("lenient parse");
    // No assertion on contents; arbitrary user text must simply not error.
    assert!(hits.len() <= 3);
}

#[test]
fn equal_score_ties_follow_insertion_order() {
    // Two identical documents tie exactly; the earlier insertion must win.
    let chunks = vec![
        Chunk::new("first:0", "polyurethane resin storage guidance"),
        Chunk::new("second:0", "polyurethane resin storage guidance"),
    ];
    let index = LexicalIndex::build(&chunks).expect("build");
    let hits = index.search("polyurethane storage", 2).expect("search");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "first:0");
    assert_eq!(hits[1].id, "second:0");
}
