use wikirag_core::config::{ModelSettings, RerankSettings, RetrievalSettings};
use wikirag_embed::{get_default_embedder, get_default_scorer, FakeEmbedder, FAKE_EMBEDDING_DIM};
use wikirag_core::traits::Embedder;

fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading a real model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(&RetrievalSettings::default(), &ModelSettings::default()).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), FAKE_EMBEDDING_DIM);
    assert_eq!(embedder.dim(), FAKE_EMBEDDING_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_prefers_shared_words() {
    let embedder = FakeEmbedder::new(FAKE_EMBEDDING_DIM);
    let q = embedder.embed_text("What is the capital of France?");
    let paris = embedder.embed_text("Paris is the capital of France.");
    let tokyo = embedder.embed_text("Tokyo is in Japan.");
    assert!(dot(&q, &paris) > dot(&q, &tokyo));
}

#[test]
fn fake_embedder_id_encodes_dimension() {
    assert_eq!(FakeEmbedder::new(8).model_id(), "fake:xxhash:d8");
}

#[test]
fn fake_scorer_is_selected_by_env() {
    std::env::set_var("APP_USE_FAKE_RERANKER", "1");
    let scorer = get_default_scorer(&RerankSettings::default(), &ModelSettings::default()).expect("scorer");
    assert_eq!(scorer.model_id(), "fake:lexical");
    let scores = scorer.score_batch(&[("rust crates", "crates for rust"), ("rust crates", "python")]).unwrap();
    assert!(scores[0] > scores[1]);
}
