use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use wikirag_core::config::Settings;
use wikirag_core::error::Error;
use wikirag_core::traits::VectorIndex;
use wikirag_core::types::{Chunk, Neighbor};
use wikirag_embed::FakeEmbedder;
use wikirag_rag::{artifacts_present, build_artifacts, check_alignment, load_artifacts, Retriever};
use wikirag_vector::IndexFingerprint;

fn settings_in(root: &Path) -> Settings {
    let mut s = Settings::default();
    s.data.dir = root.to_string_lossy().to_string();
    s.data.source = root.join("raw").to_string_lossy().to_string();
    s.data.chunks_file = root.join("wikipedia_chunks.json").to_string_lossy().to_string();
    s.data.index_dir = root.join("index").to_string_lossy().to_string();
    s.data.chunk_size = 6;
    s
}

fn write_articles(root: &Path) {
    let raw = root.join("raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(raw.join("a_paris.txt"), "Paris is the capital and most populous city of France. It sits on the Seine.").unwrap();
    fs::write(raw.join("b_everest.txt"), "Mount Everest is Earth's highest mountain above sea level.").unwrap();
}

fn is_mismatch(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<Error>(), Some(Error::ArtifactMismatch(_)))
}

#[test]
fn build_then_load_and_retrieve() {
    let tmp = TempDir::new().unwrap();
    write_articles(tmp.path());
    let settings = settings_in(tmp.path());
    let embedder = FakeEmbedder::new(64);

    assert!(!artifacts_present(&settings));
    let fp = build_artifacts(&settings, &embedder).expect("build");
    assert!(artifacts_present(&settings));
    // 15 + 9 words at 6 words per chunk.
    assert_eq!(fp.chunk_count, 5);

    let artifacts = load_artifacts(&settings, &embedder).expect("load");
    assert_eq!(artifacts.chunks.len(), 5);
    assert_eq!(artifacts.index.size(), 5);
    assert_eq!(artifacts.chunks[0].text, "Paris is the capital and most");

    let retriever = Retriever::new(std::sync::Arc::new(FakeEmbedder::new(64)), 2);
    let hits = retriever.retrieve("highest mountain above sea level", artifacts.index.as_ref(), &artifacts.chunks).unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].text.contains("mountain") || hits[0].text.contains("level"));
}

#[test]
fn missing_source_builds_from_cached_dataset() {
    let tmp = TempDir::new().unwrap();
    let mut settings = settings_in(tmp.path());
    settings.data.dataset.repo = "someone/wiki-sample".to_string();
    settings.data.dataset.file = "articles.jsonl".to_string();
    let repo_dir = settings.data.cache_path().join("datasets--someone--wiki-sample");
    let snapshot = repo_dir.join("snapshots").join("abc123");
    fs::create_dir_all(repo_dir.join("refs")).unwrap();
    fs::create_dir_all(&snapshot).unwrap();
    fs::write(repo_dir.join("refs").join("main"), "abc123").unwrap();
    fs::write(snapshot.join("articles.jsonl"), "{\"text\": \"Lisbon is the capital of Portugal\"}\n{\"text\": \"\"}\n").unwrap();

    let fp = build_artifacts(&settings, &FakeEmbedder::new(16)).expect("build");
    assert_eq!(fp.chunk_count, 1);
    let artifacts = load_artifacts(&settings, &FakeEmbedder::new(16)).expect("load");
    assert_eq!(artifacts.chunks[0].text, "Lisbon is the capital of Portugal");
}

#[test]
fn edited_chunk_file_is_detected() {
    let tmp = TempDir::new().unwrap();
    write_articles(tmp.path());
    let mut settings = settings_in(tmp.path());
    let embedder = FakeEmbedder::new(32);
    build_artifacts(&settings, &embedder).expect("build");

    let chunks_path = settings.data.chunks_path();
    let text = fs::read_to_string(&chunks_path).unwrap().replace("Paris", "Lyon");
    fs::write(&chunks_path, text).unwrap();
    let err = load_artifacts(&settings, &embedder).err().expect("should fail");
    assert!(is_mismatch(&err));

    settings.retrieval.strict_alignment = false;
    assert!(load_artifacts(&settings, &embedder).is_ok());
}

#[test]
fn different_embedder_dimension_fails_even_when_lenient() {
    let tmp = TempDir::new().unwrap();
    write_articles(tmp.path());
    let mut settings = settings_in(tmp.path());
    build_artifacts(&settings, &FakeEmbedder::new(32)).expect("build");
    settings.retrieval.strict_alignment = false;
    let err = load_artifacts(&settings, &FakeEmbedder::new(16)).err().expect("should fail");
    assert!(is_mismatch(&err));
}

#[test]
fn missing_artifacts_are_not_found() {
    let tmp = TempDir::new().unwrap();
    let settings = settings_in(tmp.path());
    let err = load_artifacts(&settings, &FakeEmbedder::new(8)).err().expect("should fail");
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
}

struct SizedIndex(usize);

impl VectorIndex for SizedIndex {
    fn dim(&self) -> usize { 8 }
    fn size(&self) -> usize { self.0 }
    fn search(&self, _q: &[f32], _k: usize) -> Result<Vec<Neighbor>> { Ok(vec![]) }
}

#[test]
fn size_mismatch_is_fatal_only_when_strict() {
    let chunks = vec![Chunk::new("a"), Chunk::new("b")];
    let embedder = FakeEmbedder::new(8);
    let fp = IndexFingerprint::new("fake:xxhash:d8", 8, 3, "h");
    let err = check_alignment(&SizedIndex(3), Some(&fp), &chunks, "h", &embedder, true).unwrap_err();
    assert!(is_mismatch(&err));
    assert!(check_alignment(&SizedIndex(3), Some(&fp), &chunks, "h", &embedder, false).is_ok());
    assert!(check_alignment(&SizedIndex(2), Some(&fp), &chunks, "h", &embedder, true).is_ok());
}

#[test]
fn embedder_id_mismatch_is_reported() {
    let chunks = vec![Chunk::new("a")];
    let fp = IndexFingerprint::new("sentence-transformers/all-MiniLM-L6-v2", 8, 1, "h");
    let err = check_alignment(&SizedIndex(1), Some(&fp), &chunks, "h", &FakeEmbedder::new(8), true).unwrap_err();
    assert!(err.to_string().contains("all-MiniLM-L6-v2"));
}
