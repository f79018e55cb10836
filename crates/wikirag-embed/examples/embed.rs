use wikirag_core::config::Config;
use wikirag_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    wikirag_core::logging::init(false);
    let settings = Config::load()?.settings()?;
    let embedder = get_default_embedder(&settings.retrieval, &settings.models)?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("model={} B={} dim={}", embedder.model_id(), embs.len(), embedder.dim());
    Ok(())
}
