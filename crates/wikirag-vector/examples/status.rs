use wikirag_core::config::Config;
use wikirag_core::traits::VectorIndex;
use wikirag_vector::LanceVectorIndex;

fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let index = LanceVectorIndex::open(&settings.data.index_path(), &settings.data.index_table)?;
    println!("{}: rows={} dim={}", settings.data.index_table, index.size(), index.dim());
    match index.fingerprint() {
        Some(fp) => println!("built_at={} embedder={} chunks={} chunks_hash={}", fp.built_at, fp.embedder_id, fp.chunk_count, fp.chunks_hash),
        None => println!("no build fingerprint"),
    }
    Ok(())
}
