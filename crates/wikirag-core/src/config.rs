//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nesting, e.g. `APP_RETRIEVAL__TOP_K=3`).
//! The resulting [`Settings`] value is passed explicitly to every component;
//! nothing reads configuration from global state.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        // A missing .env is fine; the key may come from the real environment.
        let _ = dotenvy::dotenv();

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, env_name: env_name.to_string() })
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate_for_env(&self.env_name)?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub retrieval: RetrievalSettings,
    pub rerank: RerankSettings,
    pub generation: GenerationSettings,
    pub models: ModelSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub dir: String,
    /// Directory of `.txt` articles or a `.jsonl` dump with one `{"text": ..}` per line.
    pub source: String,
    pub chunks_file: String,
    pub index_dir: String,
    pub index_table: String,
    /// Words per chunk.
    pub chunk_size: usize,
    pub max_articles: usize,
    /// Smaller article limits tried in order when reading the source fails.
    pub fallback_max_articles: Vec<usize>,
    /// Dump fetched from the Hugging Face Hub when `source` does not exist.
    pub dataset: DatasetSettings,
}

/// A single file of a Hub dataset repo: `.parquet` or `.jsonl`, with a `text` column or field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Empty disables the download.
    pub repo: String,
    pub file: String,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            repo: "wikimedia/wikipedia".to_string(),
            file: "20231101.en/train-00000-of-00041.parquet".to_string(),
        }
    }
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: "./data".to_string(),
            source: "./data/raw".to_string(),
            chunks_file: "./data/wikipedia_chunks.json".to_string(),
            index_dir: "./data/index".to_string(),
            index_table: "chunks".to_string(),
            chunk_size: 300,
            max_articles: 1000,
            fallback_max_articles: vec![100],
            dataset: DatasetSettings::default(),
        }
    }
}

impl DataSettings {
    pub fn dir_path(&self) -> PathBuf {
        expand_path(&self.dir)
    }

    pub fn source_path(&self) -> PathBuf {
        expand_path(&self.source)
    }

    pub fn chunks_path(&self) -> PathBuf {
        expand_path(&self.chunks_file)
    }

    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }

    /// Where downloaded dataset files are cached.
    pub fn cache_path(&self) -> PathBuf {
        self.dir_path().join("cache")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub embedding_model: String,
    pub max_len: usize,
    pub batch_size: usize,
    /// Fail fast on index/chunk disagreements at load time instead of only warning.
    pub strict_alignment: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            max_len: 256,
            batch_size: 32,
            strict_alignment: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub model: String,
    pub max_len: usize,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { model: "cross-encoder/ms-marco-MiniLM-L-12-v2".to_string(), max_len: 512 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 60,
        }
    }
}

impl GenerationSettings {
    pub fn api_key(&self) -> crate::error::Result<String> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::InvalidConfig(format!("{} not found in environment or .env file", self.api_key_env))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Local model cache checked before downloading from the Hugging Face Hub.
    pub dir: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { dir: "./models".to_string() }
    }
}

impl Settings {
    pub fn validate_for_env(&self, env: &str) -> crate::error::Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".into()));
        }
        if self.data.chunk_size == 0 {
            return Err(Error::InvalidConfig("data.chunk_size must be at least 1".into()));
        }
        if self.data.max_articles == 0 {
            return Err(Error::InvalidConfig("data.max_articles must be at least 1".into()));
        }
        if self.retrieval.max_len == 0 || self.rerank.max_len == 0 {
            return Err(Error::InvalidConfig("model max_len must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::InvalidConfig(format!(
                "generation.temperature must be within [0, 2], got {}",
                self.generation.temperature
            )));
        }
        if matches!(env, "prod" | "production") && !self.retrieval.strict_alignment {
            tracing::warn!("retrieval.strict_alignment is off in production");
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_any_file() {
        Jail::expect_with(|_jail| {
            let settings = Config::load_for_env("dev").expect("load").settings().expect("settings");
            assert_eq!(settings.retrieval.top_k, 5);
            assert_eq!(settings.data.chunk_size, 300);
            assert_eq!(settings.rerank.model, "cross-encoder/ms-marco-MiniLM-L-12-v2");
            assert!(settings.retrieval.strict_alignment);
            Ok(())
        });
    }

    #[test]
    fn env_file_and_env_vars_layer_over_base() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[retrieval]\ntop_k = 8\n[data]\nchunk_size = 120\n")?;
            jail.create_file("config.test.toml", "[retrieval]\ntop_k = 4\n")?;
            jail.set_env("APP_GENERATION__MODEL", "gpt-4o-mini");
            let settings = Config::load_for_env("test").expect("load").settings().expect("settings");
            assert_eq!(settings.retrieval.top_k, 4, "env file overrides base file");
            assert_eq!(settings.data.chunk_size, 120);
            assert_eq!(settings.generation.model, "gpt-4o-mini");
            Ok(())
        });
    }

    #[test]
    fn zero_top_k_is_rejected() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_RETRIEVAL__TOP_K", "0");
            let err = Config::load_for_env("dev").expect("load").settings().unwrap_err();
            assert!(err.to_string().contains("top_k"));
            Ok(())
        });
    }

    #[test]
    fn get_reads_a_single_key() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[data]\nindex_table = \"wiki\"\n")?;
            let cfg = Config::load_for_env("dev").expect("load");
            let table: String = cfg.get("data.index_table").expect("key");
            assert_eq!(table, "wiki");
            Ok(())
        });
    }

    #[test]
    fn lenient_alignment_in_prod_only_warns() {
        Jail::expect_with(|jail| {
            jail.set_env("APP_RETRIEVAL__STRICT_ALIGNMENT", "false");
            let settings = Config::load_for_env("prod").expect("load").settings().expect("settings");
            assert!(!settings.retrieval.strict_alignment);
            Ok(())
        });
    }

    #[test]
    fn dataset_source_is_configurable() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[data]\ndir = \"./wiki\"\n[data.dataset]\nrepo = \"me/wiki-dump\"\nfile = \"articles.jsonl\"\n")?;
            let settings = Config::load_for_env("dev").expect("load").settings().expect("settings");
            assert_eq!(settings.data.dataset.repo, "me/wiki-dump");
            assert_eq!(settings.data.dataset.file, "articles.jsonl");
            assert_eq!(settings.data.cache_path(), PathBuf::from("./wiki/cache"));
            Ok(())
        });
    }

    #[test]
    fn default_dataset_points_at_wikipedia() {
        let d = DatasetSettings::default();
        assert_eq!(d.repo, "wikimedia/wikipedia");
        assert!(d.file.ends_with(".parquet"));
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/wikirag");
        assert_eq!(resolve_with_base(base, "data/index"), PathBuf::from("/srv/wikirag/data/index"));
        assert_eq!(resolve_with_base(base, "/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
