//! Article source reading and word-count chunking for the build step.

use anyhow::{anyhow, bail, Context, Result};
use arrow_array::{LargeStringArray, StringArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::types::Chunk;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Words per chunk.
    pub chunk_size: usize,
    pub max_articles: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 300, max_articles: 1000 }
    }
}

/// One record of a JSON-lines Wikipedia dump. Extra fields (id, url, ...) are ignored.
#[derive(Debug, Deserialize)]
struct ArticleRecord {
    #[serde(default)]
    text: String,
}

#[derive(Default)]
pub struct DataProcessor {
    chunking_config: ChunkingConfig,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(chunking_config: ChunkingConfig) -> Self { Self { chunking_config } }

    /// Read up to `max_articles` articles from `source` and split them into chunks.
    ///
    /// `source` is either a directory of `.txt` files (one article per file,
    /// visited in sorted path order), a `.parquet` file with a `text` column,
    /// or a `.jsonl` file.
    pub fn process_source(&self, source: &Path) -> Result<Vec<Chunk>> {
        self.process_source_limited(source, self.chunking_config.max_articles)
    }

    pub fn process_source_limited(&self, source: &Path, limit: usize) -> Result<Vec<Chunk>> {
        let articles = if source.is_dir() {
            self.read_txt_articles(source, limit)?
        } else if source.is_file() && source.extension().and_then(|e| e.to_str()) == Some("parquet") {
            self.read_parquet_articles(source, limit)?
        } else if source.is_file() {
            self.read_jsonl_articles(source, limit)?
        } else {
            return Err(crate::error::Error::NotFound(format!("article source {}", source.display())).into());
        };
        tracing::info!("Processing {} articles...", articles.len());
        let mut chunks = Vec::new();
        for (i, text) in articles.iter().enumerate() {
            chunks.extend(chunk_text(text, self.chunking_config.chunk_size).into_iter().map(Chunk::new));
            if i % 10 == 0 {
                tracing::info!("Processed {} articles...", i);
            }
        }
        tracing::info!("Processed {} articles into {} chunks", articles.len(), chunks.len());
        Ok(chunks)
    }

    /// Try the configured article limit, then each fallback limit in order.
    /// Returns the chunks of the first attempt that succeeds, or the last error.
    pub fn process_with_fallback(&self, source: &Path, fallback_limits: &[usize]) -> Result<Vec<Chunk>> {
        let limits = std::iter::once(self.chunking_config.max_articles).chain(fallback_limits.iter().copied());
        let mut last_err = None;
        for (attempt, limit) in limits.enumerate() {
            if attempt > 0 {
                tracing::warn!("Retrying with a smaller subset ({} articles)...", limit);
            }
            match self.process_source_limited(source, limit) {
                Ok(chunks) => return Ok(chunks),
                Err(e) => {
                    tracing::error!("Error loading articles: {:#}", e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no article limits to try")))
    }

    fn read_txt_articles(&self, root: &Path, limit: usize) -> Result<Vec<String>> {
        let mut files = self.list_txt_files(root);
        if files.is_empty() {
            tracing::warn!("No .txt files found under {}.", root.display());
            return Ok(vec![]);
        }
        if files.len() > limit { files.truncate(limit); tracing::info!("Limited to first {} files", limit); }
        let mut articles = Vec::with_capacity(files.len());
        for file_path in &files {
            let content = self.read_file_content(file_path)?;
            if !content.trim().is_empty() { articles.push(content); }
        }
        Ok(articles)
    }

    fn read_jsonl_articles(&self, path: &Path, limit: usize) -> Result<Vec<String>> {
        let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut articles = Vec::new();
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            if line_no >= limit { break; }
            let line = line.with_context(|| format!("reading {} line {}", path.display(), line_no + 1))?;
            if line.trim().is_empty() { continue; }
            let record: ArticleRecord = serde_json::from_str(&line)
                .with_context(|| format!("parsing {} line {}", path.display(), line_no + 1))?;
            if !record.text.is_empty() { articles.push(record.text); }
        }
        Ok(articles)
    }

    fn read_parquet_articles(&self, path: &Path, limit: usize) -> Result<Vec<String>> {
        let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .with_context(|| format!("reading parquet metadata of {}", path.display()))?
            .with_batch_size(256)
            .build()?;
        let mut articles = Vec::new();
        for batch in reader {
            let batch = batch?;
            let column = batch.column_by_name("text").ok_or_else(|| anyhow!("{} has no 'text' column", path.display()))?;
            let texts: Vec<Option<&str>> = if let Some(a) = column.as_any().downcast_ref::<StringArray>() {
                a.iter().collect()
            } else if let Some(a) = column.as_any().downcast_ref::<LargeStringArray>() {
                a.iter().collect()
            } else {
                bail!("'text' column of {} is not a string column", path.display());
            };
            for text in texts.into_iter().flatten() {
                if articles.len() >= limit { return Ok(articles); }
                if !text.trim().is_empty() { articles.push(text.to_string()); }
            }
        }
        Ok(articles)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path(); if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort(); txt_files
    }
}

/// Split on whitespace and join runs of `chunk_size` words with single spaces.
/// The last chunk may be shorter. `chunk_size` of zero is treated as one.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(chunk_size.max(1)).map(|w| w.join(" ")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_splits_on_word_boundaries() {
        let chunks = chunk_text("a b  c\nd e", 2);
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn chunk_text_of_blank_input_is_empty() {
        assert!(chunk_text("   \n\t", 5).is_empty());
    }
}
