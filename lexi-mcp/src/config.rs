//! Server configuration, loadable from a TOML file.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```toml
//! top_k = 5
//! generation_timeout_secs = 60
//! generator_command = ["ollama", "run", "llama3"]
//!
//! [embed]
//! model_name = "bge-small-en-v1.5"
//! ```

use anyhow::{Context, Result, bail};
use lexi_context::DEFAULT_CONTEXT_LIMIT;
use lexi_embed::EmbedConfig;
use lexi_retriever::retrieval::retriever::DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the lexi answering service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory that relative paths below are resolved against
    pub root_dir: PathBuf,
    /// Index directory holding `manifest.json`
    pub index_dir: PathBuf,
    /// Documents indexed at startup when no index exists yet
    pub docs_dir: Option<PathBuf>,
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Maximum context characters placed in a prompt
    pub context_limit: usize,
    /// Program and arguments of the generator; the prompt is written to its stdin
    pub generator_command: Vec<String>,
    /// Hard limit on one generator run
    pub generation_timeout_secs: u64,
    pub embed: EmbedConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            index_dir: PathBuf::from(".lexi"),
            docs_dir: None,
            top_k: DEFAULT_TOP_K,
            context_limit: DEFAULT_CONTEXT_LIMIT,
            generator_command: ["ollama", "run", "mistral:7b-instruct"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            generation_timeout_secs: 90,
            embed: EmbedConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            ..Self::default()
        }
    }

    /// Reads a TOML config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            bail!("top_k must be at least 1");
        }
        if self.generator_command.is_empty() || self.generator_command[0].trim().is_empty() {
            bail!("generator_command must name a program");
        }
        if self.generation_timeout_secs == 0 {
            bail!("generation_timeout_secs must be at least 1");
        }
        self.embed.validate()?;
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// `index_dir` resolved against `root_dir`.
    pub fn resolved_index_dir(&self) -> PathBuf {
        self.root_dir.join(&self.index_dir)
    }

    /// `docs_dir` resolved against `root_dir`.
    pub fn resolved_docs_dir(&self) -> Option<PathBuf> {
        self.docs_dir.as_ref().map(|dir| self.root_dir.join(dir))
    }

    /// `embed` with its cache directory resolved against `root_dir`.
    pub fn resolved_embed_config(&self) -> EmbedConfig {
        EmbedConfig {
            cache_dir: self.root_dir.join(&self.embed.cache_dir),
            ..self.embed.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new(PathBuf::from("/srv/lexi"));
        assert_eq!(config.top_k, 3);
        assert_eq!(config.context_limit, 2000);
        assert_eq!(config.resolved_docs_dir(), None);
        assert_eq!(config.generation_timeout(), Duration::from_secs(90));
        assert_eq!(config.generator_command[0], "ollama");
        assert_eq!(config.resolved_index_dir(), PathBuf::from("/srv/lexi/.lexi"));
        assert_eq!(
            config.resolved_embed_config().cache_dir,
            PathBuf::from("/srv/lexi/.lexi/models")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = ServerConfig::from_toml(
            r#"
            top_k = 5
            generator_command = ["llm", "-m", "local"]
            index_dir = "/var/lib/lexi"
            docs_dir = "books"

            [embed]
            batch_size = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.top_k, 5);
        assert_eq!(config.generator_command, vec!["llm", "-m", "local"]);
        assert_eq!(config.embed.batch_size, 8);
        assert_eq!(config.embed.model_name, "all-MiniLM-L6-v2");
        assert_eq!(config.context_limit, 2000);
        // Absolute paths are not re-rooted.
        assert_eq!(config.resolved_index_dir(), PathBuf::from("/var/lib/lexi"));
        assert_eq!(config.docs_dir, Some(PathBuf::from("books")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::from_toml("top_k = 0").is_err());
        assert!(ServerConfig::from_toml("generator_command = []").is_err());
        assert!(ServerConfig::from_toml("generation_timeout_secs = 0").is_err());
        assert!(ServerConfig::from_toml("top_k = \"three\"").is_err());
    }

    #[test]
    fn test_from_missing_file() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/lexi.toml")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
