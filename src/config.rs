use crate::error::{Error, Result};
use config::{Config, Environment, File as ConfigFile, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub type Number = f32;

pub const DEFAULT_STORE_PATH: &str = "embeddings.store";
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_MIN_SCORE: f64 = 0.6;
pub const DEFAULT_EXIT_SENTINELS: [&str; 3] = ["exit", "quit", "bye"];
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_DIMENSIONS: usize = 1536;
pub const DEFAULT_CHUNK_SIZE: usize = 300;
pub const DEFAULT_CHUNK_OVERLAP: usize = 0;
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["txt", "pdf"];

const CONFIG_FILE_NAME: &str = "embedstore";
const ENV_PREFIX: &str = "EMBEDSTORE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Hash,
}

impl ProviderKind {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "hash" => Ok(ProviderKind::Hash),
            other => Err(Error::InvalidConfig(format!(
                "unknown provider '{}' (expected 'openai' or 'hash')",
                other
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Hash => "hash",
        }
    }
}

/// Raw values as they come out of the config sources; every field optional.
#[derive(Deserialize, Default)]
pub struct EmbedstoreConfig {
    pub store_path: Option<String>,
    pub max_results: Option<usize>,
    pub min_score: Option<f64>,
    pub verbose: Option<bool>,
    pub exit_sentinels: Option<Vec<String>>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub dimensions: Option<usize>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub extensions: Option<Vec<String>>,
}

impl EmbedstoreConfig {
    pub fn try_from(config: &Config) -> Self {
        EmbedstoreConfig {
            store_path: config.get("store_path").ok(),
            max_results: config.get("max_results").ok(),
            min_score: config.get("min_score").ok(),
            verbose: config.get("verbose").ok(),
            exit_sentinels: get_list(config, "exit_sentinels"),
            provider: config.get("provider").ok(),
            model: config.get("model").ok(),
            endpoint: config.get("endpoint").ok(),
            api_key_env: config.get("api_key_env").ok(),
            dimensions: config.get("dimensions").ok(),
            chunk_size: config.get("chunk_size").ok(),
            chunk_overlap: config.get("chunk_overlap").ok(),
            extensions: get_list(config, "extensions"),
        }
    }
}

/// Lists may be given natively (TOML/JSON arrays) or as "a,b,c" strings
/// (environment variables, properties files).
fn get_list(config: &Config, key: &str) -> Option<Vec<String>> {
    config.get::<Vec<String>>(key).ok().or_else(|| {
        config.get::<String>(key).ok().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
    })
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub max_results: usize,
    pub min_score: f64,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub extensions: Vec<String>,
}

/// Effective settings handed to every component at construction time.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_path: PathBuf,
    pub exit_sentinels: Vec<String>,
    pub search: SearchSettings,
    pub embedding: EmbeddingSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    /// Load from `embedstore.*` in the working directory (or `explicit_file`)
    /// and `EMBEDSTORE_*` environment variables.
    pub fn load(explicit_file: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        builder = match explicit_file {
            Some(path) => builder.add_source(ConfigFile::new(
                &path.to_string_lossy(),
                config_format(path),
            )),
            None => builder.add_source(ConfigFile::with_name(CONFIG_FILE_NAME).required(false)),
        };
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(Self::from_config(&config)?)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let raw = EmbedstoreConfig::try_from(config);

        let max_results = raw.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if max_results == 0 {
            return Err(Error::InvalidConfig("max_results must be at least 1".into()));
        }

        let min_score = raw.min_score.unwrap_or(DEFAULT_MIN_SCORE);
        if !(0.0..=1.0).contains(&min_score) {
            return Err(Error::InvalidConfig(format!(
                "min_score must be within [0, 1], got {}",
                min_score
            )));
        }

        let chunk_size = raw.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let chunk_overlap = raw.chunk_overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP);
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }

        let dimensions = raw.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
        if dimensions == 0 {
            return Err(Error::InvalidConfig("dimensions must be at least 1".into()));
        }

        let provider = match raw.provider {
            Some(p) => ProviderKind::parse(&p)?,
            None => ProviderKind::OpenAi,
        };

        let exit_sentinels = raw
            .exit_sentinels
            .unwrap_or_else(|| DEFAULT_EXIT_SENTINELS.iter().map(|s| s.to_string()).collect())
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect();

        let extensions = raw
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            store_path: PathBuf::from(raw.store_path.unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())),
            exit_sentinels,
            search: SearchSettings {
                max_results,
                min_score,
                verbose: raw.verbose.unwrap_or(false),
            },
            embedding: EmbeddingSettings {
                provider,
                model: raw.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                endpoint: raw.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                api_key_env: raw.api_key_env.unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
                dimensions,
            },
            ingest: IngestSettings {
                chunk_size,
                chunk_overlap,
                extensions,
            },
        })
    }

    pub fn print_config(&self) {
        println!("store_path={}", self.store_path.display());
        println!("max_results={}", self.search.max_results);
        println!("min_score={}", self.search.min_score);
        println!("verbose={}", self.search.verbose);
        println!("exit_sentinels={}", self.exit_sentinels.join(","));
        println!("provider={}", self.embedding.provider.as_str());
        println!("model={}", self.embedding.model);
        println!("endpoint={}", self.embedding.endpoint);
        println!("api_key_env={}", self.embedding.api_key_env);
        println!("dimensions={}", self.embedding.dimensions);
        println!("chunk_size={}", self.ingest.chunk_size);
        println!("chunk_overlap={}", self.ingest.chunk_overlap);
        println!("extensions={}", self.ingest.extensions.join(","));
    }
}

/// Java-style `.properties` files are plain `key=value` lines, which the INI
/// reader accepts as top-level keys.
fn config_format(path: &Path) -> FileFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("json") => FileFormat::Json,
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("ini") | Some("properties") => FileFormat::Ini,
        _ => FileFormat::Toml,
    }
}
