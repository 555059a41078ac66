use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FactlineConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub queues: QueueConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub answer: AnswerConfig,
}

impl FactlineConfig {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env("FACTLINE")
    }

    /// Load configuration from environment with custom prefix
    pub fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("storage.container_url", "mem://documents")?
            .set_default("storage.document_id_key", "documentId")?
            .set_default("storage.nested_metadata_key", "customMetadata")?
            .set_default("queues.ingestion_queue", "document-ingestion")?
            .set_default("queues.answer_queue", "answer-generation")?
            .set_default("chunking.chunk_size_chars", 2000)?
            .set_default("chunking.chunk_overlap_chars", 200)?
            .set_default("chunking.min_chunk_chars", 40)?
            .set_default("embedding.batch_size", 16)?
            .set_default("embedding.dimension", 1536)?
            .set_default("retrieval.top_k", 5)?
            .set_default("answer.poll_render", "cached")?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load configuration from file with environment overrides
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("FACTLINE").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

impl Default for FactlineConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                container_url: "mem://documents".to_string(),
                document_id_key: "documentId".to_string(),
                nested_metadata_key: "customMetadata".to_string(),
            },
            queues: QueueConfig {
                ingestion_queue: "document-ingestion".to_string(),
                answer_queue: "answer-generation".to_string(),
            },
            chunking: ChunkingConfig {
                chunk_size_chars: 2000,
                chunk_overlap_chars: 200,
                min_chunk_chars: 40,
            },
            embedding: EmbeddingConfig {
                batch_size: 16,
                dimension: 1536,
            },
            retrieval: RetrievalConfig { top_k: 5 },
            answer: AnswerConfig {
                poll_render: PollRenderMode::Cached,
            },
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Object storage locations and blob metadata keys
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Base URL under which uploaded documents land
    pub container_url: String,
    /// Blob metadata key carrying the required document identifier
    pub document_id_key: String,
    /// Blob metadata key whose value is a nested JSON-encoded map
    pub nested_metadata_key: String,
}

impl StorageConfig {
    pub fn blob_url(&self, document_name: &str) -> String {
        format!("{}/{}", self.container_url, document_name)
    }
}

/// Queue names for the two asynchronous pipelines
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    pub ingestion_queue: String,
    pub answer_queue: String,
}

/// Configuration for the page text splitter
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size_chars: usize,
    /// Overlap between adjacent chunks in characters
    pub chunk_overlap_chars: usize,
    /// Fragments shorter than this are discarded
    pub min_chunk_chars: usize,
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size_chars == 0 {
            return Err("Chunk size must be greater than 0".to_string());
        }
        if self.chunk_overlap_chars >= self.chunk_size_chars {
            return Err("Chunk overlap must be less than chunk size".to_string());
        }
        Ok(())
    }
}

/// Configuration for the embedding enrichment stage
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// Maximum chunks per embedding backend call
    pub batch_size: usize,
    /// Expected vector dimension; mismatches are rejected before upload
    pub dimension: usize,
}

/// Configuration for filtered vector retrieval
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

/// How a completed answer is rendered on poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollRenderMode {
    /// Replay the formatted answer persisted at generation time
    Cached,
    /// Reload the persisted chunk context and re-invoke generation
    Regenerate,
}

/// Answer pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerConfig {
    pub poll_render: PollRenderMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = FactlineConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.embedding.batch_size, 16);
        assert_eq!(config.answer.poll_render, PollRenderMode::Cached);
    }

    #[test]
    fn test_env_loader_defaults_match_literal_defaults() {
        let loaded = FactlineConfig::load_from_env("FACTLINE_TEST_UNSET").unwrap();
        let literal = FactlineConfig::default();

        assert_eq!(loaded.server.port, literal.server.port);
        assert_eq!(loaded.storage.container_url, literal.storage.container_url);
        assert_eq!(loaded.queues.ingestion_queue, literal.queues.ingestion_queue);
        assert_eq!(loaded.queues.answer_queue, literal.queues.answer_queue);
        assert_eq!(
            loaded.chunking.chunk_size_chars,
            literal.chunking.chunk_size_chars
        );
        assert_eq!(loaded.embedding.dimension, literal.embedding.dimension);
        assert_eq!(loaded.retrieval.top_k, literal.retrieval.top_k);
        assert_eq!(loaded.answer.poll_render, literal.answer.poll_render);
    }

    #[test]
    fn test_chunking_validation() {
        let valid = ChunkingConfig {
            chunk_size_chars: 2000,
            chunk_overlap_chars: 200,
            min_chunk_chars: 40,
        };
        assert!(valid.validate().is_ok());

        let invalid = ChunkingConfig {
            chunk_size_chars: 100,
            chunk_overlap_chars: 100,
            min_chunk_chars: 10,
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_blob_url() {
        let storage = StorageConfig {
            container_url: "mem://documents".to_string(),
            document_id_key: "documentId".to_string(),
            nested_metadata_key: "customMetadata".to_string(),
        };
        assert_eq!(storage.blob_url("a.pdf"), "mem://documents/a.pdf");
    }
}
