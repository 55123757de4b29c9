//! On-device embeddings through fastembed.

use super::{EmbeddingError, EmbeddingGateway, EmbeddingResult};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use std::path::PathBuf;

pub const DEFAULT_LOCAL_MODEL: &str = "AllMiniLML6V2";

/// Map a configured model name to a fastembed model.
pub fn parse_model(name: &str) -> EmbeddingResult<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" | "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "BGESmallENV15" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" | "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "NomicEmbedTextV15" | "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

/// fastembed model behind a lock; `embed` needs exclusive access.
pub struct LocalGateway {
    model: Mutex<TextEmbedding>,
    model_name: String,
    dimension: usize,
}

impl LocalGateway {
    /// Load `model_name`, downloading it into `cache_dir` on first use.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> EmbeddingResult<Self> {
        let model = parse_model(model_name)?;
        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        tracing::info!(target: "embed", "loading local embedding model {model_name}");
        let mut text_model =
            TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        // Probe once to learn the output size.
        let probe = text_model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;
        let dimension = probe
            .first()
            .map(Vec::len)
            .ok_or_else(|| EmbeddingError::Response("model returned no embedding".to_string()))?;

        Ok(Self {
            model: Mutex::new(text_model),
            model_name: model_name.to_string(),
            dimension,
        })
    }
}

impl std::fmt::Debug for LocalGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGateway")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl EmbeddingGateway for LocalGateway {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.model
            .lock()
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Request(e.to_string()))
    }
}
