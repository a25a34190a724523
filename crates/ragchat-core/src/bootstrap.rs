//! Application bootstrap: config resolution, provider, storage and agent construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use ragchat_llm::any::AnyProvider;
use ragchat_llm::gemini::{self, GeminiProvider};
use ragchat_llm::openai::{self, OpenAiProvider};
use ragchat_memory::document::SplitterConfig;
use ragchat_memory::{KnowledgeBase, LocalVectorStore, QdrantOps, SqliteStore, VectorStore};
use tokio::sync::watch;

use crate::agent::Agent;
use crate::config::{Config, ProviderKind, VectorBackend};
use crate::vault::{EnvVaultProvider, VaultProvider};

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const OPENAI_DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

pub struct AppBuilder {
    config: Config,
    config_path: PathBuf,
}

impl AppBuilder {
    /// Load the config at `config_path`, resolve secrets through `vault` and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed, the vault fails, or
    /// validation rejects the result.
    pub async fn new(config_path: PathBuf, vault: &dyn VaultProvider) -> anyhow::Result<Self> {
        let mut config = Config::load(&config_path)?;
        config.resolve_secrets(vault).await?;
        config.validate()?;
        tracing::debug!(path = %config_path.display(), "configuration loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Resolve the config path from `cli` or the environment and read secrets from env vars.
    ///
    /// # Errors
    ///
    /// See [`AppBuilder::new`].
    pub async fn from_env(cli: Option<PathBuf>) -> anyhow::Result<Self> {
        Self::new(resolve_config_path(cli), &EnvVaultProvider).await
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// # Errors
    ///
    /// Returns an error if no API key was resolved for the selected provider.
    pub fn build_provider(&self) -> anyhow::Result<AnyProvider> {
        create_provider(&self.config)
    }

    /// Open storage, index the knowledge file and assemble the agent around `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite, the vector store or the knowledge file cannot be
    /// opened, or if indexing fails.
    pub async fn build_agent(&self, provider: AnyProvider) -> anyhow::Result<Agent<AnyProvider>> {
        let store = SqliteStore::new(&self.config.storage.sqlite_path)
            .await
            .with_context(|| {
                format!(
                    "failed to open session storage at {}",
                    self.config.storage.sqlite_path
                )
            })?;

        let vectors = build_vector_store(&self.config).await?;
        let knowledge = build_knowledge(&self.config, vectors, &provider);
        knowledge
            .load(self.config.knowledge.recreate)
            .await
            .with_context(|| {
                format!(
                    "failed to load knowledge base from {}",
                    self.config.knowledge.path
                )
            })?;

        let agent_cfg = &self.config.agent;
        Ok(Agent::new(provider, Arc::new(knowledge), store)
            .with_instructions(agent_cfg.instructions.clone())
            .with_history_limit(agent_cfg.history_limit)
            .with_num_documents(agent_cfg.num_documents))
    }

    #[must_use]
    pub fn build_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }
}

/// Priority: `--config` argument > `RAGCHAT_CONFIG` env > `config/default.toml`.
#[must_use]
pub fn resolve_config_path(cli: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli {
        return path;
    }
    if let Ok(path) = std::env::var("RAGCHAT_CONFIG")
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

/// Build the configured provider. Gemini-specific defaults left in place while
/// `provider = "openai"` are swapped for OpenAI ones.
///
/// # Errors
///
/// Returns an error if no API key was resolved for the selected provider.
pub fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let llm = &config.llm;
    let api_key = config
        .provider_api_key()
        .with_context(|| format!("no API key resolved for {}", llm.provider.as_str()))?
        .expose()
        .to_owned();

    let provider = match llm.provider {
        ProviderKind::Gemini => AnyProvider::Gemini(
            GeminiProvider::new(api_key, llm.base_url.clone(), llm.model.clone(), llm.max_tokens)
                .with_embedding_model(
                    llm.embedding_model.clone(),
                    Some(llm.embedding_dimensions),
                )
                .with_max_retries(llm.max_retries),
        ),
        ProviderKind::OpenAi => {
            let base_url = if llm.base_url == gemini::DEFAULT_BASE_URL {
                openai::DEFAULT_BASE_URL.to_owned()
            } else {
                llm.base_url.clone()
            };
            let model = if llm.model.starts_with("gemini") {
                OPENAI_DEFAULT_MODEL.to_owned()
            } else {
                llm.model.clone()
            };
            let embedding_model = if llm.embedding_model.starts_with("gemini") {
                OPENAI_DEFAULT_EMBEDDING_MODEL.to_owned()
            } else {
                llm.embedding_model.clone()
            };
            AnyProvider::OpenAi(
                OpenAiProvider::new(api_key, base_url, model, llm.max_tokens, Some(embedding_model))
                    .with_embedding_dimensions(llm.embedding_dimensions)
                    .with_max_retries(llm.max_retries),
            )
        }
    };
    tracing::info!(provider = llm.provider.as_str(), "LLM provider configured");
    Ok(provider)
}

/// # Errors
///
/// Returns an error if the local directory cannot be opened or the Qdrant URL is invalid.
pub async fn build_vector_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    let vs = &config.vector_store;
    match vs.backend {
        VectorBackend::Local => {
            let store = LocalVectorStore::open(&vs.path)
                .await
                .with_context(|| format!("failed to open vector store at {}", vs.path))?;
            tracing::info!(path = %vs.path, "using local vector store");
            Ok(Arc::new(store))
        }
        VectorBackend::Qdrant => {
            let store = QdrantOps::new(&vs.qdrant_url)
                .with_context(|| format!("failed to create Qdrant client for {}", vs.qdrant_url))?;
            tracing::info!(url = %vs.qdrant_url, "using Qdrant vector store");
            Ok(Arc::new(store))
        }
    }
}

#[must_use]
pub fn build_knowledge(
    config: &Config,
    store: Arc<dyn VectorStore>,
    provider: &AnyProvider,
) -> KnowledgeBase {
    let kc = &config.knowledge;
    KnowledgeBase::new(
        store,
        kc.collection.clone(),
        u64::from(config.llm.embedding_dimensions),
        &kc.path,
        SplitterConfig {
            chunk_size: kc.chunk_size,
            chunk_overlap: kc.chunk_overlap,
            sentence_aware: true,
        },
        Arc::new(provider.embed_fn()),
    )
}
