use serde::{Deserialize, Serialize};

use crate::vault::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

fn default_session_id() -> String {
    "session_id".into()
}

fn default_user_id() -> String {
    "user".into()
}

fn default_history_limit() -> u32 {
    6
}

fn default_num_documents() -> u64 {
    5
}

pub(crate) fn default_instructions() -> String {
    "You are a helpful assistant. Use the references from the knowledge base to answer \
     the user's question. If the references do not contain the answer, say so and answer \
     from general knowledge."
        .into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentConfig {
    /// Session used when a request carries no `session_id`.
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Previous messages replayed to the model on each turn, rounded down to whole turns.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Knowledge chunks retrieved per query.
    #[serde(default = "default_num_documents")]
    pub num_documents: u64,
    #[serde(default = "default_instructions")]
    pub instructions: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            user_id: default_user_id(),
            history_limit: default_history_limit(),
            num_documents: default_num_documents(),
            instructions: default_instructions(),
        }
    }
}

/// LLM provider backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }
}

fn default_provider() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_base_url() -> String {
    ragchat_llm::gemini::DEFAULT_BASE_URL.into()
}

fn default_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_embedding_model() -> String {
    "gemini-embedding-001".into()
}

fn default_embedding_dimensions() -> u32 {
    1536
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retries after a 429 before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            max_tokens: default_max_tokens(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_knowledge_path() -> String {
    "./data/Cant_Hurt_mee.pdf".into()
}

fn default_collection() -> String {
    "recipes".into()
}

fn default_chunk_size() -> usize {
    5000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_path")]
    pub path: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Drop and rebuild the collection at startup.
    #[serde(default)]
    pub recreate: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub chunk_overlap: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            path: default_knowledge_path(),
            collection: default_collection(),
            recreate: false,
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
        }
    }
}

/// Vector store backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    #[default]
    Local,
    Qdrant,
}

fn default_vector_path() -> String {
    "./tmp/lancedb".into()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorStoreConfig {
    #[serde(default)]
    pub backend: VectorBackend,
    /// Directory of the local backend.
    #[serde(default = "default_vector_path")]
    pub path: String,
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::default(),
            path: default_vector_path(),
            qdrant_url: default_qdrant_url(),
        }
    }
}

fn default_sqlite_path() -> String {
    "data.db".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: default_sqlite_path(),
        }
    }
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".into()]
}

fn default_gateway_max_body() -> usize {
    1_048_576
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
    /// Fill `sources` in chat responses with retrieved chunk references.
    #[serde(default)]
    pub include_sources: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            cors_origins: default_cors_origins(),
            max_body_size: default_gateway_max_body(),
            include_sources: false,
        }
    }
}

/// Secrets resolved through the vault at startup. Never serialized.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub google_api_key: Option<Secret>,
    pub openai_api_key: Option<Secret>,
}
