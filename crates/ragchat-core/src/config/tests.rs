use std::io::Write;

use serial_test::serial;

use super::*;
use crate::vault::MockVaultProvider;

const ENV_KEYS: [&str; 14] = [
    "RAGCHAT_LLM_PROVIDER",
    "RAGCHAT_LLM_BASE_URL",
    "RAGCHAT_LLM_MODEL",
    "RAGCHAT_LLM_EMBEDDING_MODEL",
    "RAGCHAT_KNOWLEDGE_PATH",
    "RAGCHAT_KNOWLEDGE_RECREATE",
    "RAGCHAT_VECTOR_STORE_BACKEND",
    "RAGCHAT_VECTOR_STORE_PATH",
    "RAGCHAT_QDRANT_URL",
    "RAGCHAT_SQLITE_PATH",
    "RAGCHAT_GATEWAY_BIND",
    "RAGCHAT_GATEWAY_PORT",
    "RAGCHAT_SESSION_ID",
    "RAGCHAT_USER_ID",
];

fn clear_env() {
    for key in ENV_KEYS {
        unsafe { std::env::remove_var(key) };
    }
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(f, "{body}").unwrap();
    path
}

fn valid_config() -> Config {
    let mut config = Config::default();
    config.secrets.google_api_key = Some(crate::vault::Secret::new("g-key"));
    config
}

#[test]
fn defaults_match_service_layout() {
    let config = Config::default();
    assert_eq!(config.agent.session_id, "session_id");
    assert_eq!(config.agent.user_id, "user");
    assert_eq!(config.llm.provider, ProviderKind::Gemini);
    assert_eq!(config.llm.embedding_dimensions, 1536);
    assert_eq!(config.knowledge.path, "./data/Cant_Hurt_mee.pdf");
    assert_eq!(config.knowledge.collection, "recipes");
    assert!(!config.knowledge.recreate);
    assert_eq!(config.vector_store.backend, VectorBackend::Local);
    assert_eq!(config.vector_store.path, "./tmp/lancedb");
    assert_eq!(config.storage.sqlite_path, "data.db");
    assert_eq!(config.gateway.port, 8000);
    assert_eq!(config.gateway.cors_origins, vec!["http://localhost:5173"]);
    assert!(!config.gateway.include_sources);
}

#[test]
#[serial]
fn missing_file_yields_defaults() {
    clear_env();
    let config = Config::load(std::path::Path::new("/nonexistent/ragchat.toml")).unwrap();
    assert_eq!(config.gateway.port, 8000);
    assert_eq!(config.llm.model, "gemini-2.0-flash");
}

#[test]
#[serial]
fn parse_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[llm]
provider = "openai"
base_url = "http://localhost:9999/v1"
model = "gpt-4o-mini"

[knowledge]
path = "./docs/manual.md"
chunk_size = 800
chunk_overlap = 80

[gateway]
include_sources = true
"#,
    );

    clear_env();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.base_url, "http://localhost:9999/v1");
    assert_eq!(config.llm.embedding_dimensions, 1536);
    assert_eq!(config.knowledge.chunk_size, 800);
    assert_eq!(config.knowledge.collection, "recipes");
    assert!(config.gateway.include_sources);
    assert_eq!(config.gateway.port, 8000);
    assert_eq!(config.agent.history_limit, 6);
}

#[test]
#[serial]
fn invalid_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[llm\nprovider = ");
    clear_env();
    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("failed to parse config file"));
}

#[test]
#[serial]
fn unknown_provider_in_toml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[llm]\nprovider = \"ollama\"\n");
    clear_env();
    assert!(Config::load(&path).is_err());
}

#[test]
#[serial]
fn env_overrides_apply() {
    clear_env();
    unsafe {
        std::env::set_var("RAGCHAT_LLM_PROVIDER", "OpenAI");
        std::env::set_var("RAGCHAT_LLM_MODEL", "gpt-4o");
        std::env::set_var("RAGCHAT_KNOWLEDGE_PATH", "/srv/book.pdf");
        std::env::set_var("RAGCHAT_KNOWLEDGE_RECREATE", "true");
        std::env::set_var("RAGCHAT_VECTOR_STORE_BACKEND", "qdrant");
        std::env::set_var("RAGCHAT_QDRANT_URL", "http://qdrant:6334");
        std::env::set_var("RAGCHAT_SQLITE_PATH", "/var/lib/ragchat.db");
        std::env::set_var("RAGCHAT_GATEWAY_BIND", "0.0.0.0");
        std::env::set_var("RAGCHAT_GATEWAY_PORT", "9000");
        std::env::set_var("RAGCHAT_SESSION_ID", "shared");
        std::env::set_var("RAGCHAT_USER_ID", "alice");
    }

    let config = Config::load(std::path::Path::new("/nonexistent/ragchat.toml")).unwrap();
    clear_env();

    assert_eq!(config.llm.provider, ProviderKind::OpenAi);
    assert_eq!(config.llm.model, "gpt-4o");
    assert_eq!(config.knowledge.path, "/srv/book.pdf");
    assert!(config.knowledge.recreate);
    assert_eq!(config.vector_store.backend, VectorBackend::Qdrant);
    assert_eq!(config.vector_store.qdrant_url, "http://qdrant:6334");
    assert_eq!(config.storage.sqlite_path, "/var/lib/ragchat.db");
    assert_eq!(config.gateway.bind, "0.0.0.0");
    assert_eq!(config.gateway.port, 9000);
    assert_eq!(config.agent.session_id, "shared");
    assert_eq!(config.agent.user_id, "alice");
}

#[test]
#[serial]
fn invalid_env_values_are_ignored() {
    clear_env();
    unsafe {
        std::env::set_var("RAGCHAT_LLM_PROVIDER", "claude");
        std::env::set_var("RAGCHAT_GATEWAY_PORT", "not-a-port");
        std::env::set_var("RAGCHAT_KNOWLEDGE_RECREATE", "yes please");
        std::env::set_var("RAGCHAT_VECTOR_STORE_BACKEND", "lancedb");
    }

    let config = Config::load(std::path::Path::new("/nonexistent/ragchat.toml")).unwrap();
    clear_env();

    assert_eq!(config.llm.provider, ProviderKind::Gemini);
    assert_eq!(config.gateway.port, 8000);
    assert!(!config.knowledge.recreate);
    assert_eq!(config.vector_store.backend, VectorBackend::Local);
}

#[test]
#[serial]
fn env_overrides_beat_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[gateway]\nport = 7000\n");
    clear_env();
    unsafe { std::env::set_var("RAGCHAT_GATEWAY_PORT", "7100") };

    let config = Config::load(&path).unwrap();
    clear_env();
    assert_eq!(config.gateway.port, 7100);
}

#[tokio::test]
async fn resolve_secrets_populates_google_key() {
    let vault = MockVaultProvider::new().with_secret("GOOGLE_API_KEY", "AIza-test");
    let mut config = Config::default();
    config.resolve_secrets(&vault).await.unwrap();
    assert_eq!(
        config.secrets.google_api_key.as_ref().unwrap().expose(),
        "AIza-test"
    );
    assert_eq!(config.provider_api_key().unwrap().expose(), "AIza-test");
}

#[tokio::test]
async fn resolve_secrets_empty_vault_leaves_none() {
    let mut config = Config::default();
    config
        .resolve_secrets(&MockVaultProvider::new())
        .await
        .unwrap();
    assert!(config.secrets.google_api_key.is_none());
    assert!(config.secrets.openai_api_key.is_none());
}

#[tokio::test]
async fn provider_key_follows_selected_provider() {
    let vault = MockVaultProvider::new()
        .with_secret("GOOGLE_API_KEY", "g")
        .with_secret("OPENAI_API_KEY", "o");
    let mut config = Config::default();
    config.llm.provider = ProviderKind::OpenAi;
    config.resolve_secrets(&vault).await.unwrap();
    assert_eq!(config.provider_api_key().unwrap().expose(), "o");
}

#[test]
fn validate_accepts_defaults_with_key() {
    valid_config().validate().unwrap();
}

#[test]
fn validate_requires_provider_key() {
    let err = Config::default().validate().unwrap_err();
    assert!(err.to_string().contains("GOOGLE_API_KEY"));

    let mut config = valid_config();
    config.llm.provider = ProviderKind::OpenAi;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("OPENAI_API_KEY"));
}

#[test]
fn validate_rejects_bad_chunking() {
    let mut config = valid_config();
    config.knowledge.chunk_size = 0;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.knowledge.chunk_size = 100;
    config.knowledge.chunk_overlap = 100;
    assert!(config.validate().unwrap_err().to_string().contains("chunk_overlap"));
}

#[test]
fn validate_rejects_zero_dimensions_and_blank_ids() {
    let mut config = valid_config();
    config.llm.embedding_dimensions = 0;
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.agent.session_id = "  ".into();
    assert!(config.validate().is_err());

    let mut config = valid_config();
    config.knowledge.collection = String::new();
    assert!(config.validate().is_err());
}
