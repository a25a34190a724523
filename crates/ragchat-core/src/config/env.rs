use super::Config;

/// Parse `value` into a serde enum such as [`super::ProviderKind`].
fn parse_enum<T: serde::de::DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase())).ok()
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_llm();
        self.apply_env_overrides_storage();
        self.apply_env_overrides_gateway();
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("RAGCHAT_LLM_PROVIDER") {
            if let Some(kind) = parse_enum(&v) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGCHAT_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGCHAT_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
    }

    fn apply_env_overrides_storage(&mut self) {
        if let Ok(v) = std::env::var("RAGCHAT_KNOWLEDGE_PATH") {
            self.knowledge.path = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_KNOWLEDGE_RECREATE") {
            if let Ok(recreate) = v.parse::<bool>() {
                self.knowledge.recreate = recreate;
            } else {
                tracing::warn!("ignoring invalid RAGCHAT_KNOWLEDGE_RECREATE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGCHAT_VECTOR_STORE_BACKEND") {
            if let Some(backend) = parse_enum(&v) {
                self.vector_store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid RAGCHAT_VECTOR_STORE_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGCHAT_VECTOR_STORE_PATH") {
            self.vector_store.path = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_QDRANT_URL") {
            self.vector_store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_SQLITE_PATH") {
            self.storage.sqlite_path = v;
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("RAGCHAT_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_GATEWAY_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.gateway.port = port;
            } else {
                tracing::warn!("ignoring invalid RAGCHAT_GATEWAY_PORT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGCHAT_SESSION_ID") {
            self.agent.session_id = v;
        }
        if let Ok(v) = std::env::var("RAGCHAT_USER_ID") {
            self.agent.user_id = v;
        }
    }
}
