mod env;
mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};

use crate::vault::{Secret, VaultProvider};

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve API keys through the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault backend fails.
    pub async fn resolve_secrets(&mut self, vault: &dyn VaultProvider) -> anyhow::Result<()> {
        if let Some(val) = vault.get_secret("GOOGLE_API_KEY").await? {
            self.secrets.google_api_key = Some(Secret::new(val));
        }
        if let Some(val) = vault.get_secret("OPENAI_API_KEY").await? {
            self.secrets.openai_api_key = Some(Secret::new(val));
        }
        Ok(())
    }

    /// API key for the selected provider, if one was resolved.
    #[must_use]
    pub fn provider_api_key(&self) -> Option<&Secret> {
        match self.llm.provider {
            ProviderKind::Gemini => self.secrets.google_api_key.as_ref(),
            ProviderKind::OpenAi => self.secrets.openai_api_key.as_ref(),
        }
    }

    /// Check cross-field constraints after overrides and secrets are applied.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.provider_api_key().is_none_or(|k| k.expose().trim().is_empty()) {
            let var = match self.llm.provider {
                ProviderKind::Gemini => "GOOGLE_API_KEY",
                ProviderKind::OpenAi => "OPENAI_API_KEY",
            };
            bail!(
                "{var} is not set (required by llm.provider = \"{}\")",
                self.llm.provider.as_str()
            );
        }
        if self.llm.embedding_dimensions == 0 {
            bail!("llm.embedding_dimensions must be greater than zero");
        }
        if self.knowledge.chunk_size == 0 {
            bail!("knowledge.chunk_size must be greater than zero");
        }
        if self.knowledge.chunk_overlap >= self.knowledge.chunk_size {
            bail!(
                "knowledge.chunk_overlap ({}) must be smaller than knowledge.chunk_size ({})",
                self.knowledge.chunk_overlap,
                self.knowledge.chunk_size
            );
        }
        if self.agent.session_id.trim().is_empty() || self.agent.user_id.trim().is_empty() {
            bail!("agent.session_id and agent.user_id must not be empty");
        }
        if self.knowledge.collection.trim().is_empty() {
            bail!("knowledge.collection must not be empty");
        }
        Ok(())
    }
}
