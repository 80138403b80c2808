use anyhow::{anyhow, Result};
use tracing::info;

use crate::extract::ProductScan;
use crate::prompts::{self, UserProfile};
use crate::providers::{Provider, ProviderUsage};
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct Advisor<P: Provider> {
    provider: P,
    settings: Settings,
}

#[derive(Debug, Clone)]
pub struct AdviceOutput {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

impl<P: Provider> Advisor<P> {
    pub fn new(provider: P, settings: Settings) -> Self {
        Self { provider, settings }
    }

    /// Advice for a single product: its ingredient list and nutrition table.
    pub async fn product_advice(
        &self,
        profile: &UserProfile,
        scan: &ProductScan,
    ) -> Result<AdviceOutput> {
        let prompt = prompts::render_product_prompt(profile, scan)?;
        self.advise(prompt).await
    }

    /// Advice for several products eaten together.
    pub async fn meal_advice(
        &self,
        profile: &UserProfile,
        scans: &[ProductScan],
    ) -> Result<AdviceOutput> {
        if scans.is_empty() {
            return Err(anyhow!("meal advice needs at least one product"));
        }
        let prompt = prompts::render_meal_prompt(profile, scans)?;
        self.advise(prompt).await
    }

    pub async fn advise(&self, prompt: String) -> Result<AdviceOutput> {
        let response = self
            .provider
            .clone()
            .append_system_input(self.settings.system_prompt.clone())
            .append_user_input(prompt)
            .complete()
            .await?;
        info!(
            "advice received from {}",
            response.model.as_deref().unwrap_or("unknown model")
        );
        Ok(AdviceOutput {
            text: response.text,
            model: response.model,
            usage: response.usage,
        })
    }
}
