//! LLM provider inspection and settings.

use clap::Subcommand;

use mv_protocol::rest::{ApiKeyTestRequest, LlmSettingsUpdate};

use crate::Ctx;

#[derive(Subcommand)]
pub enum RagCommand {
    /// List configured providers and their models
    Providers,
    /// Check the RAG pipeline's health
    Health,
    /// Show stored provider settings
    Settings,
    /// Store or update a provider's settings
    Configure {
        provider: String,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Remove a provider's stored settings
    Remove { provider: String },
    /// Make a provider the default
    SetDefault { provider: String },
    /// Verify an API key against the provider
    TestKey {
        provider: String,
        api_key: String,
        #[arg(long)]
        model: Option<String>,
    },
}

pub async fn run(ctx: &Ctx, cmd: RagCommand) -> anyhow::Result<()> {
    match cmd {
        RagCommand::Providers => {
            let list = ctx.api.providers().await?;
            for p in &list.providers {
                let marker = if p.name == list.default_provider {
                    "*"
                } else {
                    " "
                };
                let availability = if p.is_available { "" } else { " (unavailable)" };
                println!("{marker} {} — {}{availability}", p.name, p.display_name);
                println!("    models: {}", p.models.join(", "));
            }
        }
        RagCommand::Health => {
            let health = ctx.api.rag_health().await?;
            println!("status: {}", health.status);
            for (component, state) in &health.components {
                println!("  {component}: {state}");
            }
        }
        RagCommand::Settings => {
            let list = ctx.api.llm_settings().await?;
            for s in &list.settings {
                println!(
                    "{}{}  enabled: {}  key: {}  model: {}",
                    s.provider,
                    if s.is_default { " (default)" } else { "" },
                    s.is_enabled,
                    s.api_key_preview.as_deref().unwrap_or("unset"),
                    s.model.as_deref().unwrap_or("provider default"),
                );
            }
        }
        RagCommand::Configure {
            provider,
            api_key,
            model,
            base_url,
            enabled,
        } => {
            let update = LlmSettingsUpdate {
                api_key,
                model,
                base_url,
                is_enabled: enabled,
                ..Default::default()
            };
            let saved = ctx.api.update_llm_settings(&provider, &update).await?;
            println!("Saved settings for {}", saved.provider);
        }
        RagCommand::Remove { provider } => {
            ctx.api.delete_llm_settings(&provider).await?;
            println!("Removed settings for {provider}");
        }
        RagCommand::SetDefault { provider } => {
            let saved = ctx.api.set_default_provider(&provider).await?;
            println!("Default provider is now {}", saved.provider);
        }
        RagCommand::TestKey {
            provider,
            api_key,
            model,
        } => {
            let request = ApiKeyTestRequest {
                provider,
                api_key,
                model,
                base_url: None,
            };
            let result = ctx.api.test_api_key(&request).await?;
            if result.success {
                println!("OK: {}", result.message);
            } else {
                println!(
                    "FAILED: {}",
                    result.error.as_deref().unwrap_or(&result.message)
                );
            }
        }
    }
    Ok(())
}
