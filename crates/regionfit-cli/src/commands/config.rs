//! Config commands
//!
//! Commands for inspecting the effective configuration.

use anyhow::Result;
use clap::Subcommand;
use regionfit_core::config::default_config_path;
use serde::Serialize;
use tabled::Tabled;

use super::Context;
use crate::output::{print_info, print_output, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

pub async fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(ctx),
        ConfigAction::Path => show_path(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let rows = config_rows(ctx);
    print_output(&rows, ctx.format, "No configuration.")?;
    Ok(())
}

fn show_path(ctx: &Context) -> Result<()> {
    let path = match &ctx.config_path {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };
    match ctx.format {
        OutputFormat::Table => print_info(&path.display().to_string(), false),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "path": path.display().to_string(),
                "exists": path.exists(),
            }))?
        ),
    }
    Ok(())
}

fn config_rows(ctx: &Context) -> Vec<ConfigRow> {
    let config = &ctx.config;
    let source = if ctx.config_path.is_some() { "file" } else { "default" };
    let row = |key: &str, value: String| ConfigRow {
        key: key.to_string(),
        value,
        source: source.to_string(),
    };

    let mut rows = Vec::new();

    rows.push(ConfigRow {
        key: "config_file".to_string(),
        value: ctx
            .config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Not found".to_string()),
        source: ctx.config_source.as_str().to_string(),
    });

    rows.push(row("candidate_regions", config.candidate_regions.join(",")));
    rows.push(row("recommended_threshold", config.recommended_threshold.to_string()));
    rows.push(row("max_concurrent_probes", config.max_concurrent_probes.to_string()));
    rows.push(row("env_key", config.env_key.clone()));
    rows.push(row(
        "models",
        if config.models.is_empty() {
            "(none)".to_string()
        } else {
            config
                .models
                .iter()
                .map(|m| format!("{}:{}:{}", m.model, m.deployment_type, m.capacity))
                .collect::<Vec<_>>()
                .join(",")
        },
    ));

    let quota_source = match &ctx.quota_file {
        Some(path) => ConfigRow {
            key: "quota_source".to_string(),
            value: format!("file {}", path.display()),
            source: "flag".to_string(),
        },
        None => row(
            "quota_source",
            format!("{} {}", config.provider.program, config.provider.args.join(" ")),
        ),
    };
    rows.push(quota_source);
    rows.push(row("usage_name_template", config.provider.usage_name_template.clone()));
    rows.push(row("timeout_secs", config.provider.timeout_secs.to_string()));

    rows
}
