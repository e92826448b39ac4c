//! Select command
//!
//! Runs the selection procedure from a primary region and reports the
//! accepted region, optionally writing it into an env file.

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Args;
use regionfit_core::{
    expand_path, EnvFileStore, FailureReason, SelectionOutcome, SelectionProcedure,
};

use super::{region_list, Context, ModelArgs};
use crate::output::{print_error, print_outcome, print_success};
use crate::prompt::ConsoleInteraction;

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Primary region to try first
    #[arg(long, short)]
    pub region: String,

    #[command(flatten)]
    pub models: ModelArgs,

    /// Candidate regions, comma separated (default: from config)
    #[arg(long, value_delimiter = ',')]
    pub candidates: Vec<String>,

    /// Recommended headroom per model (default: from config)
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<i64>,

    /// Maximum probes in flight (default: from config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Answer prompts automatically: keep a sufficient primary, take
    /// fallbacks in rank order
    #[arg(long, short)]
    pub yes: bool,

    /// Write the accepted region into this dotenv-style file
    #[arg(long)]
    pub env_file: Option<String>,

    /// Key to write the region under (default: from config)
    #[arg(long)]
    pub env_key: Option<String>,
}

pub async fn execute(ctx: &Context, args: SelectArgs) -> Result<ExitCode> {
    let outcome = select(ctx, &args).await;

    let mut written = None;
    if let (SelectionOutcome::Accepted(region), Some(raw)) = (&outcome, &args.env_file) {
        let key = args.env_key.as_deref().unwrap_or(&ctx.config.env_key);
        let store = EnvFileStore::new(expand_path(raw));
        let previous = store
            .get(key)
            .with_context(|| format!("Failed to read {}", store.path().display()))?;
        store
            .set(key, region)
            .with_context(|| format!("Failed to write {} to {}", key, store.path().display()))?;
        let message = match previous {
            Some(old) if old != *region => format!(
                "Updated {} from \"{}\" to \"{}\" in {}",
                key,
                old,
                region,
                store.path().display()
            ),
            _ => format!("Wrote {}=\"{}\" to {}", key, region, store.path().display()),
        };
        print_success(&message, ctx.quiet);
        written = Some(store.path().display().to_string());
    }

    print_outcome(&outcome, written, ctx.format)?;
    Ok(ExitCode::from(outcome.exit_code() as u8))
}

async fn select(ctx: &Context, args: &SelectArgs) -> SelectionOutcome {
    let requests = match args.models.requests(&ctx.config) {
        Ok(requests) => requests,
        Err(e) => return invalid(FailureReason::invalid_request(&e)),
    };

    let mut settings = ctx.config.assessment_settings();
    if let Some(threshold) = args.threshold {
        if threshold < 0 {
            return invalid(FailureReason::InvalidRequestSpecification(format!(
                "threshold must not be negative, got {}",
                threshold
            )));
        }
        settings.recommended_threshold = threshold;
    }
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 {
            return invalid(FailureReason::InvalidRequestSpecification(
                "concurrency must be at least 1".to_string(),
            ));
        }
        settings.max_concurrent_probes = concurrency;
    }

    let candidates = if args.candidates.is_empty() {
        ctx.config.candidate_regions.clone()
    } else {
        region_list(&args.candidates)
    };

    let engine = ctx.engine(settings).await;
    let mut interaction = ConsoleInteraction::new(args.yes, ctx.quiet);
    SelectionProcedure::new(&engine, &requests, &candidates)
        .run(&args.region, &mut interaction)
        .await
}

/// Fail before any probe, reporting like the procedure would
fn invalid(reason: FailureReason) -> SelectionOutcome {
    print_error(&reason.to_string());
    SelectionOutcome::Failed(reason)
}
