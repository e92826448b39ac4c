//! Assess command
//!
//! Probes every given region and prints the full quota report. No region is
//! selected and nothing is written.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use regionfit_core::services::report;
use regionfit_core::{FailureReason, RegionAssessment};

use super::{region_list, Context, ModelArgs};
use crate::output::{print_error, print_output};

#[derive(Args, Debug)]
pub struct AssessArgs {
    /// Regions to assess, comma separated (default: candidate regions from config)
    #[arg(long, value_delimiter = ',')]
    pub regions: Vec<String>,

    #[command(flatten)]
    pub models: ModelArgs,
}

pub async fn execute(ctx: &Context, args: AssessArgs) -> Result<ExitCode> {
    let requests = match args.models.requests(&ctx.config) {
        Ok(requests) => requests,
        Err(e) => {
            let reason = FailureReason::invalid_request(&e);
            print_error(&reason.to_string());
            return Ok(ExitCode::from(reason.exit_code() as u8));
        }
    };

    let regions = if args.regions.is_empty() {
        ctx.config.candidate_regions.clone()
    } else {
        region_list(&args.regions)
    };

    let engine = ctx.engine(ctx.config.assessment_settings()).await;
    let table = engine.assess(&requests, &regions).await;

    // Report in the order the regions were given
    let mut ordered: Vec<&RegionAssessment> = Vec::with_capacity(table.len());
    for region in &regions {
        if let Some(assessment) = table.get(region) {
            if !ordered.iter().any(|o| o.region == assessment.region) {
                ordered.push(assessment);
            }
        }
    }

    let rows = report::rows(ordered);
    print_output(&rows, ctx.format, "No regions to show.")?;
    Ok(ExitCode::SUCCESS)
}
