use super::pipeline_builder;
use crate::cli::args::RunArgs;
use crate::exit_codes::{EXIT_SUCCESS, PARTIAL_FAILURE};

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let pipeline = pipeline_builder::build(&args.config)?;
    let report = pipeline.run().await?;

    tracing::info!(
        records = report.records,
        consensus = report.consensus,
        summary_failures = report.summary_failures,
        secondary_failures = report.secondary_failures,
        "pipeline finished"
    );
    if report.summary_failures > 0 || report.secondary_failures > 0 {
        return Ok(PARTIAL_FAILURE);
    }
    Ok(EXIT_SUCCESS)
}
