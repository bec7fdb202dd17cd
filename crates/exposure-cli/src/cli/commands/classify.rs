use super::pipeline_builder;
use crate::cli::args::ClassifyArgs;
use crate::exit_codes::{EXIT_SUCCESS, PARTIAL_FAILURE};

pub async fn run(args: ClassifyArgs) -> anyhow::Result<i32> {
    let pipeline = pipeline_builder::build(&args.config)?;
    let report = pipeline.run_classification(&args.input, &args.output).await?;

    tracing::info!(
        records = report.records,
        failures = report.secondary_failures,
        "classification finished"
    );
    if report.secondary_failures > 0 {
        return Ok(PARTIAL_FAILURE);
    }
    Ok(EXIT_SUCCESS)
}
