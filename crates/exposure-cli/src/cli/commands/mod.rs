use super::args::*;

pub mod classify;
pub mod run;

mod pipeline_builder;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Run(args) => run::run(args).await,
        Command::Classify(args) => classify::run(args).await,
    }
}
