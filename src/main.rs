use anyhow::Result;
use clap::Parser;
use tasktally::{
    cli::{run_cli, Args},
    utils::runtime::single_thread_runtime,
};
use tracing::error;

fn main() -> Result<()> {
    let args = Args::parse();
    let runtime = single_thread_runtime()?;

    let result = runtime.block_on(run_cli(args)).inspect_err(|e| {
        error!("Error running cli {e:?}");
    });

    // Reading stdin occupies a blocking thread that won't return before the next line.
    runtime.shutdown_background();
    result
}
