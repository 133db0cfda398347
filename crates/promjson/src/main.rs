use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use promjson_core::{BoxError, Pipeline, decoder_for};
use promjson_fetch::{Input, open};
use promjson_observe::init_logger;

mod cli;
mod output;

use cli::Cli;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1) logger
    if let Err(e) = init_logger(&cli.logger_config()) {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let mut stdout = BufWriter::new(io::stdout());
    match run(&cli, &mut stdout).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Read, convert and print. Nothing reaches `out` unless the whole input converted.
async fn run<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<()> {
    // 2) input
    let input = Input::from_arg(cli.input.as_deref());
    let fetch_cfg = cli.fetch_config();
    fetch_cfg.validate()?;
    debug!(%input, "reading metrics");

    // 3) producer: open the input and decode records off the consumer's task
    let pipeline = Pipeline::spawn(
        async move {
            let fetched = open(&input, &fetch_cfg).await?;
            Ok::<_, BoxError>(decoder_for(fetched.content_type.as_deref(), fetched.body))
        },
        &cli.pipeline_config(),
    );

    // 4) consumer
    let mut families = pipeline.collect().await.context("error reading metrics")?;
    debug!(families = families.len(), "metrics converted");

    // 5) extra labels
    output::apply_labels(&mut families, &cli.labels);

    // 6) output
    let now = time::OffsetDateTime::now_utc().unix_timestamp();
    output::write_families(out, &families, cli.format, now)
}
