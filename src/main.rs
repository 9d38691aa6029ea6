mod audio;
mod classify;
mod cli;
mod config;
mod error;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use classify::RemoteClassifier;
use cli::Cli;
use pipeline::Analyzer;
use report::OutputFormat;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if let Some(path) = config::find_config(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.remote_url.is_none() { cli.remote_url = cfg.classifier.remote_url; }
            if cli.timeout == 10 { cli.timeout = cfg.classifier.timeout_secs; }
            if cli.format == OutputFormat::Text { cli.format = cfg.output.format; }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if cli.jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let analyzer = match cli.remote_url.as_deref().filter(|_| !cli.local_only) {
        Some(url) => {
            log::info!("Remote classifier: {} (timeout {}s)", url, cli.timeout);
            let remote = RemoteClassifier::new(url, Duration::from_secs(cli.timeout))
                .context("Failed to build HTTP client")?;
            Analyzer::with_primary(Box::new(remote))
        }
        None => Analyzer::local(),
    };
    log::info!(
        "Analyzing {} file(s) with {} classifier",
        cli.inputs.len(),
        analyzer.primary_name().unwrap_or("heuristic")
    );

    let pb = (cli.inputs.len() > 1).then(|| {
        let pb = ProgressBar::new(cli.inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} clips")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb
    });

    let outcomes = analyzer.analyze_batch(&cli.inputs, pb.as_ref());

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match cli.format {
        OutputFormat::Json => {
            println!("{}", report::to_json(&outcomes).context("Failed to serialize results")?)
        }
        OutputFormat::Text => print!("{}", report::to_text(&outcomes)),
    }

    let failed = outcomes.iter().filter(|o| o.report.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} file(s) could not be analyzed", failed, outcomes.len());
    }
    Ok(())
}
