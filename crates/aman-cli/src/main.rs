//! aman CLI - read Amiga autodocs as man pages
//!
//! Looks a keyword up in the autodoc indices and shows the matching page,
//! or lists the titles when several pages match.

use std::process::ExitCode;
use std::time::Instant;

use aman_core::{DocumentSet, Page, Query};
use anyhow::Result;
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod output;

use cli::Cli;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    execute(&cli)
}

fn initialize_logging(cli: &Cli) -> Result<()> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    let config = cli.resolve_config(|key| std::env::var(key).ok())?;
    info!("config: {config:?}");

    if let Some(path) = &cli.dump_config {
        config.save(path)?;
        info!("wrote config to '{}'", path.display());
    }
    let Some(keyword) = cli.keyword.as_deref() else {
        return Ok(ExitCode::SUCCESS);
    };

    config.finalize()?;

    let start = Instant::now();
    let mut docs = DocumentSet::new(config.compression()).with_suffix(config.suffix.as_str());
    let all_valid = docs.setup(config.man_paths.as_slice(), &config.cache_dir, cli.force)?;

    let mut query = Query::new(cli.mode.into());
    query.setup(&docs, cli.force, all_valid)?;
    let page_refs = query.search(&docs, keyword)?;
    info!(
        "'{keyword}' matched {} pages in {:.6}s",
        page_refs.len(),
        start.elapsed().as_secs_f64()
    );

    if page_refs.is_empty() {
        eprintln!("no entry found for '{keyword}'");
        return Ok(ExitCode::FAILURE);
    }

    let text = if cli.list || (page_refs.len() > 1 && !cli.all) {
        output::render_list(&page_refs, cli.format)?
    } else {
        let pages = page_refs
            .iter()
            .map(|page_ref| docs.resolve(page_ref))
            .collect::<aman_core::Result<Vec<&Page>>>()?;
        output::render_pages(&pages, cli.format)?
    };

    output::emit(&text, cli.output.as_deref(), config.pager.as_deref())?;
    Ok(ExitCode::SUCCESS)
}
