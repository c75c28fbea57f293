use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use std::fs;
use std::path::PathBuf;

use vcs_stamp::cli::Cli;
use vcs_stamp::config::Config;
use vcs_stamp::runner::SystemRunner;

fn log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vcs-stamp")
        .join("logs")
        .join("vcs-stamp.log")
}

fn setup_logging() -> Result<()> {
    let log_file = log_file();
    if let Some(log_dir) = log_file.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn generate(cli: &Cli, config: &Config) -> Result<()> {
    let repo = cli.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let backend = cli
        .backend
        .unwrap_or(config.backend)
        .resolve(&repo)
        .context("Failed to select a version control backend")?;
    info!("Using {} backend in {}", backend, repo.display());

    let mut generator = config.generator(backend);
    if let Some(format) = cli.format {
        generator.format = format;
    }
    if let Some(zone) = cli.timezone {
        generator.zone = zone;
    }

    let runner = SystemRunner::new(&repo);

    if cli.stdout {
        let stamp = generator.stamp(&runner).context("Failed to read the head revision")?;
        print!("{}", generator.render(&stamp));
        return Ok(());
    }

    let output = cli.output.clone().unwrap_or_else(|| config.output_path(backend));
    let stamp = generator
        .write(&runner, &output)
        .context(format!("Failed to write {}", output.display()))?;

    println!(
        "{} {} {} ({})",
        "✓".green(),
        output.display(),
        stamp.version.cyan(),
        stamp.date
    );
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("Starting vcs-stamp");

    generate(&cli, &config).context("Failed to generate version stamp")?;

    Ok(())
}
