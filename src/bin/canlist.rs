//! CLI binary for canlist.

use anyhow::Context;
use canlist::config::{AppConfig, MAX_TARGET};
use canlist::export;
use canlist::{ProviderKind, RunRequest, Scope};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

/// canlist: Canadian business listings, merged and de-duplicated.
#[derive(Parser)]
#[command(name = "canlist", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true, env = "CANLIST_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Collect listings and write them to a spreadsheet.
    Search(SearchArgs),

    /// Print the cities searched by --canada-wide.
    Cities,

    /// Write a default configuration file.
    InitConfig {
        /// Destination (defaults to the standard config path).
        path: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Business type or keywords, e.g. "dentist".
    #[arg(short, long)]
    term: String,

    /// City or region, e.g. "Toronto, ON".
    #[arg(short, long, required_unless_present = "canada_wide")]
    location: Option<String>,

    /// Search every city in the configured Canada-wide list instead.
    #[arg(long, conflicts_with = "location")]
    canada_wide: bool,

    /// Unique listings to collect (per city with --canada-wide).
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u16).range(1..=500))]
    target: Option<u16>,

    /// Providers in priority order, comma-separated
    /// (yelp, google-places, bing, duckduckgo).
    #[arg(short, long, value_delimiter = ',')]
    providers: Option<Vec<ProviderKind>>,

    /// Output file; `.json` writes JSON, anything else CSV.
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Write CSV to stdout instead of a file.
    #[arg(long)]
    stdout: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    canlist::logging::init(cli.verbose);

    match cli.command {
        Command::Search(args) => {
            let config = AppConfig::load(cli.config.as_deref())?;
            run_search(config, args).await
        }
        Command::Cities => {
            let config = AppConfig::load(cli.config.as_deref())?;
            for city in &config.search.cities {
                println!("{city}");
            }
            Ok(())
        }
        Command::InitConfig { path, force } => init_config(path.or(cli.config), force),
    }
}

async fn run_search(config: AppConfig, args: SearchArgs) -> anyhow::Result<()> {
    let scope = match args.location {
        Some(location) if !args.canada_wide => Scope::Location(location),
        _ => Scope::CanadaWide,
    };
    let mut request = RunRequest::from_defaults(&config, args.term, scope);
    if let Some(target) = args.target {
        request.target = usize::from(target).min(MAX_TARGET);
    }
    if let Some(providers) = args.providers {
        request.providers = providers;
    }
    let output = args.output.unwrap_or_else(|| config.search.output.clone());

    let spinner = spinner(&request);
    let result = canlist::execute(&config, request).await;
    spinner.finish_and_clear();
    let report = result?;

    for (outcome, reason) in report.failures() {
        eprintln!("warning: {} ({}) failed: {reason}", outcome.provider, outcome.location);
    }

    if report.records.is_empty() {
        eprintln!("No listings found. Check your API keys and input.");
        return Ok(());
    }

    if args.stdout {
        export::write_csv(&report.records, std::io::stdout().lock())?;
        eprintln!("Retrieved {} unique listings.", report.records.len());
    } else {
        export::export_to_path(&report.records, &output)
            .with_context(|| format!("writing {}", output.display()))?;
        println!(
            "Retrieved {} unique listings. Saved to {}",
            report.records.len(),
            output.display()
        );
    }
    Ok(())
}

fn spinner(request: &RunRequest) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    let names: Vec<&str> = request.providers.iter().map(|p| p.name()).collect();
    pb.set_message(format!("Gathering listings from {}", names.join(", ")));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(AppConfig::default_config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    AppConfig::default().save_to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_parses_provider_list() {
        let cli = Cli::try_parse_from([
            "canlist",
            "search",
            "--term",
            "dentist",
            "--location",
            "Ottawa, ON",
            "--providers",
            "yelp,bing",
            "-n",
            "25",
        ])
        .expect("valid arguments");
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(
            args.providers,
            Some(vec![ProviderKind::Yelp, ProviderKind::Bing])
        );
        assert_eq!(args.target, Some(25));
    }

    #[test]
    fn location_or_canada_wide_is_required() {
        assert!(Cli::try_parse_from(["canlist", "search", "--term", "dentist"]).is_err());
        assert!(
            Cli::try_parse_from(["canlist", "search", "--term", "dentist", "--canada-wide"])
                .is_ok()
        );
    }

    #[test]
    fn location_conflicts_with_canada_wide() {
        let result = Cli::try_parse_from([
            "canlist",
            "search",
            "--term",
            "dentist",
            "--location",
            "Ottawa",
            "--canada-wide",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn target_range_is_enforced() {
        for bad in ["0", "501"] {
            let result = Cli::try_parse_from([
                "canlist", "search", "--term", "x", "--canada-wide", "-n", bad,
            ]);
            assert!(result.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let result = Cli::try_parse_from([
            "canlist",
            "search",
            "--term",
            "x",
            "--canada-wide",
            "--providers",
            "altavista",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        init_config(Some(path.clone()), false).expect("first write");
        assert!(init_config(Some(path.clone()), false).is_err());
        init_config(Some(path.clone()), true).expect("forced write");
        assert!(AppConfig::from_file(&path).is_ok());
    }
}
