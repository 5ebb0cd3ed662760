use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use sal_core::config::SessionConfig;
use sal_core::test_harness::{Scenario, Simulator, SimulatorReport};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Command::new("sal-sim")
        .version(sal_core::VERSION)
        .about("Spatial anchor lifecycle simulator")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Session configuration (TOML)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON"),
        )
        .subcommand(
            Command::new("replay")
                .about("Replay a scripted scenario")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario file (JSON)"),
                ),
        )
        .subcommand(Command::new("demo").about("Run the built-in scenario"));

    let matches = cli.get_matches();
    let config = load_config(&matches)?;

    let scenario = match matches.subcommand() {
        Some(("replay", args)) => {
            let path = args
                .get_one::<PathBuf>("scenario")
                .context("--scenario is required")?;
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario {}", path.display()))?;
            Scenario::from_json(&raw)
                .with_context(|| format!("invalid scenario {}", path.display()))?
        }
        Some(("demo", _)) => Scenario::demo(),
        _ => unreachable!("subcommand_required"),
    };

    tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "replaying");
    let report = Simulator::new(config)?.run(&scenario).await?;
    print_report(&report, matches.get_flag("json"))?;

    std::process::exit(if report.passed() { 0 } else { 1 });
}

fn load_config(matches: &ArgMatches) -> Result<SessionConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(SessionConfig::default()),
    }
}

fn print_report(report: &SimulatorReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.generate_text());
    }
    Ok(())
}
