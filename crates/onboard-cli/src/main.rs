//! `onboard` command-line entry point

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use onboard_cli::{catalog_json, render_catalog, telemetry, Replayer, Scenario};
use onboard_core::OnboardingConfig;
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("onboard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Property onboarding workflow tools")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("replay")
                .about("Replay a scenario against a fresh in-memory store")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario JSON file"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Service configuration TOML"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report as JSON"),
                ),
        )
        .subcommand(
            Command::new("stages")
                .about("List stages, canonical fields and aliases")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("replay", args)) => {
            let config = match args.get_one::<PathBuf>("config") {
                Some(path) => OnboardingConfig::load(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => OnboardingConfig::default(),
            };
            telemetry::init(&config.log)?;

            let path = args
                .get_one::<PathBuf>("scenario")
                .context("--scenario is required")?;
            let scenario = Scenario::load(path)?;
            let report = Replayer::new(config).run(&scenario).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Some(("stages", args)) => {
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&catalog_json())?);
            } else {
                print!("{}", render_catalog());
            }
        }
        _ => {
            cli().print_help()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn replay_requires_a_scenario() {
        assert!(cli().try_get_matches_from(["onboard", "replay"]).is_err());
        let matches = cli()
            .try_get_matches_from(["onboard", "replay", "--scenario", "s.json", "--json"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        assert!(args.get_flag("json"));
    }
}
