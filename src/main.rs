use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::{
    client::GeminiClient,
    config::{policy_from_lookup, AppConfig, EnvSource},
    line::LineClient,
    recognition::{Pipeline, Recognizer, ValidationPolicy},
    webhook::AppState,
};

pub mod api_models;
pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod line;
pub mod messages;
pub mod recognition;
pub mod webhook;

#[derive(Parser, Debug)]
#[command(name = "venue-lens", version, about = "Find venues from forwarded screenshots")]
struct Cli {
    /// Settings file read before the process environment
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the LINE webhook server
    Serve {
        /// Address to listen on (overrides BIND_ADDR)
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Also require a locale keyword in the address
        #[arg(long)]
        strict: bool,
    },
    /// Recognize venues in a local image file
    Recognize {
        image: PathBuf,
        #[arg(long)]
        strict: bool,
    },
    /// Normalize raw model output from a file or stdin (no network)
    Parse {
        file: Option<PathBuf>,
        #[arg(long)]
        strict: bool,
    },
}

fn effective_policy(config_policy: ValidationPolicy, strict: bool) -> ValidationPolicy {
    if strict {
        ValidationPolicy::Strict
    } else {
        config_policy
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let source = EnvSource::load(&cli.env_file)?;

    let filter = source.get("RUST_LOG").unwrap_or_else(|| "info".to_string());
    env_logger::Builder::new().parse_filters(&filter).init();

    let command = cli.command.unwrap_or(Command::Serve {
        bind: None,
        strict: false,
    });

    match command {
        Command::Serve { bind, strict } => {
            let config = AppConfig::from_source(&source)?;
            let line_config = config.require_line()?;
            let recognizer: Box<dyn Recognizer> = Box::new(GeminiClient::new(config.gemini.clone())?);

            let state = Arc::new(AppState {
                pipeline: Pipeline::new(recognizer).with_policy(effective_policy(config.policy, strict)),
                line: LineClient::new(&line_config.channel_access_token),
                channel_secret: line_config.channel_secret.clone(),
            });

            log::info!(
                "Using model {} with {:?} validation",
                config.gemini.model,
                state.pipeline.policy()
            );
            webhook::serve(state, bind.unwrap_or(config.bind_addr))
                .await
                .context("Webhook server stopped")?;
        }
        Command::Recognize { image, strict } => {
            let config = AppConfig::from_source(&source)?;
            let bytes = cli::load_image(&image)?;
            let client = GeminiClient::new(config.gemini.clone())?;
            println!(
                "{} {} ({})",
                "🔍".cyan(),
                image.display().to_string().yellow(),
                client.model().dimmed()
            );

            let pipeline = Pipeline::new(client).with_policy(effective_policy(config.policy, strict));
            let outcome = cli::recognize_with_spinner(&pipeline, &bytes).await;
            cli::print_outcome(&outcome);
        }
        Command::Parse { file, strict } => {
            let raw = cli::read_raw_text(file.as_deref())?;
            let policy = effective_policy(policy_from_lookup(|key| source.get(key))?, strict);
            let outcome = recognition::pipeline::process_response(Some(&raw), policy);
            cli::print_outcome(&outcome);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["venue-lens"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.env_file, PathBuf::from(".env"));
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["venue-lens", "serve", "--bind", "127.0.0.1:3000"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Serve { bind: Some(_), strict: false })));

        let cli = Cli::try_parse_from(["venue-lens", "recognize", "shot.png", "--strict"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Recognize { strict: true, .. })));

        let cli = Cli::try_parse_from(["venue-lens", "parse"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Parse { file: None, .. })));
    }

    #[test]
    fn env_file_flag_is_global() {
        let cli = Cli::try_parse_from(["venue-lens", "parse", "--env-file", "bot.env"]).unwrap();
        assert_eq!(cli.env_file, PathBuf::from("bot.env"));
    }

    #[test]
    fn parse_policy_comes_from_env_file_without_api_key() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "VALIDATION_POLICY=strict").unwrap();
        let source = EnvSource::load(file.path()).unwrap();

        let policy = policy_from_lookup(|key| source.file_value(key)).unwrap();
        assert_eq!(effective_policy(policy, false), ValidationPolicy::Strict);
        assert!(AppConfig::from_lookup(|key| source.file_value(key)).is_err());
    }

    #[test]
    fn strict_flag_overrides_config() {
        assert_eq!(
            effective_policy(ValidationPolicy::NameOnly, true),
            ValidationPolicy::Strict
        );
        assert_eq!(
            effective_policy(ValidationPolicy::Strict, false),
            ValidationPolicy::Strict
        );
    }
}
