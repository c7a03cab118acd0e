//! verification-gate CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, CliLogFormat, Command};
use color_eyre::eyre::bail;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use verification_gate::config::{default_config_path, Settings};
use verification_gate::{CheckResult, GateBuilder, RequestContext, Subject};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();
    let settings = cli.settings()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        CliLogFormat::Text => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
        CliLogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }

    info!("verification-gate v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Check {
            user_id,
            chat_id,
            language,
            username,
            fail_closed,
        } => {
            let mut subject = Subject::new(user_id);
            if let Some(language) = language {
                subject = subject.with_language(language);
            }
            if let Some(username) = username {
                subject = subject.with_username(username);
            }
            check(&settings, subject, chat_id.unwrap_or(user_id), fail_closed).await?;
        }
        Command::Probe => {
            let gate = GateBuilder::from_settings(&settings)?.build().await?;
            info!("Checker initialized (fail_open={})", gate.is_fail_open());
            println!("ok");
        }
        Command::InitConfig {
            output,
            kind,
            key,
            force,
        } => {
            let path = output
                .or(cli.config)
                .unwrap_or_else(default_config_path);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let settings = Settings {
                checker: Some(kind.into_config(key)),
                ..Settings::default()
            };
            settings.to_file(&path)?;
            info!("Wrote {}", path.display());
        }
    }

    Ok(())
}

async fn check(
    settings: &Settings,
    subject: Subject,
    chat_id: i64,
    fail_closed: bool,
) -> color_eyre::Result<()> {
    let mut builder = GateBuilder::from_settings(settings)?.on_error(|e, ctx| {
        warn!(
            "Verification error for {:?}: {e}",
            ctx.subject().map(|s| s.id)
        );
    });
    if fail_closed {
        builder = builder.fail_open(false);
    }
    let gate = builder.build().await?;

    let user_id = subject.id;
    let ctx = RequestContext::for_subject(subject).with_chat(chat_id);
    let report = gate
        .handle(ctx, |mut ctx| async move {
            let allowed = ctx.verify_tasks().await;
            let verification = ctx.verification();
            json!({
                "user_id": user_id,
                "chat_id": chat_id,
                "allowed": allowed,
                "tasks": verification.map(CheckResult::task_targets),
                "meta": verification.map(|v| v.meta.clone()),
            })
        })
        .await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
