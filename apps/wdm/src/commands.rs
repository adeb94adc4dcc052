//! Command implementations

use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;
use wdm_config::{Config, Preferences};
use wdm_errors::UpdateError;
use wdm_events::{EventEmitter, UpdateEvent};
use wdm_packager::{TransformReport, TransformRequest};
use wdm_platform::fs;
use wdm_updater::{FeedSource, HostInfo, RemoteUpdateEntry};

use crate::cli::Commands;
use crate::error::CliError;
use crate::setup::AppContext;

/// Result of a command, rendered as text or JSON
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum CommandResult {
    Transform(TransformReport),
    Check { notified: bool },
    Updates(UpdateListing),
    Status(StatusReport),
    Preferences(Preferences),
    Success(String),
}

#[derive(Debug, Serialize)]
pub struct UpdateListing {
    pub build: Option<String>,
    pub all: bool,
    pub entries: Vec<RemoteUpdateEntry>,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub product_version: Option<String>,
    pub build: Option<String>,
    pub installed_version: Option<String>,
    pub feed_url: String,
    pub preferences: Preferences,
}

pub async fn execute(command: Commands, ctx: &AppContext) -> Result<CommandResult, CliError> {
    match command {
        Commands::Install { package } => {
            let report = ctx
                .transformer()
                .run_to_completion(TransformRequest::new(package))
                .await?;
            Ok(CommandResult::Transform(report))
        }

        Commands::InstallUpdate => install_update(ctx).await,

        Commands::Check => {
            let notified = ctx.scheduler().check_now().await;
            Ok(CommandResult::Check { notified })
        }

        Commands::Watch => watch(ctx).await,

        Commands::Updates { all } => {
            let entries = ctx.feed().fetch().await?;
            let build = ctx.host().os_build().await.ok();
            let entries = match (&build, all) {
                (Some(build), false) => entries
                    .into_iter()
                    .filter(|entry| &entry.os == build)
                    .collect(),
                _ => entries,
            };
            Ok(CommandResult::Updates(UpdateListing {
                build,
                all,
                entries,
            }))
        }

        Commands::Status => {
            let host = ctx.host();
            Ok(CommandResult::Status(StatusReport {
                product_version: host.os_product_version().await.ok(),
                build: host.os_build().await.ok(),
                installed_version: host.installed_version().await,
                feed_url: ctx.config.updates.feed_url.clone(),
                preferences: ctx.preferences.snapshot().await,
            }))
        }

        Commands::Suppress { version } => {
            let version = match version {
                Some(version) => version,
                None => latest_for_build(ctx)
                    .await?
                    .version
                    .ok_or_else(|| {
                        CliError::InvalidArguments(
                            "the feed entry for this OS build has no version".to_string(),
                        )
                    })?,
            };
            ctx.preferences.suppress(&version).await?;
            ctx.event_sender.emit_update(UpdateEvent::SuppressionSet {
                version: version.clone(),
            });
            Ok(CommandResult::Success(format!(
                "Alerts for {version} will no longer be shown"
            )))
        }

        Commands::Unsuppress => {
            let message = if ctx.preferences.clear_suppression().await? {
                ctx.event_sender.emit_update(UpdateEvent::SuppressionCleared);
                "Update alerts re-enabled"
            } else {
                "No version was suppressed"
            };
            Ok(CommandResult::Success(message.to_string()))
        }

        Commands::Prefs { automatic_checks } => {
            if let Some(enabled) = automatic_checks {
                ctx.preferences.set_automatic_checks(enabled).await?;
                info!(enabled, "automatic checks preference changed");
            }
            Ok(CommandResult::Preferences(ctx.preferences.snapshot().await))
        }
    }
}

/// Feed entry selected for the running OS build
async fn latest_for_build(ctx: &AppContext) -> Result<RemoteUpdateEntry, CliError> {
    let entries = ctx.feed().fetch().await?;
    let build = ctx.host().os_build().await?;
    let selection = wdm_updater::select(&entries, &build, ctx.config.updates.feed_match);
    selection
        .selected
        .cloned()
        .ok_or_else(|| wdm_errors::Error::from(UpdateError::NoMatchingEntry { build }).into())
}

async fn install_update(ctx: &AppContext) -> Result<CommandResult, CliError> {
    let entry = latest_for_build(ctx).await?;
    let download_dir = download_dir(&ctx.config);
    fs::create_dir_all(&download_dir).await?;

    let result = async {
        let package =
            wdm_updater::download_update(&ctx.net, &entry, &download_dir, &ctx.event_sender)
                .await?;
        let request = TransformRequest::update(package, ctx.config.packager.vendor_marker.clone());
        Ok::<_, CliError>(ctx.transformer().run_to_completion(request).await?)
    }
    .await;

    if let Err(e) = fs::remove_dir_all(&download_dir).await {
        warn!(error = %e, "failed to remove download directory");
    }

    result.map(CommandResult::Transform)
}

fn download_dir(config: &Config) -> PathBuf {
    config
        .staging_root()
        .join(format!("wdm-download-{}", Uuid::new_v4()))
}

async fn watch(ctx: &AppContext) -> Result<CommandResult, CliError> {
    let scheduler = ctx.scheduler();
    if !ctx.preferences.automatic_checks().await {
        return Ok(CommandResult::Success(
            "Automatic checks are disabled; enable them with `wdm prefs --automatic-checks on`"
                .to_string(),
        ));
    }

    scheduler.start().await;
    tokio::signal::ctrl_c().await?;
    scheduler.cancel();

    Ok(CommandResult::Success("Stopped watching for updates".to_string()))
}
