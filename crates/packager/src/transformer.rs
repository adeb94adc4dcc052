//! Package transformation pipeline
//!
//! Guard, validate, stage, extract, locate manifest, patch manifest,
//! substitute resources, build components, build product, publish, launch
//! installer, clean up. Any failure aborts the run; cleanup always happens.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;
use wdm_config::{constants, Config};
use wdm_errors::{Error, PackagerError, UserFacingError};
use wdm_events::{EventEmitter, EventSender, FailureContext, PackagerEvent, PackagerStage};
use wdm_platform::{fs, ArchiveOperations, PlatformContext, ToolOutcome};

use crate::manifest::{self, ProductIdentity};
use crate::resources;
use crate::staging::StagingArea;

/// Settings a transformer needs from the configuration
#[derive(Debug, Clone)]
pub struct TransformerSettings {
    pub staging_root: PathBuf,
    pub publish_dir: Option<PathBuf>,
    pub resources_dir: Option<PathBuf>,
    pub output_prefix: String,
    pub tool_diagnostics: bool,
}

impl TransformerSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            staging_root: config.staging_root(),
            publish_dir: config.publish_dir(),
            resources_dir: config.packager.resources_dir.clone(),
            output_prefix: config.packager.output_prefix.clone(),
            tool_diagnostics: config.general.tool_diagnostics,
        }
    }
}

/// A request to repackage one driver archive
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub source: PathBuf,
    /// Marker the archive listing must contain (vendor update packages)
    pub marker: Option<String>,
}

impl TransformRequest {
    /// Repackage a user-supplied archive
    #[must_use]
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            marker: None,
        }
    }

    /// Repackage a downloaded vendor update, requiring `marker` in its listing
    #[must_use]
    pub fn update(source: impl Into<PathBuf>, marker: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            marker: Some(marker.into()),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub run_id: Uuid,
    pub source: PathBuf,
    pub identity: ProductIdentity,
    pub components: usize,
    /// Package location inside the (now removed) staging area
    pub staged: PathBuf,
    pub published: Option<PathBuf>,
    /// Package the installer was launched against
    pub launched: PathBuf,
    /// Best-effort steps that failed without aborting the run
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

struct StageFailure {
    stage: PackagerStage,
    error: Error,
}

trait AtStage<T> {
    fn at(self, stage: PackagerStage) -> Result<T, StageFailure>;
}

impl<T, E: Into<Error>> AtStage<T> for Result<T, E> {
    fn at(self, stage: PackagerStage) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            error: e.into(),
        })
    }
}

/// Clears the in-progress flag when dropped
struct InProgressGuard<'a>(&'a AtomicBool);

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Inner {
    archive: Arc<dyn ArchiveOperations>,
    settings: TransformerSettings,
    in_progress: AtomicBool,
    event_sender: Option<EventSender>,
}

/// Orchestrates the transformation pipeline; at most one run at a time
#[derive(Clone)]
pub struct PackageTransformer {
    inner: Arc<Inner>,
}

impl EventEmitter for PackageTransformer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.inner.event_sender.as_ref()
    }
}

impl PackageTransformer {
    #[must_use]
    pub fn new(
        archive: Arc<dyn ArchiveOperations>,
        settings: TransformerSettings,
        event_sender: Option<EventSender>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                archive,
                settings,
                in_progress: AtomicBool::new(false),
                event_sender,
            }),
        }
    }

    /// Whether a transformation is currently running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.in_progress.load(Ordering::Acquire)
    }

    /// Run the transformation on a worker task, resolving to its outcome
    #[must_use]
    pub fn spawn(
        &self,
        request: TransformRequest,
    ) -> JoinHandle<Result<TransformReport, Error>> {
        let this = self.clone();
        tokio::spawn(async move { this.transform(request).await })
    }

    /// Run the transformation on a worker task and wait for it
    ///
    /// # Errors
    ///
    /// Returns the pipeline's error, or `Error::Internal` if the worker task
    /// panicked or was cancelled.
    pub async fn run_to_completion(
        &self,
        request: TransformRequest,
    ) -> Result<TransformReport, Error> {
        self.spawn(request)
            .await
            .map_err(|e| Error::internal(format!("transformation task failed: {e}")))?
    }

    /// Run the whole pipeline for `request`
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that failed. A request made while
    /// another run is active fails with `PackagerError::AlreadyRunning`
    /// without touching the filesystem.
    pub async fn transform(&self, request: TransformRequest) -> Result<TransformReport, Error> {
        let Some(flag) = InProgressGuard::acquire(&self.inner.in_progress) else {
            let error = Error::from(PackagerError::AlreadyRunning);
            self.emit_packager(PackagerEvent::Rejected {
                source: request.source.clone(),
                reason: error.user_message().into_owned(),
            });
            return Err(error);
        };

        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let mut staging = None;
        let mut warnings = Vec::new();

        let result = self
            .run(&request, run_id, &mut staging, &mut warnings)
            .await;

        // Cleanup
        if let Some(area) = staging.take() {
            self.emit_packager(PackagerEvent::StageStarted {
                stage: PackagerStage::Cleanup,
            });
            if let Err(e) = area.cleanup().await {
                tracing::warn!(error = %e, "failed to remove staging area");
            }
        }
        drop(flag);

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = match result {
            Ok(mut report) => {
                report.warnings = warnings;
                report.duration_ms = duration_ms;
                Ok(report)
            }
            Err(StageFailure { stage, error }) => {
                if stage == PackagerStage::Guard {
                    self.emit_packager(PackagerEvent::Rejected {
                        source: request.source.clone(),
                        reason: error.user_message().into_owned(),
                    });
                } else {
                    tracing::error!(stage = %stage, error = %error, "package transformation failed");
                    self.emit_packager(PackagerEvent::Failed {
                        stage,
                        failure: FailureContext::from_error(&error),
                    });
                }
                Err(error)
            }
        };

        self.emit_packager(PackagerEvent::Completed {
            success: outcome.is_ok(),
            duration_ms,
        });
        self.emit_packager(PackagerEvent::ControlsRestored);

        outcome
    }

    fn stage(&self, stage: PackagerStage) {
        tracing::debug!(stage = %stage, "packager stage");
        self.emit_packager(PackagerEvent::StageStarted { stage });
    }

    fn warn(&self, warnings: &mut Vec<String>, stage: PackagerStage, message: String) {
        tracing::warn!(stage = %stage, "{message}");
        self.emit_packager(PackagerEvent::Warning {
            stage,
            message: message.clone(),
        });
        warnings.push(message);
    }

    async fn run(
        &self,
        request: &TransformRequest,
        run_id: Uuid,
        staging: &mut Option<StagingArea>,
        warnings: &mut Vec<String>,
    ) -> Result<TransformReport, StageFailure> {
        let settings = &self.inner.settings;
        let archive = &self.inner.archive;
        let ctx = PlatformContext::new(self.inner.event_sender.clone())
            .with_diagnostics(settings.tool_diagnostics);
        let source = request.source.as_path();

        // Guard
        if !fs::exists(source).await {
            return Err(PackagerError::SourceNotFound {
                path: source.display().to_string(),
            })
            .at(PackagerStage::Guard);
        }
        self.emit_packager(PackagerEvent::Started {
            run_id: run_id.to_string(),
            source: source.to_path_buf(),
            marker: request.marker.clone(),
        });

        // Validate container
        self.stage(PackagerStage::Validate);
        let listing = archive.list(&ctx, source).await.at(PackagerStage::Validate)?;
        if !listing.exited_ok() {
            return Err(PackagerError::NotAnArchive {
                path: source.display().to_string(),
                status: listing.status_label(),
            })
            .at(PackagerStage::Validate);
        }
        if let Some(marker) = &request.marker {
            if !listing.stdout_contains(marker) {
                return Err(PackagerError::MarkerMissing {
                    path: source.display().to_string(),
                    marker: marker.clone(),
                })
                .at(PackagerStage::Validate);
            }
        }

        // Stage
        self.stage(PackagerStage::Stage);
        let area = staging.insert(
            StagingArea::create(&settings.staging_root, run_id)
                .await
                .at(PackagerStage::Stage)?,
        );
        let extracted = area.extract_dir();

        // Extract
        self.stage(PackagerStage::Extract);
        let outcome = archive
            .extract(&ctx, source, &extracted)
            .await
            .at(PackagerStage::Extract)?;
        require_exit(&outcome).at(PackagerStage::Extract)?;

        // Locate manifest
        self.stage(PackagerStage::LocateManifest);
        let distribution = extracted.join(constants::DISTRIBUTION_FILE);
        if !fs::exists(&distribution).await {
            return Err(PackagerError::ManifestNotFound {
                path: distribution.display().to_string(),
            })
            .at(PackagerStage::LocateManifest);
        }

        // Patch manifest
        self.stage(PackagerStage::PatchManifest);
        let identity = manifest::patch_manifest(&distribution)
            .await
            .at(PackagerStage::PatchManifest)?;
        self.emit_packager(PackagerEvent::ManifestPatched {
            name: identity.name.clone(),
            version: identity.version.clone(),
        });

        // Resource substitution (best effort)
        if let Some(replacements) = settings.resources_dir.clone() {
            self.stage(PackagerStage::SubstituteResources);
            self.substitute(replacements, extracted.join(constants::RESOURCES_DIR), warnings)
                .await;
        }

        // Build component packages
        self.stage(PackagerStage::BuildComponents);
        let components = component_dirs(&extracted)
            .await
            .at(PackagerStage::BuildComponents)?;
        if components.is_empty() {
            return Err(PackagerError::NoComponents {
                path: extracted.display().to_string(),
            })
            .at(PackagerStage::BuildComponents);
        }
        let packages_dir = area.packages_dir();
        for component in &components {
            let Some(name) = component.file_name() else {
                continue;
            };
            let output = packages_dir.join(name);
            let outcome = archive
                .build_component(&ctx, component, &output)
                .await
                .at(PackagerStage::BuildComponents)?;
            require_artifact(&outcome).at(PackagerStage::BuildComponents)?;
        }
        self.emit_packager(PackagerEvent::ComponentsBuilt {
            count: components.len(),
        });

        // Build product package
        self.stage(PackagerStage::BuildProduct);
        let product = area.product_path(&settings.output_prefix, &identity.version);
        let outcome = archive
            .build_product(&ctx, &extracted, &packages_dir, &product)
            .await
            .at(PackagerStage::BuildProduct)?;
        require_artifact(&outcome).at(PackagerStage::BuildProduct)?;
        self.emit_packager(PackagerEvent::ProductBuilt {
            path: product.clone(),
        });

        // Publish (best effort)
        self.stage(PackagerStage::Publish);
        let published = self.publish(&product, warnings).await;

        // Launch installer
        self.stage(PackagerStage::LaunchInstaller);
        let target = published.clone().unwrap_or_else(|| product.clone());
        let outcome = archive
            .launch_installer(&ctx, &target)
            .await
            .at(PackagerStage::LaunchInstaller)?;
        if !outcome.exited_ok() {
            return Err(PackagerError::InstallerLaunchFailed {
                path: target.display().to_string(),
                status: outcome.status_label(),
            })
            .at(PackagerStage::LaunchInstaller);
        }
        self.emit_packager(PackagerEvent::InstallerLaunched {
            path: target.clone(),
        });

        Ok(TransformReport {
            run_id,
            source: source.to_path_buf(),
            identity,
            components: components.len(),
            staged: product,
            published,
            launched: target,
            warnings: Vec::new(),
            duration_ms: 0,
        })
    }

    async fn substitute(
        &self,
        replacements: PathBuf,
        resources_dir: PathBuf,
        warnings: &mut Vec<String>,
    ) {
        if !fs::exists(&replacements).await {
            tracing::debug!(
                path = %replacements.display(),
                "no replacement resources bundled"
            );
            return;
        }

        let result = tokio::task::spawn_blocking(move || {
            resources::substitute_resources(&replacements, &resources_dir)
        })
        .await;

        match result {
            Ok(report) => {
                for message in report.warnings {
                    self.warn(warnings, PackagerStage::SubstituteResources, message);
                }
                tracing::debug!(replaced = report.replaced.len(), "resources substituted");
            }
            Err(e) => self.warn(
                warnings,
                PackagerStage::SubstituteResources,
                format!("resource substitution did not complete: {e}"),
            ),
        }
    }

    async fn publish(&self, product: &Path, warnings: &mut Vec<String>) -> Option<PathBuf> {
        let Some(dir) = &self.inner.settings.publish_dir else {
            self.warn(
                warnings,
                PackagerStage::Publish,
                "no publish directory available; using the staged package".to_string(),
            );
            return None;
        };
        let file_name = product.file_name()?;
        let destination = dir.join(file_name);

        match fs::replace_with_copy(product, &destination).await {
            Ok(()) => {
                self.emit_packager(PackagerEvent::Published {
                    path: destination.clone(),
                });
                Some(destination)
            }
            Err(e) => {
                self.warn(
                    warnings,
                    PackagerStage::Publish,
                    format!("failed to copy package to {}: {e}", destination.display()),
                );
                None
            }
        }
    }
}

fn require_exit(outcome: &ToolOutcome) -> Result<(), PackagerError> {
    if outcome.exited_ok() {
        Ok(())
    } else {
        Err(PackagerError::ToolFailed {
            tool: outcome.tool.clone(),
            operation: outcome.operation.to_string(),
            status: outcome.status_label(),
        })
    }
}

fn require_artifact(outcome: &ToolOutcome) -> Result<(), PackagerError> {
    require_exit(outcome)?;
    match &outcome.artifact {
        Some(path) if !outcome.artifact_exists => Err(PackagerError::ArtifactMissing {
            operation: outcome.operation.to_string(),
            path: path.display().to_string(),
        }),
        _ => Ok(()),
    }
}

/// Top-level expanded component packages (`*.pkg` directories), sorted,
/// without the excluded ones
async fn component_dirs(extracted: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut entries = tokio::fs::read_dir(extracted)
        .await
        .map_err(|e| Error::io_with_path(&e, extracted))?;
    let mut components = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io_with_path(&e, extracted))?
    {
        let path = entry.path();
        let is_pkg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pkg"));
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        if !(is_pkg && is_dir) {
            continue;
        }
        if manifest::is_excluded_component(&entry.file_name().to_string_lossy()) {
            tracing::debug!(component = %path.display(), "component left out of the rebuild");
            continue;
        }
        components.push(path);
    }

    components.sort();
    Ok(components)
}
