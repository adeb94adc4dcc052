//! Event handling and progress display

use console::{Style, Term};
use wdm_events::{AppEvent, GeneralEvent, PackagerEvent, PlatformEvent, UpdateEvent};

/// Turns domain events into progress lines on stderr
pub struct EventHandler {
    term: Term,
    colors: bool,
    debug: bool,
    quiet: bool,
}

impl EventHandler {
    /// `quiet` suppresses all terminal output (JSON mode)
    pub fn new(colors: bool, debug: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors,
            debug,
            quiet,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        crate::logging::log_event(&event);
        if self.quiet {
            return;
        }

        match event {
            AppEvent::General(event) => self.handle_general(event),
            AppEvent::Platform(event) => self.handle_platform(&event),
            AppEvent::Packager(event) => self.handle_packager(event),
            AppEvent::Update(event) => self.handle_update(event),
        }
    }

    fn handle_general(&self, event: GeneralEvent) {
        match event {
            GeneralEvent::Warning { message, context } => match context {
                Some(context) => self.show_warning(&format!("{message} ({context})")),
                None => self.show_warning(&message),
            },
            GeneralEvent::Error { message, details } => match details {
                Some(details) => self.show_error(&format!("{message}: {details}")),
                None => self.show_error(&message),
            },
            GeneralEvent::DebugLog { message } => {
                if self.debug {
                    self.show_detail(&message);
                }
            }
        }
    }

    fn handle_platform(&self, event: &PlatformEvent) {
        if !self.debug {
            return;
        }
        match event {
            PlatformEvent::OperationStarted { context } => {
                if let Some(command) = &context.command {
                    self.show_detail(&format!("$ {} {}", command.program, command.args.join(" ")));
                }
            }
            PlatformEvent::OperationCompleted { .. } => {}
            PlatformEvent::OperationFailed { context, failure, .. } => {
                self.show_detail(&format!("{} failed: {}", context.operation, failure.message));
            }
        }
    }

    fn handle_packager(&self, event: PackagerEvent) {
        match event {
            PackagerEvent::Started { source, marker, .. } => {
                let flavor = if marker.is_some() { " (update)" } else { "" };
                self.show_status(&format!("Repackaging {}{flavor}", source.display()));
            }
            PackagerEvent::StageStarted { stage } => self.show_detail(&format!("→ {stage}")),
            PackagerEvent::Rejected { source, reason } => {
                self.beep();
                self.show_error(&format!("{} rejected: {reason}", source.display()));
            }
            PackagerEvent::Warning { stage, message } => {
                self.show_warning(&format!("{stage}: {message}"));
            }
            PackagerEvent::ManifestPatched { name, version } => {
                self.show_status(&format!("Removed OS version check from {name} ({version})"));
            }
            PackagerEvent::ComponentsBuilt { count } => {
                self.show_detail(&format!("rebuilt {count} component package(s)"));
            }
            PackagerEvent::ProductBuilt { path } => {
                self.show_detail(&format!("built {}", path.display()));
            }
            PackagerEvent::Published { path } => {
                self.show_status(&format!("Saved {}", path.display()));
            }
            PackagerEvent::InstallerLaunched { path } => {
                self.show_success(&format!("Opened {} in Installer", path.display()));
            }
            PackagerEvent::Failed { stage, failure } => {
                self.show_error(&format!("{stage} failed: {}", failure.message));
                if let Some(hint) = failure.hint {
                    self.show_detail(&hint);
                }
            }
            PackagerEvent::Completed { .. } | PackagerEvent::ControlsRestored => {}
        }
    }

    fn handle_update(&self, event: UpdateEvent) {
        match event {
            UpdateEvent::CheckStarted { on_demand } => {
                if on_demand {
                    self.show_status("Checking for driver updates");
                }
            }
            UpdateEvent::NoMatchingEntry { build } => {
                self.show_status(&format!("No driver listed for OS build {build}"));
            }
            UpdateEvent::DuplicateEntries {
                build,
                count,
                selected,
            } => self.show_warning(&format!(
                "{count} feed entries match OS build {build}; using {selected}"
            )),
            UpdateEvent::AlreadyInstalled { version } => {
                self.show_success(&format!("Driver {version} is installed and current"));
            }
            UpdateEvent::Suppressed { version } => {
                self.show_status(&format!("Update {version} available (alerts suppressed)"));
            }
            UpdateEvent::UpdateAvailable { version, installed, .. } => match installed {
                Some(installed) => {
                    self.show_success(&format!("Driver {version} available (installed: {installed})"));
                }
                None => self.show_success(&format!("Driver {version} available")),
            },
            UpdateEvent::CheckFailed { failure } => {
                self.show_error(&format!("Update check failed: {}", failure.message));
            }
            UpdateEvent::NextCheckScheduled { in_secs } => {
                self.show_detail(&format!("next check in {}", format_interval(in_secs)));
            }
            UpdateEvent::SuppressionCleared => self.show_detail("suppressed version cleared"),
            UpdateEvent::DownloadStarted { url } => {
                self.show_status(&format!("Downloading {url}"));
            }
            UpdateEvent::DownloadCompleted { path, bytes } => {
                self.show_detail(&format!("downloaded {} ({bytes} bytes)", path.display()));
            }
            UpdateEvent::NotificationScheduled { identifier, .. } => {
                self.show_detail(&format!("notification scheduled for {identifier}"));
            }
            UpdateEvent::ControlsDisabled
            | UpdateEvent::ControlsEnabled
            | UpdateEvent::FeedFetched { .. }
            | UpdateEvent::CheckCompleted { .. }
            | UpdateEvent::ScheduleCancelled
            | UpdateEvent::SuppressionSet { .. } => {}
        }
    }

    fn style(&self, style: Style) -> Style {
        if self.colors {
            style
        } else {
            Style::new()
        }
    }

    fn write(&self, line: &str) {
        // Best effort; a closed stderr must not abort the command
        let _ = self.term.write_line(line);
    }

    fn beep(&self) {
        let _ = self.term.write_str("\x07");
    }

    fn show_status(&self, message: &str) {
        self.write(&format!("{} {message}", self.style(Style::new().cyan()).apply_to("•")));
    }

    fn show_success(&self, message: &str) {
        self.write(&format!("{} {message}", self.style(Style::new().green()).apply_to("✓")));
    }

    fn show_warning(&self, message: &str) {
        self.write(&format!(
            "{} {message}",
            self.style(Style::new().yellow().bold()).apply_to("warning:")
        ));
    }

    fn show_error(&self, message: &str) {
        self.write(&format!(
            "{} {message}",
            self.style(Style::new().red().bold()).apply_to("error:")
        ));
    }

    fn show_detail(&self, message: &str) {
        self.write(&format!("  {}", self.style(Style::new().dim()).apply_to(message)));
    }
}

fn format_interval(secs: u64) -> String {
    match secs {
        s if s >= 3600 && s % 3600 == 0 => format!("{}h", s / 3600),
        s if s >= 60 && s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_use_largest_whole_unit() {
        assert_eq!(format_interval(21_600), "6h");
        assert_eq!(format_interval(90), "90s");
        assert_eq!(format_interval(120), "2m");
    }
}
