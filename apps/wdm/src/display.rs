//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::Style;
use std::io;
use wdm_config::Preferences;
use wdm_packager::TransformReport;

use crate::commands::{CommandResult, StatusReport, UpdateListing};

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    colors: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors: bool) -> Self {
        Self {
            json_output,
            colors,
        }
    }

    /// Render a command result to stdout
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            return Ok(());
        }

        match result {
            CommandResult::Transform(report) => self.render_transform(report),
            CommandResult::Check { notified } => {
                if !notified {
                    println!("No new driver to announce.");
                }
            }
            CommandResult::Updates(listing) => self.render_updates(listing),
            CommandResult::Status(status) => self.render_status(status),
            CommandResult::Preferences(prefs) => self.render_preferences(prefs),
            CommandResult::Success(message) => println!("{message}"),
        }
        Ok(())
    }

    fn render_transform(&self, report: &TransformReport) {
        println!(
            "{} {}",
            self.paint(Style::new().green().bold(), "Installer ready:"),
            report.launched.display()
        );
        println!("  Product:    {}", report.identity.name);
        println!("  Version:    {}", report.identity.version);
        println!("  Components: {}", report.components);
        println!("  Took:       {} ms", report.duration_ms);
        for warning in &report.warnings {
            println!("  {} {warning}", self.paint(Style::new().yellow(), "!"));
        }
    }

    fn render_updates(&self, listing: &UpdateListing) {
        if listing.entries.is_empty() {
            match (&listing.build, listing.all) {
                (Some(build), false) => println!("The feed lists no driver for OS build {build}."),
                _ => println!("The feed lists no drivers."),
            }
            return;
        }

        let mut table = self.table();
        table.set_header(vec![
            header("OS build"),
            header("Version"),
            header("Download"),
            header("Checksum"),
        ]);
        for entry in &listing.entries {
            let os = if listing.build.as_deref() == Some(entry.os.as_str()) {
                Cell::new(&entry.os).fg(Color::Green)
            } else {
                Cell::new(&entry.os)
            };
            table.add_row(vec![
                os,
                Cell::new(entry.version.as_deref().unwrap_or("-")),
                Cell::new(entry.download_url.as_deref().unwrap_or("-")),
                Cell::new(entry.checksum.as_deref().unwrap_or("-")),
            ]);
        }
        println!("{table}");
    }

    fn render_status(&self, status: &StatusReport) {
        let running_on = match (&status.product_version, &status.build) {
            (Some(version), Some(build)) => format!("macOS {version} ({build})"),
            (None, Some(build)) => format!("macOS ({build})"),
            _ => "unknown".to_string(),
        };

        let mut table = self.table();
        table.add_row(vec![Cell::new("Running on"), Cell::new(running_on)]);
        table.add_row(vec![
            Cell::new("Installed driver"),
            Cell::new(status.installed_version.as_deref().unwrap_or("unknown")),
        ]);
        table.add_row(vec![Cell::new("Update feed"), Cell::new(&status.feed_url)]);
        add_preference_rows(&mut table, &status.preferences);
        println!("{table}");
    }

    fn render_preferences(&self, prefs: &Preferences) {
        let mut table = self.table();
        add_preference_rows(&mut table, prefs);
        println!("{table}");
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        if !self.colors {
            table.force_no_tty();
        }
        table
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.colors {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn header(title: &str) -> Cell {
    Cell::new(title).add_attribute(Attribute::Bold)
}

fn add_preference_rows(table: &mut Table, prefs: &Preferences) {
    table.add_row(vec![
        Cell::new("Automatic checks"),
        Cell::new(if prefs.automatic_checks { "on" } else { "off" }),
    ]);
    let suppressed = if prefs.suppress_update_alerts.is_empty() {
        "none"
    } else {
        prefs.suppress_update_alerts.as_str()
    };
    table.add_row(vec![Cell::new("Suppressed version"), Cell::new(suppressed)]);
}
