//! Configuration sections shared across all crates

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants;

/// Terminal color preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

/// How to choose between several feed entries for the same OS build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedMatch {
    First,
    #[default]
    Last,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub color: ColorChoice,
    /// Log captured stdout/stderr of external tools
    #[serde(default = "default_tool_diagnostics")]
    pub tool_diagnostics: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            tool_diagnostics: default_tool_diagnostics(),
        }
    }
}

/// Locations of the external packaging tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_xar")]
    pub xar: PathBuf,
    #[serde(default = "default_pkgutil")]
    pub pkgutil: PathBuf,
    #[serde(default = "default_productbuild")]
    pub productbuild: PathBuf,
    #[serde(default = "default_open")]
    pub open: PathBuf,
    #[serde(default = "default_sysctl")]
    pub sysctl: PathBuf,
    #[serde(default = "default_osascript")]
    pub osascript: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            xar: default_xar(),
            pkgutil: default_pkgutil(),
            productbuild: default_productbuild(),
            open: default_open(),
            sysctl: default_sysctl(),
            osascript: default_osascript(),
        }
    }
}

/// Package transformation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagerConfig {
    /// Marker that must appear in the listing of vendor update packages
    #[serde(default = "default_vendor_marker")]
    pub vendor_marker: String,
    /// File name prefix of the rebuilt product package
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Replacement installer resources, matched by file name
    #[serde(default)]
    pub resources_dir: Option<PathBuf>,
    /// Where the finished package is copied (defaults to the desktop)
    #[serde(default)]
    pub publish_dir: Option<PathBuf>,
    /// Parent of per-run staging directories (defaults to the system temp dir)
    #[serde(default)]
    pub staging_root: Option<PathBuf>,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            vendor_marker: default_vendor_marker(),
            output_prefix: default_output_prefix(),
            resources_dir: None,
            publish_dir: None,
            staging_root: None,
        }
    }
}

/// Update feed and scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatesConfig {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_driver_info_plist")]
    pub driver_info_plist: PathBuf,
    #[serde(default)]
    pub feed_match: FeedMatch,
    #[serde(default = "default_check_interval")]
    pub check_interval: u64, // seconds
    #[serde(default = "default_notification_delay")]
    pub notification_delay: u64, // milliseconds
    /// Forces the persisted automatic-checks preference when set
    #[serde(default)]
    pub automatic_checks: Option<bool>,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            driver_info_plist: default_driver_info_plist(),
            feed_match: FeedMatch::Last,
            check_interval: default_check_interval(),
            notification_delay: default_notification_delay(),
            automatic_checks: None,
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 60,
            retries: 0,
            retry_delay: 1,
        }
    }
}

// Default value functions for serde
fn default_tool_diagnostics() -> bool {
    cfg!(debug_assertions)
}

fn default_xar() -> PathBuf {
    PathBuf::from("/usr/bin/xar")
}

fn default_pkgutil() -> PathBuf {
    PathBuf::from("/usr/sbin/pkgutil")
}

fn default_productbuild() -> PathBuf {
    PathBuf::from("/usr/bin/productbuild")
}

fn default_open() -> PathBuf {
    PathBuf::from("/usr/bin/open")
}

fn default_sysctl() -> PathBuf {
    PathBuf::from("/usr/sbin/sysctl")
}

fn default_osascript() -> PathBuf {
    PathBuf::from("/usr/bin/osascript")
}

fn default_vendor_marker() -> String {
    constants::DEFAULT_VENDOR_MARKER.to_string()
}

fn default_output_prefix() -> String {
    constants::DEFAULT_OUTPUT_PREFIX.to_string()
}

fn default_feed_url() -> String {
    constants::DEFAULT_FEED_URL.to_string()
}

fn default_driver_info_plist() -> PathBuf {
    PathBuf::from(constants::DEFAULT_DRIVER_INFO_PLIST)
}

fn default_check_interval() -> u64 {
    constants::DEFAULT_CHECK_INTERVAL_SECS
}

fn default_notification_delay() -> u64 {
    constants::DEFAULT_NOTIFICATION_DELAY_MS
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    0
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}
