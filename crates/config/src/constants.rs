//! Fixed names and locations used by wdm
//!
//! These are not exposed through TOML configuration. Anything a user may
//! reasonably need to change lives in [`crate::Config`] instead.

/// Directory name used under the platform config/data/cache roots
pub const APP_DIR_NAME: &str = "wdm";

pub const CONFIG_FILE: &str = "config.toml";
pub const PREFERENCES_FILE: &str = "preferences.toml";
pub const LOGS_DIR: &str = "logs";

/// Relative path of the installer manifest inside an extracted payload
pub const DISTRIBUTION_FILE: &str = "Distribution";
/// Relative path of the installer resources inside an extracted payload
pub const RESOURCES_DIR: &str = "Resources";

pub const STAGING_EXTRACT_DIR: &str = "tmp";
pub const STAGING_PACKAGES_DIR: &str = "packages";

pub const INSTALLER_BUNDLE_ID: &str = "com.apple.installer";

pub const DEFAULT_FEED_URL: &str = "https://gfestage.nvidia.com/mac-update";
pub const DEFAULT_DRIVER_INFO_PLIST: &str =
    "/Library/Extensions/GeForceWeb.kext/Contents/Info.plist";
pub const DEFAULT_VENDOR_MARKER: &str = "NVWebDrivers";
pub const DEFAULT_OUTPUT_PREFIX: &str = "WebDriver";

pub const NOTIFICATION_TITLE: &str = "NVIDIA Web Driver";
pub const NOTIFICATION_ACTION: &str = "Don't Show Again";

/// Six hours
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 21_600;
pub const DEFAULT_NOTIFICATION_DELAY_MS: u64 = 1_000;
