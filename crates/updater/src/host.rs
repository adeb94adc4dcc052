//! Facts about the local machine the update check depends on

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use wdm_errors::Error;
use wdm_platform::{PlatformContext, SystemOperations};

use crate::plist;

/// Key in the driver bundle's `Info.plist` holding its version string
pub const INFO_STRING_KEY: &str = "CFBundleGetInfoString";

#[async_trait]
pub trait HostInfo: Send + Sync {
    /// OS build identifier, e.g. `18A391`
    async fn os_build(&self) -> Result<String, Error>;

    /// OS marketing version, e.g. `10.14`
    async fn os_product_version(&self) -> Result<String, Error>;

    /// Installed driver version; `None` when it cannot be determined
    async fn installed_version(&self) -> Option<String>;
}

/// Driver version from a bundle info string such as
/// `"GeForceWeb Driver 387.10.10.10.40.105"`
///
/// The string must consist of exactly three whitespace-separated tokens; the
/// version is the third.
#[must_use]
pub fn version_from_info_string(info: &str) -> Option<String> {
    let tokens: Vec<&str> = info.split_whitespace().collect();
    match tokens.as_slice() {
        [_, _, version] => Some((*version).to_string()),
        _ => None,
    }
}

/// Host information from `sysctl` and the installed driver bundle
pub struct SystemHostInfo {
    system: Arc<dyn SystemOperations>,
    ctx: PlatformContext,
    info_plist: PathBuf,
}

impl SystemHostInfo {
    #[must_use]
    pub fn new(
        system: Arc<dyn SystemOperations>,
        ctx: PlatformContext,
        info_plist: impl Into<PathBuf>,
    ) -> Self {
        Self {
            system,
            ctx,
            info_plist: info_plist.into(),
        }
    }
}

#[async_trait]
impl HostInfo for SystemHostInfo {
    async fn os_build(&self) -> Result<String, Error> {
        self.system.os_build(&self.ctx).await
    }

    async fn os_product_version(&self) -> Result<String, Error> {
        self.system.os_product_version(&self.ctx).await
    }

    async fn installed_version(&self) -> Option<String> {
        let info = match plist::read_file(&self.info_plist).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(
                    path = %self.info_plist.display(),
                    error = %e,
                    "driver bundle info unavailable"
                );
                return None;
            }
        };

        let Some(info_string) = info.get_str(INFO_STRING_KEY) else {
            tracing::debug!(path = %self.info_plist.display(), "no {INFO_STRING_KEY} entry");
            return None;
        };

        let version = version_from_info_string(info_string);
        match &version {
            Some(version) => tracing::debug!(%version, "installed driver version"),
            None => tracing::warn!(
                info = info_string,
                "unexpected driver info string; installed version unknown"
            ),
        }
        version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_third_of_three_tokens() {
        assert_eq!(
            version_from_info_string("GeForceWeb Driver 387.10.10.10.40.40"),
            Some("387.10.10.10.40.40".to_string())
        );
        assert_eq!(
            version_from_info_string("  a  b   c "),
            Some("c".to_string())
        );
        assert_eq!(version_from_info_string("GeForceWeb 387.10.10.10.40.40"), None);
        assert_eq!(version_from_info_string("a b c d"), None);
        assert_eq!(version_from_info_string(""), None);
    }
}
