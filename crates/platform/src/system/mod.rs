//! System information queries

use async_trait::async_trait;
use wdm_errors::Error;

use crate::core::PlatformContext;

/// Read-only queries against the running operating system
#[async_trait]
pub trait SystemOperations: Send + Sync {
    /// Value of a kernel state variable (`sysctl -n <name>`), trimmed
    async fn sysctl(&self, ctx: &PlatformContext, name: &str) -> Result<String, Error>;

    /// OS build identifier, e.g. `18A391`
    async fn os_build(&self, ctx: &PlatformContext) -> Result<String, Error> {
        self.sysctl(ctx, "kern.osversion").await
    }

    /// OS marketing version, e.g. `10.14`
    async fn os_product_version(&self, ctx: &PlatformContext) -> Result<String, Error> {
        self.sysctl(ctx, "kern.osproductversion").await
    }
}
