//! Wiring of platform, network, preferences and the two pipelines

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use wdm_config::{Config, PreferencesStore};
use wdm_events::EventSender;
use wdm_net::{NetClient, NetConfig};
use wdm_packager::{PackageTransformer, TransformerSettings};
use wdm_platform::Platform;
use wdm_updater::{
    HttpFeedSource, OsascriptNotifier, SystemHostInfo, UpdateChecker, UpdateScheduler,
};

use crate::error::CliError;

/// Everything a command needs, built once per invocation
pub struct AppContext {
    pub config: Config,
    pub platform: Platform,
    pub preferences: PreferencesStore,
    pub net: NetClient,
    pub event_sender: EventSender,
}

impl AppContext {
    /// Open the preference store and build shared clients
    pub async fn initialize(config: Config, event_sender: EventSender) -> Result<Self, CliError> {
        let preferences = PreferencesStore::open(Config::preferences_path()?).await?;

        if let Some(forced) = config.updates.automatic_checks {
            if preferences.automatic_checks().await != forced {
                info!(automatic_checks = forced, "applying configured automatic-checks setting");
                preferences.set_automatic_checks(forced).await?;
            }
        }

        let net = NetClient::new(NetConfig::from(&config.network))?;
        let platform = Platform::current(&config.tools);
        debug!(
            preferences = ?preferences.path(),
            feed = %config.updates.feed_url,
            "application context ready"
        );

        Ok(Self {
            config,
            platform,
            preferences,
            net,
            event_sender,
        })
    }

    fn platform_context(&self) -> wdm_platform::PlatformContext {
        self.platform
            .create_context(Some(self.event_sender.clone()))
            .with_diagnostics(self.config.general.tool_diagnostics)
    }

    pub fn transformer(&self) -> PackageTransformer {
        PackageTransformer::new(
            self.platform.archive(),
            TransformerSettings::from_config(&self.config),
            Some(self.event_sender.clone()),
        )
    }

    pub fn feed(&self) -> Arc<HttpFeedSource> {
        Arc::new(HttpFeedSource::new(
            self.net.clone(),
            self.config.updates.feed_url.clone(),
            Some(self.event_sender.clone()),
        ))
    }

    pub fn host(&self) -> Arc<SystemHostInfo> {
        Arc::new(SystemHostInfo::new(
            self.platform.system(),
            self.platform_context(),
            self.config.updates.driver_info_plist.clone(),
        ))
    }

    pub fn checker(&self) -> UpdateChecker {
        let notifier = OsascriptNotifier::new(
            self.platform.process(),
            self.platform_context(),
            self.config.tools.osascript.clone(),
        );
        UpdateChecker::new(
            self.feed(),
            self.host(),
            Arc::new(notifier),
            self.preferences.clone(),
            Some(self.event_sender.clone()),
        )
        .with_feed_match(self.config.updates.feed_match)
        .with_notification_delay(Duration::from_millis(self.config.updates.notification_delay))
    }

    pub fn scheduler(&self) -> UpdateScheduler {
        UpdateScheduler::new(
            self.checker(),
            Duration::from_secs(self.config.updates.check_interval),
            Some(self.event_sender.clone()),
        )
    }
}
