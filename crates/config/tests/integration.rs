//! Integration tests for config

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use wdm_config::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
color = "never"
tool_diagnostics = true

[tools]
xar = "/opt/bin/xar"

[packager]
output_prefix = "Driver"
publish_dir = "/tmp/out"

[updates]
feed_url = "http://localhost/feed"
feed_match = "first"
check_interval = 60
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.color, ColorChoice::Never);
        assert!(config.general.tool_diagnostics);
        assert_eq!(config.tools.xar, PathBuf::from("/opt/bin/xar"));
        assert_eq!(config.tools.pkgutil, PathBuf::from("/usr/sbin/pkgutil"));
        assert_eq!(config.packager.output_prefix, "Driver");
        assert_eq!(config.packager.vendor_marker, "NVWebDrivers");
        assert_eq!(config.publish_dir(), Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.updates.feed_match, FeedMatch::First);
        assert_eq!(config.updates.check_interval, 60);
        assert_eq!(config.updates.notification_delay, 1000);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.updates.feed_url, constants::DEFAULT_FEED_URL);
        assert_eq!(config.updates.check_interval, 21_600);
        assert_eq!(config.updates.feed_match, FeedMatch::Last);
        assert_eq!(config.updates.automatic_checks, None);
        assert_eq!(config.packager.output_prefix, "WebDriver");
        assert!(config.packager.resources_dir.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.updates.check_interval, 21_600);
        assert_eq!(config.network.retries, 0);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[updates\ncheck_interval = ").is_err());
        assert!(Config::from_toml("[updates]\nfeed_match = \"middle\"").is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/wdm.toml")).await;
        assert!(matches!(
            result,
            Err(wdm_errors::Error::Config(wdm_errors::ConfigError::NotFound { .. }))
        ));
    }

    #[test]
    fn test_merge_vars() {
        let mut config = Config::default();
        config
            .merge_vars(vars(&[
                ("WDM_FEED_URL", "http://127.0.0.1:9/feed"),
                ("WDM_CHECK_INTERVAL", "120"),
                ("WDM_AUTO_CHECK", "no"),
                ("WDM_TOOL_DIAGNOSTICS", "1"),
            ]))
            .unwrap();

        assert_eq!(config.updates.feed_url, "http://127.0.0.1:9/feed");
        assert_eq!(config.updates.check_interval, 120);
        assert_eq!(config.updates.automatic_checks, Some(false));
        assert!(config.general.tool_diagnostics);
    }

    #[test]
    fn test_merge_vars_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config
            .merge_vars(vars(&[("WDM_CHECK_INTERVAL", "soon")]))
            .is_err());
        assert!(config
            .merge_vars(vars(&[("WDM_CHECK_INTERVAL", "0")]))
            .is_err());
        assert!(config
            .merge_vars(vars(&[("WDM_AUTO_CHECK", "sometimes")]))
            .is_err());
        assert!(config.merge_vars(vars(&[("WDM_FEED_URL", "  ")])).is_err());
    }
}
