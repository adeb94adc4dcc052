//! Integration tests for the platform layer, using shell scripts as tools

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use wdm_config::ToolsConfig;
    use wdm_events::{AppEvent, PlatformEvent};
    use wdm_platform::{ArchiveOperation, Platform, PlatformContext};

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn tools(dir: &Path) -> ToolsConfig {
        ToolsConfig {
            // prints its arguments, one per line
            xar: script(dir, "xar", r#"for a in "$@"; do echo "$a"; done; echo NVWebDrivers.pkg"#),
            // exits 0 without writing the output package
            pkgutil: script(dir, "pkgutil", "exit 0"),
            productbuild: script(dir, "productbuild", r#"for a in "$@"; do last="$a"; done; touch "$last""#),
            open: script(dir, "open", "exit 7"),
            sysctl: script(dir, "sysctl", r#"[ "$2" = "kern.osversion" ] && echo " 18A391 " || exit 1"#),
            osascript: PathBuf::from("/usr/bin/true"),
        }
    }

    #[tokio::test]
    async fn archive_tools_report_typed_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::current(&tools(dir.path()));
        let (tx, mut rx) = wdm_events::channel();
        let ctx = PlatformContext::new(Some(tx)).with_diagnostics(true);
        let archive = platform.archive();

        let listing = archive.list(&ctx, Path::new("/tmp/driver.pkg")).await.unwrap();
        assert_eq!(listing.operation, ArchiveOperation::List);
        assert_eq!(listing.tool, "xar");
        assert!(listing.succeeded());
        assert!(listing.stdout_contains("-tf"));
        assert!(listing.stdout_contains("/tmp/driver.pkg"));
        assert!(listing.stdout_contains("NVWebDrivers"));

        // exits 0 without producing the artifact
        let out = dir.path().join("component.pkg");
        let component = archive
            .build_component(&ctx, dir.path(), &out)
            .await
            .unwrap();
        assert!(component.exited_ok());
        assert!(!component.artifact_exists);
        assert!(!component.succeeded());

        let product_out = dir.path().join("WebDriver-1.0.pkg");
        let product = archive
            .build_product(&ctx, dir.path(), dir.path(), &product_out)
            .await
            .unwrap();
        assert!(product.succeeded());
        assert!(product_out.exists());

        let launch = archive.launch_installer(&ctx, &product_out).await.unwrap();
        assert_eq!(launch.exit_code, Some(7));
        assert!(!launch.succeeded());

        drop(ctx);
        let mut started = 0;
        let mut completed = 0;
        while let Some(event) = rx.recv().await {
            match event {
                AppEvent::Platform(PlatformEvent::OperationStarted { .. }) => started += 1,
                AppEvent::Platform(PlatformEvent::OperationCompleted { .. }) => completed += 1,
                _ => {}
            }
        }
        assert_eq!(started, 4);
        assert_eq!(completed, 4);
    }

    #[tokio::test]
    async fn missing_tool_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = tools(dir.path());
        tools.xar = dir.path().join("no-such-xar");
        let platform = Platform::current(&tools);
        let ctx = PlatformContext::default();

        let result = platform.archive().list(&ctx, Path::new("/tmp/x.pkg")).await;
        assert!(matches!(
            result,
            Err(wdm_errors::Error::Platform(
                wdm_errors::PlatformError::CommandNotFound { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn sysctl_values_are_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::current(&tools(dir.path()));
        let ctx = PlatformContext::default();
        let system = platform.system();

        assert_eq!(system.os_build(&ctx).await.unwrap(), "18A391");
        assert!(system.os_product_version(&ctx).await.is_err());
    }
}
