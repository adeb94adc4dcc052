//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use std::time::Duration;
    use tempfile::tempdir;
    use wdm_events::channel;
    use wdm_net::*;

    fn client() -> NetClient {
        NetClient::new(NetConfig {
            retry_count: 0,
            retry_delay: Duration::from_millis(1),
            ..NetConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_download_file() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        let content = b"xar! not really a package";
        let mock = server.mock(|when, then| {
            when.method(GET).path("/WebDriver-387.10.10.10.40.105.pkg");
            then.status(200)
                .header("content-length", content.len().to_string())
                .body(content);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("nested").join("driver.pkg");
        let url = server.url("/WebDriver-387.10.10.10.40.105.pkg");

        let result = download_file(&client(), &url, &dest, &tx).await.unwrap();

        mock.assert();
        assert_eq!(result.size, content.len() as u64);
        assert_eq!(result.path, dest);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
        assert!(!dest.with_extension("part").exists());
    }

    #[tokio::test]
    async fn test_download_http_error_leaves_nothing() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        server.mock(|when, then| {
            when.method(GET).path("/missing.pkg");
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("driver.pkg");
        let error = download_file(&client(), &server.url("/missing.pkg"), &dest, &tx)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            wdm_errors::Error::Network(wdm_errors::NetworkError::HttpError { status: 404, .. })
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        let content = "<plist version=\"1.0\"><dict/></plist>";
        server.mock(|when, then| {
            when.method(GET).path("/mac-update");
            then.status(200)
                .header("content-type", "text/xml")
                .body(content);
        });

        let text = fetch_text(&client(), &server.url("/mac-update"), &tx)
            .await
            .unwrap();
        assert_eq!(text, content);
    }

    #[tokio::test]
    async fn test_http_error_handling() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        server.mock(|when, then| {
            when.method(GET).path("/500");
            then.status(500).body("boom");
        });

        let error = fetch_text(&client(), &server.url("/500"), &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            wdm_errors::Error::Network(wdm_errors::NetworkError::HttpError { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start();
        let (tx, _rx) = channel();

        server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429).header("retry-after", "30");
        });

        let error = fetch_text(&client(), &server.url("/busy"), &tx)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            wdm_errors::Error::Network(wdm_errors::NetworkError::RateLimited { seconds: 30 })
        ));
    }

    #[test]
    fn test_config_conversion() {
        let cfg = wdm_config::NetworkConfig {
            timeout: 5,
            retries: 0,
            retry_delay: 2,
        };
        let net = NetConfig::from(&cfg);
        assert_eq!(net.timeout, Duration::from_secs(5));
        assert_eq!(net.retry_count, 0);
        assert_eq!(net.retry_delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_default_config_makes_a_single_attempt() {
        // Reserve a port, then free it so connections are refused
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let config = NetConfig::from(&wdm_config::NetworkConfig::default());
        let client = NetClient::new(config).unwrap();
        assert_eq!(NetConfig::default().retry_count, 0);
        let none: Option<wdm_events::EventSender> = None;

        let started = std::time::Instant::now();
        let result = fetch_text(&client, &format!("http://{addr}/mac-update"), &none).await;

        assert!(result.is_err());
        // A retry would have slept for the one second retry delay first
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
