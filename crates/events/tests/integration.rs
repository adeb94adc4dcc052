//! Integration tests for events

#[cfg(test)]
mod tests {
    use wdm_errors::PackagerError;
    use wdm_events::*;

    #[tokio::test]
    async fn test_event_sender_emit() {
        let (tx, mut rx) = channel();

        tx.emit_error("test error");
        tx.emit_debug("test debug");

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            event1,
            AppEvent::General(GeneralEvent::Error { .. })
        ));

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::General(GeneralEvent::DebugLog { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_warning("ignored");
    }

    #[test]
    fn test_optional_sender_without_listener() {
        let none: Option<EventSender> = None;
        none.emit_packager(PackagerEvent::ControlsRestored);
    }

    #[test]
    fn test_log_levels() {
        let failed = AppEvent::Packager(PackagerEvent::Failed {
            stage: PackagerStage::Extract,
            failure: FailureContext::from_error(&PackagerError::AlreadyRunning),
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
        assert_eq!(failed.log_target(), "wdm::events::packager");

        let rejected = AppEvent::Packager(PackagerEvent::Rejected {
            source: "/tmp/a.pkg".into(),
            reason: "busy".into(),
        });
        assert_eq!(rejected.log_level(), tracing::Level::WARN);

        let disabled = AppEvent::Update(UpdateEvent::ControlsDisabled);
        assert_eq!(disabled.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_failure_context_from_error() {
        let ctx = FailureContext::from_error(&PackagerError::AlreadyRunning);
        assert_eq!(ctx.code.as_deref(), Some("packager.already_running"));
        assert!(ctx.retryable);
        assert!(ctx.hint.is_some());
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = AppEvent::Update(UpdateEvent::NotificationScheduled {
            identifier: "387.10.10.10.40.105".into(),
            delay_ms: 1000,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "update");
        assert_eq!(json["event"]["type"], "notification_scheduled");
        assert_eq!(json["event"]["identifier"], "387.10.10.10.40.105");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PackagerStage::BuildComponents.to_string(), "build components");
    }
}
