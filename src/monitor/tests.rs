#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::adb::MockDeviceBackend;
    use crate::classify::LineClassifier;
    use crate::error::BridgeError;
    use crate::forward::{ConnectionState, MockSinkConnector};
    use crate::subprocess::ReaderOptions;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const DEVICE: &str = "emulator-5554";
    const FATAL_LINE: &str = "01-01 00:00:00.000 1-1/1 E AndroidRuntime: FATAL EXCEPTION: main";

    fn settings() -> MonitorSettings {
        MonitorSettings {
            sink_uri: "ws://127.0.0.1:6544".to_string(),
            preferred_device: None,
            send_timeout: Duration::from_millis(500),
            reader: ReaderOptions {
                stop_grace: Duration::from_secs(2),
                ..ReaderOptions::default()
            },
        }
    }

    fn controller(backend: &MockDeviceBackend, sink: &MockSinkConnector) -> MonitorController {
        MonitorController::new(Arc::new(backend.clone()), Arc::new(sink.clone()), settings())
    }

    fn print_lines(lines: &[&str]) -> String {
        let quoted: Vec<String> = lines.iter().map(|l| format!("'{}'", l)).collect();
        format!("printf '%s\\n' {}", quoted.join(" "))
    }

    fn of_type(sink: &MockSinkConnector, kind: &str) -> Vec<Value> {
        sink.sent().into_iter().filter(|m| m["type"] == kind).collect()
    }

    fn statuses(sink: &MockSinkConnector) -> Vec<String> {
        sink.sent()
            .iter()
            .filter(|m| m["type"] != "android_error")
            .map(|m| m["status"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_fatal_exception_is_forwarded_once() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], &print_lines(&[FATAL_LINE]));
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        let stats = monitor.run(&ShutdownSignal::new()).await.unwrap();

        let events = of_type(&sink, "android_error");
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event["error_type"], "fatal_exception");
        assert_eq!(event["severity"], "critical");
        assert_eq!(event["package_name"], Value::Null);
        assert_eq!(event["device_id"], DEVICE);
        assert_eq!(event["source"], "bridge");
        assert_eq!(event["full_log_line"], FATAL_LINE);
        assert!(event["timestamp_sent"].as_f64().unwrap() > 1_600_000_000.0);

        assert_eq!(statuses(&sink), vec!["connected", "active", "stopped"]);
        assert_eq!(
            stats,
            SessionStats {
                lines_read: 1,
                events_classified: 1,
                events_delivered: 1,
                events_dropped: 0,
            }
        );
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(sink.close_count(), 1);
        assert_eq!(backend.launched_for(), vec![DEVICE.to_string()]);
    }

    #[tokio::test]
    async fn test_unclassified_lines_are_counted_but_not_sent() {
        let script = print_lines(&[
            "--------- beginning of main",
            "01-01 00:00:00.000 10 10 E ActivityManager: Process com.example has died",
            FATAL_LINE,
        ]);
        let backend = MockDeviceBackend::with_script(&[DEVICE], &script);
        let sink = MockSinkConnector::new();
        let catalog = Arc::new(crate::classify::PatternCatalog::standard());
        let mut monitor =
            controller(&backend, &sink).with_classifier(LineClassifier::new(catalog));

        let stats = monitor.run(&ShutdownSignal::new()).await.unwrap();

        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.events_classified, 1);
        assert_eq!(of_type(&sink, "android_error").len(), 1);
    }

    #[tokio::test]
    async fn test_events_are_forwarded_in_producer_order() {
        let lines = [
            "01-01 00:00:00.001 1 1 E A: java.lang.NullPointerException",
            "01-01 00:00:00.002 1 1 E A: FATAL EXCEPTION: main",
            "01-01 00:00:00.003 1 1 E A: ANR in com.example.app",
            "01-01 00:00:00.004 1 1 E A: java.lang.IllegalStateException: x",
        ];
        let backend = MockDeviceBackend::with_script(&[DEVICE], &print_lines(&lines));
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        monitor.run(&ShutdownSignal::new()).await.unwrap();

        let kinds: Vec<String> = of_type(&sink, "android_error")
            .iter()
            .map(|e| e["error_type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec!["null_pointer", "fatal_exception", "crash_anr", "illegal_state"]
        );
    }

    #[tokio::test]
    async fn test_no_device_returns_to_idle_and_closes_channel() {
        let backend = MockDeviceBackend::empty();
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        let err = monitor.start().await.unwrap_err();

        assert!(matches!(err, BridgeError::NoDeviceAvailable { .. }));
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
        assert_eq!(sink.close_count(), 1);
        assert!(backend.launched_for().is_empty());
        assert_eq!(statuses(&sink), vec!["connected"]);
    }

    #[tokio::test]
    async fn test_device_listing_failure_is_no_device() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], "true");
        backend.fail_listing();
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        let err = monitor.start().await.unwrap_err();

        assert!(matches!(err, BridgeError::NoDeviceAvailable { .. }));
        assert_eq!(monitor.state(), MonitoringState::Idle);
    }

    #[tokio::test]
    async fn test_missing_preferred_device_is_no_device() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], "true");
        let sink = MockSinkConnector::new();
        let mut monitor = MonitorController::new(
            Arc::new(backend.clone()),
            Arc::new(sink.clone()),
            MonitorSettings {
                preferred_device: Some("R58M123".to_string()),
                ..settings()
            },
        );

        let err = monitor.start().await.unwrap_err();

        match err {
            BridgeError::NoDeviceAvailable { preferred, .. } => {
                assert_eq!(preferred.as_deref(), Some("R58M123"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.launched_for().is_empty());
    }

    #[tokio::test]
    async fn test_refused_connection_never_queries_devices() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], "true");
        let sink = MockSinkConnector::refusing();
        let mut monitor = controller(&backend, &sink);

        let err = monitor.start().await.unwrap_err();

        assert!(matches!(err, BridgeError::Connect { .. }));
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(backend.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_launch_failure_closes_channel() {
        let backend =
            MockDeviceBackend::with_script(&[DEVICE], "echo 'error: device offline' >&2; exit 1");
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        let err = monitor.start().await.unwrap_err();

        match &err {
            BridgeError::Launch { device_id, .. } => {
                assert_eq!(device_id.as_deref(), Some(DEVICE));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("device offline"));
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(sink.close_count(), 1);
        assert!(monitor.device_id().is_none());
    }

    #[tokio::test]
    async fn test_send_failure_drops_following_events() {
        let lines = [FATAL_LINE; 4];
        let backend = MockDeviceBackend::with_script(&[DEVICE], &print_lines(&lines));
        let sink = MockSinkConnector::new();
        // connected + active statuses go through, then the transport breaks
        sink.fail_sends_after(2);
        let mut monitor = controller(&backend, &sink);

        monitor.start().await.unwrap();
        monitor.run_loop(&ShutdownSignal::new()).await;

        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
        assert_eq!(
            monitor.stats(),
            SessionStats {
                lines_read: 4,
                events_classified: 4,
                events_delivered: 0,
                events_dropped: 4,
            }
        );
        assert!(of_type(&sink, "android_error").is_empty());

        monitor.stop().await;
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(statuses(&sink), vec!["connected", "active"]);
    }

    #[tokio::test]
    async fn test_listener_that_stops_reading_cannot_block_shutdown() {
        let script = format!("while true; do echo '{}'; sleep 0.05; done", FATAL_LINE);
        let backend = MockDeviceBackend::with_script(&[DEVICE], &script);
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);
        let shutdown = ShutdownSignal::new();

        monitor.start().await.unwrap();
        sink.stall();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.request_shutdown();
        });

        let started = Instant::now();
        let exit = monitor.run_loop(&shutdown).await;
        monitor.stop().await;

        assert_eq!(exit, LoopExit::ShutdownRequested);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(monitor.connection_state(), ConnectionState::Disconnected);
        assert!(monitor.stats().events_dropped >= 1);
        assert_eq!(monitor.stats().events_delivered, 0);
    }

    #[tokio::test]
    async fn test_start_while_active_is_rejected() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], "sleep 30");
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        monitor.start().await.unwrap();
        assert_eq!(monitor.state(), MonitoringState::Active);
        assert_eq!(monitor.device_id(), Some(DEVICE));

        let err = monitor.start().await.unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyRunning { .. }));
        assert_eq!(monitor.state(), MonitoringState::Active);
        assert_eq!(sink.connected_uris().len(), 1);

        monitor.stop().await;
        assert_eq!(monitor.state(), MonitoringState::Idle);
    }

    #[tokio::test]
    async fn test_stop_twice_is_harmless() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], "sleep 30");
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        monitor.stop().await;
        assert_eq!(monitor.state(), MonitoringState::Idle);

        monitor.start().await.unwrap();
        monitor.stop().await;
        assert_eq!(monitor.state(), MonitoringState::Idle);
        monitor.stop().await;
        assert_eq!(monitor.state(), MonitoringState::Idle);

        assert_eq!(sink.close_count(), 1);
        assert_eq!(statuses(&sink), vec!["connected", "active", "stopped"]);
    }

    #[tokio::test]
    async fn test_shutdown_request_stops_session_promptly() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], "sleep 30");
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);
        let shutdown = ShutdownSignal::new();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.request_shutdown();
        });

        let started = Instant::now();
        monitor.run(&shutdown).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(monitor.state(), MonitoringState::Idle);
        assert_eq!(sink.close_count(), 1);
        assert_eq!(statuses(&sink).last().map(String::as_str), Some("stopped"));
    }

    #[tokio::test]
    async fn test_run_loop_without_session() {
        let backend = MockDeviceBackend::empty();
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        assert_eq!(
            monitor.run_loop(&ShutdownSignal::new()).await,
            LoopExit::NotActive
        );
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let backend = MockDeviceBackend::with_script(&[DEVICE], &print_lines(&[FATAL_LINE]));
        let sink = MockSinkConnector::new();
        let mut monitor = controller(&backend, &sink);

        let first = monitor.run(&ShutdownSignal::new()).await.unwrap();
        let first_id = monitor.session_id();
        let second = monitor.run(&ShutdownSignal::new()).await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first_id, monitor.session_id());
        assert_eq!(sink.connected_uris().len(), 2);
        assert_eq!(of_type(&sink, "android_error").len(), 2);
    }
}
