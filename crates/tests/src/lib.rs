//! # Integration Tests
//!
//! End-to-end tests over the public surfaces: registry in, transport out.
//!
//! Covers:
//! - Full delivery round trips (render, deliver, acknowledge)
//! - Backpressure deferral and resumption under a small pending bound
//! - Reconnect with oldest-first resend of unacknowledged batches
//! - Lifecycle observer ordering and fault isolation
//! - Configuration loading wired into a live registry

#[cfg(test)]
mod contract_tests {
    use contracts::{CircuitError, FaultKind, SessionState};

    #[test]
    fn test_fatal_classification() {
        assert!(CircuitError::OutOfRangeAcknowledgement {
            acked: 9,
            highest: 3
        }
        .is_fatal());
        assert!(!CircuitError::QueueFull {
            pending: 3,
            max: 3
        }
        .is_fatal());
        assert!(FaultKind::ProtocolViolation.is_fatal());
        assert!(!FaultKind::TaskFailed.is_fatal());
    }

    #[test]
    fn test_state_machine_gates() {
        assert!(SessionState::Open.accepts_work());
        assert!(SessionState::Disconnected.accepts_work());
        assert!(!SessionState::Closed.accepts_work());
        assert!(SessionState::Connected.is_connected());
        assert!(!SessionState::Disconnected.is_connected());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use contracts::{CircuitConfig, CircuitError, ClientCommand, LifecycleObserver, Transport};
    use session::mock::{MockTransport, RecordingObserver, ScriptedRenderer};
    use session::CircuitRegistry;

    fn registry_with(
        max_pending: usize,
        observers: Vec<Arc<dyn LifecycleObserver>>,
    ) -> Arc<CircuitRegistry> {
        let config = CircuitConfig {
            max_pending_batches: max_pending,
            ..Default::default()
        };
        CircuitRegistry::new(config, Arc::from(observers))
    }

    fn scripted(payloads: &[&[u8]]) -> Box<ScriptedRenderer> {
        let mut renderer = ScriptedRenderer::default();
        for payload in payloads {
            renderer.push(payload);
        }
        Box::new(renderer)
    }

    /// Render two batches, deliver them in order, acknowledge cumulatively,
    /// close cleanly.
    #[tokio::test]
    async fn test_delivery_round_trip() {
        let registry = registry_with(10, Vec::new());
        let id = registry
            .create_session(scripted(&[b"alpha", b"beta"]))
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, transport.clone()).await);

        registry.request_render(id).await.unwrap();
        transport.wait_for_sends(2).await;
        assert_eq!(transport.sent_sequences(), vec![1, 2]);
        assert_eq!(
            transport.sent_payloads(),
            vec![Bytes::from_static(b"alpha"), Bytes::from_static(b"beta")]
        );

        // Cumulative: one ack covers both
        registry.acknowledge(id, 2, None).await.unwrap();
        registry.close(id).await.unwrap();
        assert_eq!(registry.session_count(), 0);
    }

    /// A client-reported batch error is not a protocol violation: the queue
    /// still advances, the session stays open, and delivery continues.
    #[tokio::test]
    async fn test_erroring_ack_advances_without_closing() {
        let registry = registry_with(10, Vec::new());
        let id = registry
            .create_session(scripted(&[b"b1", b"b2", b"b3"]))
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, transport.clone()).await);
        registry.request_render(id).await.unwrap();
        transport.wait_for_sends(3).await;

        registry
            .acknowledge(id, 2, Some("render failed".into()))
            .await
            .unwrap();
        registry.acknowledge(id, 3, None).await.unwrap();

        // No error frame went out and the session is still serving
        assert!(transport.error_notifications().is_empty());
        assert_eq!(registry.session_count(), 1);
        registry.close(id).await.unwrap();
    }

    /// With a pending bound of 3, production defers after three batches and
    /// each acknowledgement pulls the next one through.
    #[tokio::test]
    async fn test_backpressure_defer_and_resume() {
        let registry = registry_with(3, Vec::new());
        let id = registry
            .create_session(scripted(&[b"b1", b"b2", b"b3", b"b4", b"b5"]))
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, transport.clone()).await);

        registry.request_render(id).await.unwrap();
        transport.wait_for_sends(3).await;
        assert_eq!(transport.sent_sequences(), vec![1, 2, 3]);

        registry.acknowledge(id, 1, None).await.unwrap();
        transport.wait_for_sends(4).await;

        registry.acknowledge(id, 3, None).await.unwrap();
        transport.wait_for_sends(5).await;
        assert_eq!(transport.sent_sequences(), vec![1, 2, 3, 4, 5]);

        registry.close(id).await.unwrap();
    }

    /// Unacknowledged batches are resent oldest-first on the replacement
    /// transport after a reconnect.
    #[tokio::test]
    async fn test_reconnect_resends_pending() {
        let registry = registry_with(10, Vec::new());
        let id = registry
            .create_session(scripted(&[b"b1", b"b2", b"b3"]))
            .await
            .unwrap();

        let first = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, first.clone()).await);
        registry.request_render(id).await.unwrap();
        first.wait_for_sends(3).await;

        registry.acknowledge(id, 1, None).await.unwrap();
        registry.disconnect(id, first.connection_id()).await;

        let second = Arc::new(MockTransport::new());
        let handle = registry.reconnect(id, second.clone()).await;
        assert!(handle.is_some());

        second.wait_for_sends(2).await;
        assert_eq!(second.sent_sequences(), vec![2, 3]);
        // The old transport saw nothing new
        assert_eq!(first.sent_sequences(), vec![1, 2, 3]);

        registry.close(id).await.unwrap();
    }

    /// Observers fire in registration order at every transition, and one
    /// failing hook never silences the rest of the chain.
    #[tokio::test]
    async fn test_observer_order_and_fault_isolation() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let flaky = Arc::new(RecordingObserver::failing_on(
            "flaky",
            events.clone(),
            "on_connection_up",
        ));
        let steady = Arc::new(RecordingObserver::new("steady", events.clone()));

        let registry = registry_with(
            10,
            vec![
                flaky as Arc<dyn LifecycleObserver>,
                steady as Arc<dyn LifecycleObserver>,
            ],
        );
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, transport).await);
        registry.close(id).await.unwrap();

        let recorded = events.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                "flaky:on_opened",
                "steady:on_opened",
                "flaky:on_connection_up",
                "steady:on_connection_up",
                "flaky:on_connection_down",
                "steady:on_connection_down",
                "flaky:on_closed",
                "steady:on_closed",
            ]
        );
    }

    /// A command mutates the renderer on the session's logical thread and
    /// its output is delivered like any other batch.
    #[tokio::test]
    async fn test_command_drives_production() {
        let registry = registry_with(10, Vec::new());
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();

        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, transport.clone()).await);

        registry
            .submit_command(
                id,
                ClientCommand::with_payload("draw", Bytes::from_static(b"hello")),
            )
            .await
            .unwrap();

        transport.wait_for_sends(1).await;
        assert_eq!(transport.sent_payloads(), vec![Bytes::from_static(b"hello")]);

        registry.close(id).await.unwrap();
    }

    /// Close is idempotent and unknown sessions reject work with a typed
    /// error rather than hanging.
    #[tokio::test]
    async fn test_close_idempotence_and_unknown_session() {
        let registry = registry_with(10, Vec::new());
        let id = registry
            .create_session(Box::new(ScriptedRenderer::default()))
            .await
            .unwrap();

        registry.close(id).await.unwrap();
        registry.close(id).await.unwrap();

        let result = registry.submit_command(id, ClientCommand::named("x")).await;
        assert!(matches!(result, Err(CircuitError::UnknownSession { .. })));
    }

    /// Configuration flows from a TOML document into a live registry.
    #[tokio::test]
    async fn test_config_wires_into_registry() {
        let blueprint = config_loader::ConfigLoader::load_from_str(
            r#"
[circuit]
max_pending_batches = 2
disconnect_grace_secs = 45
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap();

        let registry = CircuitRegistry::new(
            blueprint.circuit,
            Arc::from(Vec::<Arc<dyn LifecycleObserver>>::new()),
        );
        assert_eq!(registry.grace_period().as_secs(), 45);

        let id = registry
            .create_session(scripted(&[b"a", b"b", b"c"]))
            .await
            .unwrap();
        let transport = Arc::new(MockTransport::new());
        assert!(registry.attach_transport(id, transport.clone()).await);

        // Bound of 2 from the config holds
        registry.request_render(id).await.unwrap();
        transport.wait_for_sends(2).await;
        assert_eq!(transport.sent_sequences(), vec![1, 2]);

        registry.close(id).await.unwrap();
    }
}
