//! Demo host orchestrator - coordinates registry, sessions, and loopback
//! clients.
//!
//! Each hosted session gets a loopback transport; delivered batches are fed
//! to one in-process client task, which acknowledges them through the
//! registry exactly like a remote client would. A driver task per session
//! paces render requests and optionally simulates one mid-run transport
//! loss, exercising the resend path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ClientCommand, HostBlueprint, LifecycleObserver, SessionId, Transport};
use observability::DeliveryStats;
use session::CircuitRegistry;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::loopback::{CounterRenderer, Delivered, LogObserver, LoopbackTransport};
use super::HostStats;

/// Demo host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// The host blueprint configuration
    pub blueprint: HostBlueprint,

    /// Number of concurrent sessions
    pub sessions: usize,

    /// Batches to render per session (None = unlimited)
    pub batches: Option<u64>,

    /// Delay between render requests
    pub interval: Duration,

    /// Drop the transport once this many batches are acked (None = never)
    pub disconnect_at: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Delivery totals shared between drivers and the loopback client.
#[derive(Default)]
struct Totals {
    /// Highest sequence seen per session; the sum is the produced count
    highest_seen: Mutex<HashMap<SessionId, u64>>,
    /// Distinct batches acknowledged per session
    acked: Mutex<HashMap<SessionId, u64>>,
    resent: AtomicU64,
    disconnects: AtomicU64,
}

impl Totals {
    fn acked_for(&self, session_id: SessionId) -> u64 {
        self.acked
            .lock()
            .unwrap()
            .get(&session_id)
            .copied()
            .unwrap_or(0)
    }

    fn delivery_stats(&self) -> DeliveryStats {
        DeliveryStats {
            batches_produced: self.highest_seen.lock().unwrap().values().sum(),
            batches_acked: self.acked.lock().unwrap().values().sum(),
            batches_resent: self.resent.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
        }
    }
}

/// Main demo host orchestrator
pub struct DemoHost {
    config: HostConfig,
}

impl DemoHost {
    /// Create a new host with the given configuration
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    /// Run every session to completion and report totals
    pub async fn run(self) -> Result<HostStats> {
        let start_time = Instant::now();

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let observers: Vec<Arc<dyn LifecycleObserver>> = vec![Arc::new(LogObserver)];
        let registry = CircuitRegistry::new(
            self.config.blueprint.circuit.clone(),
            Arc::from(observers),
        );
        let totals = Arc::new(Totals::default());

        // One client task acknowledges deliveries for every session
        let (delivered_tx, delivered_rx) = mpsc::unbounded_channel();
        let client = tokio::spawn(loopback_client(
            Arc::clone(&registry),
            delivered_rx,
            Arc::clone(&totals),
        ));

        info!(
            sessions = self.config.sessions,
            batches = ?self.config.batches,
            max_pending = self.config.blueprint.circuit.max_pending_batches,
            "Demo host running"
        );

        let mut drivers = Vec::with_capacity(self.config.sessions);
        for _ in 0..self.config.sessions {
            drivers.push(tokio::spawn(drive_session(
                Arc::clone(&registry),
                self.config.clone(),
                delivered_tx.clone(),
                Arc::clone(&totals),
            )));
        }
        drop(delivered_tx);

        for driver in drivers {
            if let Err(e) = driver.await.context("session driver panicked")? {
                warn!(error = %e, "session driver failed");
            }
        }

        // Shutdown
        info!("Shutting down host...");
        registry.close_all().await;

        // Sessions are gone, so every loopback sender is dropped and the
        // client task drains out
        let _ = tokio::time::timeout(Duration::from_secs(5), client).await;

        let stats = HostStats {
            delivery: totals.delivery_stats(),
            sessions: self.config.sessions,
            duration: start_time.elapsed(),
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            acked = stats.delivery.batches_acked,
            resent = stats.delivery.batches_resent,
            "Host shutdown complete"
        );

        Ok(stats)
    }
}

/// Acknowledge every delivered batch, tracking produced/acked/resent totals.
async fn loopback_client(
    registry: Arc<CircuitRegistry>,
    mut delivered_rx: mpsc::UnboundedReceiver<Delivered>,
    totals: Arc<Totals>,
) {
    while let Some(delivered) = delivered_rx.recv().await {
        let is_resend = {
            let mut highest = totals.highest_seen.lock().unwrap();
            let entry = highest.entry(delivered.session_id).or_insert(0);
            if delivered.sequence > *entry {
                *entry = delivered.sequence;
                false
            } else {
                true
            }
        };
        if is_resend {
            totals.resent.fetch_add(1, Ordering::Relaxed);
        }

        let acked = registry
            .acknowledge(delivered.session_id, delivered.sequence, None)
            .await
            .is_ok();
        if acked && !is_resend {
            *totals
                .acked
                .lock()
                .unwrap()
                .entry(delivered.session_id)
                .or_insert(0) += 1;
        }
    }
}

/// Host one session: open, attach, pace render requests, optionally drop and
/// re-attach the transport, close when the batch budget is acknowledged.
async fn drive_session(
    registry: Arc<CircuitRegistry>,
    config: HostConfig,
    delivered_tx: mpsc::UnboundedSender<Delivered>,
    totals: Arc<Totals>,
) -> Result<()> {
    let renderer = CounterRenderer::new(config.batches);
    let session_id = registry
        .create_session(Box::new(renderer))
        .await
        .context("Failed to open session")?;
    observability::record_session_opened(session_id);

    let transport = Arc::new(LoopbackTransport::new(delivered_tx.clone()));
    let mut connection_id = transport.connection_id();
    let handle = registry
        .reconnect(session_id, transport)
        .await
        .context("Session vanished before first attach")?;

    // Rename the payload label and kick off production
    handle
        .submit_command(ClientCommand::named("demo"))
        .await
        .context("Command rejected")?;

    let mut link_dropped = false;
    loop {
        tokio::time::sleep(config.interval).await;
        if handle.is_closed() {
            break;
        }

        let acked = totals.acked_for(session_id);

        // One simulated transport loss per session; batches rendered while
        // disconnected stay pending and are resent on re-attach
        if let Some(at) = config.disconnect_at {
            if !link_dropped && acked >= at {
                link_dropped = true;
                totals.disconnects.fetch_add(1, Ordering::Relaxed);
                info!(session_id = %session_id, acked, "simulating transport loss");
                registry.disconnect(session_id, connection_id).await;

                let _ = handle.render_now().await;
                tokio::time::sleep(config.interval).await;

                let replacement = Arc::new(LoopbackTransport::new(delivered_tx.clone()));
                connection_id = replacement.connection_id();
                if registry.reconnect(session_id, replacement).await.is_none() {
                    warn!(session_id = %session_id, "session evicted before reconnect");
                    return Ok(());
                }
                continue;
            }
        }

        if let Some(budget) = config.batches {
            if acked >= budget {
                info!(session_id = %session_id, acked, "batch budget acknowledged");
                break;
            }
        }

        // Pulls production again if it deferred under backpressure
        let _ = handle.render_now().await;
    }

    let dispatched = handle.metrics().snapshot();
    info!(
        session_id = %session_id,
        scheduled = dispatched.scheduled_count,
        executed = dispatched.executed_count,
        failed = dispatched.failed_count,
        "session dispatcher totals"
    );

    registry.close(session_id).await.context("Close failed")?;
    Ok(())
}
