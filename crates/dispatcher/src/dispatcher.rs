//! Dispatcher - worker loop providing the per-session logical thread

use std::sync::Arc;

use async_trait::async_trait;
use contracts::{CircuitError, FaultRecord, SessionId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::affinity::CURRENT_SESSION;
use crate::handle::DispatcherHandle;
use crate::metrics::DispatcherMetrics;

/// What the worker loop does after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep processing the mailbox
    Continue,
    /// Stop the worker; queued work is cancelled
    Stop,
}

/// State machine driven exclusively on its dispatcher's worker task.
///
/// `handle` runs one message at a time with exclusive access to the actor,
/// so implementations need no locks around their state. A panicking handler
/// tears the worker down; queued callers observe `DispatchCancelled`.
#[async_trait]
pub trait Actor: Send + 'static {
    type Message: Send + 'static;

    async fn handle(&mut self, msg: Self::Message) -> Result<Flow, CircuitError>;
}

pub(crate) struct Envelope<M> {
    pub(crate) msg: M,
    pub(crate) completion: Option<oneshot::Sender<Result<(), CircuitError>>>,
}

/// Spawn the worker task for an actor and return its scheduling handle.
///
/// Fire-and-forget failures are pushed to `fault_tx` as typed records; the
/// hosting layer drains that channel.
pub fn spawn<A: Actor>(
    actor: A,
    session_id: SessionId,
    mailbox_capacity: usize,
    fault_tx: mpsc::UnboundedSender<FaultRecord>,
) -> (DispatcherHandle<A::Message>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let metrics = Arc::new(DispatcherMetrics::new());

    let worker_metrics = Arc::clone(&metrics);
    let worker = tokio::spawn(CURRENT_SESSION.scope(session_id, async move {
        run(actor, session_id, rx, worker_metrics, fault_tx).await;
    }));

    (DispatcherHandle::new(session_id, tx, metrics), worker)
}

/// Worker loop: one unit of session work at a time, in mailbox order.
#[instrument(name = "dispatcher_run", skip_all, fields(session_id = %session_id))]
async fn run<A: Actor>(
    mut actor: A,
    session_id: SessionId,
    mut rx: mpsc::Receiver<Envelope<A::Message>>,
    metrics: Arc<DispatcherMetrics>,
    fault_tx: mpsc::UnboundedSender<FaultRecord>,
) {
    debug!("dispatcher worker started");

    while let Some(envelope) = rx.recv().await {
        let result = actor.handle(envelope.msg).await;
        metrics.inc_executed_count();

        let stop = matches!(result, Ok(Flow::Stop));
        if result.is_err() {
            metrics.inc_failed_count();
        }

        match envelope.completion {
            Some(done_tx) => {
                // Caller may have stopped waiting; that is not an error.
                let _ = done_tx.send(result.map(|_| ()));
            }
            None => {
                if let Err(error) = result {
                    metrics.inc_faulted_count();
                    let _ = fault_tx.send(FaultRecord::from_error(session_id, &error));
                }
            }
        }

        if stop {
            break;
        }
    }

    // Fail everything still queued so no caller awaits forever.
    rx.close();
    while let Ok(envelope) = rx.try_recv() {
        metrics.inc_cancelled_count();
        if let Some(done_tx) = envelope.completion {
            let _ = done_tx.send(Err(CircuitError::DispatchCancelled { session_id }));
        }
    }

    debug!("dispatcher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::assert_on_logical_thread;

    struct CounterActor {
        session_id: SessionId,
        count: u64,
        probe: mpsc::UnboundedSender<u64>,
    }

    enum CounterMsg {
        Add(u64),
        Fail,
        Sleep(u64),
        Stop,
    }

    #[async_trait]
    impl Actor for CounterActor {
        type Message = CounterMsg;

        async fn handle(&mut self, msg: CounterMsg) -> Result<Flow, CircuitError> {
            assert_on_logical_thread(self.session_id)?;
            match msg {
                CounterMsg::Add(n) => {
                    self.count += n;
                    let _ = self.probe.send(self.count);
                    Ok(Flow::Continue)
                }
                CounterMsg::Fail => Err(CircuitError::Other("handler failure".into())),
                CounterMsg::Sleep(ms) => {
                    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
                    Ok(Flow::Continue)
                }
                CounterMsg::Stop => Ok(Flow::Stop),
            }
        }
    }

    fn setup() -> (
        DispatcherHandle<CounterMsg>,
        JoinHandle<()>,
        mpsc::UnboundedReceiver<u64>,
        mpsc::UnboundedReceiver<FaultRecord>,
    ) {
        let session_id = SessionId::next();
        let (probe_tx, probe_rx) = mpsc::unbounded_channel();
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let actor = CounterActor {
            session_id,
            count: 0,
            probe: probe_tx,
        };
        let (handle, worker) = spawn(actor, session_id, 16, fault_tx);
        (handle, worker, probe_rx, fault_rx)
    }

    #[tokio::test]
    async fn test_schedule_runs_in_program_order() {
        let (handle, worker, mut probe, _faults) = setup();

        for n in 1..=5u64 {
            handle.schedule(CounterMsg::Add(n)).await.unwrap();
        }
        handle
            .schedule(CounterMsg::Stop)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();

        // Running totals prove both ordering and mutual exclusion
        let mut seen = Vec::new();
        while let Ok(v) = probe.try_recv() {
            seen.push(v);
        }
        assert_eq!(seen, vec![1, 3, 6, 10, 15]);

        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_completion_carries_handler_error() {
        let (handle, _worker, _probe, _faults) = setup();

        let completion = handle.schedule(CounterMsg::Fail).await.unwrap();
        assert!(matches!(
            completion.wait().await,
            Err(CircuitError::Other(_))
        ));
        // An error with a listener never reaches the fault channel
        assert_eq!(handle.metrics().faulted_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_failure_routed_to_fault_channel() {
        let (handle, _worker, _probe, mut faults) = setup();

        handle.notify(CounterMsg::Fail).await.unwrap();
        let fault = faults.recv().await.unwrap();
        assert_eq!(fault.session_id, handle.session_id());
    }

    #[tokio::test]
    async fn test_stop_cancels_queued_completions() {
        let session_id = SessionId::next();
        let (probe_tx, _probe_rx) = mpsc::unbounded_channel();
        let (fault_tx, _fault_rx) = mpsc::unbounded_channel();
        let actor = CounterActor {
            session_id,
            count: 0,
            probe: probe_tx,
        };
        // Capacity large enough to queue work behind the stop message
        let (handle, worker) = spawn(actor, session_id, 16, fault_tx);

        // Hold the worker busy so the stop and the trailing unit both queue
        handle.schedule(CounterMsg::Sleep(100)).await.unwrap();
        let stop = handle.schedule(CounterMsg::Stop).await.unwrap();
        let after = handle.schedule(CounterMsg::Add(1)).await.unwrap();

        stop.wait().await.unwrap();
        assert!(matches!(
            after.wait().await,
            Err(CircuitError::DispatchCancelled { .. })
        ));

        worker.await.unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_schedule_after_stop_fails() {
        let (handle, worker, _probe, _faults) = setup();
        handle
            .schedule(CounterMsg::Stop)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        worker.await.unwrap();

        assert!(matches!(
            handle.schedule(CounterMsg::Add(1)).await,
            Err(CircuitError::DispatcherClosed { .. })
        ));
    }
}
