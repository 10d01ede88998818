//! In-process message bus carrying action-tagged envelopes to bound services.
//!
//! A single dispatcher task, driven by [`BackgroundWorker`], receives
//! deliveries, rejects protocol errors, and hands each classified operation
//! to the pipeline. Every operation then runs as its own task, so a slow
//! request never blocks the ones queued behind it. Each delivery carries its
//! own reply channel: exactly one reply or failure reaches exactly the caller
//! that sent it.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tower::{Service, ServiceExt};
use tracing::{debug, warn};
use wiki_core::{Envelope, FailureCode, ReplyFailure};

use super::classify::OperationService;
use super::config::ServerConfig;
use super::middleware::{build_operation_pipeline, OperationPipeline};
use super::operation::{Operation, OperationError};
use super::router::OperationRouter;
use super::worker::{BackgroundRunnable, BackgroundWorker};
use crate::network::{InFlightGuard, ShutdownController};

pub const BUS_IN_FLIGHT: &str = "wiki_bus_in_flight";

/// Outcome delivered to the requesting caller.
pub type Reply = Result<Value, ReplyFailure>;

/// One request in transit, with the channel its reply goes back on.
pub struct Delivery {
    envelope: Envelope,
    reply_to: oneshot::Sender<Reply>,
    _guard: InFlightGuard,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

struct Dispatcher {
    bound: HashSet<String>,
    classifier: OperationService,
    pipeline: OperationPipeline,
    shutdown: Arc<ShutdownController>,
}

impl Dispatcher {
    /// Resolves the delivery to an operation, or to the failure that ends it.
    fn admit(&self, envelope: Envelope) -> Result<Operation, ReplyFailure> {
        if !self.bound.contains(&envelope.address) {
            return Err(OperationError::UnknownService {
                name: envelope.address,
            }
            .into());
        }
        self.classifier.classify(envelope).map_err(Into::into)
    }
}

#[async_trait]
impl BackgroundRunnable for Dispatcher {
    type Task = Delivery;

    async fn run(&mut self, delivery: Delivery) {
        let Delivery {
            envelope,
            reply_to,
            _guard: guard,
        } = delivery;

        let op = match self.admit(envelope) {
            Ok(op) => op,
            Err(failure) => {
                warn!(code = %failure.code, message = %failure.message, "request rejected");
                let _ = reply_to.send(Err(failure));
                return;
            }
        };

        let call_id = op.ctx().call_id;
        let fut = match ServiceExt::<Operation>::ready(&mut self.pipeline).await {
            Ok(pipeline) => pipeline.call(op),
            Err(e) => {
                let _ = reply_to.send(Err(e.into()));
                return;
            }
        };

        tokio::spawn(async move {
            let reply = match fut.await {
                Ok(response) => response.into_body().map_err(|e| {
                    ReplyFailure::new(FailureCode::InvalidReply, e.to_string())
                }),
                Err(e) => Err(e.into()),
            };
            if reply_to.send(reply).is_err() {
                debug!(call_id, "caller dropped before the reply arrived");
            }
            drop(guard);
        });
    }

    async fn on_tick(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(BUS_IN_FLIGHT).set(self.shutdown.in_flight_count() as f64);
    }

    async fn shutdown(&mut self) {
        debug!(
            in_flight = self.shutdown.in_flight_count(),
            "bus dispatcher stopped"
        );
    }
}

// ---------------------------------------------------------------------------
// MessageBus
// ---------------------------------------------------------------------------

/// Owner of the dispatcher task.
pub struct MessageBus {
    worker: BackgroundWorker<Dispatcher>,
    client: BusClient,
}

impl MessageBus {
    /// Wraps `router` in the operation pipeline and starts dispatching.
    ///
    /// Addresses bound on `router` are the only ones the bus answers for.
    #[must_use]
    pub fn start(
        router: OperationRouter,
        config: &ServerConfig,
        shutdown: Arc<ShutdownController>,
    ) -> Self {
        let dispatcher = Dispatcher {
            bound: router.addresses(),
            classifier: OperationService::new(Arc::new(config.clone())),
            pipeline: build_operation_pipeline(router, config),
            shutdown: Arc::clone(&shutdown),
        };
        let worker = BackgroundWorker::start(
            dispatcher,
            config.bus_tick_interval_ms,
            config.bus_channel_capacity,
        );
        let client = BusClient {
            tx: worker.sender(),
            shutdown,
        };
        Self { worker, client }
    }

    /// A send handle for callers.
    #[must_use]
    pub fn client(&self) -> BusClient {
        self.client.clone()
    }

    /// Stops dispatching. Deliveries still queued are answered with a
    /// transport failure.
    pub async fn stop(&mut self) {
        self.worker.stop().await;
    }
}

// ---------------------------------------------------------------------------
// BusClient
// ---------------------------------------------------------------------------

/// Cloneable sending side of the bus.
#[derive(Clone)]
pub struct BusClient {
    tx: mpsc::Sender<Delivery>,
    shutdown: Arc<ShutdownController>,
}

impl BusClient {
    /// Sends `envelope` and waits for its reply.
    ///
    /// # Errors
    ///
    /// Returns the failure the service replied with, or a `Transport` failure
    /// when the node is draining, the bus is stopped, or the reply was lost.
    pub async fn request(&self, envelope: Envelope) -> Reply {
        let guard = self.shutdown.try_in_flight_guard().ok_or_else(|| {
            ReplyFailure::new(FailureCode::Transport, "bus is shutting down")
        })?;

        let (reply_to, reply) = oneshot::channel();
        self.tx
            .send(Delivery {
                envelope,
                reply_to,
                _guard: guard,
            })
            .await
            .map_err(|_| ReplyFailure::new(FailureCode::Transport, "bus is closed"))?;

        reply
            .await
            .map_err(|_| ReplyFailure::new(FailureCode::Transport, "reply was dropped"))?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use serde_json::json;
    use wiki_core::{Action, PageSummary, ACTION_HEADER};

    use super::*;
    use crate::service::operation::OperationResponse;

    const ADDRESS: &str = "wikidb.queue";

    /// Answers with one summary whose name echoes the requested id.
    #[derive(Clone)]
    struct EchoService {
        delay_ms: u64,
    }

    impl Service<Operation> for EchoService {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future =
            Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, op: Operation) -> Self::Future {
            let delay = self.delay_ms;
            let name = match &op {
                Operation::GetPageById { id, .. } => id.clone(),
                _ => op.action().to_string(),
            };
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(OperationResponse::Pages(vec![PageSummary {
                    id: "echo".to_string(),
                    name,
                }]))
            })
        }
    }

    fn start_bus(delay_ms: u64, config: ServerConfig) -> (MessageBus, Arc<ShutdownController>) {
        let mut router = OperationRouter::new();
        router.register(ADDRESS, EchoService { delay_ms });
        let shutdown = Arc::new(ShutdownController::new());
        let bus = MessageBus::start(router, &config, Arc::clone(&shutdown));
        (bus, shutdown)
    }

    fn get_by_id(id: &str) -> Envelope {
        Envelope::new(ADDRESS, json!({ "id": id })).with_action(Action::GetPageById)
    }

    #[tokio::test]
    async fn tagged_request_gets_reply() {
        let (bus, _) = start_bus(0, ServerConfig::default());
        let body = bus.client().request(get_by_id("p1")).await.unwrap();
        assert_eq!(body, json!({ "pages": [{ "id": "echo", "name": "p1" }] }));
    }

    #[tokio::test]
    async fn missing_action_is_rejected_before_the_service() {
        let (bus, _) = start_bus(0, ServerConfig::default());
        let failure = bus
            .client()
            .request(Envelope::new(ADDRESS, json!({ "action": "all-pages" })))
            .await
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::NoActionSpecified);
    }

    #[tokio::test]
    async fn unknown_action_is_bad_action() {
        let (bus, _) = start_bus(0, ServerConfig::default());
        let failure = bus
            .client()
            .request(Envelope::new(ADDRESS, Value::Null).with_header(ACTION_HEADER, "frobnicate"))
            .await
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::BadAction);
        assert!(failure.message.contains("frobnicate"));
    }

    #[tokio::test]
    async fn unbound_address_has_no_handlers() {
        let (bus, _) = start_bus(0, ServerConfig::default());
        let failure = bus
            .client()
            .request(Envelope::new("elsewhere", Value::Null))
            .await
            .unwrap_err();
        assert_eq!(failure.code, FailureCode::NoHandlers);
    }

    #[tokio::test]
    async fn concurrent_replies_reach_their_own_callers() {
        let (bus, _) = start_bus(20, ServerConfig::default());
        let client = bus.client();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let client = client.clone();
                tokio::spawn(async move {
                    let id = format!("p{i}");
                    let body = client.request(get_by_id(&id)).await.unwrap();
                    (id, body["pages"][0]["name"].as_str().map(str::to_string))
                })
            })
            .collect();

        for handle in handles {
            let (sent, received) = handle.await.unwrap();
            assert_eq!(Some(sent), received);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_run_concurrently() {
        let (bus, _) = start_bus(200, ServerConfig::default());
        let client = bus.client();

        let started = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            client.request(get_by_id("a")),
            client.request(get_by_id("b"))
        );
        a.unwrap();
        b.unwrap();
        // Serial handling would need the sum of both delays.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_timeout_is_reported() {
        let config = ServerConfig {
            default_operation_timeout_ms: 20,
            ..ServerConfig::default()
        };
        let (bus, _) = start_bus(500, config);
        let failure = bus.client().request(get_by_id("p1")).await.unwrap_err();
        assert_eq!(failure.code, FailureCode::Timeout);
    }

    #[tokio::test]
    async fn draining_node_refuses_requests() {
        let (bus, shutdown) = start_bus(0, ServerConfig::default());
        shutdown.trigger_shutdown();

        let failure = bus.client().request(get_by_id("p1")).await.unwrap_err();
        assert_eq!(failure.code, FailureCode::Transport);
    }

    #[tokio::test]
    async fn stopped_bus_fails_with_transport() {
        let (mut bus, shutdown) = start_bus(0, ServerConfig::default());
        let client = bus.client();
        bus.stop().await;

        let failure = client.request(get_by_id("p1")).await.unwrap_err();
        assert_eq!(failure.code, FailureCode::Transport);
        assert_eq!(shutdown.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_requests_are_tracked_until_replied() {
        let (bus, shutdown) = start_bus(100, ServerConfig::default());
        let client = bus.client();

        let pending = tokio::spawn(async move { client.request(get_by_id("p1")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(shutdown.in_flight_count(), 1);

        shutdown.trigger_shutdown();
        assert!(shutdown.wait_for_drain(Duration::from_secs(2)).await);
        assert!(pending.await.unwrap().is_ok());
    }
}
