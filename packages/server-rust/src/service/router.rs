//! Operation routing: dispatches `Operation` to services by bus address.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;

use super::operation::{Operation, OperationError, OperationResponse};

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

/// A boxed Tower service bound to one address.
type BoxedService = Box<
    dyn Service<Operation, Response = OperationResponse, Error = OperationError, Future = BoxedFuture>
        + Send,
>;

// ---------------------------------------------------------------------------
// OperationRouter
// ---------------------------------------------------------------------------

/// Routes `Operation` values to the service bound at their address.
///
/// Exactly one service may be bound per address; binding again replaces the
/// previous one. Operations sent to an unbound address fail with
/// `OperationError::UnknownService`.
pub struct OperationRouter {
    services: HashMap<String, BoxedService>,
}

impl OperationRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Bind a service at the given address.
    pub fn register<S>(&mut self, address: impl Into<String>, service: S)
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send + 'static,
        S::Future: Send + 'static,
    {
        self.services
            .insert(address.into(), Box::new(ServiceWrapper(service)));
    }

    /// Whether anything is bound at `address`.
    #[must_use]
    pub fn is_bound(&self, address: &str) -> bool {
        self.services.contains_key(address)
    }

    /// Every bound address.
    #[must_use]
    pub fn addresses(&self) -> HashSet<String> {
        self.services.keys().cloned().collect()
    }
}

impl Default for OperationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Operation> for OperationRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        for svc in self.services.values_mut() {
            match svc.poll_ready(cx) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        match self.services.get_mut(op.ctx().service_name.as_str()) {
            Some(svc) => svc.call(op),
            None => {
                let name = op.ctx().service_name.clone();
                Box::pin(async move { Err(OperationError::UnknownService { name }) })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceWrapper (type-erased adapter)
// ---------------------------------------------------------------------------

struct ServiceWrapper<S>(S);

impl<S> Service<Operation> for ServiceWrapper<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.0.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        Box::pin(self.0.call(op))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tower::ServiceExt;
    use wiki_core::Action;

    use super::*;
    use crate::service::operation::OperationContext;

    /// Acks every operation, tagging the call id with a per-address offset so
    /// tests can tell which binding answered.
    #[derive(Clone)]
    struct TaggedAck {
        offset: u64,
    }

    impl Service<Operation> for TaggedAck {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future = BoxedFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, op: Operation) -> Self::Future {
            let call_id = op.ctx().call_id + self.offset;
            Box::pin(async move { Ok(OperationResponse::Ack { call_id }) })
        }
    }

    fn list_op(address: &str) -> Operation {
        Operation::ListPages {
            ctx: OperationContext::new(1, address, Action::ListPages, 5000),
        }
    }

    #[tokio::test]
    async fn routes_to_bound_address() {
        let mut router = OperationRouter::new();
        router.register("wikidb.queue", TaggedAck { offset: 0 });

        let resp = router.oneshot(list_op("wikidb.queue")).await.unwrap();
        assert_eq!(resp, OperationResponse::Ack { call_id: 1 });
    }

    #[tokio::test]
    async fn unbound_address_returns_unknown_service() {
        let mut router = OperationRouter::new();
        router.register("wikidb.queue", TaggedAck { offset: 0 });

        let err = router.oneshot(list_op("nowhere")).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::UnknownService { name } if name == "nowhere"
        ));
    }

    #[tokio::test]
    async fn routes_to_correct_address_among_multiple() {
        let mut router = OperationRouter::new();
        router.register("a", TaggedAck { offset: 100 });
        router.register("b", TaggedAck { offset: 200 });

        let resp = ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(list_op("b"))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Ack { call_id: 201 });

        let resp = ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(list_op("a"))
            .await
            .unwrap();
        assert_eq!(resp, OperationResponse::Ack { call_id: 101 });
    }

    #[test]
    fn rebinding_replaces_previous_service() {
        let mut router = OperationRouter::new();
        router.register("a", TaggedAck { offset: 1 });
        router.register("a", TaggedAck { offset: 2 });
        assert!(router.is_bound("a"));
        assert!(!router.is_bound("b"));
        assert_eq!(router.addresses(), HashSet::from(["a".to_string()]));
    }
}
