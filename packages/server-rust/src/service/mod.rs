//! Page store service and the message bus that carries requests to it.
//!
//! Request path:
//!
//! 1. **Proxy** (`proxy`): typed call -> action-tagged `Envelope`
//! 2. **Bus** (`bus`): delivers the envelope, one reply per request
//! 3. **Classification** (`classify`): `Envelope` -> `Result<Operation, ClassifyError>`
//! 4. **Middleware** (`middleware`): Tower layers (load shedding, timeout, metrics)
//! 5. **Routing** (`router`): dispatch by bus address
//! 6. **Domain** (`domain`): the page store itself
//!
//! `registry` owns service lifecycles; `worker` drives the bus dispatcher.

pub mod bus;
pub mod classify;
pub mod config;
pub mod domain;
pub mod middleware;
pub mod operation;
pub mod proxy;
pub mod registry;
pub mod router;
pub mod worker;

pub use bus::{BusClient, MessageBus, Reply};
pub use classify::OperationService;
pub use config::ServerConfig;
pub use domain::PageStoreService;
pub use operation::{
    ClassifyError, Operation, OperationContext, OperationError, OperationResponse,
};
pub use proxy::PageStoreProxy;
pub use registry::{ManagedService, ServiceContext, ServiceRegistry};
pub use router::OperationRouter;
pub use worker::{BackgroundRunnable, BackgroundWorker};
