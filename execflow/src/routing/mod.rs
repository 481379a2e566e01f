//! Queue routing and worker pool scaling policy.
//!
//! Pure configuration: task names map to queues, queues belong to worker
//! pools, and each pool has scaling bounds for an external autoscaler.

mod queues;
mod router;
mod scaling;
mod table;

pub use queues::{QueueDefinition, WorkerType, MAX_QUEUE_PRIORITY};
pub use router::QueueRouter;
pub use scaling::{ScalingDecision, ScalingPolicy};
pub use table::RoutingConfig;
