//! hookd dispatch core.
//!
//! Accepts [`Job`]s from the HTTP layer and runs them on a fixed-size pool of
//! [`Worker`]s, decoupling request acceptance from action execution.
//!
//! ```text
//!   HTTP handler ──submit──▶ Dispatcher ──enqueue──▶ JobQueue (MPMC, FIFO)
//!                                                     │   │   │
//!                                                     ▼   ▼   ▼
//!                                                  worker 0 … worker N-1
//!                                                     │
//!                                                     ▼
//!                                          JobHandler::run + JobReporter
//! ```
//!
//! Lifecycle: `Idle → Running → Draining → Stopped`, or `→ TimedOut` when
//! [`Dispatcher::shutdown`] hits its deadline and in-flight work is abandoned.

pub mod dispatcher;
pub mod error;
pub mod job;
pub mod queue;
pub mod reporter;
pub mod script;
pub mod stats;
pub mod worker;

pub use dispatcher::{Dispatcher, DispatcherState, ShutdownReport};
pub use error::{DispatchError, JobExecutionError};
pub use job::{Job, JobBuilder, JobHandler, JobId, JobOutput, JobResult};
pub use queue::{EnqueueError, JobQueue, QueueCapacity};
pub use reporter::{JobReporter, NoopReporter};
pub use script::ScriptJobHandler;
pub use stats::{DispatcherStats, StatsSnapshot};
pub use worker::Worker;
