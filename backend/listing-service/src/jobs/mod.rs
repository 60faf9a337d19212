/// Background workers for the post lifecycle
///
/// Three independent polling loops (expiration, boost, cleanup) owned and
/// supervised by the [`scheduler::Scheduler`]. Each worker sweeps its store
/// on an interval, treats row-level failures as skip-and-retry-next-tick,
/// and backs off briefly after a cycle-level error instead of terminating.
use async_trait::async_trait;
use tokio::sync::broadcast;

pub mod boost;
pub mod cleanup;
pub mod expiration;
pub mod scheduler;

pub use boost::BoostWorker;
pub use cleanup::CleanupWorker;
pub use expiration::ExpirationWorker;
pub use scheduler::Scheduler;

/// A long-running polling loop the scheduler can supervise.
///
/// `run` must only return when the shutdown signal fires, and must never
/// interrupt a sweep mid-row: the signal is checked between sweeps only.
#[async_trait]
pub trait Worker: Clone + Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn run(self, shutdown: broadcast::Receiver<()>);
}
