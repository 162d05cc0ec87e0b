pub mod db;
pub mod manager;
pub mod orchestrator;
pub mod store;
#[cfg(test)]
pub(crate) mod test_support;

pub use db::{fetch_properties, PgResolutionStore};
pub use manager::{resolve_across_platforms, run_resolution_batch, BatchContext, BatchSummary};
pub use orchestrator::Resolver;
pub use store::{InMemoryResolutionStore, ResolutionStore};
