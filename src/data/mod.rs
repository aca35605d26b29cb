//! Data retrieval and storage
//!
//! Rate-limited fetching, the on-disk page cache and feature store, page
//! scrapers, dataset assembly and loading, and the SQLite build ledger.

pub mod cache;
pub mod database;
pub mod dataset;
pub mod fetch;
pub mod links;
pub mod loader;
pub mod scrapers;

pub use cache::{FeatureStore, Layout, PageCache, PageDescriptor};
pub use database::Database;
pub use dataset::{BuildAudit, ConfigPlan, DatasetAssembler};
pub use fetch::{Fetcher, HttpTransport, RateLimiter, RecordingTransport, Transport};
pub use links::Links;
pub use loader::{load_dataset, Corpus, Table};
