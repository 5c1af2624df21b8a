//! Gazette Core - archive audit and batch processing for digitized
//! newspaper collections.
//!
//! A digitization archive holds one directory per newspaper issue, each
//! with scanned page images and a legacy metadata file. The catalog side
//! (a Drupal backend) holds one entity per ingested issue. This crate
//! reconciles the two by content fingerprint and schedules the external
//! OCR/tiling jobs that produce derivatives, with bounded parallelism.
//!
//! # Example
//!
//! ```rust,ignore
//! use gazette_core::{AuditConfig, AuditOrchestrator, PhpDefineLoader, RestCatalog, WebrootFetcher};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> gazette_core::Result<()> {
//!     let config = AuditConfig::default();
//!     let catalog = Arc::new(RestCatalog::new(&config.catalog_base_url, Duration::from_secs(30))?);
//!     let fetcher = Arc::new(WebrootFetcher::new(&config.webroot));
//!     let loader = Arc::new(PhpDefineLoader::default());
//!
//!     let orchestrator = AuditOrchestrator::new(config, catalog, fetcher, loader);
//!     let report = orchestrator.run("/archive/sn0001").await?;
//!     print!("{}", report.render_summary());
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod hashing;
pub mod metadata;
pub mod pages;
pub mod reconcile;
pub mod report;

// Re-export commonly used types
pub use audit::AuditOrchestrator;
pub use catalog::{CatalogReader, ContentFetcher, EntityId, RemotePageRecord, RestCatalog, WebrootFetcher};
pub use config::AuditConfig;
pub use error::{GazetteError, Result};
pub use executor::{BatchExecutor, BatchSummary, JobOutcome, JobSpec, JobStatus};
pub use hashing::EMPTY_SHA256;
pub use metadata::{IssueMetadata, MetadataLoader, PhpDefineLoader};
pub use pages::{LocalPage, PageScan};
pub use reconcile::{PageRef, ReconciliationResult};
pub use report::{AuditReport, DuplicateIssue, IssueFailure, IssueFinding};
