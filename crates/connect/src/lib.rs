//! `vmaster-connect` — external collaborators for the vendor-master cycle.
//!
//! Everything here is an I/O wrapper around a system the core never touches
//! directly: the GRC records API, the ERP mirror, the mapping staging
//! database and its source workbook, the vendor-master merge store, and the
//! artifact uploader.

pub mod api;
pub mod db;
pub mod error;
pub mod http;
pub mod merge;
pub mod staging;
pub mod upload;

pub use api::{GrcApiClient, GrcFetch};
pub use db::{ErpDb, ErpLoad, MappingDb, LEGACY_SOURCE_TAG};
pub use error::ConnectError;
pub use merge::{MergeStore, StoredVendor};
pub use staging::{archive_workbook, find_inbox_workbook, refresh_staging, WorkbookLoad};
pub use upload::{ArtifactUploader, UploadOutcome, UploadPolicy, UploadReport};
