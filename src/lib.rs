//! Transfer engine core for Backblaze B2 Cloud Storage: authentication lifecycle,
//! chunked parallel upload/download, per-URL credential caching, and policy-driven retry.
//!
//! [`Client`] owns the authenticated session, the upload/part URL caches, and the
//! upload/download bulkheads. [`upload()`] and [`download()`] are the transfer
//! orchestrators (SPEC_FULL.md §4.4/§4.5); [`Client`]'s methods are the thin per-endpoint
//! wrappers they drive. `Client::upload_from_path`/`download_to_path` (SPEC_FULL.md §4.7,
//! in [`fs`]) are convenience wrappers over a path on disk.

#![allow(unused)]

#[macro_use]
extern crate serde;

pub mod backoff;
pub mod cache;
pub mod config;
pub mod download;
pub mod error;
#[cfg(feature = "fs")]
pub mod fs;
pub mod models;
pub mod parts;
pub mod policy;
pub mod progress;
pub mod session;
pub mod sink;
pub mod source;
pub mod upload;

pub use config::{Config, ConfigBuilder, TestMode};
pub use download::{download, DownloadIdentifier, DownloadOptions};
pub use error::B2Error;
pub use parts::{cutoff, part_size, plan_parts, Part, RangeDescriptor};
pub use progress::{NoProgress, ProgressEvent, ProgressSink, ProgressTracker};
pub use session::{
    Client, ClientBuilder, DownloadedFile, NewFileInfo, NewPartInfo, ServerSideEncryption, ServerSideEncryptionCustomer,
};
pub use sink::{FileSink, MemorySink, Sink};
pub use source::Source;
pub use upload::{upload, UploadOptions};
