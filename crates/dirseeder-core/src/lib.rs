#![forbid(unsafe_code)]
#![warn(
    unused,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Engine-agnostic seeding interfaces and DTOs.
//!
//! Layout: `model` (descriptor, task snapshot, rate caps), `service` (engine,
//! loader, and callback traits), `metainfo` (`.torrent` loader), `error`.

pub mod error;
pub mod metainfo;
pub mod model;
pub mod service;

pub use error::{DescriptorError, TaskError, TaskResult};
pub use metainfo::{DESCRIPTOR_SUFFIX, MetainfoLoader};
pub use model::{
    ContinuationRequest, DEFAULT_STATUS_INTERVAL, Descriptor, DescriptorFile, InfoHash, RateCaps,
    TaskHandle, TaskRates, TaskState, TaskStatus,
};
pub use service::{DescriptorLoader, SeedingSession, StatusCallback};
