//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are interfaces that the domain core depends on, but whose
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteSource`] - Public-link content retrieval (Yandex Disk, Google
//!   Drive/Docs, Dropbox, GitHub, plain HTTP)

pub mod remote_source;

pub use remote_source::{
    EntryOutcome, FolderEntry, IRemoteSource, ProgressCallback, RemoteFetch, SkipReason,
    StagedFile,
};
