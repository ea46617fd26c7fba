//! NoteSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `SyncTarget`, `SyncedFileItem`, `DownloadOptions`, `FolderProgress`
//! - **Port definitions** - `IRemoteSource`, implemented by the fetch adapter
//! - **Catalog** - the persisted, tree-shaped list of sync targets
//! - **Configuration** - the YAML application settings
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement; the sync
//! crate drives them and owns every mutation of the local store.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod ports;
