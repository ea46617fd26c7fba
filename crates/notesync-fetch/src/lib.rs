//! NoteSync Fetch - public-link content retrieval
//!
//! Implements the [`IRemoteSource`](notesync_core::ports::IRemoteSource) port for:
//! - Yandex Disk public resources (single files and folder trees)
//! - Google Docs/Sheets/Slides PDF export and Google Drive file links
//! - Dropbox, GitHub blob, and plain HTTP(S) downloads
//!
//! ## Modules
//!
//! - [`resolver`] - Classifies a source URL into a provider-specific descriptor
//! - [`transport`] - Shared HTTP GET primitive (timeout, user agent, cancellation)
//! - [`staging`] - Temp-file staging and HTML response detection
//! - [`policy`] - Skip rules for folder entries (video, size)
//! - [`yandex`] - Yandex Disk public API client
//! - [`google`] - Google Drive / Docs client
//! - [`provider`] - `PublicLinkSource`, the port implementation

pub mod google;
pub mod policy;
pub mod provider;
pub mod resolver;
pub mod staging;
pub mod transport;
pub mod yandex;

pub use provider::PublicLinkSource;
pub use resolver::{resolve_source, ResolvedSource, ResourceDescriptor};
pub use transport::{HttpResponse, HttpTransport};
