//! Integration tests for notesync-fetch
//!
//! Uses wiremock to stand in for the Yandex Disk public API, Google Drive,
//! Google Docs and plain HTTP hosts, and drives `PublicLinkSource` through
//! the `IRemoteSource` port end to end.

mod common;

mod test_direct;
mod test_google;
mod test_yandex;
