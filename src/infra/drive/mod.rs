// Drive backends.
// The Google client talks to the real Drive REST API; the in-memory backend
// stands in for it during local development and in tests.

pub mod google_drive_client;
pub mod in_memory;

pub use google_drive_client::{GoogleDriveClient, DEFAULT_DRIVE_API_BASE};
pub use in_memory::InMemoryDriveBackend;
