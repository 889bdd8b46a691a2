// Implementations of the client token store.

pub mod in_memory;
pub mod sqlite_token_store;

pub use in_memory::InMemoryTokenStore;
pub use sqlite_token_store::SqliteTokenStore;
