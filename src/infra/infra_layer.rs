// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "drive/mod.rs"]
pub mod drive;

#[path = "session/mod.rs"]
pub mod session;

#[path = "identity/mod.rs"]
pub mod identity;

#[path = "gateway/mod.rs"]
pub mod gateway;
