// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "letters/mod.rs"]
pub mod letters;

#[path = "session/mod.rs"]
pub mod session;

#[path = "identity/identity_verifier.rs"]
pub mod identity;
