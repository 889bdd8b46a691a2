// Shared state handed to every gateway handler.

use std::sync::Arc;

use crate::core::identity::IdentityVerifier;
use crate::core::letters::{DriveBackend, LetterService};

pub type SharedLetterService = LetterService<Arc<dyn DriveBackend>>;

#[derive(Clone)]
pub struct AppState {
    pub letters: Arc<SharedLetterService>,
    /// `None` leaves identity tokens unchecked.
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    pub fn new(drive: Arc<dyn DriveBackend>, verifier: Option<Arc<dyn IdentityVerifier>>) -> Self {
        Self {
            letters: Arc::new(LetterService::new(drive)),
            verifier,
        }
    }
}
