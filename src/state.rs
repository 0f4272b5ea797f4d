use crate::security::{PasswordEncoder, SessionStore};
use crate::services::{notifier::ActivationNotifier, user_repository::UserRepository};
use std::sync::Arc;

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub encoder: Arc<dyn PasswordEncoder>,
    pub notifier: Arc<dyn ActivationNotifier>,
    pub sessions: &'static SessionStore,
    pub public_base_url: String,
}

impl AppState {
    pub fn activation_url(&self, hash: &str) -> String {
        format!("{}/activation/{}", self.public_base_url, hash)
    }
}
