use crate::{models::User, utils::AppResult};
use async_trait::async_trait;

/// Delivers the activation link to a freshly registered user.
#[async_trait]
pub trait ActivationNotifier: Send + Sync {
    async fn send_activation(&self, user: &User, activation_url: &str) -> AppResult<()>;
}

/// Writes the link to the log instead of mailing it.
pub struct LogActivationNotifier;

#[async_trait]
impl ActivationNotifier for LogActivationNotifier {
    async fn send_activation(&self, user: &User, activation_url: &str) -> AppResult<()> {
        log::info!("✉️  Activation link for {}: {}", user.email(), activation_url);
        Ok(())
    }
}

#[cfg(test)]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ActivationNotifier for RecordingNotifier {
        async fn send_activation(&self, user: &User, activation_url: &str) -> AppResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((user.email().to_string(), activation_url.to_string()));
            Ok(())
        }
    }
}
