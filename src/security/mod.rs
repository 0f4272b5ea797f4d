// Capability set implemented by anything that can log in.
pub mod password;
pub mod session;

use crate::utils::AppResult;
use std::fmt;

pub use password::*;
pub use session::*;

/// Identity lookup: the name a principal logs in with and its role labels.
pub trait UserIdentity {
    fn username(&self) -> &str;
    fn role_names(&self) -> &[String];
}

/// Holder of an encoded credential.
pub trait CredentialHolder {
    fn encoded_password(&self) -> &str;

    /// bcrypt embeds its own salt
    fn salt(&self) -> Option<&str> {
        None
    }

    /// Drops any plaintext secret held after authentication.
    fn erase_credentials(&mut self) {}
}

/// Account state predicates consulted before a login is accepted.
pub trait AccountState {
    fn is_account_non_expired(&self) -> bool {
        true
    }

    fn is_account_non_locked(&self) -> bool {
        true
    }

    fn is_credentials_non_expired(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool;
}

/// Compact state kept in the session between requests.
pub trait SessionSerializable: Sized {
    fn serialize_session(&self) -> AppResult<String>;
    fn deserialize_session(serialized: &str) -> AppResult<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationError {
    BadCredentials,
    AccountLocked,
    AccountDisabled,
    AccountExpired,
    CredentialsExpired,
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AuthenticationError::BadCredentials => "Bad credentials.",
            AuthenticationError::AccountLocked => "Account is locked.",
            AuthenticationError::AccountDisabled => "Account is disabled.",
            AuthenticationError::AccountExpired => "Account has expired.",
            AuthenticationError::CredentialsExpired => "Credentials have expired.",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for AuthenticationError {}

/// Runs the account state predicates in the order a login checks them.
pub fn check_account_state<U: AccountState>(user: &U) -> Result<(), AuthenticationError> {
    if !user.is_account_non_locked() {
        return Err(AuthenticationError::AccountLocked);
    }
    if !user.is_enabled() {
        return Err(AuthenticationError::AccountDisabled);
    }
    if !user.is_account_non_expired() {
        return Err(AuthenticationError::AccountExpired);
    }
    if !user.is_credentials_non_expired() {
        return Err(AuthenticationError::CredentialsExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeAccount {
        enabled: bool,
        locked: bool,
    }

    impl AccountState for FakeAccount {
        fn is_account_non_locked(&self) -> bool {
            !self.locked
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[test]
    fn disabled_account_is_rejected() {
        let account = FakeAccount { enabled: false, locked: false };
        assert_eq!(check_account_state(&account), Err(AuthenticationError::AccountDisabled));
    }

    #[test]
    fn lock_is_checked_before_enabled() {
        let account = FakeAccount { enabled: false, locked: true };
        assert_eq!(check_account_state(&account), Err(AuthenticationError::AccountLocked));
    }

    #[test]
    fn healthy_account_passes() {
        let account = FakeAccount { enabled: true, locked: false };
        assert!(check_account_state(&account).is_ok());
    }
}
