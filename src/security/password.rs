use crate::utils::AppResult;

/// Turns plaintext passwords into stored credentials and checks them back.
pub trait PasswordEncoder: Send + Sync {
    fn encode_password(&self, raw: &str) -> AppResult<String>;
    fn is_password_valid(&self, encoded: &str, raw: &str) -> bool;
}

pub struct BcryptPasswordEncoder {
    cost: u32,
}

impl BcryptPasswordEncoder {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordEncoder {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordEncoder for BcryptPasswordEncoder {
    fn encode_password(&self, raw: &str) -> AppResult<String> {
        Ok(bcrypt::hash(raw, self.cost)?)
    }

    fn is_password_valid(&self, encoded: &str, raw: &str) -> bool {
        match bcrypt::verify(raw, encoded) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("⚠️  Password verification error: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> BcryptPasswordEncoder {
        BcryptPasswordEncoder::new(4)
    }

    #[test]
    fn encoded_password_is_not_plaintext() {
        let encoded = encoder().encode_password("secret").unwrap();
        assert_ne!(encoded, "secret");
        assert!(encoded.starts_with("$2"));
    }

    #[test]
    fn verifies_matching_password_only() {
        let enc = encoder();
        let encoded = enc.encode_password("secret").unwrap();
        assert!(enc.is_password_valid(&encoded, "secret"));
        assert!(!enc.is_password_valid(&encoded, "Secret"));
    }

    #[test]
    fn garbage_hash_never_validates() {
        assert!(!encoder().is_password_valid("not-a-hash", "secret"));
        assert!(!encoder().is_password_valid("", ""));
    }
}
