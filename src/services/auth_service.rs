use crate::{
    models::{Gender, User, ROLE_USER, STATUS_PENDING},
    security::{check_account_state, AuthenticationError, CredentialHolder, PasswordEncoder},
    services::user_repository::UserRepository,
    utils::{AppError, AppResult},
};
use uuid::Uuid;

pub const INVALID_ACTIVATION: &str = "Invalid or expired activation link";

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub gender: Option<Gender>,
    pub source: Option<String>,
    pub reason: Option<String>,
}

pub fn generate_activation_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

// User registration
pub async fn register(
    users: &dyn UserRepository,
    encoder: &dyn PasswordEncoder,
    registration: Registration,
) -> AppResult<User> {
    let mut user = User::new();
    user.set_roles(ROLE_USER);
    user.set_status(STATUS_PENDING);
    user.set_email(registration.email);
    user.set_gender(registration.gender);
    user.set_source(registration.source);
    user.set_reason(registration.reason);
    user.set_activation_hash(generate_activation_hash());
    user.set_password(encoder.encode_password(&registration.password)?);

    user.touch_created();

    // The unique email index rejects duplicates; save reports them as Conflict
    users.save(&mut user).await?;

    log::info!("✅ User registered (pending activation): {}", user.email());

    Ok(user)
}

// Email activation
pub async fn activate(users: &dyn UserRepository, hash: &str) -> AppResult<User> {
    // An activated account stores an empty hash; never let "" match it
    if hash.trim().is_empty() {
        return Err(AppError::NotFound(INVALID_ACTIVATION.to_string()));
    }

    let mut user = users
        .find_one_by_activation_hash(hash)
        .await?
        .ok_or_else(|| AppError::NotFound(INVALID_ACTIVATION.to_string()))?;

    user.activate();
    users.save(&mut user).await?;

    log::info!("✅ User activated: {}", user.email());

    Ok(user)
}

// Credential check behind /login_check
pub async fn check_credentials(
    users: &dyn UserRepository,
    encoder: &dyn PasswordEncoder,
    username: &str,
    password: &str,
) -> AppResult<User> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(AuthenticationError::BadCredentials.into());
    }

    let mut user = users
        .find_by_email(username.trim())
        .await?
        .ok_or(AuthenticationError::BadCredentials)?;

    if !encoder.is_password_valid(user.encoded_password(), password) {
        return Err(AuthenticationError::BadCredentials.into());
    }

    check_account_state(&user)?;
    user.erase_credentials();

    Ok(user)
}

/// Reloads the user behind a session principal. `None` when the account is gone
/// or its credentials changed since the session was opened.
pub async fn refresh_user(
    users: &dyn UserRepository,
    principal: &User,
) -> AppResult<Option<User>> {
    let id = match principal.id() {
        Some(id) => id,
        None => return Ok(None),
    };

    let user = match users.find_by_id(id).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    if user.password() != principal.password() || user.email() != principal.email() {
        log::info!("🔒 Session for {} invalidated: credentials changed", principal.email());
        return Ok(None);
    }

    Ok(Some(user))
}
