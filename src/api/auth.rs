use crate::api::forms::{self, FormView, LoginForm, RegistrationForm, EMAIL_TAKEN};
use crate::models::User;
use crate::security::{session_cookie, session_id, AuthenticationUtils, UserIdentity};
use crate::services::auth_service;
use crate::state::AppState;
use crate::utils::{AppError, AppResult};
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Serialize;
use std::collections::HashMap;
use validator::Validate;

pub const LOGIN_PATH: &str = "/login";
pub const LOGIN_SUCCESS_PATH: &str = "/";
pub const REGISTRATION_SUCCESS_PATH: &str = "/registrationSuccess";

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginPage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Who the session already belongs to, if anyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated_as: Option<Principal>,
    pub form: FormView,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessagePage {
    pub success: bool,
    pub message: String,
}

fn see_other(location: &str) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location.to_string()));
    builder
}

#[utoipa::path(
    get,
    path = "/login",
    tag = "Users",
    responses(
        (status = 200, description = "Login form with the last error and username", body = LoginPage)
    )
)]
pub async fn login(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    log::info!("🔐 {} /login", req.method());

    let utils = AuthenticationUtils::from_request(state.sessions, &req);
    let error = utils.last_authentication_error(true);
    let last_username = utils.last_username();

    let authenticated_as = match session_id(&req) {
        Some(sid) => current_user(&state, &sid).await?.map(|u| Principal {
            username: u.username().to_string(),
            roles: u.role_names().to_vec(),
        }),
        None => None,
    };

    Ok(HttpResponse::Ok().json(LoginPage {
        error: error.map(|e| e.to_string()),
        authenticated_as,
        form: forms::login_form(&last_username),
    }))
}

async fn current_user(state: &AppState, sid: &str) -> AppResult<Option<User>> {
    let principal: User = match state.sessions.principal(sid) {
        Ok(Some(principal)) => principal,
        Ok(None) => return Ok(None),
        Err(e) => {
            log::warn!("⚠️  Discarding unreadable session state: {}", e);
            return Ok(None);
        }
    };
    auth_service::refresh_user(state.users.as_ref(), &principal).await
}

#[utoipa::path(
    post,
    path = "/login_check",
    tag = "Users",
    request_body = LoginForm,
    responses(
        (status = 303, description = "Redirect to / on success, back to /login on failure")
    )
)]
pub async fn login_check(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Json<LoginForm>,
) -> AppResult<HttpResponse> {
    log::info!("🔐 POST /login_check - email: {}", form.username);

    let presented = session_id(&req).filter(|sid| state.sessions.contains(sid));

    let result = auth_service::check_credentials(
        state.users.as_ref(),
        state.encoder.as_ref(),
        &form.username,
        &form.password,
    )
    .await;

    match result {
        Ok(user) => {
            // A logged-in session never keeps an id the client already knew
            let sid = state.sessions.renew(presented.as_deref());
            state.sessions.authenticate(&sid, &user)?;
            log::info!("✅ Login successful: {}", user.username());
            Ok(see_other(LOGIN_SUCCESS_PATH).cookie(session_cookie(&sid)).finish())
        }
        Err(AppError::Authentication(e)) => {
            log::warn!("❌ Login failed: {} - {}", form.username, e);
            let sid = presented.unwrap_or_else(|| state.sessions.start());
            state.sessions.record_failure(&sid, e, form.username.trim());
            Ok(see_other(LOGIN_PATH).cookie(session_cookie(&sid)).finish())
        }
        Err(e) => Err(e),
    }
}

#[utoipa::path(
    get,
    path = "/registration",
    tag = "Users",
    responses(
        (status = 200, description = "Empty registration form", body = FormView)
    )
)]
pub async fn registration_form() -> HttpResponse {
    HttpResponse::Ok().json(forms::registration_form(None))
}

#[utoipa::path(
    post,
    path = "/registration",
    tag = "Users",
    request_body = RegistrationForm,
    responses(
        (status = 303, description = "Registered; redirect to /registrationSuccess"),
        (status = 400, description = "Form re-rendered with field errors", body = FormView)
    )
)]
pub async fn registration(
    state: web::Data<AppState>,
    form: web::Json<RegistrationForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    log::info!("📝 POST /registration - email: {}", form.email);

    if let Err(errors) = form.validate() {
        log::info!("📝 Registration form invalid: {}", errors);
        let view = forms::registration_form(Some(&form)).with_errors(forms::field_errors(&errors));
        return Ok(HttpResponse::BadRequest().json(view));
    }

    let echo = forms::registration_form(Some(&form));
    let result = auth_service::register(
        state.users.as_ref(),
        state.encoder.as_ref(),
        form.into_registration(),
    )
    .await;

    let user = match result {
        Ok(user) => user,
        Err(AppError::Conflict(e)) => {
            log::warn!("❌ Registration rejected: {}", e);
            let mut errors = HashMap::new();
            errors.insert("email".to_string(), vec![EMAIL_TAKEN.to_string()]);
            return Ok(HttpResponse::BadRequest().json(echo.with_errors(errors)));
        }
        Err(e) => return Err(e),
    };

    let url = state.activation_url(user.activation_hash());
    if let Err(e) = state.notifier.send_activation(&user, &url).await {
        log::warn!("⚠️  Failed to send activation link to {}: {}", user.email(), e);
    }

    Ok(see_other(REGISTRATION_SUCCESS_PATH).finish())
}

#[utoipa::path(
    get,
    path = "/registrationSuccess",
    tag = "Users",
    responses(
        (status = 200, description = "Registration confirmation", body = MessagePage)
    )
)]
pub async fn registration_success() -> HttpResponse {
    HttpResponse::Ok().json(MessagePage {
        success: true,
        message: "Registration received. Check your inbox for the activation link.".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/activation/{hash}",
    tag = "Users",
    params(
        ("hash" = String, Path, description = "Activation token from the registration email")
    ),
    responses(
        (status = 200, description = "Account activated", body = MessagePage),
        (status = 404, description = "Invalid or expired activation link")
    )
)]
pub async fn activate_email(
    state: web::Data<AppState>,
    hash: web::Path<String>,
) -> AppResult<HttpResponse> {
    log::info!("✉️  GET /activation/{}", hash);

    let user = auth_service::activate(state.users.as_ref(), &hash).await?;

    Ok(HttpResponse::Ok().json(MessagePage {
        success: true,
        message: format!("Account {} activated.", user.email()),
    }))
}
