pub mod auth;
pub mod forms;
pub mod health;
pub mod swagger;

use crate::utils::AppError;
use actix_web::web;

/// Routes for the account pages.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(16 * 1024)
        .error_handler(|err, _req| AppError::InvalidRequest(err.to_string()).into());

    cfg.app_data(json_config)
        .route("/health", web::get().to(health::health_check))
        .route("/login", web::get().to(auth::login))
        .route("/login", web::post().to(auth::login))
        .route("/login_check", web::post().to(auth::login_check))
        .route("/registration", web::get().to(auth::registration_form))
        .route("/registration", web::post().to(auth::registration))
        // Older links still point here
        .route("/register", web::get().to(auth::registration_form))
        .route("/register", web::post().to(auth::registration))
        .route("/registrationSuccess", web::get().to(auth::registration_success))
        .route("/activation/{hash}", web::get().to(auth::activate_email));
}
