use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reader Accounts API",
        version = "1.0.0",
        description = "Registration, login and email activation for reader accounts.\n\n**Flow:** register → follow the activation link → log in via `/login_check`. Forms are described as JSON form views; failed submissions come back with per-field errors."
    ),
    paths(
        crate::api::auth::login,
        crate::api::auth::login_check,
        crate::api::auth::registration_form,
        crate::api::auth::registration,
        crate::api::auth::registration_success,
        crate::api::auth::activate_email,
        crate::api::health::health_check,
    ),
    components(
        schemas(
            crate::api::forms::FormView,
            crate::api::forms::FormField,
            crate::api::forms::FieldKind,
            crate::api::forms::Choice,
            crate::api::forms::SubmitButton,
            crate::api::forms::RegistrationForm,
            crate::api::forms::LoginForm,
            crate::api::auth::LoginPage,
            crate::api::auth::Principal,
            crate::api::auth::MessagePage,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Users", description = "Login form, credential check, registration and email activation."),
        (name = "Health", description = "Health check for monitoring service status."),
    )
)]
pub struct ApiDoc;
