// Form descriptions returned to the client, and the submitted payloads behind them.

use crate::{models::Gender, services::auth_service::Registration};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::{Validate, ValidationError, ValidationErrors};

pub const NOT_BLANK: &str = "This value should not be blank.";
pub const INVALID_EMAIL: &str = "This value is not a valid email address.";
pub const INVALID_CHOICE: &str = "The value you selected is not a valid choice.";
pub const EMAIL_TAKEN: &str = "This email is already registered.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Email,
    Password,
    Choice,
    Text,
    Textarea,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FormField {
    pub name: String,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl FormField {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            label: None,
            required: true,
            value: None,
            choices: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn value(mut self, value: Option<&str>) -> Self {
        self.value = value.filter(|v| !v.is_empty()).map(str::to_string);
        self
    }

    pub fn choice(mut self, value: &str, label: &str) -> Self {
        self.choices.push(Choice {
            value: value.to_string(),
            label: label.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SubmitButton {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct FormView {
    pub action: String,
    pub method: String,
    pub fields: Vec<FormField>,
    pub submit: SubmitButton,
}

impl FormView {
    pub fn post(action: &str, submit_label: &str) -> Self {
        Self {
            action: action.to_string(),
            method: "POST".to_string(),
            fields: Vec::new(),
            submit: SubmitButton {
                label: submit_label.to_string(),
                class: None,
            },
        }
    }

    pub fn submit_class(mut self, class: &str) -> Self {
        self.submit.class = Some(class.to_string());
        self
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field_named(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Attaches messages to the named fields; unknown names are ignored.
    pub fn with_errors(mut self, mut errors: HashMap<String, Vec<String>>) -> Self {
        for field in self.fields.iter_mut() {
            if let Some(messages) = errors.remove(&field.name) {
                field.errors.extend(messages);
            }
        }
        self
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

fn valid_gender(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || Gender::from_code(value).is_some() {
        return Ok(());
    }
    Err(ValidationError::new("choice"))
}

#[derive(Debug, Default, Deserialize, Validate, utoipa::ToSchema)]
pub struct RegistrationForm {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "This value should not be blank."),
        email(message = "This value is not a valid email address.")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "This value should not be blank."))]
    pub password: String,
    #[validate(custom(
        function = "valid_gender",
        message = "The value you selected is not a valid choice."
    ))]
    pub gender: Option<String>,
    pub source: Option<String>,
    pub reason: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl RegistrationForm {
    /// Only valid after `validate()` succeeded.
    pub fn into_registration(self) -> Registration {
        Registration {
            email: self.email.trim().to_string(),
            password: self.password,
            gender: self.gender.as_deref().and_then(Gender::from_code),
            source: non_empty(self.source),
            reason: non_empty(self.reason),
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct LoginForm {
    #[serde(rename = "_username", default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Flattens validator output into field name -> messages.
pub fn field_errors(errors: &ValidationErrors) -> HashMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let mut messages: Vec<String> = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            // A blank value is reported once, not also as malformed
            if messages.iter().any(|m| m == NOT_BLANK) {
                messages.retain(|m| m == NOT_BLANK);
            }
            (field.to_string(), messages)
        })
        .collect()
}

pub fn login_form(last_username: &str) -> FormView {
    FormView::post("/login_check", "Einloggen")
        .submit_class("btn btn-primary")
        .field(
            FormField::new("_username", FieldKind::Email)
                .label("Email")
                .value(Some(last_username)),
        )
        .field(FormField::new("password", FieldKind::Password).label("Passwort"))
}

pub fn registration_form(submitted: Option<&RegistrationForm>) -> FormView {
    let email = submitted.map(|s| s.email.as_str());
    let gender = submitted.and_then(|s| s.gender.as_deref());
    let source = submitted.and_then(|s| s.source.as_deref());
    let reason = submitted.and_then(|s| s.reason.as_deref());

    FormView::post("/registration", "Registrierung anfordern")
        .field(FormField::new("email", FieldKind::Email).value(email))
        .field(FormField::new("password", FieldKind::Password).label("Passwort"))
        .field(
            FormField::new("gender", FieldKind::Choice)
                .label("Geschlecht")
                .optional()
                .choice(Gender::Male.code(), "männlich")
                .choice(Gender::Female.code(), "weiblich")
                .value(gender),
        )
        .field(
            FormField::new("source", FieldKind::Text)
                .label("Wo hast du von uns erfahren?")
                .optional()
                .value(source),
        )
        .field(
            FormField::new("reason", FieldKind::Textarea)
                .label("Wieso möchtest du an der geschlossenen Beta teilnehmen?")
                .optional()
                .value(reason),
        )
}
