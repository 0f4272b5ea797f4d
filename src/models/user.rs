use crate::security::{AccountState, CredentialHolder, SessionSerializable, UserIdentity};
use crate::utils::{AppError, AppResult};
use chrono::Utc;
use mongodb::bson::{oid::ObjectId, Bson, Document};
use serde::{Deserialize, Serialize};

pub const ROLE_USER: &str = "ROLE_USER";

pub const STATUS_PENDING: i32 = 0;
pub const STATUS_ACTIVE: i32 = 1;

pub const META_CREATED: &str = "created";
pub const META_UPDATED: &str = "updated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl Gender {
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(Gender::Male),
            "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Role labels. Never empty; a bare string in the stored document reads back as
/// a one-element list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RolesRepr", into = "Vec<String>")]
pub struct Roles(Vec<String>);

/// Stored shape of `roles`: legacy documents hold a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum RolesRepr {
    One(String),
    Many(Vec<String>),
}

impl Roles {
    pub fn new(roles: Vec<String>) -> Self {
        let roles: Vec<String> = roles
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        if roles.is_empty() {
            Self::default()
        } else {
            Self(roles)
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.iter().any(|r| r == role)
    }
}

impl Default for Roles {
    fn default() -> Self {
        Self(vec![ROLE_USER.to_string()])
    }
}

impl From<RolesRepr> for Roles {
    fn from(repr: RolesRepr) -> Self {
        match repr {
            RolesRepr::One(role) => Roles::new(vec![role]),
            RolesRepr::Many(roles) => Roles::new(roles),
        }
    }
}

impl From<Roles> for Vec<String> {
    fn from(roles: Roles) -> Self {
        roles.0
    }
}

impl From<&str> for Roles {
    fn from(role: &str) -> Self {
        Roles::new(vec![role.to_string()])
    }
}

impl From<String> for Roles {
    fn from(role: String) -> Self {
        Roles::new(vec![role])
    }
}

impl From<Vec<String>> for Roles {
    fn from(roles: Vec<String>) -> Self {
        Roles::new(roles)
    }
}

impl From<Vec<&str>> for Roles {
    fn from(roles: Vec<&str>) -> Self {
        Roles::new(roles.into_iter().map(str::to_string).collect())
    }
}

/// A reader's account, stored in the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    roles: Roles,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    licensee_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_textnode: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(default)]
    status: i32,
    #[serde(default)]
    activation_hash: String,
    #[serde(default)]
    metadata: Document,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_topic_id: Option<ObjectId>,
}

impl User {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn set_id(&mut self, id: Option<ObjectId>) {
        self.id = id;
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn set_roles(&mut self, roles: impl Into<Roles>) {
        self.roles = roles.into();
    }

    pub fn licensee_id(&self) -> Option<ObjectId> {
        self.licensee_id
    }

    pub fn set_licensee_id(&mut self, id: Option<ObjectId>) {
        self.licensee_id = id;
    }

    /// Textnode the reader is currently on, if any.
    pub fn current_textnode(&self) -> Option<ObjectId> {
        self.current_textnode
    }

    pub fn set_current_textnode(&mut self, textnode_id: Option<ObjectId>) {
        self.current_textnode = textnode_id;
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn set_gender(&mut self, gender: Option<Gender>) {
        self.gender = gender;
    }

    /// Where the user heard about the site.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    /// Why the user asked to register.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn set_reason(&mut self, reason: Option<String>) {
        self.reason = reason;
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    pub fn set_status(&mut self, status: i32) {
        self.status = status;
    }

    pub fn activation_hash(&self) -> &str {
        &self.activation_hash
    }

    pub fn set_activation_hash(&mut self, hash: impl Into<String>) {
        self.activation_hash = hash.into();
    }

    pub fn last_topic_id(&self) -> Option<ObjectId> {
        self.last_topic_id
    }

    pub fn set_last_topic_id(&mut self, topic_id: Option<ObjectId>) {
        self.last_topic_id = topic_id;
    }

    pub fn metadata(&self) -> &Document {
        &self.metadata
    }

    /// Replaces the whole metadata bag.
    pub fn set_metadata(&mut self, metadata: Document) {
        self.metadata = metadata;
    }

    /// Sets a single metadata entry, keeping the others.
    pub fn set_metadata_entry(&mut self, key: impl Into<String>, value: impl Into<Bson>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Replaces the metadata bag from an untyped value; only a document is accepted.
    pub fn set_metadata_from_bson(&mut self, value: Bson) -> AppResult<()> {
        match value {
            Bson::Document(doc) => {
                self.metadata = doc;
                Ok(())
            }
            other => Err(AppError::InvalidArgument(format!(
                "metadata must be a document, got {:?}",
                other.element_type()
            ))),
        }
    }

    /// Stamps `created` and `updated` with the same instant.
    pub fn touch_created(&mut self) {
        let now = Utc::now().timestamp();
        self.set_metadata_entry(META_CREATED, now);
        self.set_metadata_entry(META_UPDATED, now);
    }

    pub fn touch_updated(&mut self) {
        self.set_metadata_entry(META_UPDATED, Utc::now().timestamp());
    }

    /// Consumes the activation token and enables the account.
    pub fn activate(&mut self) {
        self.activation_hash.clear();
        self.status = STATUS_ACTIVE;
        self.touch_updated();
    }
}

impl UserIdentity for User {
    fn username(&self) -> &str {
        &self.email
    }

    fn role_names(&self) -> &[String] {
        self.roles.as_slice()
    }
}

impl CredentialHolder for User {
    fn encoded_password(&self) -> &str {
        &self.password
    }
}

impl AccountState for User {
    fn is_enabled(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

#[derive(Serialize, Deserialize)]
struct SessionTuple(Option<String>, String, String, Option<String>);

fn parse_object_id(raw: Option<String>) -> AppResult<Option<ObjectId>> {
    raw.map(|hex| {
        ObjectId::parse_str(&hex)
            .map_err(|e| AppError::InvalidArgument(format!("invalid object id '{}': {}", hex, e)))
    })
    .transpose()
}

impl SessionSerializable for User {
    /// `[id, email, password, currentTextnode]`
    fn serialize_session(&self) -> AppResult<String> {
        let tuple = SessionTuple(
            self.id.map(|id| id.to_hex()),
            self.email.clone(),
            self.password.clone(),
            self.current_textnode.map(|id| id.to_hex()),
        );
        serde_json::to_string(&tuple)
            .map_err(|e| AppError::Internal(format!("session serialization failed: {}", e)))
    }

    fn deserialize_session(serialized: &str) -> AppResult<Self> {
        let SessionTuple(id, email, password, current_textnode) = serde_json::from_str(serialized)
            .map_err(|e| AppError::InvalidArgument(format!("malformed session state: {}", e)))?;

        let mut user = User::new();
        user.set_id(parse_object_id(id)?);
        user.set_email(email);
        user.set_password(password);
        user.set_current_textnode(parse_object_id(current_textnode)?);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn username_is_email() {
        let mut user = User::new();
        user.set_email("a@b.com");
        assert_eq!(user.username(), "a@b.com");
    }

    #[test]
    fn enabled_only_for_active_status() {
        let mut user = User::new();
        for (status, expected) in [(0, false), (1, true), (2, false), (-1, false)] {
            user.set_status(status);
            assert_eq!(user.is_enabled(), expected, "status {}", status);
        }
    }

    #[test]
    fn account_state_predicates_report_healthy() {
        let user = User::new();
        assert!(user.is_account_non_expired());
        assert!(user.is_account_non_locked());
        assert!(user.is_credentials_non_expired());
        assert_eq!(user.salt(), None);
    }

    #[test]
    fn erase_credentials_keeps_the_hash() {
        let mut user = User::new();
        user.set_password("$2b$04$hash");
        user.erase_credentials();
        assert_eq!(user.password(), "$2b$04$hash");
    }

    #[test]
    fn single_role_is_wrapped_in_a_list() {
        let mut user = User::new();
        user.set_roles("ROLE_ADMIN");
        assert_eq!(user.roles().as_slice(), &["ROLE_ADMIN".to_string()]);

        user.set_roles(vec!["ROLE_USER", "ROLE_ADMIN"]);
        assert_eq!(user.roles().as_slice().len(), 2);
    }

    #[test]
    fn empty_roles_fall_back_to_default() {
        let mut user = User::new();
        user.set_roles(Vec::<String>::new());
        assert!(user.roles().contains(ROLE_USER));
    }

    #[test]
    fn scalar_roles_in_stored_document_are_normalised() {
        let stored = doc! { "email": "a@b.com", "roles": "ROLE_ADMIN", "status": 1 };
        let user: User = mongodb::bson::from_document(stored).unwrap();
        assert_eq!(user.roles().as_slice(), &["ROLE_ADMIN".to_string()]);
        assert!(user.is_enabled());
    }

    #[test]
    fn metadata_entry_keeps_existing_keys() {
        let mut user = User::new();
        user.set_metadata_entry("created", 10_i64);
        user.set_metadata_entry("k", "v");
        assert_eq!(user.metadata().get_str("k").unwrap(), "v");
        assert_eq!(user.metadata().get_i64("created").unwrap(), 10);
    }

    #[test]
    fn set_metadata_replaces_everything() {
        let mut user = User::new();
        user.set_metadata_entry("old", "x");
        user.set_metadata(doc! { "new": "y" });
        assert!(user.metadata().get("old").is_none());
        assert_eq!(user.metadata().get_str("new").unwrap(), "y");
    }

    #[test]
    fn metadata_from_non_document_is_rejected() {
        let mut user = User::new();
        user.set_metadata_entry("keep", 1_i32);
        let err = user.set_metadata_from_bson(Bson::String("v".into())).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert!(user.metadata().contains_key("keep"));

        user.set_metadata_from_bson(Bson::Document(doc! { "a": 1 })).unwrap();
        assert!(!user.metadata().contains_key("keep"));
    }

    #[test]
    fn session_round_trip_keeps_only_the_tuple() {
        let mut user = User::new();
        user.set_id(Some(ObjectId::new()));
        user.set_email("a@b.com");
        user.set_password("$2b$04$hash");
        user.set_current_textnode(Some(ObjectId::new()));
        user.set_status(STATUS_ACTIVE);
        user.set_source(Some("friends".into()));

        let restored = User::deserialize_session(&user.serialize_session().unwrap()).unwrap();
        assert_eq!(restored.id(), user.id());
        assert_eq!(restored.email(), user.email());
        assert_eq!(restored.password(), user.password());
        assert_eq!(restored.current_textnode(), user.current_textnode());
        assert_eq!(restored.status(), STATUS_PENDING);
        assert_eq!(restored.source(), None);
    }

    #[test]
    fn session_tuple_is_a_four_element_array() {
        let mut user = User::new();
        user.set_email("a@b.com");
        user.set_password("h");
        assert_eq!(user.serialize_session().unwrap(), r#"[null,"a@b.com","h",null]"#);
    }

    #[test]
    fn malformed_session_is_invalid_argument() {
        assert!(matches!(
            User::deserialize_session("{\"id\":1}"),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            User::deserialize_session(r#"["zz","a@b.com","h",null]"#),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn activate_clears_token_and_enables() {
        let mut user = User::new();
        user.set_activation_hash("abc");
        user.activate();
        assert_eq!(user.activation_hash(), "");
        assert!(user.is_enabled());
        assert!(user.metadata().contains_key(META_UPDATED));
    }

    #[test]
    fn touch_created_stamps_both_timestamps() {
        let mut user = User::new();
        user.touch_created();
        let created = user.metadata().get_i64(META_CREATED).unwrap();
        assert_eq!(user.metadata().get_i64(META_UPDATED).unwrap(), created);
        assert!(created > 0);
    }

    #[test]
    fn stored_field_names_are_camel_case() {
        let mut user = User::new();
        user.set_activation_hash("abc");
        user.set_last_topic_id(Some(ObjectId::new()));
        let doc = mongodb::bson::to_document(&user).unwrap();
        assert!(doc.contains_key("activationHash"));
        assert!(doc.contains_key("lastTopicId"));
        assert!(!doc.contains_key("_id"));
        assert_eq!(doc.get_array("roles").unwrap().len(), 1);
    }
}
