// ==================== USER PERSISTENCE ====================
// Leitura e gravação de documentos de usuário

use crate::{
    database::{MongoDB, USERS_COLLECTION},
    models::User,
    utils::{AppError, AppResult},
};
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Collection;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_one_by_activation_hash(&self, hash: &str) -> AppResult<Option<User>>;

    /// Inserts a new record (assigning its id) or replaces the stored one.
    async fn save(&self, user: &mut User) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &MongoDB) -> Self {
        Self {
            collection: db.collection::<User>(USERS_COLLECTION),
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_one_by_activation_hash(&self, hash: &str) -> AppResult<Option<User>> {
        Ok(self
            .collection
            .find_one(doc! { "activationHash": hash })
            .await?)
    }

    async fn save(&self, user: &mut User) -> AppResult<()> {
        match user.id() {
            Some(id) => {
                let result = self
                    .collection
                    .replace_one(doc! { "_id": id }, &*user)
                    .await?;
                if result.matched_count == 0 {
                    return Err(AppError::NotFound(format!("user {}", id.to_hex())));
                }
            }
            None => {
                let result = self.collection.insert_one(&*user).await?;
                let id = result.inserted_id.as_object_id().ok_or_else(|| {
                    AppError::DatabaseError("inserted id is not an ObjectId".to_string())
                })?;
                user.set_id(Some(id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::sync::Mutex;

    /// Keeps users in a vector; enforces the unique email the same way the index does.
    #[derive(Default)]
    pub struct InMemoryUserRepository {
        users: Mutex<Vec<User>>,
    }

    impl InMemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn all(&self) -> Vec<User> {
            self.users.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn find_by_id(&self, id: ObjectId) -> AppResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id() == Some(id)).cloned())
        }

        async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email() == email).cloned())
        }

        async fn find_one_by_activation_hash(&self, hash: &str) -> AppResult<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.activation_hash() == hash).cloned())
        }

        async fn save(&self, user: &mut User) -> AppResult<()> {
            let mut users = self.users.lock().unwrap();
            if users
                .iter()
                .any(|u| u.email() == user.email() && u.id() != user.id())
            {
                return Err(AppError::Conflict(format!(
                    "E11000 duplicate key error: email {}",
                    user.email()
                )));
            }

            match user.id() {
                Some(id) => {
                    let slot = users
                        .iter_mut()
                        .find(|u| u.id() == Some(id))
                        .ok_or_else(|| AppError::NotFound(format!("user {}", id.to_hex())))?;
                    *slot = user.clone();
                }
                None => {
                    user.set_id(Some(ObjectId::new()));
                    users.push(user.clone());
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryUserRepository;
    use super::*;

    #[tokio::test]
    async fn save_assigns_id_then_replaces() {
        let repo = InMemoryUserRepository::new();
        let mut user = User::new();
        user.set_email("a@b.com");
        repo.save(&mut user).await.unwrap();
        let id = user.id().expect("id assigned on insert");

        user.set_status(1);
        repo.save(&mut user).await.unwrap();

        let stored = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), 1);
        assert_eq!(repo.all().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        let mut first = User::new();
        first.set_email("a@b.com");
        repo.save(&mut first).await.unwrap();

        let mut second = User::new();
        second.set_email("a@b.com");
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
