use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const USERS_COLLECTION: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        let db = client.database(&database_name(uri));

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the users collection relies on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(USERS_COLLECTION);

        // Unique: users(email) - one account per address
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        // A failed unique index means duplicates already exist; refuse to start
        users.create_index(email_index).await?;
        log::info!("   ✅ Index ready: users(email) unique");

        // users(activationHash) - activation link lookup
        let activation_index = IndexModel::builder()
            .keys(doc! { "activationHash": 1 })
            .build();

        match users.create_index(activation_index).await {
            Ok(_) => log::info!("   ✅ Index ready: users(activationHash)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Check if the connection is healthy
    pub async fn health_check(&self) -> bool {
        self.db.list_collection_names().await.is_ok()
    }
}

/// Database name from the URI path, falling back to `reader_accounts`.
fn database_name(uri: &str) -> String {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, path)| path.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("reader_accounts")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_comes_from_uri_path() {
        assert_eq!(database_name("mongodb://localhost:27017/readers"), "readers");
        assert_eq!(
            database_name("mongodb+srv://u:p@cluster.example/readers?retryWrites=true"),
            "readers"
        );
    }

    #[test]
    fn database_name_defaults_without_path() {
        assert_eq!(database_name("mongodb://localhost:27017"), "reader_accounts");
        assert_eq!(database_name("mongodb://localhost:27017/"), "reader_accounts");
        assert_eq!(database_name("mongodb://localhost:27017/?w=majority"), "reader_accounts");
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/reader_accounts_test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await);
    }
}
