use crate::error::StoreError;
use crate::models::{ImageRecord, NewImage, NewUser, UpdatePatch, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Repository Trait
///
/// The persistence contract for users and images. Handlers and flows only ever talk to
/// `Arc<dyn Repository>`, so the Postgres store and the in-memory store are
/// interchangeable.
///
/// Every method returns `StoreError` on collaborator failure; "not found" is expressed
/// through `Option` or a zero count, never through an error.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    // Exact match on both columns.
    async fn find_user_by_credentials(
        &self,
        username: &str,
        password_digest: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, user: NewUser) -> Result<Uuid, StoreError>;

    // --- Images ---
    async fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError>;
    async fn find_image(&self, id: Uuid) -> Result<Option<ImageRecord>, StoreError>;
    async fn insert_image(&self, image: NewImage) -> Result<Uuid, StoreError>;
    /// Applies every field of `patch` in one write. Returns the number of records the
    /// write matched: 0 means the id does not exist and nothing was created.
    async fn apply_patch(&self, id: Uuid, patch: &UpdatePatch) -> Result<u64, StoreError>;
    async fn delete_image(&self, id: Uuid) -> Result<u64, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_digest, role FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_credentials(
        &self,
        username: &str,
        password_digest: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, username, password_digest, role
               FROM users
               WHERE username = $1 AND password_digest = $2"#,
        )
        .bind(username)
        .bind(password_digest)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// insert_user
    ///
    /// The table carries a UNIQUE constraint on `username`, which closes the
    /// check-then-insert window left open by the registration flow. A violation comes
    /// back as `StoreError::Conflict("username")`.
    async fn insert_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let result = sqlx::query(
            "INSERT INTO users (id, username, password_digest, role) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&user.username)
        .bind(&user.password_digest)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(id),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Conflict("username"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let images = sqlx::query_as::<_, ImageRecord>(
            "SELECT id, title, description, media_ref FROM images ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<ImageRecord>, StoreError> {
        let image = sqlx::query_as::<_, ImageRecord>(
            "SELECT id, title, description, media_ref FROM images WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(image)
    }

    async fn insert_image(&self, image: NewImage) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO images (id, title, description, media_ref) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(&image.title)
        .bind(&image.description)
        .bind(&image.media_ref)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// apply_patch
    ///
    /// One UPDATE statement, so either every patched column lands or none does.
    /// `COALESCE` keeps the stored value for fields the patch leaves as `None`. An empty
    /// patch still matches the row, which is how a no-op edit is told apart from a
    /// missing record.
    async fn apply_patch(&self, id: Uuid, patch: &UpdatePatch) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE images
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                media_ref = COALESCE($4, media_ref)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.media_ref)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_image(&self, id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// --- In-Memory Implementation ---

#[derive(Default)]
struct MemoryData {
    users: Vec<User>,
    images: Vec<ImageRecord>,
}

/// MemoryRepository
///
/// A document-store style implementation held in process memory. It behaves like a
/// store without secondary indexes: `insert_user` does not reject duplicate usernames,
/// so uniqueness rests entirely on the registration flow's lookup.
///
/// Used by the test suites and for running the service without a database.
#[derive(Default)]
pub struct MemoryRepository {
    data: RwLock<MemoryData>,
    /// When true, every call fails as if the store were unreachable.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    /// Overwrites the stored role text for every user with `username`. Role management
    /// is not a gallery operation; this exists for seeding and administration scripts.
    pub async fn set_role(&self, username: &str, role: Option<&str>) -> u64 {
        let mut data = self.data.write().await;
        let mut modified = 0;
        for user in data.users.iter_mut().filter(|u| u.username == username) {
            user.role = role.map(str::to_string);
            modified += 1;
        }
        modified
    }

    pub async fn user_count(&self) -> usize {
        self.data.read().await.users.len()
    }

    pub async fn image_count(&self) -> usize {
        self.data.read().await.images.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_credentials(
        &self,
        username: &str,
        password_digest: &str,
    ) -> Result<Option<User>, StoreError> {
        self.check_available()?;
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.username == username && u.password_digest == password_digest)
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<Uuid, StoreError> {
        self.check_available()?;
        let id = Uuid::new_v4();
        self.data.write().await.users.push(User {
            id,
            username: user.username,
            password_digest: user.password_digest,
            role: Some(user.role.as_str().to_string()),
        });
        Ok(id)
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.check_available()?;
        Ok(self.data.read().await.images.clone())
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<ImageRecord>, StoreError> {
        self.check_available()?;
        let data = self.data.read().await;
        Ok(data.images.iter().find(|i| i.id == id).cloned())
    }

    async fn insert_image(&self, image: NewImage) -> Result<Uuid, StoreError> {
        self.check_available()?;
        let id = Uuid::new_v4();
        self.data.write().await.images.push(ImageRecord {
            id,
            title: image.title,
            description: image.description,
            media_ref: image.media_ref,
        });
        Ok(id)
    }

    async fn apply_patch(&self, id: Uuid, patch: &UpdatePatch) -> Result<u64, StoreError> {
        self.check_available()?;
        // The write lock is held for the whole patch, so readers never see it half applied.
        let mut data = self.data.write().await;
        let Some(image) = data.images.iter_mut().find(|i| i.id == id) else {
            return Ok(0);
        };

        if let Some(title) = &patch.title {
            image.title = Some(title.clone());
        }
        if let Some(description) = &patch.description {
            image.description = Some(description.clone());
        }
        if let Some(media_ref) = &patch.media_ref {
            image.media_ref = media_ref.clone();
        }
        Ok(1)
    }

    async fn delete_image(&self, id: Uuid) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut data = self.data.write().await;
        let before = data.images.len();
        data.images.retain(|i| i.id != id);
        Ok((before - data.images.len()) as u64)
    }
}
