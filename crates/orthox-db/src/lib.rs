//! # orthox-db
//!
//! Case store implementations for orthox.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL repositories for cases, notes and media
//! - [`Database`], the PostgreSQL [`CaseStore`]
//! - [`InMemoryCaseStore`], for tests and database-less development
//!
//! ## Example
//!
//! ```rust,ignore
//! use orthox_db::{CaseStore, CreateCaseRequest, Database};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/orthox").await?;
//!     db.migrate().await?;
//!
//!     let case = db.create_case(CreateCaseRequest::default()).await?;
//!     println!("Created {}", case.patient_name);
//!     Ok(())
//! }
//! ```

pub mod cases;
pub mod media;
pub mod memory;
pub mod notes;
pub mod pool;

// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use async_trait::async_trait;
use uuid::Uuid;

// Re-export core types
pub use orthox_core::*;

pub use cases::PgCaseRepository;
pub use media::PgMediaRepository;
pub use memory::InMemoryCaseStore;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig, PoolStatus};

/// PostgreSQL case store with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub cases: PgCaseRepository,
    pub notes: PgNoteRepository,
    pub media: PgMediaRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            cases: PgCaseRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            media: PgMediaRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    async fn require_case(&self, id: Uuid) -> Result<()> {
        if self.cases.exists(id).await? {
            Ok(())
        } else {
            Err(Error::CaseNotFound(id))
        }
    }
}

#[async_trait]
impl CaseStore for Database {
    async fn create_case(&self, req: CreateCaseRequest) -> Result<Case> {
        self.cases.insert(req).await
    }

    async fn get_case(&self, id: Uuid) -> Result<CaseFull> {
        let case = self.cases.get(id).await?.ok_or(Error::CaseNotFound(id))?;
        let notes = self.notes.list_for_case(id).await?;
        let media = self.media.list_for_case(id).await?;
        Ok(CaseFull { case, notes, media })
    }

    async fn list_cases(&self) -> Result<Vec<Case>> {
        self.cases.list().await
    }

    async fn update_case_fields(&self, id: Uuid, update: CaseUpdate) -> Result<()> {
        self.cases.update_fields(id, &update).await
    }

    async fn add_note(&self, req: CreateNoteRequest) -> Result<Note> {
        self.require_case(req.case_id).await?;
        self.notes.insert(req).await
    }

    async fn add_media(&self, req: CreateMediaRequest) -> Result<Media> {
        self.require_case(req.case_id).await?;
        self.media.insert(req).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
