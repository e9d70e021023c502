use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use nantimmo_core::error::AppError;
use nantimmo_core::models::{Listing, StoredListing};
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Pool, Postgres, QueryBuilder};

/// Schema statements, executed one at a time. All of them are idempotent.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS properties (
        id BIGSERIAL PRIMARY KEY,
        site TEXT,
        title TEXT,
        price TEXT,
        price_numeric BIGINT,
        description TEXT,
        url TEXT,
        image_url TEXT,
        square_meters INTEGER,
        scraped_date TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )"#,
    // Tables created before surfaces were tracked lack this column.
    r#"ALTER TABLE properties ADD COLUMN IF NOT EXISTS square_meters INTEGER"#,
    // Older tables store prices as INTEGER; widening is a no-op once BIGINT.
    r#"ALTER TABLE properties ALTER COLUMN price_numeric TYPE BIGINT"#,
    r#"CREATE INDEX IF NOT EXISTS idx_image_url ON properties(image_url)"#,
];

const INSERT_COLUMNS: usize = 9;

/// PostgreSQL caps a statement at 65535 bind parameters.
const MAX_ROWS_PER_STATEMENT: usize = u16::MAX as usize / INSERT_COLUMNS;

/// Arbitrary key shared by every process writing to the same database.
const RUN_LOCK_KEY: i64 = 0x6E61_6E74_696D_6D6F;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn db_err(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

/// Held for the duration of a run.
///
/// The advisory lock lives on this connection's session. The connection is
/// closed instead of returned to the pool when dropped, which ends the
/// session and releases the lock on every exit path.
pub struct RunLock {
    _conn: PoolConnection<Postgres>,
}

/// Repository for listing persistence in PostgreSQL.
#[derive(Clone)]
pub struct ListingRepository {
    pool: Pool<Postgres>,
}

impl ListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Take the run lock without waiting.
    pub async fn lock_run(&self) -> Result<RunLock, AppError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;

        let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(RUN_LOCK_KEY)
            .fetch_one(&mut *conn)
            .await
            .map_err(db_err)?;

        if !locked {
            return Err(AppError::RunInProgress);
        }

        conn.close_on_drop();
        Ok(RunLock { _conn: conn })
    }

    /// Create the listings table and the dedup-key index if they are absent.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    /// Every non-null image URL already stored.
    pub async fn known_image_urls(&self) -> Result<HashSet<String>, AppError> {
        let urls: Vec<String> = sqlx::query_scalar(
            r#"SELECT DISTINCT image_url FROM properties WHERE image_url IS NOT NULL"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(urls.into_iter().collect())
    }

    /// Insert listings with multi-row statements inside one transaction.
    ///
    /// An empty slice returns 0 without touching the pool.
    pub async fn insert_listings(&self, listings: &[Listing]) -> Result<u64, AppError> {
        if listings.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut written = 0;

        for chunk in listings.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO properties \
                 (site, title, price, price_numeric, description, url, image_url, \
                 square_meters, scraped_date) ",
            );
            builder.push_values(chunk, |mut row, listing| {
                row.push_bind(&listing.site)
                    .push_bind(&listing.title)
                    .push_bind(&listing.price_text)
                    .push_bind(listing.price_numeric)
                    .push_bind(&listing.description)
                    .push_bind(&listing.url)
                    .push_bind(&listing.image_url)
                    .push_bind(listing.square_meters)
                    .push_bind(listing.scraped_date.format(DATE_FORMAT).to_string());
            });

            let result = builder.build().execute(&mut *tx).await.map_err(db_err)?;
            written += result.rows_affected();
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(%written, "Inserted listings");

        Ok(written)
    }

    /// All stored listings, newest scrape date first, then newest id.
    pub async fn list_listings(&self) -> Result<Vec<StoredListing>, AppError> {
        let rows = sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT id::BIGINT AS id, site, title, price, price_numeric::BIGINT AS price_numeric,
                   description, url, image_url, square_meters, scraped_date, created_at
            FROM properties
            ORDER BY scraped_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(StoredListing::try_from).collect()
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: i64,
    site: Option<String>,
    title: Option<String>,
    price: Option<String>,
    price_numeric: Option<i64>,
    description: Option<String>,
    url: Option<String>,
    image_url: Option<String>,
    square_meters: Option<i32>,
    scraped_date: Option<String>,
    created_at: Option<NaiveDateTime>,
}

impl TryFrom<ListingRow> for StoredListing {
    type Error = AppError;

    fn try_from(row: ListingRow) -> Result<Self, AppError> {
        let raw_date = row.scraped_date.unwrap_or_default();
        let scraped_date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
            AppError::ParseError(format!(
                "Listing {} has invalid scraped_date '{raw_date}': {e}",
                row.id
            ))
        })?;

        Ok(StoredListing {
            id: row.id,
            listing: Listing {
                site: row.site.unwrap_or_default(),
                title: row.title,
                price_text: row.price,
                price_numeric: row.price_numeric,
                description: row.description,
                url: row.url,
                image_url: row.image_url,
                square_meters: row.square_meters,
                scraped_date,
            },
            created_at: row.created_at,
        })
    }
}

// -- Trait implementation --

impl nantimmo_core::traits::ListingStore for ListingRepository {
    type RunGuard = RunLock;

    async fn lock_run(&self) -> Result<RunLock, AppError> {
        ListingRepository::lock_run(self).await
    }

    async fn ensure_schema(&self) -> Result<(), AppError> {
        ListingRepository::ensure_schema(self).await
    }

    async fn known_image_urls(&self) -> Result<HashSet<String>, AppError> {
        ListingRepository::known_image_urls(self).await
    }

    async fn insert_listings(&self, listings: &[Listing]) -> Result<u64, AppError> {
        ListingRepository::insert_listings(self, listings).await
    }

    async fn list_listings(&self) -> Result<Vec<StoredListing>, AppError> {
        ListingRepository::list_listings(self).await
    }
}
