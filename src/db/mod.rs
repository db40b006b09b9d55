use async_trait::async_trait;
use sqlx::{Row, postgres::{PgPool, PgPoolOptions}};

use crate::error::AppError;
use crate::models::{Category, NomineeAttributes, VoteRow};

/// Read-side contract against the vote store. The store is owned by the
/// write path; this service only ever queries it.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Existence probe for scoped views.
    async fn category(&self, category_id: i64) -> Result<Option<Category>, AppError>;

    /// One row per nominee in scope with its summed vote quantity.
    /// Zero-vote nominees are included; categories without nominees
    /// produce no rows.
    async fn vote_rows(&self, category_id: Option<i64>) -> Result<Vec<VoteRow>, AppError>;
}

pub struct Database {
    pool: PgPool,
}

// LEFT JOIN keeps nominees without any vote row in the tally at 0.
const VOTE_ROWS: &str = r#"
    SELECT
        c.id AS category_id,
        c.name AS category_name,
        n.id AS nominee_id,
        n.name AS nominee_name,
        n.location,
        n.church,
        n.county,
        COALESCE(SUM(v.quantity), 0)::BIGINT AS vote_total
    FROM nominees n
    JOIN categories c ON n.category_id = c.id
    LEFT JOIN votes v ON v.nominee_id = n.id
    GROUP BY c.id, c.name, n.id, n.name, n.location, n.church, n.county
    ORDER BY c.id, n.id
"#;

const VOTE_ROWS_BY_CATEGORY: &str = r#"
    SELECT
        c.id AS category_id,
        c.name AS category_name,
        n.id AS nominee_id,
        n.name AS nominee_name,
        n.location,
        n.church,
        n.county,
        COALESCE(SUM(v.quantity), 0)::BIGINT AS vote_total
    FROM nominees n
    JOIN categories c ON n.category_id = c.id
    LEFT JOIN votes v ON v.nominee_id = n.id
    WHERE c.id = $1
    GROUP BY c.id, c.name, n.id, n.name, n.location, n.church, n.county
    ORDER BY n.id
"#;

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl VoteStore for Database {
    async fn category(&self, category_id: i64) -> Result<Option<Category>, AppError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::StoreUnavailable)?;

        Ok(row.map(|r| Category {
            id: r.get("id"),
            name: r.get("name"),
        }))
    }

    async fn vote_rows(&self, category_id: Option<i64>) -> Result<Vec<VoteRow>, AppError> {
        let rows = match category_id {
            Some(id) => {
                sqlx::query(VOTE_ROWS_BY_CATEGORY)
                    .bind(id)
                    .fetch_all(&self.pool)
                    .await
            }
            None => sqlx::query(VOTE_ROWS).fetch_all(&self.pool).await,
        }
        .map_err(AppError::StoreUnavailable)?;

        Ok(rows
            .into_iter()
            .map(|r| VoteRow {
                category_id: r.get("category_id"),
                category_name: r.get("category_name"),
                nominee_id: r.get("nominee_id"),
                nominee_name: r.get("nominee_name"),
                attributes: NomineeAttributes {
                    location: r.get("location"),
                    church: r.get("church"),
                    county: r.get("county"),
                },
                vote_total: r.get("vote_total"),
            })
            .collect())
    }
}
