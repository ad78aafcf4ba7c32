//! libSQL backend — async `Store` trait implementation.
//!
//! Supports local file and in-memory databases. A single connection is
//! reused for all operations; `libsql::Connection` is `Send + Sync` and
//! safe for concurrent async use.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Connection, Database as LibSqlDatabase};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Store;
use crate::subscriptions::model::Subscription;
use crate::tips::model::{NewTip, Tip, RANDOM_CATEGORY};

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(&backend.conn).await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 datetime string (our canonical write format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Query(format!("invalid id in row: {e}")))
}

/// Column list shared by all tip SELECTs.
const TIP_COLUMNS: &str = "id, tip, url, category, created_at";

fn row_to_tip(row: &libsql::Row) -> Result<Tip, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("tip row: {e}")))?;
    let text: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("tip row: {e}")))?;
    let url: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("tip row: {e}")))?;
    let category: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("tip row: {e}")))?;
    let created_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("tip row: {e}")))?;

    Ok(Tip {
        id: parse_uuid(&id_str)?,
        text,
        url,
        category,
        created_at: parse_datetime(&created_str),
    })
}

/// NULL-or-text parameter for nullable columns.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, intent, args, created_at";

fn row_to_subscription(row: &libsql::Row) -> Result<Subscription, DatabaseError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("subscription row: {e}")))?;
    let user_id: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("subscription row: {e}")))?;
    let intent: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("subscription row: {e}")))?;
    let args: Option<String> = row.get::<String>(3).ok();
    let created_str: String = row
        .get(4)
        .map_err(|e| DatabaseError::Query(format!("subscription row: {e}")))?;

    Ok(Subscription {
        id: parse_uuid(&id_str)?,
        user_id,
        intent,
        args,
        created_at: parse_datetime(&created_str),
    })
}

// ── Store implementation ────────────────────────────────────────────

#[async_trait]
impl Store for LibSqlBackend {
    async fn insert_tip(&self, tip: &NewTip) -> Result<Tip, DatabaseError> {
        // The sentinel means "any category" in queries; storing it as a
        // real category would make it unreachable by the equality filter.
        if tip.category == RANDOM_CATEGORY {
            return Err(DatabaseError::Constraint(format!(
                "'{RANDOM_CATEGORY}' is a reserved category"
            )));
        }

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO tips (id, tip, url, category, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                tip.text.as_str(),
                tip.url.as_str(),
                tip.category.as_str(),
                created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("insert_tip: {e}")))?;

        debug!(tip_id = %id, category = %tip.category, "Tip inserted into DB");
        Ok(Tip {
            id,
            text: tip.text.clone(),
            url: tip.url.clone(),
            category: tip.category.clone(),
            created_at,
        })
    }

    async fn all_tips(&self) -> Result<Vec<Tip>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TIP_COLUMNS} FROM tips ORDER BY created_at ASC, id ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("all_tips: {e}")))?;

        let mut tips = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            tips.push(row_to_tip(&row)?);
        }
        Ok(tips)
    }

    async fn tips_by_category(&self, category: &str) -> Result<Vec<Tip>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {TIP_COLUMNS} FROM tips WHERE category = ?1 ORDER BY created_at ASC, id ASC"
                ),
                params![category],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("tips_by_category: {e}")))?;

        let mut tips = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            tips.push(row_to_tip(&row)?);
        }
        Ok(tips)
    }

    async fn most_recent_tip(&self) -> Result<Option<Tip>, DatabaseError> {
        let conn = self.conn();
        // id ASC breaks created_at ties so repeated calls are stable.
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {TIP_COLUMNS} FROM tips ORDER BY created_at DESC, id ASC LIMIT 1"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("most_recent_tip: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_tip(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("most_recent_tip: {e}"))),
        }
    }

    async fn count_tips(&self) -> Result<u64, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM tips", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_tips: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count_tips: {e}")))?;
                Ok(count as u64)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_tips: {e}"))),
        }
    }

    async fn add_subscription(
        &self,
        user_id: &str,
        intent: &str,
        args: Option<&str>,
    ) -> Result<Subscription, DatabaseError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO subscriptions (id, user_id, intent, args, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                user_id,
                intent,
                opt_text(args),
                created_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("add_subscription: {e}")))?;

        debug!(subscription_id = %id, user_id, intent, "Subscription inserted into DB");
        Ok(Subscription {
            id,
            user_id: user_id.to_string(),
            intent: intent.to_string(),
            args: args.map(str::to_string),
            created_at,
        })
    }

    async fn subscriptions_by_intent(
        &self,
        intent: &str,
    ) -> Result<Vec<Subscription>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE intent = ?1"),
                params![intent],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("subscriptions_by_intent: {e}")))?;

        let mut subs = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            subs.push(row_to_subscription(&row)?);
        }
        Ok(subs)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
