use crate::db::{Database, db_err, from_millis, parse_enum, to_millis};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use tic_core::common::Page;
use tic_core::notify::entity::Notification;
use tic_core::notify::port::NotificationStore;
use tic_core::store::error::StoreError;

pub struct SqliteNotificationStore {
    db: Database,
}

impl SqliteNotificationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Inserts `n` on an open connection (used by the funding store so the
/// inbox entry commits with the status change).
pub(crate) async fn insert_notification(
    conn: &mut SqliteConnection,
    n: &Notification,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO notifications (id, user_email, title, message, kind, priority, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&n.id)
    .bind(&n.user_email)
    .bind(&n.title)
    .bind(&n.message)
    .bind(&n.kind)
    .bind(n.priority.to_string())
    .bind(n.is_read)
    .bind(to_millis(n.created_at))
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification, StoreError> {
    let priority: String = row.try_get("priority").map_err(db_err)?;
    let created_at: i64 = row.try_get("created_at").map_err(db_err)?;
    Ok(Notification {
        id: row.try_get("id").map_err(db_err)?,
        user_email: row.try_get("user_email").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        message: row.try_get("message").map_err(db_err)?,
        kind: row.try_get("kind").map_err(db_err)?,
        priority: parse_enum(&priority)?,
        is_read: row.try_get("is_read").map_err(db_err)?,
        created_at: from_millis(created_at)?,
    })
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn create_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut conn = self.db.pool().acquire().await.map_err(db_err)?;
        insert_notification(&mut *conn, notification).await
    }

    async fn list_notifications(
        &self,
        email: &str,
        unread_only: bool,
        page: Page,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM notifications WHERE user_email = ");
        qb.push_bind(email);
        if unread_only {
            qb.push(" AND is_read = 0");
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(i64::from(page.limit));
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(page.offset));

        let rows = qb.build().fetch_all(self.db.pool()).await.map_err(db_err)?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn count_notifications(&self, email: &str, unread_only: bool) -> Result<u64, StoreError> {
        let sql = if unread_only {
            "SELECT COUNT(*) FROM notifications WHERE user_email = ? AND is_read = 0"
        } else {
            "SELECT COUNT(*) FROM notifications WHERE user_email = ?"
        };
        let count: i64 = sqlx::query_scalar(sql)
            .bind(email)
            .fetch_one(self.db.pool())
            .await
            .map_err(db_err)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn mark_read(&self, email: &str, ids: Option<&[String]>) -> Result<u64, StoreError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE notifications SET is_read = 1 WHERE is_read = 0 AND user_email = ");
        qb.push_bind(email);
        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(0);
            }
            qb.push(" AND id IN (");
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }

        let result = qb.build().execute(self.db.pool()).await.map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
