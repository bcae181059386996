use crate::{
    chat::{ChatMessage, ChatRole},
    error::Result,
    hours::{BillableHours, LeaveHours},
};
use anyhow::Context;
use chrono::Utc;
use sqlx::{sqlite::SqliteConnectOptions, ConnectOptions, Row, SqlitePool};
use std::{path::Path, str::FromStr};

/// SQLite-backed store for chat sessions and hour records. Cloning shares
/// the underlying pool, so one instance can serve concurrent requests.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Create a new Store instance.
    /// This will automatically create the database file if it doesn't exist.
    pub async fn new(db_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let db_url = format!("sqlite://{}", db_path.to_string_lossy());

        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .log_statements(tracing::log::LevelFilter::Trace);

        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        Ok(Self { pool })
    }

    /// In-memory store, used by tests.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;
        Ok(Self { pool })
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chat_messages_session_timestamp
                ON chat_messages(session_id, timestamp DESC);

            CREATE TABLE IF NOT EXISTS leave_hours (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id TEXT NOT NULL,
                leave_type TEXT NOT NULL,
                start_date DATE NOT NULL,
                end_date DATE NOT NULL,
                total_hours REAL NOT NULL,
                description TEXT,
                status TEXT NOT NULL,
                requested_at DATETIME NOT NULL,
                approved_at DATETIME,
                approved_by TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_leave_hours_employee
                ON leave_hours(employee_id, start_date DESC);

            CREATE TABLE IF NOT EXISTS billable_client_hours (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                employee_id TEXT NOT NULL,
                client_name TEXT NOT NULL,
                project_name TEXT,
                location TEXT NOT NULL,
                work_date DATE NOT NULL,
                hours_worked REAL NOT NULL,
                description TEXT NOT NULL,
                travel_type TEXT,
                travel_kilometers REAL,
                travel_from_location TEXT,
                travel_to_location TEXT,
                hourly_rate REAL,
                status TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                submitted_at DATETIME,
                approved_at DATETIME,
                invoiced_at DATETIME
            );
            CREATE INDEX IF NOT EXISTS idx_billable_hours_employee
                ON billable_client_hours(employee_id, work_date DESC);
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to initialize database schema")?;

        Ok(())
    }

    // --- Session store -------------------------------------------------

    /// Append a message to a session, preserving arrival order. Returns
    /// the stored message with its assigned id.
    pub async fn append_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage> {
        let timestamp = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO chat_messages (session_id, role, content, timestamp)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(role.to_string())
        .bind(content)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        })
    }

    /// Full history for a session in chronological order. Unknown sessions
    /// yield an empty list.
    pub async fn session_history(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content, timestamp
            FROM chat_messages
            WHERE session_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_message).collect()
    }

    /// The `limit` most recent messages of a session, returned in
    /// chronological order (oldest first).
    pub async fn recent_history(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, role, content, timestamp
            FROM chat_messages
            WHERE session_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<ChatMessage> =
            rows.iter().map(row_to_message).collect::<Result<_>>()?;

        // Query returns newest-first; callers want oldest-first.
        messages.reverse();

        Ok(messages)
    }

    // --- Leave hours ---------------------------------------------------

    /// Insert a leave record, returning it with its assigned id.
    pub async fn insert_leave_hours(&self, record: LeaveHours) -> Result<LeaveHours> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_hours
                (employee_id, leave_type, start_date, end_date, total_hours,
                 description, status, requested_at, approved_at, approved_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.employee_id)
        .bind(record.leave_type.as_str())
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.total_hours)
        .bind(&record.description)
        .bind(record.status.as_str())
        .bind(record.requested_at)
        .bind(record.approved_at)
        .bind(&record.approved_by)
        .execute(&self.pool)
        .await?;

        Ok(LeaveHours {
            id: result.last_insert_rowid(),
            ..record
        })
    }

    pub async fn leave_hours_by_employee(&self, employee_id: &str) -> Result<Vec<LeaveHours>> {
        let rows = sqlx::query(
            r#"
            SELECT id, employee_id, leave_type, start_date, end_date, total_hours,
                   description, status, requested_at, approved_at, approved_by
            FROM leave_hours
            WHERE employee_id = ?
            ORDER BY start_date DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_leave_hours).collect()
    }

    /// Sum of approved leave hours with a start date in the given year.
    pub async fn total_approved_leave_hours(&self, employee_id: &str, year: i32) -> Result<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_hours), 0.0) AS total
            FROM leave_hours
            WHERE employee_id = ?
              AND status = 'APPROVED'
              AND CAST(strftime('%Y', start_date) AS INTEGER) = ?
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("total")?)
    }

    // --- Billable hours ------------------------------------------------

    pub async fn insert_billable_hours(&self, record: BillableHours) -> Result<BillableHours> {
        let result = sqlx::query(
            r#"
            INSERT INTO billable_client_hours
                (employee_id, client_name, project_name, location, work_date,
                 hours_worked, description, travel_type, travel_kilometers,
                 travel_from_location, travel_to_location, hourly_rate, status,
                 created_at, submitted_at, approved_at, invoiced_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.employee_id)
        .bind(&record.client_name)
        .bind(&record.project_name)
        .bind(&record.location)
        .bind(record.work_date)
        .bind(record.hours_worked)
        .bind(&record.description)
        .bind(record.travel_type.map(|t| t.as_str()))
        .bind(record.travel_kilometers)
        .bind(&record.travel_from_location)
        .bind(&record.travel_to_location)
        .bind(record.hourly_rate)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.submitted_at)
        .bind(record.approved_at)
        .bind(record.invoiced_at)
        .execute(&self.pool)
        .await?;

        Ok(BillableHours {
            id: result.last_insert_rowid(),
            ..record
        })
    }

    pub async fn billable_hours_by_employee(
        &self,
        employee_id: &str,
    ) -> Result<Vec<BillableHours>> {
        let rows = sqlx::query(
            r#"
            SELECT id, employee_id, client_name, project_name, location, work_date,
                   hours_worked, description, travel_type, travel_kilometers,
                   travel_from_location, travel_to_location, hourly_rate, status,
                   created_at, submitted_at, approved_at, invoiced_at
            FROM billable_client_hours
            WHERE employee_id = ?
            ORDER BY work_date DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_billable_hours).collect()
    }

    /// Sum of billable hours in APPROVED or INVOICED status with a work
    /// date in the given year.
    pub async fn total_billable_hours(&self, employee_id: &str, year: i32) -> Result<f64> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(hours_worked), 0.0) AS total
            FROM billable_client_hours
            WHERE employee_id = ?
              AND status IN ('APPROVED', 'INVOICED')
              AND CAST(strftime('%Y', work_date) AS INTEGER) = ?
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("total")?)
    }

    /// Direct status update, used by tests to simulate the external
    /// approval workflow. Status transitions are not part of the core.
    pub async fn set_leave_status(&self, id: i64, status: crate::hours::LeaveStatus) -> Result<()> {
        sqlx::query("UPDATE leave_hours SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_billable_status(
        &self,
        id: i64,
        status: crate::hours::BillableStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE billable_client_hours SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage> {
    let role_str: String = row.try_get("role")?;
    let role = role_str
        .parse::<ChatRole>()
        .map_err(|e| sqlx::Error::Decode(e.into()))?;

    Ok(ChatMessage {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        role,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
    })
}

fn row_to_leave_hours(row: &sqlx::sqlite::SqliteRow) -> Result<LeaveHours> {
    let leave_type: String = row.try_get("leave_type")?;
    let status: String = row.try_get("status")?;

    Ok(LeaveHours {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        leave_type: leave_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        total_hours: row.try_get("total_hours")?,
        description: row.try_get("description")?,
        status: status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        requested_at: row.try_get("requested_at")?,
        approved_at: row.try_get("approved_at")?,
        approved_by: row.try_get("approved_by")?,
    })
}

fn row_to_billable_hours(row: &sqlx::sqlite::SqliteRow) -> Result<BillableHours> {
    let travel_type: Option<String> = row.try_get("travel_type")?;
    let status: String = row.try_get("status")?;

    Ok(BillableHours {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        client_name: row.try_get("client_name")?,
        project_name: row.try_get("project_name")?,
        location: row.try_get("location")?,
        work_date: row.try_get("work_date")?,
        hours_worked: row.try_get("hours_worked")?,
        description: row.try_get("description")?,
        travel_type: travel_type
            .map(|t| t.parse())
            .transpose()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        travel_kilometers: row.try_get("travel_kilometers")?,
        travel_from_location: row.try_get("travel_from_location")?,
        travel_to_location: row.try_get("travel_to_location")?,
        hourly_rate: row.try_get("hourly_rate")?,
        status: status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        created_at: row.try_get("created_at")?,
        submitted_at: row.try_get("submitted_at")?,
        approved_at: row.try_get("approved_at")?,
        invoiced_at: row.try_get("invoiced_at")?,
    })
}
