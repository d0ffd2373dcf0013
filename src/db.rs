use crate::models::report::{Report, ReportPayload, ReportSummary};
use crate::services::errors::{AppError, AppResult};
use chrono::{SecondsFormat, Utc};
use sqlx::{FromRow, SqlitePool};

// ===============================================
// DATABASE MODELS

/// One row of the `reports` collection. The report body lives in `document`
/// as JSON; the columns beside it exist for lookup and ordering.
#[derive(Debug, FromRow)]
struct ReportRow {
    id: String,
    submitted_at: String,
    document: String,
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: String,
    participant_name: Option<String>,
    company_name: Option<String>,
    submitted_at: String,
}

// ======================================================
// DATABASE INITIALIZATION

pub async fn init_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reports (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            submitted_at TEXT NOT NULL,
            document TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reports_submitted_at
            ON reports (submitted_at DESC, seq DESC);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

// =============================================================
// REPORT OPERATIONS

// A payload that fails to serialize here is a server fault, not bad input.
fn unserializable(e: serde_json::Error) -> AppError {
    AppError::Store(sqlx::Error::Encode(format!("report is not serializable: {}", e).into()))
}

/// Handle over the `reports` collection. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct ReportStore {
    pool: SqlitePool,
}

impl ReportStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Appends a new report, stamping it with the current time. Returns the
    /// generated id.
    pub async fn create(&self, payload: &ReportPayload) -> AppResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let submitted_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let document = serde_json::to_string(payload).map_err(unserializable)?;

        sqlx::query("INSERT INTO reports (id, submitted_at, document) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&submitted_at)
            .bind(&document)
            .execute(&self.pool)
            .await?;

        tracing::debug!(%id, %submitted_at, "report stored");
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> AppResult<Report> {
        let row = sqlx::query_as::<_, ReportRow>(
            "SELECT id, submitted_at, document FROM reports WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Reporte no encontrado.".to_string()))?;

        let payload: ReportPayload = serde_json::from_str(&row.document).map_err(|e| {
            AppError::Store(sqlx::Error::Decode(
                format!("report {} holds an unreadable document: {}", row.id, e).into(),
            ))
        })?;

        Ok(Report {
            id: row.id,
            payload,
            submitted_at: row.submitted_at,
        })
    }

    /// All reports, newest first. Reports stored within the same millisecond
    /// keep their insertion order.
    pub async fn list(&self) -> AppResult<Vec<ReportSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT id,
                   json_extract(document, '$.demographics.nombre') AS participant_name,
                   json_extract(document, '$.empresa.nombre') AS company_name,
                   submitted_at
            FROM reports
            ORDER BY submitted_at DESC, seq DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReportSummary {
                id: row.id,
                participant_name: row.participant_name.unwrap_or_default(),
                company_name: row.company_name.unwrap_or_default(),
                submitted_at: row.submitted_at,
            })
            .collect())
    }

    /// Removes a report. Deleting an id that does not exist is not an error.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(%id, "delete of unknown report ignored");
        }
        Ok(())
    }
}
