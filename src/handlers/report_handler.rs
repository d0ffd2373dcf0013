use crate::AppState;
use crate::models::report::{Report, ReportPayload, ReportSummary};
use crate::services::errors::{AppError, AppResult};
use crate::services::mailer::{stored_report_email, unsaved_report_email};
use crate::services::pdf_report;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct ReportIdQuery {
    pub id: Option<String>,
}

impl ReportIdQuery {
    /// Extracts the id from the query string. A query string that does not
    /// parse, such as one with a repeated `id`, counts as a missing id.
    fn from_request(query: Result<Query<ReportIdQuery>, QueryRejection>) -> AppResult<Self> {
        match query {
            Ok(Query(query)) => Ok(query),
            Err(rejection) => {
                tracing::debug!("unreadable query string: {}", rejection.body_text());
                Err(missing_id())
            }
        }
    }

    fn require_id(&self) -> AppResult<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(missing_id)
    }
}

fn missing_id() -> AppError {
    AppError::Validation("El ID del reporte es requerido.".to_string())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_payload(payload: Result<Json<ReportPayload>, JsonRejection>) -> AppResult<ReportPayload> {
    match payload {
        Ok(Json(report)) => Ok(report),
        Err(rejection) => Err(AppError::Validation(format!(
            "Datos del reporte inválidos: {}",
            rejection.body_text()
        ))),
    }
}

// ====================================
// SUBMIT: persist -> render -> notify

/// `POST /api/submit-report`
///
/// Stores the report, renders its PDF and emails it. If rendering or the email
/// fails after the report was stored, the stored document is deleted again so
/// a failed submission leaves nothing behind.
pub async fn submit_report(
    State(state): State<AppState>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> AppResult<Json<SubmitResponse>> {
    let report = parse_payload(payload)?;
    info!(participant = %report.participant_name(), "receiving DSME report");

    let store = state.store.store().await?;
    let id = store.create(&report).await?;
    info!(%id, "report stored");

    if let Err(e) = render_and_notify(&state, &id, &report).await {
        match store.delete(&id).await {
            Ok(()) => warn!(%id, "submission failed after storing; report removed"),
            Err(rollback) => {
                error!(%id, error = %rollback, "failed to remove report after failed submission")
            }
        }
        return Err(e);
    }

    Ok(Json(SubmitResponse {
        message: "Reporte guardado y correo enviado".to_string(),
        id,
    }))
}

async fn render_and_notify(state: &AppState, id: &str, report: &ReportPayload) -> AppResult<()> {
    let pdf = pdf_report::render(report)?;
    info!(%id, bytes = pdf.len(), "PDF rendered");

    let email = stored_report_email(id, report, pdf);
    let delivery_id = state.mailer.send(&email).await?;
    info!(%id, %delivery_id, "report email sent");
    Ok(())
}

// ====================================
// NOTIFY ONLY: render -> notify

/// `POST /api/notify-report`
///
/// Renders and emails a report without storing it, for front ends that
/// persist results themselves.
pub async fn notify_report(
    State(state): State<AppState>,
    payload: Result<Json<ReportPayload>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let report = parse_payload(payload)?;

    let pdf = pdf_report::render(&report)?;
    info!(participant = %report.participant_name(), bytes = pdf.len(), "PDF rendered");

    let email = unsaved_report_email(&report, pdf);
    let delivery_id = state.mailer.send(&email).await?;
    info!(%delivery_id, "report email sent");

    Ok(Json(MessageResponse {
        message: "Correo con PDF enviado con éxito".to_string(),
    }))
}

// ====================================
// READ / DELETE

/// `GET /api/get-report?id=<id>`
pub async fn get_report(
    State(state): State<AppState>,
    query: Result<Query<ReportIdQuery>, QueryRejection>,
) -> AppResult<Json<Report>> {
    let query = ReportIdQuery::from_request(query)?;
    let id = query.require_id()?;
    let store = state.store.store().await?;
    let report = store.get(id).await?;
    Ok(Json(report))
}

/// `GET /api/list-reports`
pub async fn list_reports(State(state): State<AppState>) -> AppResult<Json<Vec<ReportSummary>>> {
    let store = state.store.store().await?;
    let summaries = store.list().await?;
    Ok(Json(summaries))
}

/// `DELETE /api/delete-report?id=<id>`
pub async fn delete_report(
    State(state): State<AppState>,
    query: Result<Query<ReportIdQuery>, QueryRejection>,
) -> AppResult<Json<MessageResponse>> {
    let query = ReportIdQuery::from_request(query)?;
    let id = query.require_id()?;
    let store = state.store.store().await?;
    store.delete(id).await?;
    info!(%id, "report deleted");

    Ok(Json(MessageResponse {
        message: "Reporte eliminado con éxito.".to_string(),
    }))
}

/// Fallback for every route when the method does not match.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
