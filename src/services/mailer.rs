use crate::models::report::ReportPayload;
use crate::services::errors::{AppError, AppResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.resend.com";
pub const SENDER: &str = "Reporte DSME <noreply@emcotic.com>";
pub const RECIPIENT: &str = "dpvp.cds@emcotic.com";

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    attachments: Vec<ResendAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorResponse {
    message: Option<String>,
    name: Option<String>,
}

// ====================================
// CLIENT

/// Client for the Resend email API. A missing API key is only reported when
/// an email is actually sent.
#[derive(Clone)]
pub struct Mailer {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("api_key_set", &self.api_key.is_some())
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Mailer {
    pub fn new(api_key: Option<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Sends the email and returns the provider's delivery id. No retries.
    pub async fn send(&self, email: &OutgoingEmail) -> AppResult<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Configuration("RESEND_API_KEY is not defined".to_string())
        })?;

        let body = ResendRequest {
            from: SENDER,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
            attachments: email
                .attachments
                .iter()
                .map(|a| ResendAttachment {
                    filename: &a.filename,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        };

        let resp = self
            .client
            .post(format!("{}/emails", self.api_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Delivery(format!("Request error: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            let message = match serde_json::from_str::<ResendErrorResponse>(&error_body) {
                Ok(ResendErrorResponse {
                    message: Some(message),
                    ..
                }) => message,
                Ok(ResendErrorResponse {
                    name: Some(name), ..
                }) => name,
                _ => format!("Resend API returned status {}: {}", status, error_body),
            };
            tracing::error!(%status, %message, "Resend rejected the email");
            return Err(AppError::Delivery(message));
        }

        let sent: ResendResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Delivery(format!("Failed to parse response: {}", e)))?;

        Ok(sent.id)
    }
}

// ====================================
// MESSAGE COMPOSITION

/// Email announcing a persisted report, with its PDF attached.
pub fn stored_report_email(id: &str, report: &ReportPayload, pdf: Vec<u8>) -> OutgoingEmail {
    let name = escape_html(report.participant_name());
    let email = escape_html(report.participant_email());

    OutgoingEmail {
        to: RECIPIENT.to_string(),
        subject: format!("Nuevo Reporte DSME - {}", report.participant_name()),
        html: format!(
            "<h1>Nuevo Reporte de la Escala DSME</h1>\
             <p>Se ha completado un nuevo diagnóstico.</p>\
             <p><strong>Nombre:</strong> {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p>El reporte completo se encuentra adjunto en formato PDF.</p>",
            name, email
        ),
        attachments: vec![Attachment {
            filename: format!("Reporte-DSME-{}.pdf", id),
            content: pdf,
        }],
    }
}

/// Email for a report that is only forwarded, never stored. The attachment
/// is named after the participant.
pub fn unsaved_report_email(report: &ReportPayload, pdf: Vec<u8>) -> OutgoingEmail {
    let name = escape_html(report.participant_name());

    OutgoingEmail {
        to: RECIPIENT.to_string(),
        subject: format!(
            "Nuevo Reporte DSME Completado: {}",
            report.participant_name()
        ),
        html: format!(
            "<p>Se ha completado un nuevo diagnóstico de la <strong>Escala DSME</strong> \
             por parte de <strong>{}</strong>.</p>\
             <p>Se adjunta el reporte preliminar en formato PDF con los datos y \
             puntuaciones obtenidas.</p>\
             <p>Puedes acceder al portal para ver el historial completo de reportes.</p>\
             <p>Un saludo,<br><strong>Sistema de Reportes DSME</strong></p>",
            name
        ),
        attachments: vec![Attachment {
            filename: format!("Reporte-DSME-{}.pdf", attachment_stem(report.participant_name())),
            content: pdf,
        }],
    }
}

const UNSAFE_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

// Whitespace runs become `_`; characters unsafe in file names are dropped.
fn attachment_stem(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| c.is_whitespace() || !(c.is_control() || UNSAFE_FILENAME_CHARS.contains(c)))
        .collect();
    let stem = safe.split_whitespace().collect::<Vec<_>>().join("_");
    if stem.is_empty() {
        "reporte".to_string()
    } else {
        stem
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
