use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Highest pillar index a report may carry. Pillars are numbered from 1.
pub const PILLAR_COUNT: u8 = 5;

/// Upper bound of a single pillar score.
pub const PILLAR_MAX_SCORE: u32 = 35;

/// Upper bound of the aggregate (ISME) score.
pub const ISME_MAX_SCORE: u32 = 100;

// Keys the server owns; a client cannot smuggle them in through extra fields.
const RESERVED_KEYS: &[&str] = &["id", "submittedAt", "fecha"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub nombre: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub nombre: String,
}

// ====================================
// SUBMITTED PAYLOAD

/// A report as submitted by the survey front end, normalised to the canonical
/// schema. Fields the server does not interpret are kept in `extra` and
/// persisted untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawReportPayload")]
pub struct ReportPayload {
    pub demographics: Demographics,
    pub empresa: Company,
    pub pilar_scores: BTreeMap<u8, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isme_score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportPayload {
    pub fn participant_name(&self) -> &str {
        &self.demographics.nombre
    }

    pub fn participant_email(&self) -> &str {
        &self.demographics.email
    }

    pub fn company_name(&self) -> &str {
        &self.empresa.nombre
    }
}

/// Wire shape accepted from callers. Older front ends used `demograficos`,
/// `nombreCompleto`, `nombreEmpresa` and `pilar<N>` keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReportPayload {
    #[serde(alias = "demograficos")]
    demographics: Option<RawDemographics>,
    empresa: Option<Company>,
    pilar_scores: Option<BTreeMap<String, Value>>,
    isme_score: Option<f64>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDemographics {
    #[serde(alias = "nombreCompleto")]
    nombre: Option<String>,
    email: Option<String>,
    nombre_empresa: Option<String>,
}

impl TryFrom<RawReportPayload> for ReportPayload {
    type Error = String;

    fn try_from(raw: RawReportPayload) -> Result<Self, Self::Error> {
        let demographics = raw
            .demographics
            .ok_or_else(|| "missing field `demographics`".to_string())?;

        let nombre = demographics
            .nombre
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| "missing field `demographics.nombre`".to_string())?;

        let empresa = match raw.empresa {
            Some(company) => company,
            None => Company {
                nombre: demographics.nombre_empresa.unwrap_or_default(),
            },
        };

        let pilar_scores = match raw.pilar_scores {
            Some(scores) => parse_pillar_scores(scores)?,
            None => BTreeMap::new(),
        };

        let mut extra = raw.extra;
        for key in RESERVED_KEYS {
            extra.remove(*key);
        }

        Ok(ReportPayload {
            demographics: Demographics {
                nombre,
                email: demographics.email.unwrap_or_default(),
            },
            empresa,
            pilar_scores,
            isme_score: raw.isme_score,
            extra,
        })
    }
}

fn parse_pillar_scores(scores: BTreeMap<String, Value>) -> Result<BTreeMap<u8, f64>, String> {
    let mut parsed = BTreeMap::new();
    for (key, value) in scores {
        let index = parse_pillar_index(&key)
            .ok_or_else(|| format!("unknown pillar `{}` (expected 1 to {})", key, PILLAR_COUNT))?;
        match value {
            Value::Null => continue,
            Value::Number(n) => {
                let score = n
                    .as_f64()
                    .ok_or_else(|| format!("pillar `{}` score is not a finite number", key))?;
                parsed.insert(index, score);
            }
            other => return Err(format!("pillar `{}` score must be a number, got {}", key, other)),
        }
    }
    Ok(parsed)
}

/// Accepts `"3"` as well as the legacy `"pilar3"` form.
pub fn parse_pillar_index(key: &str) -> Option<u8> {
    let digits = key.strip_prefix("pilar").unwrap_or(key);
    let index: u8 = digits.parse().ok()?;
    (1..=PILLAR_COUNT).contains(&index).then_some(index)
}

// ====================================
// PERSISTED DOCUMENTS

/// A persisted report as returned by the fetch-one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    #[serde(flatten)]
    pub payload: ReportPayload,
    #[serde(alias = "fecha")]
    pub submitted_at: String,
}

/// Projection used by the company portal listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub id: String,
    pub participant_name: String,
    pub company_name: String,
    pub submitted_at: String,
}
