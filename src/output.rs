//! Text and JSON rendering of command results
//!
//! JSON bodies mirror the HTTP contract of the routing layer so scripts
//! can consume either surface the same way.

use crate::cli::OutputFormat;
use crate::enrollment::EnrollmentOutcome;
use crate::error::HuellaError;
use crate::scorer::AuthDecision;
use crate::selection::CandidateOutcome;
use crate::store::UserSummary;
use serde::Serialize;
use std::fmt::Write;

#[derive(Debug, Serialize)]
pub struct JsonEnrollment<'a> {
    pub status: &'static str,
    pub model_type: &'static str,
    pub f1_score: f64,
    pub samples_count: usize,
    pub candidates: &'a [CandidateOutcome],
}

#[derive(Debug, Serialize)]
pub struct JsonAuthentication {
    pub authenticated: bool,
    pub confidence: f64,
    pub model_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct JsonExpectedCount {
    pub expected_feature_count: usize,
}

#[derive(Debug, Serialize)]
pub struct JsonError {
    pub error: &'static str,
    pub status: u16,
    pub detail: String,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

pub fn render_enrollment(outcome: &EnrollmentOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&JsonEnrollment {
            status: "success",
            model_type: outcome.family.tag(),
            f1_score: outcome.f1_score,
            samples_count: outcome.samples_count,
            candidates: &outcome.candidates,
        }),
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(
                out,
                "enrolled: model={} f1={:.4} samples={}",
                outcome.family, outcome.f1_score, outcome.samples_count
            );
            for c in &outcome.candidates {
                let _ = match (&c.f1_score, &c.error) {
                    (Some(score), _) => writeln!(out, "  {:<4} f1={:.4}", c.family.tag(), score),
                    (None, Some(err)) => writeln!(out, "  {:<4} failed: {}", c.family.tag(), err),
                    (None, None) => writeln!(out, "  {:<4} skipped", c.family.tag()),
                };
            }
            out.trim_end().to_string()
        }
    }
}

pub fn render_decision(decision: &AuthDecision, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&JsonAuthentication {
            authenticated: decision.authenticated,
            confidence: decision.confidence,
            model_type: decision.family.tag(),
        }),
        OutputFormat::Text => format!(
            "{}: confidence={:.4} model={}",
            if decision.authenticated {
                "authenticated"
            } else {
                "rejected"
            },
            decision.confidence,
            decision.family
        ),
    }
}

pub fn render_users(users: &[UserSummary], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&users),
        OutputFormat::Text => {
            if users.is_empty() {
                return "no users enrolled".to_string();
            }
            let width = users.iter().map(|u| u.username.len()).max().unwrap_or(0);
            users
                .iter()
                .map(|u| format!("{:<width$}  {}", u.username, u.enrollments, width = width))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }
}

pub fn render_expected_count(count: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&JsonExpectedCount {
            expected_feature_count: count,
        }),
        OutputFormat::Text => count.to_string(),
    }
}

pub fn render_error(err: &HuellaError, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&JsonError {
            error: err.kind(),
            status: err.status_code(),
            detail: err.to_string(),
        }),
        OutputFormat::Text => format!("error: {}", err),
    }
}
