//! Request handlers

use crate::types::patient::{FieldViolation, PatientForm};
use crate::types::report::DisplayResult;
use crate::web::render;
use crate::web::AppState;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Form, Json};
use serde_json::{json, Value};
use tracing::{error, warn};

/// Run a submission off the async executor; inference is blocking CPU work.
async fn run_submission(state: &AppState, form: PatientForm) -> DisplayResult {
    let handler = state.handler.clone();
    match tokio::task::spawn_blocking(move || handler.handle_submission(&form)).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Submission task failed");
            state.metrics.record_failure();
            DisplayResult::Failed(format!("Error making prediction: {e}"))
        }
    }
}

pub async fn index() -> Html<String> {
    Html(render::page(&PatientForm::default(), None))
}

/// Form value as the JSON scalar serde expects for the matching field.
fn form_scalar(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>() {
        Ok(x) if x.is_finite() => Value::from(x),
        _ => Value::from(raw),
    }
}

/// Decode urlencoded pairs onto the form defaults one field at a time, so
/// every decodable value is kept and each undecodable one is reported.
fn decode_form_pairs(pairs: &[(String, String)]) -> (PatientForm, Vec<FieldViolation>) {
    let mut fields = match serde_json::to_value(PatientForm::default()) {
        Ok(Value::Object(fields)) => fields,
        _ => return (PatientForm::default(), Vec::new()),
    };
    let mut form = PatientForm::default();
    let mut violations = Vec::new();

    for (name, raw) in pairs {
        if !fields.contains_key(name) {
            continue;
        }
        let mut candidate = fields.clone();
        candidate.insert(name.clone(), form_scalar(raw));
        match serde_json::from_value::<PatientForm>(Value::Object(candidate.clone())) {
            Ok(decoded) => {
                fields = candidate;
                form = decoded;
            }
            Err(_) => violations.push(FieldViolation::new(
                name.as_str(),
                format!("cannot decode value '{}'", raw),
            )),
        }
    }

    (form, violations)
}

/// HTML form submission. Fields that cannot be decoded are reported while the
/// rest of the submission is re-filled; a body that is not a urlencoded form
/// at all re-renders the form defaults.
pub async fn predict_form(
    State(state): State<AppState>,
    pairs: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Html<String> {
    let pairs = match pairs {
        Ok(Form(pairs)) => pairs,
        Err(rejection) => {
            warn!(error = %rejection, "Undecodable form submission");
            state.metrics.record_rejected();
            let violations = vec![FieldViolation::malformed(rejection.body_text())];
            let result = DisplayResult::Rejected(violations);
            return Html(render::page(&PatientForm::default(), Some(&result)));
        }
    };

    let (form, violations) = decode_form_pairs(&pairs);
    if !violations.is_empty() {
        warn!(violations = violations.len(), "Form submission has undecodable fields");
        state.metrics.record_rejected();
        let result = DisplayResult::Rejected(violations);
        return Html(render::page(&form, Some(&result)));
    }

    let result = run_submission(&state, form.clone()).await;
    Html(render::page(&form, Some(&result)))
}

pub async fn predict_json(
    State(state): State<AppState>,
    payload: Result<Json<PatientForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            warn!(error = %rejection, "Undecodable JSON submission");
            state.metrics.record_rejected();
            let violations = vec![FieldViolation::malformed(rejection.body_text())];
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "error": "validation", "violations": violations })),
            )
                .into_response();
        }
    };

    match run_submission(&state, form).await {
        DisplayResult::Prediction(report) => (StatusCode::OK, Json(report)).into_response(),
        DisplayResult::Rejected(violations) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "validation", "violations": violations })),
        )
            .into_response(),
        DisplayResult::Failed(message) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "prediction", "message": message })),
        )
            .into_response(),
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "model": state.handler.predictor().name(),
        "metrics": state.metrics.snapshot(),
    }))
}
