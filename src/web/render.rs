//! HTML rendering of the intake form and prediction results

use crate::types::patient::{
    NumericField, PatientForm, SelectField, ALBUMIN, ANEMIA, APPETITE, BACTERIA,
    CORONARY_ARTERY_DISEASE, DIABETES_MELLITUS, GENDER, HYPERTENSION, PEDAL_EDEMA, PUS_CELL,
    PUS_CELL_CLUMPS, SUGAR,
};
use crate::types::report::{DisplayResult, Verdict};

const TITLE: &str = "🩺 Chronic Kidney Disease (CKD) Risk Predictor";

const STYLE: &str = "body{font-family:sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem}\
.columns{display:flex;gap:2rem}.columns>div{flex:1}\
label{display:block;margin-top:.6rem;font-size:.9rem}\
input,select{width:100%;padding:.3rem;box-sizing:border-box}\
button{margin-top:1rem;padding:.5rem 1.5rem}\
.metric{font-size:2rem;font-weight:bold}\
.error{background:#fde8e8;color:#9b1c1c;padding:.8rem;border-radius:4px}\
.success{background:#e6f6ec;color:#1c6b3a;padding:.8rem;border-radius:4px}";

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
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

fn number_input(field: &NumericField, value: f64) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\
<input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" required>",
        name = field.name,
        label = escape_html(field.label),
        min = field.format(field.min),
        max = field.format(field.max),
        step = field.step,
        value = field.format(value),
    )
}

fn select_input(field: &SelectField, selected: Option<&str>) -> String {
    let options: String = field
        .options
        .iter()
        .map(|option| {
            let marker = if Some(*option) == selected { " selected" } else { "" };
            format!("<option value=\"{option}\"{marker}>{option}</option>")
        })
        .collect();

    format!(
        "<label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\">{options}</select>",
        name = field.name,
        label = escape_html(field.label),
    )
}

fn select_for(form: &PatientForm, field: &SelectField) -> String {
    let selected = form.selected(field.name);
    select_input(field, selected.as_deref())
}

/// The intake form, pre-filled with `form`'s values.
pub fn form_section(form: &PatientForm) -> String {
    let numeric = form.numeric_values();
    let input = |name: &str| {
        numeric
            .iter()
            .find(|(field, _)| field.name == name)
            .map(|(field, value)| number_input(field, *value))
            .unwrap_or_default()
    };

    let left = [
        input("age"),
        select_for(form, &GENDER),
        input("blood_pressure"),
        input("specific_gravity"),
        select_for(form, &ALBUMIN),
        select_for(form, &SUGAR),
        select_for(form, &PUS_CELL),
        select_for(form, &PUS_CELL_CLUMPS),
    ]
    .concat();

    let right = [
        select_for(form, &BACTERIA),
        input("blood_glucose_random"),
        input("blood_urea"),
        input("serum_creatinine"),
        input("sodium"),
        input("potassium"),
        input("hemoglobin"),
    ]
    .concat();

    let history = [
        select_for(form, &APPETITE),
        select_for(form, &HYPERTENSION),
        select_for(form, &DIABETES_MELLITUS),
        select_for(form, &CORONARY_ARTERY_DISEASE),
        select_for(form, &ANEMIA),
        select_for(form, &PEDAL_EDEMA),
    ]
    .concat();

    format!(
        "<form method=\"post\" action=\"/predict\">\
<div class=\"columns\"><div>{left}</div><div>{right}</div></div>\
{history}<button type=\"submit\">Predict</button></form>"
    )
}

/// The result block for one submission.
pub fn result_section(result: &DisplayResult) -> String {
    match result {
        DisplayResult::Prediction(report) => {
            let class = match report.verdict {
                Verdict::Positive => "error",
                Verdict::Negative => "success",
            };
            format!(
                "<section id=\"result\"><div>CKD Probability</div>\
<div class=\"metric\">{percent}</div><p class=\"{class}\">{verdict}</p></section>",
                percent = report.probability_percent(),
                verdict = report.verdict.description(),
            )
        }
        DisplayResult::Rejected(violations) => {
            let items: String = violations
                .iter()
                .map(|v| format!("<li>{}</li>", escape_html(&v.to_string())))
                .collect();
            format!(
                "<section id=\"result\" class=\"error\"><p>Please correct the following fields:</p><ul>{items}</ul></section>"
            )
        }
        DisplayResult::Failed(message) => format!(
            "<section id=\"result\" class=\"error\">⚠️ {}</section>",
            escape_html(message)
        ),
    }
}

/// Full page: form plus an optional result block.
pub fn page(form: &PatientForm, result: Option<&DisplayResult>) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<title>CKD Predictor</title><style>{STYLE}</style></head><body>\
<h1>{TITLE}</h1><p>Enter patient details and click <strong>Predict</strong> to check CKD risk.</p>\
{form}{result}</body></html>",
        form = form_section(form),
        result = result.map(result_section).unwrap_or_default(),
    )
}
