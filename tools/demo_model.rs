//! Demonstration model writer
//!
//! Writes the hand-set logistic artifact to disk so the service can run
//! without a trained model, then scores a batch of random valid patients
//! through the submission handler.
//!
//! Usage: demo_model [output_path] [count]

use ckd_predictor::{
    config::ModelFormat,
    metrics::SubmissionMetrics,
    models::{LinearModelArtifact, ModelLoader},
    types::patient::{
        Appetite, Gender, PatientForm, Presence, PusCell, YesNo, BLOOD_GLUCOSE_RANDOM,
        BLOOD_UREA, HEMOGLOBIN, POTASSIUM, SERUM_CREATININE, SODIUM, SPECIFIC_GRAVITY,
    },
    DisplayResult, SubmissionHandler,
};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Random patient generator over the declared form domains
struct PatientGenerator {
    rng: ThreadRng,
}

impl PatientGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    fn yes_no(&mut self, p: f64) -> YesNo {
        if self.rng.gen_bool(p) {
            YesNo::Yes
        } else {
            YesNo::No
        }
    }

    fn presence(&mut self, p: f64) -> Presence {
        if self.rng.gen_bool(p) {
            Presence::Present
        } else {
            Presence::Absent
        }
    }

    /// Round to the field's widget precision
    fn decimal(&mut self, low: f64, high: f64, decimals: usize) -> f64 {
        let factor = 10f64.powi(decimals as i32);
        (self.rng.gen_range(low..=high) * factor).round() / factor
    }

    fn generate(&mut self) -> PatientForm {
        PatientForm {
            age: self.rng.gen_range(18..=90),
            gender: if self.rng.gen_bool(0.5) {
                Gender::Male
            } else {
                Gender::Female
            },
            blood_pressure: self.rng.gen_range(90..=190),
            specific_gravity: self.decimal(1.005, 1.025, SPECIFIC_GRAVITY.decimals),
            albumin: self.rng.gen_range(0..=4),
            sugar: self.rng.gen_range(0..=3),
            pus_cell: if self.rng.gen_bool(0.2) {
                PusCell::Abnormal
            } else {
                PusCell::Normal
            },
            pus_cell_clumps: self.presence(0.1),
            bacteria: self.presence(0.06),
            blood_glucose_random: self.rng.gen_range(70..=BLOOD_GLUCOSE_RANDOM.max as i64 / 2),
            blood_urea: self.rng.gen_range(10..=BLOOD_UREA.max as i64 / 3),
            serum_creatinine: self.decimal(0.5, 12.0, SERUM_CREATININE.decimals),
            sodium: self.rng.gen_range(120..=SODIUM.max as i64 * 3 / 4),
            potassium: self.decimal(3.0, 7.0, POTASSIUM.decimals),
            hemoglobin: self.decimal(6.0, HEMOGLOBIN.max * 0.6, HEMOGLOBIN.decimals),
            appetite: if self.rng.gen_bool(0.2) {
                Appetite::Poor
            } else {
                Appetite::Good
            },
            hypertension: self.yes_no(0.37),
            diabetes_mellitus: self.yes_no(0.34),
            coronary_artery_disease: self.yes_no(0.08),
            anemia: self.yes_no(0.15),
            pedal_edema: self.yes_no(0.19),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("demo_model=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let output = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("models/demo_linear.json");
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);

    let output = Path::new(output);
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let artifact = LinearModelArtifact::demonstration();
    std::fs::write(output, serde_json::to_string_pretty(&artifact)?)?;
    info!(path = %output.display(), model = %artifact.name, "Demonstration artifact written");

    // Load back through the regular loader to prove the file is usable
    let predictor = ModelLoader::default().load(output, ModelFormat::Linear)?;
    let metrics = Arc::new(SubmissionMetrics::new());
    let handler = SubmissionHandler::new(predictor, metrics.clone());

    let mut generator = PatientGenerator::new();
    for i in 0..count {
        let form = generator.generate();
        match handler.handle_submission(&form) {
            DisplayResult::Prediction(report) => info!(
                sample = i + 1,
                age = form.age,
                serum_creatinine = form.serum_creatinine,
                hemoglobin = form.hemoglobin,
                probability = %report.probability_percent(),
                verdict = %report.verdict,
                "Scored sample patient"
            ),
            other => warn!(sample = i + 1, result = ?other, "Sample patient not scored"),
        }
    }

    metrics.print_summary();
    Ok(())
}
