//! Patient form input for CKD risk prediction.
//!
//! The form mirrors the clinical intake widgets: nine bounded numeric
//! measurements, two ordinal urine grades and ten two-valued categorical
//! findings. Every field has a form default so partial submissions are
//! completed the same way the input widgets would complete them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed two-valued enumeration collected by a select widget.
pub trait Categorical: Copy {
    /// Labels in the order the form lists them. The first entry is the default.
    const LEVELS: &'static [&'static str];

    /// Wire label of this value.
    fn label(self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

impl Categorical for Gender {
    const LEVELS: &'static [&'static str] = &["male", "female"];

    fn label(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Pus cell morphology in urine microscopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PusCell {
    #[default]
    Normal,
    Abnormal,
}

impl Categorical for PusCell {
    const LEVELS: &'static [&'static str] = &["normal", "abnormal"];

    fn label(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Abnormal => "abnormal",
        }
    }
}

/// Presence of a urine finding (pus cell clumps, bacteria).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Absent,
    Present,
}

impl Categorical for Presence {
    const LEVELS: &'static [&'static str] = &["absent", "present"];

    fn label(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Present => "present",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appetite {
    #[default]
    Good,
    Poor,
}

impl Categorical for Appetite {
    const LEVELS: &'static [&'static str] = &["good", "poor"];

    fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Poor => "poor",
        }
    }
}

/// Yes/no comorbidity flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YesNo {
    #[default]
    No,
    Yes,
}

impl Categorical for YesNo {
    const LEVELS: &'static [&'static str] = &["no", "yes"];

    fn label(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::Yes => "yes",
        }
    }
}

/// Declared domain of a numeric form field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericField {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Decimal places shown by the input widget
    pub decimals: usize,
}

impl NumericField {
    /// Whether `value` is finite and inside the closed domain.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }

    /// Format a value with this field's precision.
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.decimals, value)
    }
}

/// Declared options of a select form field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectField {
    pub name: &'static str,
    pub label: &'static str,
    pub options: &'static [&'static str],
}

pub const AGE: NumericField = NumericField {
    name: "age",
    label: "Age",
    min: 0.0,
    max: 120.0,
    step: 1.0,
    decimals: 0,
};
pub const BLOOD_PRESSURE: NumericField = NumericField {
    name: "blood_pressure",
    label: "Systolic BP (mmHg)",
    min: 0.0,
    max: 300.0,
    step: 1.0,
    decimals: 0,
};
pub const SPECIFIC_GRAVITY: NumericField = NumericField {
    name: "specific_gravity",
    label: "Specific gravity (urine)",
    min: 1.000,
    max: 1.040,
    step: 0.001,
    decimals: 3,
};
pub const BLOOD_GLUCOSE_RANDOM: NumericField = NumericField {
    name: "blood_glucose_random",
    label: "Random blood glucose (mg/dL)",
    min: 0.0,
    max: 1000.0,
    step: 1.0,
    decimals: 0,
};
pub const BLOOD_UREA: NumericField = NumericField {
    name: "blood_urea",
    label: "Blood urea (mg/dL)",
    min: 0.0,
    max: 500.0,
    step: 1.0,
    decimals: 0,
};
pub const SERUM_CREATININE: NumericField = NumericField {
    name: "serum_creatinine",
    label: "Serum creatinine (mg/dL)",
    min: 0.0,
    max: 50.0,
    step: 0.01,
    decimals: 2,
};
pub const SODIUM: NumericField = NumericField {
    name: "sodium",
    label: "Sodium (mEq/L)",
    min: 0.0,
    max: 200.0,
    step: 1.0,
    decimals: 0,
};
pub const POTASSIUM: NumericField = NumericField {
    name: "potassium",
    label: "Potassium (mEq/L)",
    min: 0.0,
    max: 20.0,
    step: 0.01,
    decimals: 2,
};
pub const HEMOGLOBIN: NumericField = NumericField {
    name: "hemoglobin",
    label: "Hemoglobin (g/dL)",
    min: 0.0,
    max: 30.0,
    step: 0.01,
    decimals: 2,
};

/// Highest albumin/sugar grade.
pub const MAX_GRADE: u8 = 5;
pub const GRADE_OPTIONS: &[&str] = &["0", "1", "2", "3", "4", "5"];

pub const ALBUMIN: SelectField = SelectField {
    name: "albumin",
    label: "Albumin (0–5)",
    options: GRADE_OPTIONS,
};
pub const SUGAR: SelectField = SelectField {
    name: "sugar",
    label: "Sugar in urine (0–5)",
    options: GRADE_OPTIONS,
};
pub const GENDER: SelectField = SelectField {
    name: "gender",
    label: "Gender",
    options: Gender::LEVELS,
};
pub const PUS_CELL: SelectField = SelectField {
    name: "pus_cell",
    label: "Pus cell",
    options: PusCell::LEVELS,
};
pub const PUS_CELL_CLUMPS: SelectField = SelectField {
    name: "pus_cell_clumps",
    label: "Pus cell clumps",
    options: Presence::LEVELS,
};
pub const BACTERIA: SelectField = SelectField {
    name: "bacteria",
    label: "Bacteria in urine",
    options: Presence::LEVELS,
};
pub const APPETITE: SelectField = SelectField {
    name: "appetite",
    label: "Appetite",
    options: Appetite::LEVELS,
};
pub const HYPERTENSION: SelectField = SelectField {
    name: "hypertension",
    label: "Hypertension",
    options: YesNo::LEVELS,
};
pub const DIABETES_MELLITUS: SelectField = SelectField {
    name: "diabetes_mellitus",
    label: "Diabetes",
    options: YesNo::LEVELS,
};
pub const CORONARY_ARTERY_DISEASE: SelectField = SelectField {
    name: "coronary_artery_disease",
    label: "Coronary artery disease",
    options: YesNo::LEVELS,
};
pub const ANEMIA: SelectField = SelectField {
    name: "anemia",
    label: "Anemia",
    options: YesNo::LEVELS,
};
pub const PEDAL_EDEMA: SelectField = SelectField {
    name: "pedal_edema",
    label: "Pedal edema",
    options: YesNo::LEVELS,
};

/// A single out-of-domain form field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The submission body could not be decoded at all.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new("body", message)
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Raw field values captured from the intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientForm {
    /// Age in years
    pub age: i64,
    pub gender: Gender,
    /// Systolic blood pressure in mmHg
    pub blood_pressure: i64,
    /// Urine specific gravity
    pub specific_gravity: f64,
    /// Urine albumin grade (0-5)
    pub albumin: u8,
    /// Urine sugar grade (0-5)
    pub sugar: u8,
    pub pus_cell: PusCell,
    pub pus_cell_clumps: Presence,
    pub bacteria: Presence,
    /// mg/dL
    pub blood_glucose_random: i64,
    /// mg/dL
    pub blood_urea: i64,
    /// mg/dL
    pub serum_creatinine: f64,
    /// mEq/L
    pub sodium: i64,
    /// mEq/L
    pub potassium: f64,
    /// g/dL
    pub hemoglobin: f64,
    pub appetite: Appetite,
    pub hypertension: YesNo,
    pub diabetes_mellitus: YesNo,
    pub coronary_artery_disease: YesNo,
    pub anemia: YesNo,
    pub pedal_edema: YesNo,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            age: 50,
            gender: Gender::Male,
            blood_pressure: 120,
            specific_gravity: 1.015,
            albumin: 0,
            sugar: 0,
            pus_cell: PusCell::Normal,
            pus_cell_clumps: Presence::Absent,
            bacteria: Presence::Absent,
            blood_glucose_random: 100,
            blood_urea: 30,
            serum_creatinine: 1.0,
            sodium: 140,
            potassium: 4.0,
            hemoglobin: 14.0,
            appetite: Appetite::Good,
            hypertension: YesNo::No,
            diabetes_mellitus: YesNo::No,
            coronary_artery_disease: YesNo::No,
            anemia: YesNo::No,
            pedal_edema: YesNo::No,
        }
    }
}

impl PatientForm {
    /// Numeric fields paired with their current values, in form order.
    pub fn numeric_values(&self) -> [(NumericField, f64); 9] {
        [
            (AGE, self.age as f64),
            (BLOOD_PRESSURE, self.blood_pressure as f64),
            (SPECIFIC_GRAVITY, self.specific_gravity),
            (BLOOD_GLUCOSE_RANDOM, self.blood_glucose_random as f64),
            (BLOOD_UREA, self.blood_urea as f64),
            (SERUM_CREATININE, self.serum_creatinine),
            (SODIUM, self.sodium as f64),
            (POTASSIUM, self.potassium),
            (HEMOGLOBIN, self.hemoglobin),
        ]
    }

    /// Current label of a select field, or `None` for numeric field names.
    pub fn selected(&self, field: &str) -> Option<String> {
        let label = match field {
            "gender" => self.gender.label(),
            "pus_cell" => self.pus_cell.label(),
            "pus_cell_clumps" => self.pus_cell_clumps.label(),
            "bacteria" => self.bacteria.label(),
            "appetite" => self.appetite.label(),
            "hypertension" => self.hypertension.label(),
            "diabetes_mellitus" => self.diabetes_mellitus.label(),
            "coronary_artery_disease" => self.coronary_artery_disease.label(),
            "anemia" => self.anemia.label(),
            "pedal_edema" => self.pedal_edema.label(),
            "albumin" => return Some(self.albumin.to_string()),
            "sugar" => return Some(self.sugar.to_string()),
            _ => return None,
        };
        Some(label.to_string())
    }

    /// Reject any value outside its declared domain.
    ///
    /// # Errors
    /// Returns one violation per offending field.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let mut errors = Vec::new();

        for (field, value) in self.numeric_values() {
            if !field.contains(value) {
                errors.push(FieldViolation::new(
                    field.name,
                    format!(
                        "{} {} out of range [{}, {}]",
                        field.label,
                        value,
                        field.format(field.min),
                        field.format(field.max)
                    ),
                ));
            }
        }

        for (field, grade) in [(ALBUMIN, self.albumin), (SUGAR, self.sugar)] {
            if grade > MAX_GRADE {
                errors.push(FieldViolation::new(
                    field.name,
                    format!("{} grade {} must be between 0 and {}", field.label, grade, MAX_GRADE),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
