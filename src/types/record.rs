//! Fixed-schema single-row patient record consumed by predictors.

use crate::types::patient::{
    Appetite, Categorical, Gender, PatientForm, Presence, PusCell, YesNo,
};

/// Cell value of a patient record.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(f64),
    Category(&'static str),
    /// Unobserved value; encoded as quiet NaN
    Missing,
}

/// Kind of a model input column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Numeric,
    /// Closed label set; encoded as the label's index
    Categorical(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

const fn numeric(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Numeric,
    }
}

const fn categorical(name: &'static str, levels: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Categorical(levels),
    }
}

/// Lab fields the form never collects.
pub const MISSING_LAB_COLUMNS: [&str; 3] = [
    "packed_cell_volume",
    "white_blood_cell_count",
    "red_blood_cell_count",
];

/// Model input schema, in the column order the model was trained with.
pub const RECORD_SCHEMA: [ColumnSpec; 24] = [
    numeric("age"),
    categorical("gender", Gender::LEVELS),
    numeric("blood_pressure"),
    numeric("specific_gravity"),
    numeric("albumin"),
    numeric("sugar"),
    categorical("pus_cell", PusCell::LEVELS),
    categorical("pus_cell_clumps", Presence::LEVELS),
    categorical("bacteria", Presence::LEVELS),
    numeric("blood_glucose_random"),
    numeric("blood_urea"),
    numeric("serum_creatinine"),
    numeric("sodium"),
    numeric("potassium"),
    numeric("hemoglobin"),
    numeric("packed_cell_volume"),
    numeric("white_blood_cell_count"),
    numeric("red_blood_cell_count"),
    categorical("hypertension", YesNo::LEVELS),
    categorical("diabetes_mellitus", YesNo::LEVELS),
    categorical("coronary_artery_disease", YesNo::LEVELS),
    categorical("appetite", Appetite::LEVELS),
    categorical("anemia", YesNo::LEVELS),
    categorical("pedal_edema", YesNo::LEVELS),
];

/// One patient's feature row. Built per submission, consumed once, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    columns: Vec<(String, FeatureValue)>,
}

impl PatientRecord {
    /// Assemble the model row from a form, filling uncollected lab fields
    /// with [`FeatureValue::Missing`].
    pub fn from_form(form: &PatientForm) -> Self {
        use FeatureValue::{Category, Missing, Number};

        let columns = vec![
            ("age", Number(form.age as f64)),
            ("gender", Category(form.gender.label())),
            ("blood_pressure", Number(form.blood_pressure as f64)),
            ("specific_gravity", Number(form.specific_gravity)),
            ("albumin", Number(f64::from(form.albumin))),
            ("sugar", Number(f64::from(form.sugar))),
            ("pus_cell", Category(form.pus_cell.label())),
            ("pus_cell_clumps", Category(form.pus_cell_clumps.label())),
            ("bacteria", Category(form.bacteria.label())),
            ("blood_glucose_random", Number(form.blood_glucose_random as f64)),
            ("blood_urea", Number(form.blood_urea as f64)),
            ("serum_creatinine", Number(form.serum_creatinine)),
            ("sodium", Number(form.sodium as f64)),
            ("potassium", Number(form.potassium)),
            ("hemoglobin", Number(form.hemoglobin)),
            ("packed_cell_volume", Missing),
            ("white_blood_cell_count", Missing),
            ("red_blood_cell_count", Missing),
            ("hypertension", Category(form.hypertension.label())),
            ("diabetes_mellitus", Category(form.diabetes_mellitus.label())),
            (
                "coronary_artery_disease",
                Category(form.coronary_artery_disease.label()),
            ),
            ("appetite", Category(form.appetite.label())),
            ("anemia", Category(form.anemia.label())),
            ("pedal_edema", Category(form.pedal_edema.label())),
        ];

        Self {
            columns: columns
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Build a record from arbitrary columns. No schema check happens here;
    /// predictors reject rows that do not match their schema.
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, FeatureValue)>,
        S: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn without(mut self, name: &str) -> Self {
        self.columns.retain(|(column, _)| column != name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_matches_schema_order() {
        let record = PatientRecord::from_form(&PatientForm::default());
        let names: Vec<&str> = record.column_names().collect();
        let schema: Vec<&str> = RECORD_SCHEMA.iter().map(|c| c.name).collect();
        assert_eq!(names, schema);
        assert_eq!(record.len(), 24);
    }

    #[test]
    fn test_uncollected_labs_are_missing() {
        let forms = [
            PatientForm::default(),
            PatientForm {
                age: 0,
                hemoglobin: 0.0,
                anemia: YesNo::Yes,
                ..Default::default()
            },
        ];

        for form in &forms {
            let record = PatientRecord::from_form(form);
            for column in MISSING_LAB_COLUMNS {
                assert_eq!(record.get(column), Some(&FeatureValue::Missing));
            }
        }
    }

    #[test]
    fn test_form_values_carried_over() {
        let form = PatientForm {
            age: 63,
            serum_creatinine: 2.4,
            albumin: 2,
            pedal_edema: YesNo::Yes,
            ..Default::default()
        };
        let record = PatientRecord::from_form(&form);

        assert_eq!(record.get("age"), Some(&FeatureValue::Number(63.0)));
        assert_eq!(record.get("serum_creatinine"), Some(&FeatureValue::Number(2.4)));
        assert_eq!(record.get("albumin"), Some(&FeatureValue::Number(2.0)));
        assert_eq!(record.get("pedal_edema"), Some(&FeatureValue::Category("yes")));
        assert_eq!(record.get("gender"), Some(&FeatureValue::Category("male")));
    }

    #[test]
    fn test_without_drops_column() {
        let record = PatientRecord::from_form(&PatientForm::default()).without("sodium");
        assert_eq!(record.len(), 23);
        assert!(record.get("sodium").is_none());
    }
}
