//! Dense feature encoding of patient records for model inference.
//!
//! Columns are emitted in the exact order of [`RECORD_SCHEMA`], which is the
//! order the model artifacts were exported with.

use crate::error::PredictionError;
use crate::types::record::{ColumnKind, FeatureValue, PatientRecord, RECORD_SCHEMA};

/// Transforms patient records into `f32` model input rows.
///
/// Numeric cells are cast, categorical labels become the index of the label
/// in the column's level list, missing cells become quiet NaN.
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a record into a feature row.
    ///
    /// Fails on a missing or unknown column, an unknown categorical label,
    /// or a value of the wrong kind.
    pub fn encode(&self, record: &PatientRecord) -> Result<Vec<f32>, PredictionError> {
        if let Some(extra) = record
            .column_names()
            .find(|name| !RECORD_SCHEMA.iter().any(|c| c.name == *name))
        {
            return Err(PredictionError::UnexpectedColumn(extra.to_string()));
        }

        let mut features = Vec::with_capacity(RECORD_SCHEMA.len());

        for column in &RECORD_SCHEMA {
            let value = record
                .get(column.name)
                .ok_or(PredictionError::MissingColumn(column.name))?;

            let encoded = match (column.kind, value) {
                (_, FeatureValue::Missing) => f32::NAN,
                (ColumnKind::Numeric, FeatureValue::Number(x)) => *x as f32,
                (ColumnKind::Categorical(levels), FeatureValue::Category(label)) => levels
                    .iter()
                    .position(|level| level == label)
                    .ok_or_else(|| PredictionError::UnknownCategory {
                        column: column.name,
                        value: label.to_string(),
                    })? as f32,
                (ColumnKind::Numeric, FeatureValue::Category(_)) => {
                    return Err(PredictionError::TypeMismatch {
                        column: column.name,
                        expected: "numeric",
                    })
                }
                (ColumnKind::Categorical(_), FeatureValue::Number(_)) => {
                    return Err(PredictionError::TypeMismatch {
                        column: column.name,
                        expected: "categorical",
                    })
                }
            };

            features.push(encoded);
        }

        Ok(features)
    }

    pub fn feature_count(&self) -> usize {
        RECORD_SCHEMA.len()
    }

    /// Feature names in encoding order.
    pub fn feature_names(&self) -> Vec<&'static str> {
        RECORD_SCHEMA.iter().map(|c| c.name).collect()
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::patient::{PatientForm, PusCell, YesNo};

    #[test]
    fn test_encode_defaults() {
        let encoder = FeatureEncoder::new();
        let record = PatientRecord::from_form(&PatientForm::default());

        let features = encoder.encode(&record).unwrap();

        assert_eq!(features.len(), encoder.feature_count());
        assert_eq!(features[0], 50.0); // age
        assert_eq!(features[1], 0.0); // gender: male
        assert_eq!(features[2], 120.0); // blood_pressure
        assert!((features[3] - 1.015).abs() < 1e-6); // specific_gravity
        assert_eq!(features[12], 140.0); // sodium
    }

    #[test]
    fn test_missing_labs_encode_as_nan() {
        let encoder = FeatureEncoder::new();
        let features = encoder
            .encode(&PatientRecord::from_form(&PatientForm::default()))
            .unwrap();

        assert!(features[15].is_nan());
        assert!(features[16].is_nan());
        assert!(features[17].is_nan());
        assert_eq!(features.iter().filter(|f| f.is_nan()).count(), 3);
    }

    #[test]
    fn test_categorical_index_encoding() {
        let form = PatientForm {
            pus_cell: PusCell::Abnormal,
            hypertension: YesNo::Yes,
            ..Default::default()
        };
        let features = FeatureEncoder::new()
            .encode(&PatientRecord::from_form(&form))
            .unwrap();

        assert_eq!(features[6], 1.0); // pus_cell
        assert_eq!(features[18], 1.0); // hypertension
        assert_eq!(features[19], 0.0); // diabetes_mellitus
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let record = PatientRecord::from_form(&PatientForm::default()).without("hemoglobin");
        let err = FeatureEncoder::new().encode(&record).unwrap_err();
        assert_eq!(err, PredictionError::MissingColumn("hemoglobin"));
    }

    #[test]
    fn test_unexpected_and_mistyped_columns() {
        let encoder = FeatureEncoder::new();

        let extra = PatientRecord::from_columns(vec![("bmi", FeatureValue::Number(24.0))]);
        assert_eq!(
            encoder.encode(&extra).unwrap_err(),
            PredictionError::UnexpectedColumn("bmi".to_string())
        );

        let mut columns: Vec<(String, FeatureValue)> = Vec::new();
        let base = PatientRecord::from_form(&PatientForm::default());
        for name in base.column_names() {
            let value = if name == "gender" {
                FeatureValue::Category("unknown")
            } else {
                base.get(name).cloned().unwrap()
            };
            columns.push((name.to_string(), value));
        }
        let err = encoder
            .encode(&PatientRecord::from_columns(columns))
            .unwrap_err();
        assert!(matches!(err, PredictionError::UnknownCategory { column: "gender", .. }));
    }

    #[test]
    fn test_feature_names() {
        let encoder = FeatureEncoder::new();
        let names = encoder.feature_names();
        assert_eq!(names.len(), 24);
        assert_eq!(names[0], "age");
        assert_eq!(names[23], "pedal_edema");
    }
}
