//! Feature row construction for pipeline inference.
//!
//! The fitted pipeline was trained on a table whose column names differ from
//! the API field names for two columns (space instead of underscore). This
//! module owns that fixed mapping.

use crate::types::request::PredictionRequest;

pub const COMPANIES: &str = "Companies";
pub const JOB_TITLE: &str = "Job_Title";
pub const EDUCATIONAL_DEGREE: &str = "Educational Degree";
pub const EXPERIENCE_YEARS: &str = "Experience_Years";
pub const NUMBER_OF_SKILLS: &str = "Number of Skills";

/// Column names in training order.
pub const FEATURE_NAMES: [&str; 5] = [
    COMPANIES,
    JOB_TITLE,
    EDUCATIONAL_DEGREE,
    EXPERIENCE_YEARS,
    NUMBER_OF_SKILLS,
];

/// A single cell of the feature row
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Text(String),
    Real(f64),
    Integer(i64),
}

impl FeatureValue {
    pub fn as_text(&self) -> String {
        match self {
            FeatureValue::Text(s) => s.clone(),
            FeatureValue::Real(v) => v.to_string(),
            FeatureValue::Integer(v) => v.to_string(),
        }
    }

    /// Numeric view of the cell; text cells have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Text(_) => None,
            FeatureValue::Real(v) => Some(*v),
            FeatureValue::Integer(v) => Some(*v as f64),
        }
    }
}

/// Single-record table handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(&'static str, FeatureValue)>,
}

impl FeatureRow {
    /// Build the row from a validated request, translating field names.
    pub fn from_request(request: &PredictionRequest) -> Self {
        Self {
            columns: vec![
                (COMPANIES, FeatureValue::Text(request.companies.clone())),
                (JOB_TITLE, FeatureValue::Text(request.job_title.clone())),
                (
                    EDUCATIONAL_DEGREE,
                    FeatureValue::Text(request.educational_degree.clone()),
                ),
                (EXPERIENCE_YEARS, FeatureValue::Real(request.experience_years)),
                (
                    NUMBER_OF_SKILLS,
                    FeatureValue::Integer(request.number_of_skills),
                ),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    pub fn columns(&self) -> &[(&'static str, FeatureValue)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
