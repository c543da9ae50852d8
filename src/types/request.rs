//! Prediction request schema and field-level validation

use crate::error::FieldError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationErrors};

pub const COMPANIES: &str = "Companies";
pub const JOB_TITLE: &str = "Job_Title";
pub const EDUCATIONAL_DEGREE: &str = "Educational_Degree";
pub const EXPERIENCE_YEARS: &str = "Experience_Years";
pub const NUMBER_OF_SKILLS: &str = "Number_of_Skills";

/// Applicant attributes submitted to `/predict`.
///
/// Field names on the wire match the API contract exactly. The same struct is
/// echoed back as the `input` member of the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    #[serde(rename = "Companies")]
    pub companies: String,

    #[serde(rename = "Job_Title")]
    pub job_title: String,

    #[serde(rename = "Educational_Degree")]
    pub educational_degree: String,

    #[serde(rename = "Experience_Years")]
    #[validate(range(min = 0.0))]
    pub experience_years: f64,

    #[serde(rename = "Number_of_Skills")]
    #[validate(range(min = 0))]
    pub number_of_skills: i64,
}

impl PredictionRequest {
    /// Parse and validate a decoded JSON body.
    ///
    /// Every problem is collected so callers see all invalid fields at once.
    pub fn from_json(body: Value) -> Result<Self, Vec<FieldError>> {
        let Value::Object(map) = body else {
            return Err(vec![FieldError::body(
                "model_attributes_type",
                "Input should be a valid dictionary",
            )]);
        };

        let mut errors = Vec::new();
        let companies = text_field(&map, COMPANIES, &mut errors);
        let job_title = text_field(&map, JOB_TITLE, &mut errors);
        let educational_degree = text_field(&map, EDUCATIONAL_DEGREE, &mut errors);
        let experience_years = number_field(&map, EXPERIENCE_YEARS, &mut errors);
        let number_of_skills = integer_field(&map, NUMBER_OF_SKILLS, &mut errors);

        let request = match (
            companies,
            job_title,
            educational_degree,
            experience_years,
            number_of_skills,
        ) {
            (Some(companies), Some(job_title), Some(educational_degree), Some(experience_years), Some(number_of_skills))
                if errors.is_empty() =>
            {
                Self {
                    companies,
                    job_title,
                    educational_degree,
                    experience_years,
                    number_of_skills,
                }
            }
            _ => return Err(errors),
        };

        request.validate().map_err(range_errors)?;
        Ok(request)
    }
}

fn lookup<'a>(
    map: &'a Map<String, Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a Value> {
    match map.get(field) {
        Some(value) => Some(value),
        None => {
            errors.push(FieldError::new(field, "missing", "Field required"));
            None
        }
    }
}

fn text_field(map: &Map<String, Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    match lookup(map, field, errors)? {
        Value::String(s) => Some(s.clone()),
        _ => {
            errors.push(FieldError::new(field, "string_type", "Input should be a valid string"));
            None
        }
    }
}

fn number_field(map: &Map<String, Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    match lookup(map, field, errors)?.as_f64() {
        Some(n) => Some(n),
        None => {
            errors.push(FieldError::new(field, "float_type", "Input should be a valid number"));
            None
        }
    }
}

fn integer_field(map: &Map<String, Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<i64> {
    let value = lookup(map, field, errors)?;
    match value.as_i64() {
        Some(n) => Some(n),
        // Integers past i64::MAX arrive as u64
        None if value.is_u64() => {
            errors.push(FieldError::new(
                field,
                "less_than_equal",
                format!("Input should be less than or equal to {}", i64::MAX),
            ));
            None
        }
        None => {
            errors.push(FieldError::new(field, "int_type", "Input should be a valid integer"));
            None
        }
    }
}

/// Struct field name to wire name.
fn wire_name(field: &str) -> &str {
    match field {
        "companies" => COMPANIES,
        "job_title" => JOB_TITLE,
        "educational_degree" => EDUCATIONAL_DEGREE,
        "experience_years" => EXPERIENCE_YEARS,
        "number_of_skills" => NUMBER_OF_SKILLS,
        other => other,
    }
}

fn range_errors(errors: ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .map(|(field, _)| {
            FieldError::new(
                wire_name(field),
                "greater_than_equal",
                "Input should be greater than or equal to 0",
            )
        })
        .collect();
    out.sort_by(|a, b| a.loc.cmp(&b.loc));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "Companies": "Google",
            "Job_Title": "Software Developer",
            "Educational_Degree": "B.Tech",
            "Experience_Years": 5.0,
            "Number_of_Skills": 4
        })
    }

    #[test]
    fn test_valid_request() {
        let request = PredictionRequest::from_json(sample()).unwrap();
        assert_eq!(request.companies, "Google");
        assert_eq!(request.job_title, "Software Developer");
        assert_eq!(request.educational_degree, "B.Tech");
        assert_eq!(request.experience_years, 5.0);
        assert_eq!(request.number_of_skills, 4);
    }

    #[test]
    fn test_integer_experience_accepted() {
        let mut body = sample();
        body["Experience_Years"] = json!(3);
        let request = PredictionRequest::from_json(body).unwrap();
        assert_eq!(request.experience_years, 3.0);
    }

    #[test]
    fn test_missing_field_reported() {
        let mut body = sample();
        body.as_object_mut().unwrap().remove("Experience_Years");

        let errors = PredictionRequest::from_json(body).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("Experience_Years"));
        assert_eq!(errors[0].kind, "missing");
    }

    #[test]
    fn test_null_and_wrong_types_all_reported() {
        let body = json!({
            "Companies": null,
            "Job_Title": 7,
            "Educational_Degree": "B.Tech",
            "Experience_Years": "five",
            "Number_of_Skills": 2.5
        });

        let errors = PredictionRequest::from_json(body).unwrap_err();
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
        assert_eq!(
            fields,
            vec!["Companies", "Job_Title", "Experience_Years", "Number_of_Skills"]
        );
        assert_eq!(errors[0].kind, "string_type");
        assert_eq!(errors[2].kind, "float_type");
        assert_eq!(errors[3].kind, "int_type");
    }

    #[test]
    fn test_negative_values_rejected() {
        let mut body = sample();
        body["Experience_Years"] = json!(-1.5);
        body["Number_of_Skills"] = json!(-2);

        let errors = PredictionRequest::from_json(body).unwrap_err();
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
        assert_eq!(fields, vec!["Experience_Years", "Number_of_Skills"]);
        assert!(errors.iter().all(|e| e.kind == "greater_than_equal"));
    }

    #[test]
    fn test_oversized_skill_count_rejected_as_out_of_range() {
        let mut body = sample();
        body["Number_of_Skills"] = json!(u64::MAX);

        let errors = PredictionRequest::from_json(body).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), Some("Number_of_Skills"));
        assert_eq!(errors[0].kind, "less_than_equal");
        assert!(errors[0].msg.contains("9223372036854775807"));
    }

    #[test]
    fn test_non_object_body_rejected() {
        let errors = PredictionRequest::from_json(json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field(), None);
    }

    #[test]
    fn test_echo_uses_wire_names() {
        let request = PredictionRequest::from_json(sample()).unwrap();
        let echoed = serde_json::to_value(&request).unwrap();
        assert_eq!(echoed, sample());
    }
}
