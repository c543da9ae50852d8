//! Test Prediction Client
//!
//! Generates random applicant profiles and posts them to a running
//! predictor for smoke and load testing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Applicant profile matching the `/predict` request body
#[derive(Debug, Clone, Serialize)]
struct Applicant {
    #[serde(rename = "Companies")]
    companies: String,
    #[serde(rename = "Job_Title")]
    job_title: String,
    #[serde(rename = "Educational_Degree")]
    educational_degree: String,
    #[serde(rename = "Experience_Years")]
    experience_years: f64,
    #[serde(rename = "Number_of_Skills")]
    number_of_skills: u32,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    prediction: u8,
    probability: Option<f64>,
    message: String,
}

/// Applicant generator for testing
struct ApplicantGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ApplicantGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a plausible applicant
    fn generate(&mut self) -> Applicant {
        Applicant {
            companies: self
                .random_choice(&["Google", "Microsoft", "Amazon", "Infosys", "TCS", "Wipro"])
                .to_string(),
            job_title: self
                .random_choice(&[
                    "Software Developer",
                    "Data Scientist",
                    "Data Analyst",
                    "DevOps Engineer",
                    "Product Manager",
                ])
                .to_string(),
            educational_degree: self
                .random_choice(&["B.Tech", "M.Tech", "MBA", "B.Sc", "PhD"])
                .to_string(),
            experience_years: (self.rng.gen_range(0.0..15.0_f64) * 10.0).round() / 10.0,
            number_of_skills: self.rng.gen_range(0..12),
        }
    }

    /// Generate a body the service must reject with 422
    fn generate_invalid(&mut self) -> Value {
        let mut body = match serde_json::to_value(self.generate()) {
            Ok(body) => body,
            Err(_) => return Value::Null,
        };

        if let Some(fields) = body.as_object_mut() {
            match self.rng.gen_range(0..3) {
                0 => {
                    fields.remove("Experience_Years");
                }
                1 => {
                    fields.insert("Number_of_Skills".to_string(), Value::from(-1));
                }
                _ => {
                    fields.insert("Companies".to_string(), Value::Null);
                }
            }
        }
        body
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[derive(Debug, Default)]
struct Tally {
    selected: u64,
    rejected: u64,
    invalid: u64,
    unavailable: u64,
    errors: u64,
    confidence_sum: f64,
    confidence_count: u64,
}

impl Tally {
    async fn record(&mut self, response: reqwest::Response) -> anyhow::Result<()> {
        match response.status().as_u16() {
            200 => {
                let prediction: Prediction = response.json().await?;
                if prediction.prediction == 1 {
                    self.selected += 1;
                } else {
                    self.rejected += 1;
                }
                if let Some(p) = prediction.probability {
                    self.confidence_sum += p;
                    self.confidence_count += 1;
                }
                tracing::debug!(message = %prediction.message, "Prediction received");
            }
            422 => self.invalid += 1,
            503 => self.unavailable += 1,
            status => {
                warn!(status, body = %response.text().await.unwrap_or_default(), "Unexpected response");
                self.errors += 1;
            }
        }
        Ok(())
    }

    fn mean_confidence(&self) -> f64 {
        if self.confidence_count == 0 {
            0.0
        } else {
            self.confidence_sum / self.confidence_count as f64
        }
    }
}

/// Parse a probability argument, clamped to [0, 1]. Unparseable or NaN input yields `default`.
fn parse_rate(arg: Option<&str>, default: f64) -> f64 {
    arg.and_then(|s| s.parse::<f64>().ok())
        .filter(|rate| !rate.is_nan())
        .unwrap_or(default)
        .clamp(0.0, 1.0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:8000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let invalid_rate = parse_rate(args.get(3).map(String::as_str), 0.1);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(50);

    info!(
        base_url = %base_url,
        count = count,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    // Check the service before sending load
    match client.get(format!("{}/health", base_url)).send().await {
        Ok(resp) => {
            let health: Value = resp.json().await?;
            info!(health = %health, "Service reachable");
        }
        Err(e) => {
            warn!(error = %e, "Service unreachable");
            return Err(e.into());
        }
    }

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();
    let mut tally = Tally::default();
    let predict_url = format!("{}/predict", base_url);
    let start = Instant::now();

    info!("Starting to send {} requests...", count);

    for i in 0..count {
        let body = if rng.gen_bool(invalid_rate) {
            generator.generate_invalid()
        } else {
            serde_json::to_value(generator.generate())?
        };

        match client.post(&predict_url).json(&body).send().await {
            Ok(response) => tally.record(response).await?,
            Err(e) => {
                warn!(error = %e, "Request failed");
                tally.errors += 1;
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} selected, {} rejected, {} invalid)",
                i + 1,
                count,
                tally.selected,
                tally.rejected,
                tally.invalid
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let elapsed = start.elapsed().as_secs_f64();
    info!(
        selected = tally.selected,
        rejected = tally.rejected,
        invalid = tally.invalid,
        unavailable = tally.unavailable,
        errors = tally.errors,
        mean_confidence = %format!("{:.3}", tally.mean_confidence()),
        throughput = %format!("{:.1} req/s", count as f64 / elapsed.max(f64::EPSILON)),
        "Completed {} requests",
        count
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate_clamps() {
        assert_eq!(parse_rate(Some("0.25"), 0.1), 0.25);
        assert_eq!(parse_rate(Some("1.5"), 0.1), 1.0);
        assert_eq!(parse_rate(Some("-3"), 0.1), 0.0);
        assert_eq!(parse_rate(Some("inf"), 0.1), 1.0);
    }

    #[test]
    fn test_parse_rate_falls_back_to_default() {
        assert_eq!(parse_rate(None, 0.1), 0.1);
        assert_eq!(parse_rate(Some("often"), 0.1), 0.1);
        assert_eq!(parse_rate(Some("NaN"), 0.1), 0.1);
    }
}
