//! Concurrent batch results

use super::errors::ApiError;
use super::request::ResponseEnvelope;

/// Per-request outcomes of [`ApiClient::batch`](super::ApiClient::batch), in
/// input order
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<Result<ResponseEnvelope, ApiError>>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = &ResponseEnvelope> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// Failures with their input index
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ApiError)> {
        self.results.iter().enumerate().filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }
}

impl From<Vec<Result<ResponseEnvelope, ApiError>>> for BatchOutcome {
    fn from(results: Vec<Result<ResponseEnvelope, ApiError>>) -> Self {
        Self { results }
    }
}
