use serde_json::{Value, json};
use tracing::debug;

use crate::http::{default_agent, error_message};
use crate::{EngineError, EngineFault};

use super::SummarizeEngine;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Engine backed by a Hugging Face style inference endpoint.
///
/// Sends `{"inputs", "parameters"}` to `{base_url}/models/{model}` and returns
/// the decoded JSON body untouched. Sampling is disabled so identical input
/// yields identical output.
pub struct HuggingFaceEngine {
    model: String,
    base_url: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl HuggingFaceEngine {
    pub fn new(
        model: &str,
        api_key: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<Self, EngineError> {
        let model = model.trim();
        if model.is_empty() {
            return Err(EngineError::Config("huggingface model must not be empty".into()));
        }
        let base_url = base_url
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let api_key = api_key
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(Self {
            model: model.to_string(),
            base_url,
            api_key,
            agent: default_agent(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }

    fn build_request_body(text: &str, max_length: usize, min_length: usize) -> Value {
        json!({
            "inputs": text,
            "parameters": {
                "max_length": max_length,
                "min_length": min_length,
                "do_sample": false,
            },
            "options": {
                "wait_for_model": true,
            },
        })
    }

    fn parse_response(status: u16, body: &str) -> Result<Value, EngineFault> {
        if !(200..300).contains(&status) {
            return Err(EngineFault::Status {
                status,
                message: error_message(body),
            });
        }
        // Non-JSON success bodies are passed through so the caller can
        // report them as a malformed result.
        Ok(serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string())))
    }
}

impl SummarizeEngine for HuggingFaceEngine {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn summarize(
        &self,
        text: &str,
        max_length: usize,
        min_length: usize,
    ) -> Result<Value, EngineFault> {
        let url = self.endpoint();
        debug!(model = %self.model, max_length, min_length, "calling inference endpoint");

        let mut request = self.agent.post(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", &format!("Bearer {key}"));
        }
        let response = request
            .send_json(Self::build_request_body(text, max_length, min_length))
            .map_err(|e| EngineFault::Network(format!("{e}")))?;

        let status = response.status().as_u16();
        let raw = response
            .into_body()
            .read_to_string()
            .map_err(|e| EngineFault::Network(format!("{e}")))?;

        Self::parse_response(status, &raw)
    }
}
