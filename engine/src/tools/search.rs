//! Web search tool
//!
//! Looks up short background text for a label through the DuckDuckGo
//! instant-answer API. Either a single `query` or a list of `predictions`
//! can be looked up; healthy labels are answered locally.

use crew_sdk::errors::EngineError;
use crew_sdk::{Tool, ToolInput, ToolOutput};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::enrich_predictions;
use crate::config::SearchConfig;

pub const NO_INFO: &str = "No info found online.";

#[derive(Debug)]
pub struct WebSearchTool {
    base_url: String,
    query_suffix: String,
    healthy_message: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,

    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: Option<String>,
}

impl WebSearchTool {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            query_suffix: String::new(),
            healthy_message: SearchConfig::default().healthy_message,
            client,
        })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self, EngineError> {
        let mut tool = Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        tool.query_suffix = config.query_suffix.clone();
        tool.healthy_message = config.healthy_message.clone();
        Ok(tool)
    }

    /// Background text for one label
    pub fn lookup(&self, label: &str) -> Result<String, EngineError> {
        if is_healthy(label) {
            debug!("Label '{}' is healthy, skipping search", label);
            return Ok(self.healthy_message.clone());
        }

        let query = format!("{} {}", label.replace('_', " "), self.query_suffix)
            .trim()
            .to_string();
        self.search(&query)
    }

    /// Raw instant-answer search
    pub fn search(&self, query: &str) -> Result<String, EngineError> {
        info!("Searching online for '{}'", query);

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::ExternalService(format!("Search timed out for '{}'", query))
                } else {
                    EngineError::ExternalService(format!("Search request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(EngineError::ExternalService(format!(
                "Search backend returned {}",
                response.status()
            )));
        }

        let answer: InstantAnswer = response.json().map_err(|e| {
            EngineError::ExternalService(format!("Invalid search response: {}", e))
        })?;

        Ok(answer.best_text().unwrap_or_else(|| NO_INFO.to_string()))
    }
}

impl InstantAnswer {
    fn best_text(self) -> Option<String> {
        if !self.abstract_text.trim().is_empty() {
            return Some(self.abstract_text);
        }
        self.related_topics
            .into_iter()
            .filter_map(|topic| topic.text)
            .find(|text| !text.trim().is_empty())
    }
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "WebsiteSearchTool"
    }

    fn description(&self) -> &str {
        "Search online for information about a detected label"
    }

    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError> {
        if let Some(query) = input.param_str_opt("query") {
            let info = self.lookup(&query)?;
            return Ok(ToolOutput::empty().with_field("info", Value::String(info)));
        }

        let label_field = input
            .param_str_opt("label_field")
            .unwrap_or_else(|| "disease".to_string());
        let info_field = input
            .param_str_opt("info_field")
            .unwrap_or_else(|| "info".to_string());

        let predictions =
            enrich_predictions(input, &label_field, &info_field, |label| self.lookup(label))?;
        Ok(ToolOutput::empty().with_field("predictions", Value::Array(predictions)))
    }
}

/// True when "healthy" appears as its own token, so `Wheat_healthy`
/// matches and `Unhealthy tissue` does not.
fn is_healthy(label: &str) -> bool {
    label
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token.eq_ignore_ascii_case("healthy"))
}
