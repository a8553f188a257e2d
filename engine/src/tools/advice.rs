//! Advice lookup tool
//!
//! Maps a classifier label to fixed farming advice. The built-in table covers
//! wheat growth stages and the harvest disease classes; entries from the
//! settings file are merged over it.

use crew_sdk::errors::EngineError;
use crew_sdk::{Tool, ToolInput, ToolOutput};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::enrich_predictions;
use crate::config::AdviceConfig;

const BUILTIN_ADVICE: &[(&str, &str)] = &[
    (
        "Post flowering",
        "Keep soil moisture steady and scout for foliar diseases; a late nitrogen top-up supports grain protein.",
    ),
    (
        "Filling",
        "Avoid water stress during grain filling and protect the flag leaf from rust and septoria.",
    ),
    (
        "Filling Ripening",
        "Reduce irrigation, monitor grain moisture and prepare harvesting equipment.",
    ),
    (
        "Ripening",
        "Plan the harvest once grain moisture falls below 20% to limit shattering and weather losses.",
    ),
    (
        "Wheat_Loose_Smut",
        "Remove infected heads and sow certified seed treated with a systemic fungicide next season.",
    ),
    (
        "Wheat_crown_root_rot",
        "Rotate with non-host crops, avoid drought stress and bury infected residue.",
    ),
    (
        "Wheat_healthy",
        "No treatment needed. The wheat is healthy.",
    ),
];

#[derive(Debug, Clone)]
pub struct AdviceLookup {
    /// Keyed by lowercased label
    table: HashMap<String, String>,
    fallback: String,
}

impl AdviceLookup {
    /// Lookup over the built-in wheat table
    pub fn new(fallback: impl Into<String>) -> Self {
        let table = BUILTIN_ADVICE
            .iter()
            .map(|(label, advice)| (normalize(label), advice.to_string()))
            .collect();

        Self {
            table,
            fallback: fallback.into(),
        }
    }

    pub fn from_config(config: &AdviceConfig) -> Self {
        let mut lookup = Self::new(config.fallback.clone());
        for (label, advice) in &config.entries {
            lookup.insert(label, advice.clone());
        }
        lookup
    }

    /// Add or replace one entry
    pub fn insert(&mut self, label: &str, advice: impl Into<String>) {
        self.table.insert(normalize(label), advice.into());
    }

    /// Advice for a label, or the fallback text
    pub fn advice_for(&self, label: &str) -> &str {
        match self.table.get(&normalize(label)) {
            Some(advice) => advice,
            None => {
                debug!("No advice entry for '{}'", label);
                &self.fallback
            }
        }
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

impl Tool for AdviceLookup {
    fn name(&self) -> &str {
        "AdviceLookup"
    }

    fn description(&self) -> &str {
        "Give fixed farming advice for a growth stage or disease label"
    }

    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError> {
        if let Some(label) = input.param_str_opt("label") {
            let advice = self.advice_for(&label).to_string();
            return Ok(ToolOutput::empty()
                .with_field("label", Value::String(label))
                .with_field("advice", Value::String(advice)));
        }

        let label_field = input
            .param_str_opt("label_field")
            .unwrap_or_else(|| "label".to_string());
        let advice_field = input
            .param_str_opt("advice_field")
            .unwrap_or_else(|| "advice".to_string());

        let predictions = enrich_predictions(input, &label_field, &advice_field, |label| {
            Ok(self.advice_for(label).to_string())
        })?;
        Ok(ToolOutput::empty().with_field("predictions", Value::Array(predictions)))
    }
}
