//! External classifier tool
//!
//! Runs a configured program once per image, without a shell, and turns its
//! stdout into a prediction. A program may print either a JSON object or a
//! plain label, optionally followed by a confidence such as
//! `Wheat_Loose_Smut (97.31%)`.

use crew_sdk::errors::EngineError;
use crew_sdk::{Record, Tool, ToolError, ToolInput, ToolOutput};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::config::CommandToolConfig;

#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    description: String,
    program: String,
    args: Vec<String>,
    label_field: String,
}

impl CommandTool {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        let name = name.into();
        let program = program.into();
        Self {
            description: format!("Classify images with `{}`", program),
            name,
            program,
            args: Vec::new(),
            label_field: "label".to_string(),
        }
    }

    pub fn from_config(config: &CommandToolConfig) -> Self {
        Self::new(config.name.clone(), config.program.clone())
            .with_args(config.args.clone())
            .with_label_field(config.label_field.clone())
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_label_field(mut self, label_field: impl Into<String>) -> Self {
        self.label_field = label_field.into();
        self
    }

    /// Classify a single image
    pub fn classify(&self, image: &str) -> Result<Record, EngineError> {
        if !Path::new(image).is_file() {
            return Err(EngineError::Retrieval(format!("Image not found: {}", image)));
        }

        info!("Running classifier '{}' on {}", self.name, image);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                EngineError::Inference(format!("Failed to start '{}': {}", self.program, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            warn!("Classifier '{}' failed: {}", self.name, stderr.trim());
            return Err(EngineError::Inference(format!(
                "Classifier '{}' exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }

        let mut prediction = Record::new();
        prediction.insert("image".to_string(), Value::String(image.to_string()));
        prediction.extend(self.parse_stdout(stdout.trim())?);

        debug!("Prediction for {}: {:?}", image, prediction);
        Ok(prediction)
    }

    fn parse_stdout(&self, stdout: &str) -> Result<Record, EngineError> {
        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(stdout) {
            return Ok(fields);
        }

        if stdout.is_empty() {
            return Err(EngineError::Inference(format!(
                "Classifier '{}' printed nothing",
                self.name
            )));
        }

        let mut fields = Record::new();
        let (label, confidence) = split_confidence(stdout);
        fields.insert(self.label_field.clone(), Value::String(label.to_string()));
        if let Some(confidence) = confidence {
            fields.insert("confidence".to_string(), Value::from(confidence));
        }
        Ok(fields)
    }
}

fn confidence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.*?)\s*\((\d+(?:\.\d+)?)\s*%\)$").expect("Invalid confidence pattern")
    })
}

/// Split `Label (97.31%)` into the label and its confidence
fn split_confidence(text: &str) -> (&str, Option<f64>) {
    let Some(captures) = confidence_pattern().captures(text) else {
        return (text, None);
    };

    match (captures.get(1), captures.get(2)) {
        (Some(label), Some(value)) if !label.as_str().is_empty() => {
            (label.as_str(), value.as_str().parse().ok())
        }
        _ => (text, None),
    }
}

impl Tool for CommandTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&self, input: &ToolInput) -> Result<ToolOutput, EngineError> {
        let images = if input.contains("image_paths") {
            input.param_str_list("image_paths")?
        } else if input.contains("image_path") {
            input.param_str_list("image_path")?
        } else {
            return Err(ToolError::MissingParameter("image_paths".to_string()).into());
        };

        let predictions = images
            .iter()
            .map(|image| self.classify(image).map(Value::Object))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ToolOutput::empty().with_field("predictions", Value::Array(predictions)))
    }
}
