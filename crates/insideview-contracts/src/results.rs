use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::request::{AspectRatio, Category, GenerationRequest};

/// One component of an exploded view, in the order the service listed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: i64,
    pub name: String,
    pub system: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AnalysisCategory {
    TechnicalProduct,
    Electronics,
    Organism,
    #[default]
    Unknown,
}

impl From<String> for AnalysisCategory {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "technical_product" => AnalysisCategory::TechnicalProduct,
            "electronics" => AnalysisCategory::Electronics,
            "organism" => AnalysisCategory::Organism,
            _ => AnalysisCategory::Unknown,
        }
    }
}

impl AnalysisCategory {
    pub fn to_category(self) -> Category {
        match self {
            AnalysisCategory::Organism => Category::Organic,
            AnalysisCategory::Electronics => Category::Electronics,
            AnalysisCategory::TechnicalProduct | AnalysisCategory::Unknown => Category::Technical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MainRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for MainRegion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

impl MainRegion {
    fn normalized(self) -> Self {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        Self {
            x,
            y,
            width: self.width.clamp(0.0, 1.0 - x),
            height: self.height.clamp(0.0, 1.0 - y),
        }
    }
}

/// Vision-analyzer verdict on an uploaded photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub category: AnalysisCategory,
    #[serde(default)]
    pub canonical_name: String,
    #[serde(default = "unknown_viewpoint")]
    pub viewpoint: String,
    #[serde(default)]
    pub main_region: MainRegion,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub sensitive: bool,
}

fn unknown_viewpoint() -> String {
    "unknown".to_string()
}

impl AnalysisResult {
    /// Clamps confidence and region into their documented ranges.
    pub fn normalized(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.main_region = self.main_region.normalized();
        self
    }

    pub fn confidence_pct(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

/// Auto-fills the request from a photo analysis.
pub fn apply_analysis(request: &mut GenerationRequest, analysis: &AnalysisResult) {
    if !analysis.canonical_name.trim().is_empty() {
        request.object_name = analysis.canonical_name.trim().to_string();
    }
    request.category = analysis.category.to_category();
    request.aspect_ratio = AspectRatio::Square;
}

pub fn parts_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER" },
                "name": { "type": "STRING" },
                "system": { "type": "STRING" },
                "description": { "type": "STRING" }
            },
            "required": ["id", "name", "system", "description"]
        }
    })
}

pub fn analysis_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "category": {
                "type": "STRING",
                "enum": ["technical_product", "electronics", "organism", "unknown"]
            },
            "canonicalName": { "type": "STRING" },
            "viewpoint": { "type": "STRING" },
            "mainRegion": {
                "type": "OBJECT",
                "properties": {
                    "x": { "type": "NUMBER" },
                    "y": { "type": "NUMBER" },
                    "width": { "type": "NUMBER" },
                    "height": { "type": "NUMBER" }
                }
            },
            "summary": { "type": "STRING" },
            "confidence": { "type": "NUMBER" },
            "sensitive": { "type": "BOOLEAN" }
        }
    })
}

pub fn parse_parts(text: &str) -> serde_json::Result<Vec<Part>> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&body)
}

pub fn parse_analysis(text: &str) -> serde_json::Result<AnalysisResult> {
    let parsed: AnalysisResult = serde_json::from_str(&strip_code_fence(text))?;
    Ok(parsed.normalized())
}

/// Structured responses occasionally arrive wrapped in a markdown fence.
fn strip_code_fence(text: &str) -> String {
    let raw = text.trim();
    if !(raw.starts_with("```") && raw.ends_with("```")) || raw.len() < 6 {
        return raw.to_string();
    }
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() < 2 {
        return raw.to_string();
    }
    lines[1..lines.len() - 1].join("\n").trim().to_string()
}
