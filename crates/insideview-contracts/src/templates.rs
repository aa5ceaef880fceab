use serde::Deserialize;

use crate::request::{Category, GenerationMode, GenerationRequest};

pub const OBJECT_NAME_TOKEN: &str = "{OBJECT_NAME}";
pub const ASPECT_RATIO_TOKEN: &str = "{ASPECT_RATIO}";
pub const DETAIL_LEVEL_TOKEN: &str = "{DETAIL_LEVEL}";

/// Template families. Every category that is not organic shares the
/// technical family, electronics included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateFamily {
    Technical,
    Organic,
}

impl TemplateFamily {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Organic => TemplateFamily::Organic,
            Category::Technical | Category::Electronics => TemplateFamily::Technical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateFamily::Technical => "technical",
            TemplateFamily::Organic => "organic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub family: TemplateFamily,
    pub mode: GenerationMode,
}

impl TemplateKey {
    pub const fn new(family: TemplateFamily, mode: GenerationMode) -> Self {
        Self { family, mode }
    }

    pub fn for_request(request: &GenerationRequest) -> Self {
        Self::new(TemplateFamily::for_category(request.category), request.mode)
    }

    /// Row in [`TEMPLATE_TABLE`].
    pub const fn index(self) -> usize {
        let family = match self.family {
            TemplateFamily::Technical => 0,
            TemplateFamily::Organic => 2,
        };
        let mode = match self.mode {
            GenerationMode::Text => 0,
            GenerationMode::Photo => 1,
        };
        family + mode
    }

    pub fn label(self) -> String {
        format!("{}/{}", self.family.as_str(), self.mode.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub key: TemplateKey,
    pub source: &'static str,
}

pub static TEMPLATE_TABLE: [PromptTemplate; 4] = [
    PromptTemplate {
        key: TemplateKey::new(TemplateFamily::Technical, GenerationMode::Text),
        source: include_str!("../resources/templates/technical_text.json"),
    },
    PromptTemplate {
        key: TemplateKey::new(TemplateFamily::Technical, GenerationMode::Photo),
        source: include_str!("../resources/templates/technical_photo.json"),
    },
    PromptTemplate {
        key: TemplateKey::new(TemplateFamily::Organic, GenerationMode::Text),
        source: include_str!("../resources/templates/organic_text.json"),
    },
    PromptTemplate {
        key: TemplateKey::new(TemplateFamily::Organic, GenerationMode::Photo),
        source: include_str!("../resources/templates/organic_photo.json"),
    },
];

pub fn template_for(key: TemplateKey) -> &'static PromptTemplate {
    &TEMPLATE_TABLE[key.index()]
}

impl PromptTemplate {
    pub fn substitute(&self, request: &GenerationRequest) -> String {
        self.source
            .replace(OBJECT_NAME_TOKEN, &request.object_name)
            .replace(ASPECT_RATIO_TOKEN, request.aspect_ratio.as_str())
            .replace(DETAIL_LEVEL_TOKEN, request.detail_level.as_str())
    }
}

/// Structured shape of a substituted template.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub prompt_details: PromptDetails,
    #[serde(default)]
    pub negative_prompt: String,
    #[serde(default)]
    pub generation_hints: GenerationHints,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptDetails {
    pub description: String,
    #[serde(default)]
    pub style_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationHints {
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde(default)]
    pub detail_level: String,
    #[serde(default)]
    pub stylization: String,
    #[serde(default)]
    pub camera: CameraHints,
    #[serde(default)]
    pub lighting: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub reference_image_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CameraHints {
    #[serde(default)]
    pub angle: String,
    #[serde(default)]
    pub lens: String,
}

impl TemplateDocument {
    pub fn parse(substituted: &str) -> serde_json::Result<Self> {
        serde_json::from_str(substituted)
    }
}
