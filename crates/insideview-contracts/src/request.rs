use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Technical,
    Electronics,
    Organic,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Technical, Category::Electronics, Category::Organic];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Technical => "technical",
            Category::Electronics => "electronics",
            Category::Organic => "organic",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Technical => "Technical Products",
            Category::Electronics => "Electronics & Gadgets",
            Category::Organic => "Living Organisms",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "technical" | "tech" => Ok(Category::Technical),
            "electronics" | "electronic" => Ok(Category::Electronics),
            "organic" | "organism" | "anatomy" => Ok(Category::Organic),
            other => Err(format!(
                "unknown category '{other}' (expected technical, electronics or organic)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Text,
    Photo,
}

impl GenerationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationMode::Text => "text",
            GenerationMode::Photo => "photo",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(GenerationMode::Text),
            "photo" => Ok(GenerationMode::Photo),
            other => Err(format!("unknown mode '{other}' (expected text or photo)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| {
                format!("unsupported aspect ratio '{trimmed}' (expected 1:1, 3:4, 4:3, 9:16 or 16:9)")
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DetailLevel {
    Standard,
    #[default]
    High,
    Ultra,
}

impl DetailLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            DetailLevel::Standard => "Standard",
            DetailLevel::High => "High",
            DetailLevel::Ultra => "Ultra",
        }
    }

    /// High and Ultra route to the high-fidelity image backend profile.
    pub fn is_high_fidelity(self) -> bool {
        matches!(self, DetailLevel::High | DetailLevel::Ultra)
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(DetailLevel::Standard),
            "high" => Ok(DetailLevel::High),
            "ultra" => Ok(DetailLevel::Ultra),
            other => Err(format!(
                "unknown detail level '{other}' (expected Standard, High or Ultra)"
            )),
        }
    }
}

/// The user's current generation parameters.
///
/// `reference_image` holds a base64 data URI (or bare base64) and is only
/// meaningful in photo mode; `is_kid_friendly` only matters for organic
/// subjects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub object_name: String,
    pub category: Category,
    pub mode: GenerationMode,
    pub aspect_ratio: AspectRatio,
    pub detail_level: DetailLevel,
    pub show_labels: bool,
    pub is_kid_friendly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_hint: Option<String>,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            object_name: String::new(),
            category: Category::Technical,
            mode: GenerationMode::Text,
            aspect_ratio: AspectRatio::Square,
            detail_level: DetailLevel::High,
            show_labels: true,
            is_kid_friendly: true,
            reference_image: None,
            user_hint: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestIssue {
    MissingObjectName,
    MissingReferenceImage,
}

impl RequestIssue {
    pub fn message(&self) -> &'static str {
        match self {
            RequestIssue::MissingObjectName => "Please enter an object name.",
            RequestIssue::MissingReferenceImage => {
                "Please upload a reference photo for Photo Mode."
            }
        }
    }
}

impl fmt::Display for RequestIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl GenerationRequest {
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            ..Self::default()
        }
    }

    pub fn is_photo(&self) -> bool {
        self.mode == GenerationMode::Photo
    }

    pub fn is_organic(&self) -> bool {
        self.category == Category::Organic
    }

    /// Hint text as typed, `None` when absent or blank.
    ///
    /// Whitespace-only hints count as absent, so a stray space never adds a
    /// "User hint for context:" clause or a vision-prompt hint line.
    pub fn hint(&self) -> Option<&str> {
        self.user_hint
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn has_reference_image(&self) -> bool {
        self.reference_image
            .as_deref()
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Submit-time checks. Nothing may reach the network when this fails.
    pub fn validate(&self) -> Result<(), RequestIssue> {
        if self.object_name.trim().is_empty() {
            return Err(RequestIssue::MissingObjectName);
        }
        if self.is_photo() && !self.has_reference_image() {
            return Err(RequestIssue::MissingReferenceImage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_wire_names() -> anyhow::Result<()> {
        let mut request = GenerationRequest::new("Turbocharger");
        request.aspect_ratio = AspectRatio::Landscape16x9;
        request.detail_level = DetailLevel::Ultra;
        let value = serde_json::to_value(&request)?;
        assert_eq!(value["objectName"], "Turbocharger");
        assert_eq!(value["aspectRatio"], "16:9");
        assert_eq!(value["detailLevel"], "Ultra");
        assert_eq!(value["category"], "technical");
        assert!(value.get("referenceImage").is_none());
        Ok(())
    }

    #[test]
    fn enums_parse_from_user_text() {
        assert_eq!("Organic".parse::<Category>(), Ok(Category::Organic));
        assert_eq!("photo".parse::<GenerationMode>(), Ok(GenerationMode::Photo));
        assert_eq!("9:16".parse::<AspectRatio>(), Ok(AspectRatio::Portrait9x16));
        assert_eq!("ultra".parse::<DetailLevel>(), Ok(DetailLevel::Ultra));
        assert!("2:3".parse::<AspectRatio>().is_err());
        assert!("plastic".parse::<Category>().is_err());
    }

    #[test]
    fn validate_rejects_blank_object_name() {
        let request = GenerationRequest::new("   ");
        assert_eq!(request.validate(), Err(RequestIssue::MissingObjectName));
    }

    #[test]
    fn validate_rejects_photo_mode_without_reference() {
        let mut request = GenerationRequest::new("Keyboard");
        request.mode = GenerationMode::Photo;
        assert_eq!(request.validate(), Err(RequestIssue::MissingReferenceImage));

        request.reference_image = Some("data:image/png;base64,AAAA".to_string());
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn hint_ignores_whitespace() {
        let mut request = GenerationRequest::new("Keyboard");
        request.user_hint = Some("   ".to_string());
        assert_eq!(request.hint(), None);
        request.user_hint = Some("my old keyboard".to_string());
        assert_eq!(request.hint(), Some("my old keyboard"));
    }

    #[test]
    fn detail_tier_fidelity() {
        assert!(!DetailLevel::Standard.is_high_fidelity());
        assert!(DetailLevel::High.is_high_fidelity());
        assert!(DetailLevel::Ultra.is_high_fidelity());
    }
}
