use crate::request::{AspectRatio, Category, DetailLevel, GenerationMode, GenerationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub object_name: &'static str,
    pub aspect_ratio: AspectRatio,
    pub detail_level: DetailLevel,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        id: "p1",
        title: "Sports Car",
        description: "Complete drivetrain and chassis breakdown",
        category: Category::Technical,
        object_name: "Modern Sports Car",
        aspect_ratio: AspectRatio::Landscape16x9,
        detail_level: DetailLevel::Ultra,
    },
    Preset {
        id: "p2",
        title: "Smartphone",
        description: "Flagship internals stacked layout",
        category: Category::Electronics,
        object_name: "Flagship Smartphone",
        aspect_ratio: AspectRatio::Landscape4x3,
        detail_level: DetailLevel::High,
    },
    Preset {
        id: "p3",
        title: "Human Heart",
        description: "Clinical anatomical view",
        category: Category::Organic,
        object_name: "Human Heart",
        aspect_ratio: AspectRatio::Square,
        detail_level: DetailLevel::Ultra,
    },
    Preset {
        id: "p4",
        title: "Mechanical Watch",
        description: "Complex gear assembly view",
        category: Category::Technical,
        object_name: "Mechanical Watch Movement",
        aspect_ratio: AspectRatio::Square,
        detail_level: DetailLevel::Ultra,
    },
];

/// Looks a preset up by id or (case-insensitive) title.
pub fn find_preset(key: &str) -> Option<&'static Preset> {
    let needle = key.trim();
    PRESETS.iter().find(|preset| {
        preset.id.eq_ignore_ascii_case(needle) || preset.title.eq_ignore_ascii_case(needle)
    })
}

impl Preset {
    /// Merges the preset into `request`. Presets always run in text mode.
    pub fn apply(&self, request: &mut GenerationRequest) {
        request.object_name = self.object_name.to_string();
        request.category = self.category;
        request.aspect_ratio = self.aspect_ratio;
        request.detail_level = self.detail_level;
        request.mode = GenerationMode::Text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_forces_text_mode_and_keeps_other_fields() {
        let mut request = GenerationRequest {
            mode: GenerationMode::Photo,
            show_labels: false,
            reference_image: Some("data:image/png;base64,AAAA".to_string()),
            ..GenerationRequest::new("Old")
        };
        let preset = find_preset("p2").expect("smartphone preset");
        preset.apply(&mut request);
        assert_eq!(request.object_name, "Flagship Smartphone");
        assert_eq!(request.category, Category::Electronics);
        assert_eq!(request.aspect_ratio, AspectRatio::Landscape4x3);
        assert_eq!(request.mode, GenerationMode::Text);
        assert!(!request.show_labels);
    }

    #[test]
    fn find_by_title_ignores_case() {
        assert_eq!(find_preset("human heart").map(|preset| preset.id), Some("p3"));
        assert!(find_preset("p9").is_none());
    }
}
