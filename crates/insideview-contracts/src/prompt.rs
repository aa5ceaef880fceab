//! Prompt resolution: template selection, placeholder substitution and the
//! conditional clauses appended after the template description.

use crate::request::{Category, DetailLevel, GenerationRequest};
use crate::templates::{template_for, TemplateDocument, TemplateKey};

pub const LABELS_CLAUSE: &str = " Ensure clear numbered labels with white leader lines.";
pub const NO_LABELS_CLAUSE: &str = " Do not include text labels or callout lines.";
pub const KID_FRIENDLY_CLAUSE: &str =
    " Ensure the visual is clinically clean, educational, and suitable for all ages (no gore).";
pub const ULTRA_CLAUSE: &str =
    " Render in 8K resolution, ultra-high definition, 100 megapixel texture fidelity.";
pub const HINT_LABEL: &str = " User hint for context: ";

const PARTS_PROMPT_TEMPLATE: &str = include_str!("../resources/prompts/parts.txt");
pub const COACH_SYSTEM_PROMPT: &str = include_str!("../resources/prompts/coach.txt");
pub const VISION_ANALYZER_PROMPT: &str = include_str!("../resources/prompts/vision_analyzer.txt");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrompt {
    pub text: String,
    pub template: TemplateKey,
    /// True when the template failed to parse and the minimal prompt was used.
    pub fallback: bool,
}

pub fn fallback_prompt(object_name: &str) -> String {
    format!("Exploded view of {object_name}")
}

/// Resolves the final image prompt for `request`. Never fails.
pub fn resolve(request: &GenerationRequest) -> String {
    resolve_prompt(request).text
}

pub fn resolve_prompt(request: &GenerationRequest) -> ResolvedPrompt {
    let key = TemplateKey::for_request(request);
    let substituted = template_for(key).substitute(request);

    let document = match TemplateDocument::parse(&substituted) {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!(
                template = %key.label(),
                object_name = %request.object_name,
                error = %err,
                "template parsing failed; using fallback prompt"
            );
            return ResolvedPrompt {
                text: fallback_prompt(&request.object_name),
                template: key,
                fallback: true,
            };
        }
    };

    let mut text = document.prompt_details.description;
    append_clauses(&mut text, request);
    ResolvedPrompt {
        text,
        template: key,
        fallback: false,
    }
}

fn append_clauses(prompt: &mut String, request: &GenerationRequest) {
    if request.show_labels {
        prompt.push_str(LABELS_CLAUSE);
    } else {
        prompt.push_str(NO_LABELS_CLAUSE);
    }

    if request.category == Category::Organic && request.is_kid_friendly {
        prompt.push_str(KID_FRIENDLY_CLAUSE);
    }

    if request.detail_level == DetailLevel::Ultra {
        prompt.push_str(ULTRA_CLAUSE);
    }

    if request.is_photo() {
        if let Some(hint) = request.hint() {
            prompt.push_str(HINT_LABEL);
            prompt.push_str(hint);
            prompt.push('.');
        }
    }
}

/// Prompt for the parts-list call; depends only on category and object name.
pub fn parts_prompt(category: Category, object_name: &str) -> String {
    PARTS_PROMPT_TEMPLATE
        .replacen("{CATEGORY}", category.as_str(), 1)
        .replacen("{OBJECT_NAME}", object_name, 1)
}

pub fn vision_prompt(hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|value| !value.is_empty()) {
        Some(hint) => format!("{VISION_ANALYZER_PROMPT}\nUser Hint: {hint}"),
        None => VISION_ANALYZER_PROMPT.to_string(),
    }
}

pub fn coach_seed_message(request: &GenerationRequest) -> String {
    format!(
        "Current context: User is creating a {} view of {}. Aspect: {}.",
        request.category, request.object_name, request.aspect_ratio
    )
}

pub fn coach_greeting(object_name: &str) -> String {
    format!(
        "I'm analyzing your request for {object_name}. Ask me anything about the structure or how to improve the visual!"
    )
}

#[cfg(test)]
mod tests {
    use crate::request::{AspectRatio, GenerationMode};

    use super::*;

    fn turbocharger() -> GenerationRequest {
        GenerationRequest {
            category: Category::Technical,
            mode: GenerationMode::Text,
            aspect_ratio: AspectRatio::Landscape16x9,
            detail_level: DetailLevel::Ultra,
            show_labels: true,
            ..GenerationRequest::new("Turbocharger")
        }
    }

    #[test]
    fn resolution_is_deterministic() {
        let request = turbocharger();
        let first = resolve(&request);
        let _ = resolve(&GenerationRequest::new("Something else"));
        let second = resolve(&request.clone());
        assert_eq!(first, second);
    }

    #[test]
    fn turbocharger_ends_with_labels_then_ultra_clause() {
        let prompt = resolve(&turbocharger());
        assert!(prompt.contains("Turbocharger"));
        let expected_tail = format!("{LABELS_CLAUSE}{ULTRA_CLAUSE}");
        assert!(prompt.ends_with(&expected_tail));
    }

    #[test]
    fn kid_friendly_heart_has_no_gore_clause_and_no_ultra_clause() {
        let request = GenerationRequest {
            category: Category::Organic,
            mode: GenerationMode::Text,
            is_kid_friendly: true,
            detail_level: DetailLevel::Standard,
            ..GenerationRequest::new("Human Heart")
        };
        let prompt = resolve(&request);
        assert!(prompt.contains(KID_FRIENDLY_CLAUSE));
        assert!(!prompt.contains(ULTRA_CLAUSE));
    }

    #[test]
    fn kid_friendly_only_applies_to_organic() {
        let request = GenerationRequest {
            category: Category::Electronics,
            is_kid_friendly: true,
            ..GenerationRequest::new("Smartphone")
        };
        assert!(!resolve(&request).contains(KID_FRIENDLY_CLAUSE));
    }

    #[test]
    fn label_clauses_are_mutually_exclusive() {
        for show_labels in [true, false] {
            let request = GenerationRequest {
                show_labels,
                ..GenerationRequest::new("Watch")
            };
            let prompt = resolve(&request);
            let with = prompt.contains(LABELS_CLAUSE);
            let without = prompt.contains(NO_LABELS_CLAUSE);
            assert!(with ^ without);
            assert_eq!(with, show_labels);
        }
    }

    #[test]
    fn ultra_clause_only_for_ultra() {
        for (detail, expected) in [
            (DetailLevel::Standard, false),
            (DetailLevel::High, false),
            (DetailLevel::Ultra, true),
        ] {
            let request = GenerationRequest {
                detail_level: detail,
                ..GenerationRequest::new("Watch")
            };
            assert_eq!(resolve(&request).contains(ULTRA_CLAUSE), expected);
        }
    }

    #[test]
    fn photo_hint_appended_once_and_only_when_present() {
        let mut request = GenerationRequest {
            mode: GenerationMode::Photo,
            reference_image: Some("data:image/png;base64,AAAA".to_string()),
            ..GenerationRequest::new("Keyboard")
        };
        assert!(!resolve(&request).contains(HINT_LABEL));

        request.user_hint = Some(String::new());
        assert!(!resolve(&request).contains(HINT_LABEL));

        request.user_hint = Some(" \t ".to_string());
        assert!(!resolve(&request).contains(HINT_LABEL));
        assert!(!vision_prompt(request.hint()).contains("User Hint:"));

        request.user_hint = Some("my old mechanical keyboard".to_string());
        let prompt = resolve(&request);
        assert_eq!(prompt.matches("my old mechanical keyboard").count(), 1);
        assert!(prompt.ends_with(" User hint for context: my old mechanical keyboard."));
    }

    #[test]
    fn hint_ignored_in_text_mode() {
        let request = GenerationRequest {
            user_hint: Some("ignored".to_string()),
            ..GenerationRequest::new("Keyboard")
        };
        assert!(!resolve(&request).contains("ignored"));
    }

    #[test]
    fn malformed_substitution_falls_back_to_minimal_prompt() {
        let request = GenerationRequest::new("The \"Beast\" engine");
        let resolved = resolve_prompt(&request);
        assert!(resolved.fallback);
        assert_eq!(resolved.text, "Exploded view of The \"Beast\" engine");
    }

    #[test]
    fn resolved_prompt_reports_template_key() {
        let request = GenerationRequest {
            category: Category::Electronics,
            mode: GenerationMode::Photo,
            ..GenerationRequest::new("Console")
        };
        let resolved = resolve_prompt(&request);
        assert!(!resolved.fallback);
        assert_eq!(resolved.template.label(), "technical/photo");
    }

    #[test]
    fn parts_prompt_fills_category_and_name() {
        let prompt = parts_prompt(Category::Organic, "Octopus");
        assert!(prompt.contains("Given a category (organic) and an object name (Octopus)"));
        assert!(!prompt.contains("{CATEGORY}"));
    }

    #[test]
    fn vision_prompt_appends_hint_line() {
        assert!(vision_prompt(Some("vintage camera")).ends_with("\nUser Hint: vintage camera"));
        assert_eq!(vision_prompt(None), VISION_ANALYZER_PROMPT);
        assert_eq!(vision_prompt(Some("  ")), VISION_ANALYZER_PROMPT);
    }

    #[test]
    fn coach_seed_describes_request() {
        let seed = coach_seed_message(&turbocharger());
        assert_eq!(
            seed,
            "Current context: User is creating a technical view of Turbocharger. Aspect: 16:9."
        );
    }
}
