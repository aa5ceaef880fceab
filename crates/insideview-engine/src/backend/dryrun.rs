use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};
use insideview_contracts::request::AspectRatio;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::{BackendError, ChatCall, GenerativeBackend, ImageCall, ImagePayload, JsonCall};

const DRYRUN_LONG_EDGE: u32 = 512;
const DRYRUN_PARTS: [(&str, &str, &str); 5] = [
    ("Outer Shell", "structure", "Protective casing that holds the assembly together."),
    ("Core Assembly", "core", "Central working mechanism."),
    ("Drive Unit", "power", "Supplies motion or energy to the core."),
    ("Control Module", "control", "Coordinates the other subsystems."),
    ("Fasteners", "structure", "Screws and clips joining the layers."),
];

/// Offline stand-in: solid-colour PNGs keyed by the prompt hash and canned
/// structured replies. Used for demos and tests only.
#[derive(Debug, Default, Clone)]
pub struct DryrunBackend;

impl DryrunBackend {
    pub fn new() -> Self {
        Self
    }
}

impl GenerativeBackend for DryrunBackend {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate_image(&self, call: &ImageCall) -> Result<ImagePayload, BackendError> {
        let (width, height) = dims_for_ratio(call.aspect_ratio);
        let seed = call
            .reference
            .as_ref()
            .map(|reference| reference.data.as_str())
            .unwrap_or_default();
        let (r, g, b) = color_from_prompt(&call.prompt, seed);
        let mut image = RgbImage::new(width, height);
        for pixel in image.pixels_mut() {
            *pixel = Rgb([r, g, b]);
        }

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| BackendError::InvalidPayload {
                backend: "dryrun".to_string(),
                message: format!("png encode failed: {err}"),
            })?;
        Ok(ImagePayload {
            bytes,
            mime_type: "image/png".to_string(),
        })
    }

    fn generate_json(&self, call: &JsonCall) -> Result<String, BackendError> {
        let body = match call.schema.get("type").and_then(Value::as_str) {
            Some("ARRAY") => dryrun_parts(&call.prompt),
            _ => dryrun_analysis(),
        };
        serde_json::to_string(&body).map_err(|err| BackendError::InvalidPayload {
            backend: "dryrun".to_string(),
            message: err.to_string(),
        })
    }

    fn chat_turn(&self, call: &ChatCall) -> Result<String, BackendError> {
        Ok(format!(
            "(dryrun coach, turn {}) You asked: {}",
            call.history.len() / 2 + 1,
            call.message.trim()
        ))
    }
}

fn dims_for_ratio(ratio: AspectRatio) -> (u32, u32) {
    let (w, h) = match ratio {
        AspectRatio::Square => (1, 1),
        AspectRatio::Portrait3x4 => (3, 4),
        AspectRatio::Landscape4x3 => (4, 3),
        AspectRatio::Portrait9x16 => (9, 16),
        AspectRatio::Landscape16x9 => (16, 9),
    };
    if w >= h {
        (DRYRUN_LONG_EDGE, DRYRUN_LONG_EDGE * h / w)
    } else {
        (DRYRUN_LONG_EDGE * w / h, DRYRUN_LONG_EDGE)
    }
}

fn color_from_prompt(prompt: &str, seed: &str) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.as_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}

/// Pulls the object name out of the parts prompt's "object name (...)".
fn object_name_from_prompt(prompt: &str) -> &str {
    prompt
        .split_once("object name (")
        .and_then(|(_, tail)| tail.split_once(')'))
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or("Object")
}

fn dryrun_parts(prompt: &str) -> Value {
    let object_name = object_name_from_prompt(prompt);
    Value::Array(
        DRYRUN_PARTS
            .iter()
            .enumerate()
            .map(|(idx, (name, system, description))| {
                json!({
                    "id": idx + 1,
                    "name": format!("{object_name} {name}"),
                    "system": system,
                    "description": description,
                })
            })
            .collect(),
    )
}

fn dryrun_analysis() -> Value {
    json!({
        "category": "technical_product",
        "canonicalName": "Dryrun Gadget",
        "viewpoint": "front",
        "mainRegion": { "x": 0.1, "y": 0.1, "width": 0.8, "height": 0.8 },
        "summary": "Offline analysis placeholder.",
        "confidence": 0.5,
        "sensitive": false,
    })
}

#[cfg(test)]
mod tests {
    use insideview_contracts::prompt::parts_prompt;
    use insideview_contracts::request::Category;
    use insideview_contracts::results::{parse_analysis, parse_parts, parts_response_schema};

    use super::*;

    fn call(prompt: &str, ratio: AspectRatio) -> ImageCall {
        ImageCall {
            model: "dryrun-image-1".to_string(),
            prompt: prompt.to_string(),
            aspect_ratio: ratio,
            image_size: None,
            reference: None,
        }
    }

    #[test]
    fn same_prompt_renders_same_png() -> anyhow::Result<()> {
        let backend = DryrunBackend::new();
        let first = backend.generate_image(&call("drone", AspectRatio::Square))?;
        let second = backend.generate_image(&call("drone", AspectRatio::Square))?;
        let other = backend.generate_image(&call("heart", AspectRatio::Square))?;
        assert_eq!(first, second);
        assert_ne!(first.bytes, other.bytes);
        assert_eq!(first.mime_type, "image/png");
        Ok(())
    }

    #[test]
    fn image_follows_aspect_ratio() -> anyhow::Result<()> {
        let payload = DryrunBackend::new().generate_image(&call("drone", AspectRatio::Landscape16x9))?;
        let decoded = image::load_from_memory(&payload.bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (512, 288));
        assert_eq!(dims_for_ratio(AspectRatio::Portrait3x4), (384, 512));
        Ok(())
    }

    #[test]
    fn canned_parts_parse_and_name_the_object() -> anyhow::Result<()> {
        let text = DryrunBackend::new().generate_json(&JsonCall {
            model: "dryrun-text-1".to_string(),
            prompt: parts_prompt(Category::Technical, "Turbocharger"),
            image: None,
            schema: parts_response_schema(),
        })?;
        let parts = parse_parts(&text)?;
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0].id, 1);
        assert_eq!(parts[0].name, "Turbocharger Outer Shell");
        Ok(())
    }

    #[test]
    fn canned_analysis_parses() -> anyhow::Result<()> {
        let text = DryrunBackend::new().generate_json(&JsonCall {
            model: "dryrun-text-1".to_string(),
            prompt: "analyze".to_string(),
            image: None,
            schema: json!({ "type": "OBJECT" }),
        })?;
        let analysis = parse_analysis(&text)?;
        assert_eq!(analysis.canonical_name, "Dryrun Gadget");
        Ok(())
    }
}
