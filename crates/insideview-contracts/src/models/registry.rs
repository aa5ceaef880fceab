use indexmap::IndexMap;

pub const CAP_IMAGE: &str = "image";
pub const CAP_IMAGE_HD: &str = "image_hd";
pub const CAP_JSON: &str = "json";
pub const CAP_VISION: &str = "vision";
pub const CAP_CHAT: &str = "chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub backend: String,
    pub capabilities: Vec<String>,
    /// Requested output size tier for image models that accept one.
    pub image_size: Option<String>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    /// Registry where every capability resolves to the offline dryrun models.
    pub fn dryrun() -> Self {
        Self::new(Some(dryrun_models()))
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

fn insert_model(
    map: &mut IndexMap<String, ModelSpec>,
    name: &str,
    backend: &str,
    capabilities: &[&str],
    image_size: Option<&str>,
) {
    map.insert(
        name.to_string(),
        ModelSpec {
            name: name.to_string(),
            backend: backend.to_string(),
            capabilities: capabilities
                .iter()
                .map(|item| (*item).to_string())
                .collect(),
            image_size: image_size.map(str::to_string),
        },
    );
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();
    insert_model(&mut map, "gemini-2.5-flash-image", "gemini", &[CAP_IMAGE], None);
    insert_model(
        &mut map,
        "gemini-3-pro-image-preview",
        "gemini",
        &[CAP_IMAGE, CAP_IMAGE_HD],
        Some("4K"),
    );
    insert_model(
        &mut map,
        "gemini-2.5-flash",
        "gemini",
        &[CAP_JSON, CAP_VISION, CAP_CHAT],
        None,
    );
    map
}

fn dryrun_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();
    insert_model(&mut map, "dryrun-image-1", "dryrun", &[CAP_IMAGE], None);
    insert_model(
        &mut map,
        "dryrun-image-hd-1",
        "dryrun",
        &[CAP_IMAGE, CAP_IMAGE_HD],
        Some("4K"),
    );
    insert_model(
        &mut map,
        "dryrun-text-1",
        "dryrun",
        &[CAP_JSON, CAP_VISION, CAP_CHAT],
        None,
    );
    map
}
