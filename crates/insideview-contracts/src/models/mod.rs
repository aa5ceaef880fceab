mod registry;
mod selectors;

pub use registry::{
    ModelRegistry, ModelSpec, CAP_CHAT, CAP_IMAGE, CAP_IMAGE_HD, CAP_JSON, CAP_VISION,
};
pub use selectors::{ModelSelection, ModelSelector};
