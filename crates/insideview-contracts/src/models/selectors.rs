use crate::request::DetailLevel;

use super::registry::{ModelRegistry, ModelSpec, CAP_IMAGE, CAP_IMAGE_HD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
    ) -> Result<ModelSelection, String> {
        let fallback_reason = match requested {
            Some(requested_value) => {
                if let Some(model) = self.registry.ensure(requested_value, capability) {
                    return Ok(ModelSelection {
                        model,
                        requested: Some(requested_value.to_string()),
                        fallback_reason: None,
                    });
                }
                Some(format!(
                    "Requested model '{requested_value}' unavailable for capability '{capability}'."
                ))
            }
            None => None,
        };

        let Some(model) = self.registry.by_capability(capability).into_iter().next() else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        Ok(ModelSelection {
            model,
            requested: requested.map(str::to_string),
            fallback_reason,
        })
    }

    /// Image model for a detail tier: High and Ultra take the high-fidelity
    /// profile, Standard the fast one.
    pub fn select_image(
        &self,
        detail: DetailLevel,
        requested: Option<&str>,
    ) -> Result<ModelSelection, String> {
        if detail.is_high_fidelity() {
            return self.select(requested, CAP_IMAGE_HD);
        }
        if requested.is_some() {
            return self.select(requested, CAP_IMAGE);
        }
        let standard = self
            .registry
            .list()
            .find(|model| model.supports(CAP_IMAGE) && !model.supports(CAP_IMAGE_HD))
            .cloned();
        match standard {
            Some(model) => Ok(ModelSelection {
                model,
                requested: None,
                fallback_reason: None,
            }),
            None => self.select(None, CAP_IMAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use crate::models::registry::{CAP_CHAT, CAP_JSON};

    use super::*;

    #[test]
    fn detail_tiers_pick_expected_gemini_profiles() -> Result<(), String> {
        let selector = ModelSelector::new(None);
        let standard = selector.select_image(DetailLevel::Standard, None)?;
        assert_eq!(standard.model.name, "gemini-2.5-flash-image");
        assert_eq!(standard.model.image_size, None);

        for detail in [DetailLevel::High, DetailLevel::Ultra] {
            let selection = selector.select_image(detail, None)?;
            assert_eq!(selection.model.name, "gemini-3-pro-image-preview");
            assert_eq!(selection.model.image_size.as_deref(), Some("4K"));
        }
        Ok(())
    }

    #[test]
    fn text_capabilities_share_flash_model() -> Result<(), String> {
        let selector = ModelSelector::new(None);
        assert_eq!(selector.select(None, CAP_JSON)?.model.name, "gemini-2.5-flash");
        assert_eq!(selector.select(None, CAP_CHAT)?.model.name, "gemini-2.5-flash");
        Ok(())
    }

    #[test]
    fn unavailable_request_falls_back_with_reason() -> Result<(), String> {
        let selection = ModelSelector::new(None).select(Some("missing"), CAP_JSON)?;
        assert_eq!(selection.model.name, "gemini-2.5-flash");
        assert_eq!(
            selection.fallback_reason.as_deref(),
            Some("Requested model 'missing' unavailable for capability 'json'.")
        );
        Ok(())
    }

    #[test]
    fn explicit_standard_override_is_honoured() -> Result<(), String> {
        let selection = ModelSelector::new(None)
            .select_image(DetailLevel::Standard, Some("gemini-3-pro-image-preview"))?;
        assert_eq!(selection.model.name, "gemini-3-pro-image-preview");
        assert_eq!(selection.fallback_reason, None);
        Ok(())
    }

    #[test]
    fn empty_registry_reports_missing_capability() {
        let selector = ModelSelector::new(Some(ModelRegistry::new(Some(IndexMap::new()))));
        assert_eq!(
            selector.select_image(DetailLevel::Ultra, None).err(),
            Some("No models available for capability 'image_hd'.".to_string())
        );
    }

    #[test]
    fn dryrun_registry_mirrors_tiers() -> Result<(), String> {
        let selector = ModelSelector::new(Some(ModelRegistry::dryrun()));
        assert_eq!(
            selector.select_image(DetailLevel::Standard, None)?.model.name,
            "dryrun-image-1"
        );
        assert_eq!(
            selector.select_image(DetailLevel::Ultra, None)?.model.name,
            "dryrun-image-hd-1"
        );
        Ok(())
    }
}
