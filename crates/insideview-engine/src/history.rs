use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use insideview_contracts::request::{Category, GenerationRequest};
use insideview_contracts::results::Part;

use crate::backend::ImagePayload;

/// One successful generation. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedResult {
    pub id: String,
    pub image: ImagePayload,
    pub params: GenerationRequest,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub prompt_used: String,
    pub model: String,
    pub parts: Vec<Part>,
}

/// Download name for a PNG result.
pub fn download_file_name(id: &str) -> String {
    download_file_name_with_extension(id, "png")
}

fn download_file_name_with_extension(id: &str, extension: &str) -> String {
    format!("insideview-{id}.{extension}")
}

impl GeneratedResult {
    /// `insideview-{id}` with the extension of the stored image type.
    pub fn download_file_name(&self) -> String {
        download_file_name_with_extension(&self.id, self.image.file_extension())
    }

    /// Writes the image into `dir` under its download name.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let path = dir.join(self.download_file_name());
        fs::write(&path, &self.image.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub total: usize,
    pub by_category: Vec<(Category, usize)>,
    pub most_used: Option<Category>,
    /// Share of `most_used`, 0..=100.
    pub most_used_pct: u32,
}

/// In-memory result list, newest first.
#[derive(Debug, Clone, Default)]
pub struct History {
    items: Vec<GeneratedResult>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(&mut self, result: GeneratedResult) {
        self.items.insert(0, result);
    }

    /// Removes the entry with `id`; the others keep their order.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn get(&self, id: &str) -> Option<&GeneratedResult> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Full id for an exact id or an unambiguous prefix.
    pub fn resolve_id(&self, needle: &str) -> Option<&str> {
        let needle = needle.trim();
        if needle.is_empty() {
            return None;
        }
        if let Some(exact) = self.get(needle) {
            return Some(&exact.id);
        }
        let mut matches = self.items.iter().filter(|item| item.id.starts_with(needle));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(&first.id)
    }

    pub fn items(&self) -> &[GeneratedResult] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        let by_category: Vec<(Category, usize)> = Category::ALL
            .into_iter()
            .map(|category| {
                let count = self
                    .items
                    .iter()
                    .filter(|item| item.params.category == category)
                    .count();
                (category, count)
            })
            .collect();
        // ties resolve to the earlier category in Category::ALL
        let most_used = by_category
            .iter()
            .filter(|(_, count)| *count > 0)
            .fold(None::<(Category, usize)>, |best, &(category, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((category, count)),
            });
        let total = self.items.len();
        let most_used_pct = match most_used {
            Some((_, count)) if total > 0 => ((count as f64 / total as f64) * 100.0).round() as u32,
            _ => 0,
        };
        HistoryStats {
            total,
            by_category,
            most_used: most_used.map(|(category, _)| category),
            most_used_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, category: Category) -> GeneratedResult {
        GeneratedResult {
            id: id.to_string(),
            image: ImagePayload {
                bytes: vec![1, 2, 3],
                mime_type: "image/png".to_string(),
            },
            params: GenerationRequest {
                category,
                ..GenerationRequest::new(id)
            },
            timestamp: 0,
            prompt_used: format!("Exploded view of {id}"),
            model: "dryrun-image-1".to_string(),
            parts: Vec::new(),
        }
    }

    fn ids(history: &History) -> Vec<&str> {
        history.items().iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn prepend_keeps_newest_first() {
        let mut history = History::new();
        for id in ["a", "b", "c"] {
            history.prepend(result(id, Category::Technical));
        }
        assert_eq!(ids(&history), vec!["c", "b", "a"]);
    }

    #[test]
    fn delete_preserves_remaining_order() {
        let mut history = History::new();
        for id in ["a", "b", "c"] {
            history.prepend(result(id, Category::Technical));
        }
        assert!(history.delete("b"));
        assert_eq!(ids(&history), vec!["c", "a"]);
        assert!(!history.delete("missing"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn resolve_id_accepts_unique_prefix_only() {
        let mut history = History::new();
        history.prepend(result("abc123", Category::Technical));
        history.prepend(result("abd456", Category::Technical));
        assert_eq!(history.resolve_id("abc"), Some("abc123"));
        assert_eq!(history.resolve_id("ab"), None);
        assert_eq!(history.resolve_id("abd456"), Some("abd456"));
        assert_eq!(history.resolve_id(""), None);
    }

    #[test]
    fn stats_report_most_used_category() {
        let mut history = History::new();
        assert_eq!(history.stats().most_used, None);

        history.prepend(result("a", Category::Organic));
        history.prepend(result("b", Category::Electronics));
        history.prepend(result("c", Category::Organic));
        history.prepend(result("d", Category::Technical));
        let stats = history.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.most_used, Some(Category::Organic));
        assert_eq!(stats.most_used_pct, 50);
    }

    #[test]
    fn stats_tie_goes_to_first_listed_category() {
        let mut history = History::new();
        history.prepend(result("a", Category::Organic));
        history.prepend(result("b", Category::Technical));
        assert_eq!(history.stats().most_used, Some(Category::Technical));
    }

    #[test]
    fn export_writes_download_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let item = result("42", Category::Technical);
        let path = item.export_to(&temp.path().join("out"))?;
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("insideview-42.png"));
        assert_eq!(fs::read(path)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn export_name_follows_image_type() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut item = result("7", Category::Organic);
        item.image.mime_type = "image/jpeg".to_string();
        let path = item.export_to(temp.path())?;
        assert_eq!(path.file_name().and_then(|name| name.to_str()), Some("insideview-7.jpg"));

        item.image.mime_type = "image/webp".to_string();
        assert_eq!(item.download_file_name(), "insideview-7.webp");
        assert_eq!(download_file_name("7"), "insideview-7.png");
        Ok(())
    }
}
