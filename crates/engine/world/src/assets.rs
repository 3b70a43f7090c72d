//! Dataset asset layout

use logic::AssetResolver;
use std::path::{Path, PathBuf};

/// Resolves objects against a dataset laid out as
/// `{root}/objects/{category}/{model}/usd/{model}.usd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
    /// Only report assets that exist on disk
    require_existing: bool,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            require_existing: false,
        }
    }

    /// Resolve only paths that exist on disk
    pub fn require_existing(mut self) -> Self {
        self.require_existing = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the layout assigns to a category/model pair
    pub fn model_path(&self, category: &str, model: &str) -> PathBuf {
        self.root
            .join("objects")
            .join(category)
            .join(model)
            .join("usd")
            .join(format!("{model}.usd"))
    }
}

impl AssetResolver for DatasetLayout {
    fn resolve(&self, category: &str, model: &str) -> Option<PathBuf> {
        let path = self.model_path(category, model);
        if self.require_existing && !path.exists() {
            tracing::debug!(category, model, path = %path.display(), "asset not found");
            return None;
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_model_path() {
        let layout = DatasetLayout::new("/data/og");
        assert_eq!(
            layout.resolve("apple", "agveuv"),
            Some(PathBuf::from("/data/og/objects/apple/agveuv/usd/agveuv.usd"))
        );
    }

    #[test]
    fn test_require_existing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DatasetLayout::new(dir.path()).require_existing();
        assert_eq!(layout.resolve("apple", "a0"), None);

        let path = layout.model_path("apple", "a0");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"#usda 1.0").unwrap();
        assert_eq!(layout.resolve("apple", "a0"), Some(path));
    }
}
