//! Arrowhead image assets.
//!
//! Assets are addressed by a short symbolic name stored on the annotation.
//! Resolution to a URL is a pure lookup; loading is the host's business, and
//! an asset that never loads only means the vector head is drawn instead.

#[cfg(test)]
#[path = "assets_test.rs"]
mod assets_test;

/// Arrowhead styles shipped with the editor.
pub const ARROW_HEADS: &[&str] = &["classic", "chevron", "round", "bar"];

/// Resolves symbolic asset names to loadable URLs.
pub trait AssetLookup {
    /// URL for `name`, or `None` if the name is unknown.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Assets served from a fixed base URL as `<base>/arrowheads/<name>.png`.
#[derive(Debug, Clone)]
pub struct StaticAssets {
    base_url: String,
}

impl StaticAssets {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_owned() }
    }
}

impl AssetLookup for StaticAssets {
    fn resolve(&self, name: &str) -> Option<String> {
        ARROW_HEADS
            .contains(&name)
            .then(|| format!("{}/arrowheads/{name}.png", self.base_url))
    }
}
