pub const DEFAULT_MARKER: &str = "**";

/// Strips inline markup delimiters from raw article text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    marker: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl Normalizer {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Removes every occurrence of the marker and leaves everything else
    /// untouched. Removal is repeated until no marker is left, otherwise a
    /// marker like `ab` in `aabb` would reappear after one pass.
    pub fn normalize(&self, raw: &str) -> String {
        if self.marker.is_empty() {
            return raw.to_string();
        }

        let mut text = raw.to_string();
        while text.contains(self.marker.as_str()) {
            text = text.replace(self.marker.as_str(), "");
        }
        text
    }

    /// Number of marker occurrences in a single left-to-right pass.
    pub fn count_markers(&self, raw: &str) -> usize {
        if self.marker.is_empty() {
            return 0;
        }
        raw.matches(self.marker.as_str()).count()
    }
}

pub fn normalize(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}
