pub const DEFAULT_MAX_LEVEL: usize = 5;
pub const DEFAULT_AUTO_EXPAND_DEPTH: usize = 3;
pub const DEFAULT_MAX_CONTENT_LEN: usize = 2000;

/// Knobs for rendering and composing a spiral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiralConfig {
    /// Nodes at this depth or deeper never render children.
    pub max_level: usize,
    /// Nodes shallower than this start expanded.
    pub auto_expand_depth: usize,
    pub max_content_len: usize,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            auto_expand_depth: DEFAULT_AUTO_EXPAND_DEPTH,
            max_content_len: DEFAULT_MAX_CONTENT_LEN,
        }
    }
}

impl SpiralConfig {
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }
}
