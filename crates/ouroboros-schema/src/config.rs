//! Configuration options for validation behavior

// ============================================================================
// Validation Config
// ============================================================================

/// Options for a validation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Reject keys a mapping schema does not declare
    pub strict: bool,
}

impl ValidationConfig {
    /// Create a new validation config with defaults (strict)
    pub fn new() -> Self {
        Self::default()
    }

    /// Config that silently ignores undeclared keys
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    /// Set strict mode
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}
