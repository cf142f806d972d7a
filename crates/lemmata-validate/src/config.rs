use serde::{Deserialize, Serialize};

/// Options for [`validate`](crate::validate), read from the `[validation]`
/// table of `lemmata.toml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Breaking changes (ghosts, retargets) require a major version bump,
    /// or a minor bump below 1.0.0.
    pub require_major_bump: bool,
    /// Report assertions that nothing concludes or expands.
    pub warn_unused_assertions: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_major_bump: true,
            warn_unused_assertions: true,
        }
    }
}
