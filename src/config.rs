// config.rs - Engine configuration.
// Match budgets and cache sizing. Every value is carried by an explicit
// object; nothing here is process-global.

use crate::regint::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_DEPTH_LIMIT, DEFAULT_PARSE_DEPTH_LIMIT, DEFAULT_STEP_LIMIT,
};

/// Budgets enforced by the matcher. Zero disables a limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatchLimits {
    /// Maximum backtracking recursion depth.
    pub depth: u32,
    /// Maximum instructions executed per start position.
    pub steps: u64,
}

impl MatchLimits {
    pub const UNLIMITED: MatchLimits = MatchLimits { depth: 0, steps: 0 };

    pub fn new(depth: u32, steps: u64) -> Self {
        MatchLimits { depth, steps }
    }

    #[inline]
    pub(crate) fn depth_exceeded(&self, depth: u32) -> bool {
        self.depth != 0 && depth > self.depth
    }

    #[inline]
    pub(crate) fn steps_exceeded(&self, steps: u64) -> bool {
        self.steps != 0 && steps > self.steps
    }
}

impl Default for MatchLimits {
    fn default() -> Self {
        MatchLimits {
            depth: DEFAULT_DEPTH_LIMIT,
            steps: DEFAULT_STEP_LIMIT,
        }
    }
}

/// Settings for an [`Engine`](crate::api::Engine).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of compiled programs kept by the pattern cache. Zero disables it.
    pub cache_capacity: usize,
    /// Maximum group nesting accepted by the parser.
    pub parse_depth_limit: u32,
    pub limits: MatchLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            parse_depth_limit: DEFAULT_PARSE_DEPTH_LIMIT,
            limits: MatchLimits::default(),
        }
    }
}
