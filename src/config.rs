//! Per-engine-instance configuration. Spec §5 runs one engine instance per
//! compilation unit; the knobs here are set once at construction and never
//! touched at a finer granularity than a [`crate::module::WyilFile`].

/// Knobs the global generator and branch engine read while walking one
/// compilation unit.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bounds the global generator's recursive descent into nominal types.
    /// A defense against a loader that hands back cyclic declarations the
    /// memoization in `generator::Generator` doesn't itself catch.
    pub max_recursion_depth: usize,
    /// Prefix used by this engine's [`crate::ir::LabelGen`], so two engines
    /// running over different compilation units in the same process never
    /// collide on fresh labels even if both counters start at zero.
    pub label_prefix: &'static str,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_recursion_depth: 256, label_prefix: "blklab" }
    }
}
