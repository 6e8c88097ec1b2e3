/// Tunables shared by the lifecycle and refund engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Lets admins set any order status through `override_status`.
    pub allow_status_override: bool,
    /// How many times an operation is re-validated against a freshly loaded
    /// order after losing a version race. Values below 1 are treated as 1,
    /// so the losing writer always sees the committed state.
    pub max_stale_reloads: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_status_override: false,
            max_stale_reloads: 3,
        }
    }
}
