use rand::{rngs::StdRng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// Seed used when `RECON_DETERMINISTIC_SEED` is unset or unparsable.
pub const DEFAULT_SEED: u64 = 42;

/// Deterministic runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterminismConfig {
    /// Whether deterministic execution is enabled globally.
    pub enabled: bool,
    /// Base seed used to derive per-label seeds.
    pub base_seed: u64,
    /// If true, kernels must reduce serially instead of fanning out.
    pub fix_reduction: bool,
}

impl Default for DeterminismConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_seed: DEFAULT_SEED,
            fix_reduction: false,
        }
    }
}

impl DeterminismConfig {
    /// Builds a configuration snapshot from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("RECON_DETERMINISTIC")
            .map(|v| !is_falsy(&v))
            .unwrap_or(false);

        let base_seed = lookup("RECON_DETERMINISTIC_SEED")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_SEED);

        let fix_reduction = lookup("RECON_DETERMINISTIC_REDUCTION")
            .map(|v| is_truthy(&v))
            .unwrap_or(enabled);

        Self {
            enabled,
            base_seed,
            fix_reduction,
        }
    }

    /// Derives a deterministic seed for a given component label.
    pub fn seed_for<L: Hash>(&self, label: L) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.base_seed.hash(&mut hasher);
        label.hash(&mut hasher);
        hasher.finish()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "True" | "on" | "ON")
}

fn is_falsy(value: &str) -> bool {
    matches!(value.trim(), "0" | "false" | "False" | "off" | "OFF")
}

static CONFIG: OnceLock<DeterminismConfig> = OnceLock::new();

/// Returns the lazily initialised deterministic configuration.
pub fn config() -> &'static DeterminismConfig {
    CONFIG.get_or_init(DeterminismConfig::from_env)
}

/// Returns a RNG derived from the provided label. When determinism is disabled
/// this falls back to a random seed from the operating system.
pub fn rng_from_label(label: &str) -> StdRng {
    let cfg = config();
    if cfg.enabled {
        StdRng::seed_from_u64(cfg.seed_for(label))
    } else {
        StdRng::from_entropy()
    }
}

/// Returns a RNG seeded from an optional explicit seed, respecting deterministic
/// overrides when the seed is not provided.
pub fn rng_from_optional(seed: Option<u64>, label: &str) -> StdRng {
    match seed {
        Some(value) => StdRng::seed_from_u64(value),
        None => rng_from_label(label),
    }
}

/// Returns whether reductions should be forced to run sequentially.
pub fn lock_reduction_order() -> bool {
    let cfg = config();
    cfg.enabled && cfg.fix_reduction
}
