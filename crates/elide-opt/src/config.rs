//! Configuration Module - Collector Barrier Policy
//!
//! Describes what the target collector guarantees about its barriers, and
//! which formulation of the elision decision to use. Every default is the
//! conservative choice: nothing survives a safepoint, barrier kinds are
//! incomparable, fresh allocations get no special treatment.

use elide_ir::BarrierKind;
use serde::{Deserialize, Serialize};

/// Which barrier kinds stay valid across a safepoint.
///
/// A collector whose read barrier heals the loaded field in place may keep
/// `read` valid; a collector that flips colors at every safepoint keeps
/// nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafepointSurvival {
    pub read: bool,
    pub write: bool,
}

impl SafepointSurvival {
    pub fn survives(&self, kind: BarrierKind) -> bool {
        match kind {
            BarrierKind::None => false,
            BarrierKind::Read => self.read,
            BarrierKind::Write => self.write,
        }
    }
}

/// How the decision engine proves a barrier redundant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElisionMode {
    /// Forward must-availability dataflow with intersection at merges.
    #[default]
    Dataflow,
    /// A single dominating access plus a kill-free backward path walk.
    Dominators,
}

impl std::str::FromStr for ElisionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dataflow" => Ok(ElisionMode::Dataflow),
            "dominators" | "dom" => Ok(ElisionMode::Dominators),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Main configuration for the barrier elision pass
///
/// # Examples
///
/// ```rust
/// use elide_opt::{ElisionConfig, SafepointSurvival};
///
/// // Collector with a self-healing read barrier
/// let config = ElisionConfig {
///     survives_safepoint: SafepointSurvival { read: true, write: false },
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElisionConfig {
    /// Barrier kinds whose guarantee outlives a call, allocation or poll.
    ///
    /// Default: nothing survives
    pub survives_safepoint: SafepointSurvival,

    /// Treat a write barrier as also satisfying a read barrier on the same
    /// location.
    ///
    /// Enable only when the collector's write barrier heals the field the
    /// same way its read barrier does.
    ///
    /// Default: false
    pub write_implies_read: bool,

    /// Treat every field of a freshly allocated object as already
    /// barriered until the next kill.
    ///
    /// Default: false
    pub elide_fresh_allocations: bool,

    /// Decision formulation.
    ///
    /// Default: Dataflow
    pub mode: ElisionMode,

    /// Compute both formulations and fail if the dominator one elides
    /// anything the dataflow one keeps.
    ///
    /// Default: false
    pub verify: bool,

    /// Upper bound on dataflow rounds before giving up on the method.
    ///
    /// Default: 1000
    pub max_rounds: usize,
}

impl Default for ElisionConfig {
    fn default() -> Self {
        Self {
            survives_safepoint: SafepointSurvival::default(),
            write_implies_read: false,
            elide_fresh_allocations: false,
            mode: ElisionMode::Dataflow,
            verify: false,
            max_rounds: 1000,
        }
    }
}

impl ElisionConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::InvalidRounds(
                "max_rounds must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether an established barrier kind satisfies a required one.
    pub fn covers(&self, established: BarrierKind, required: BarrierKind) -> bool {
        match (established, required) {
            (_, BarrierKind::None) | (BarrierKind::None, _) => false,
            (a, b) if a == b => true,
            (BarrierKind::Write, BarrierKind::Read) => self.write_implies_read,
            _ => false,
        }
    }

    /// Build configuration from environment variables
    ///
    /// Overrides defaults with:
    /// - ELIDE_READ_SURVIVES_SAFEPOINT
    /// - ELIDE_WRITE_SURVIVES_SAFEPOINT
    /// - ELIDE_WRITE_IMPLIES_READ
    /// - ELIDE_FRESH_ALLOCATIONS
    /// - ELIDE_MODE
    /// - ELIDE_VERIFY
    /// - ELIDE_MAX_ROUNDS
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(flag) = env_flag("ELIDE_READ_SURVIVES_SAFEPOINT") {
            config.survives_safepoint.read = flag;
        }

        if let Some(flag) = env_flag("ELIDE_WRITE_SURVIVES_SAFEPOINT") {
            config.survives_safepoint.write = flag;
        }

        if let Some(flag) = env_flag("ELIDE_WRITE_IMPLIES_READ") {
            config.write_implies_read = flag;
        }

        if let Some(flag) = env_flag("ELIDE_FRESH_ALLOCATIONS") {
            config.elide_fresh_allocations = flag;
        }

        if let Ok(val) = std::env::var("ELIDE_MODE") {
            match val.parse() {
                Ok(mode) => config.mode = mode,
                Err(e) => log::warn!("ignoring ELIDE_MODE: {}", e),
            }
        }

        if let Some(flag) = env_flag("ELIDE_VERIFY") {
            config.verify = flag;
        }

        if let Ok(val) = std::env::var("ELIDE_MAX_ROUNDS") {
            if let Ok(rounds) = val.parse::<usize>() {
                config.max_rounds = rounds;
            }
        }

        config
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|val| val == "1" || val.eq_ignore_ascii_case("true"))
}

/// Error types for configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid round budget: {0}")]
    InvalidRounds(String),

    #[error("Invalid elision mode: {0} (expected dataflow or dominators)")]
    InvalidMode(String),
}
