use serde::{Deserialize, Serialize};

/// General settings apply to every session the gateway creates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct General {
    /// Number of compiled statements each session keeps around for reuse.
    /// `0` disables the statement cache.
    ///
    /// _Default:_ `8`
    #[serde(default = "General::query_cache_size")]
    pub query_cache_size: usize,

    /// Upper bound for per-session query timeouts, in milliseconds.
    /// Sessions asking for a longer (or unlimited) timeout are clamped
    /// to this value. `0` removes the bound.
    ///
    /// _Default:_ `0`
    #[serde(default = "General::max_query_timeout")]
    pub max_query_timeout: u64,

    /// Query timeout applied to new sessions, in milliseconds.
    /// `0` means statements run without a deadline.
    ///
    /// _Default:_ `0`
    #[serde(default = "General::default_query_timeout")]
    pub default_query_timeout: u64,

    /// Lock timeout applied to new sessions, in milliseconds.
    ///
    /// _Default:_ `2000`
    #[serde(default = "General::default_lock_timeout")]
    pub default_lock_timeout: u64,

    /// Minimum interval between throttle sleeps of a throttled session,
    /// in milliseconds. Keeps tight check loops from turning into a
    /// storm of short sleeps.
    ///
    /// _Default:_ `50`
    #[serde(default = "General::throttle_grace")]
    pub throttle_grace: u64,
}

impl General {
    fn query_cache_size() -> usize {
        8
    }

    fn max_query_timeout() -> u64 {
        0
    }

    fn default_query_timeout() -> u64 {
        0
    }

    fn default_lock_timeout() -> u64 {
        2_000
    }

    fn throttle_grace() -> u64 {
        50
    }
}

impl Default for General {
    fn default() -> Self {
        Self {
            query_cache_size: Self::query_cache_size(),
            max_query_timeout: Self::max_query_timeout(),
            default_query_timeout: Self::default_query_timeout(),
            default_lock_timeout: Self::default_lock_timeout(),
            throttle_grace: Self::throttle_grace(),
        }
    }
}
