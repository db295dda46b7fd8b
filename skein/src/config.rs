use skein_api::types::{PoolIndex, UnitId};

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "skein-unit-";
pub const DEFAULT_POOL_THREAD_NAME_PREFIX: &str = "skein-pool-";

// --- Thread Configuration ---

/// Configuration for the OS thread backing a single unit.
#[derive(Clone, Debug, Default)]
pub struct ThreadConfig {
    /// Name of the OS thread. Defaults to `skein-unit-<id>`.
    pub name: Option<String>,

    /// Stack size in bytes. Defaults to the platform's spawn default.
    pub stack_size: Option<usize>,
}

impl ThreadConfig {
    /// The thread name for the unit `id`, applying the default when none is set.
    pub fn thread_name(&self, id: UnitId) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}{}", DEFAULT_THREAD_NAME_PREFIX, id.get()))
    }
}

// --- Pool Configuration ---

/// Configuration for a `ThreadPool`.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of members; fixed for the pool's lifetime.
    pub size: usize,

    /// Prefix of member thread names; the pool index is appended.
    pub thread_name_prefix: String,

    /// Stack size in bytes for every member thread.
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            size: num_cpus::get(),
            thread_name_prefix: DEFAULT_POOL_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl PoolConfig {
    /// Pool configuration with `size` members and default thread settings.
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Derives the thread configuration of the member at `index`.
    pub fn thread_config(&self, index: PoolIndex) -> ThreadConfig {
        ThreadConfig {
            name: Some(format!("{}{}", self.thread_name_prefix, index)),
            stack_size: self.stack_size,
        }
    }
}
