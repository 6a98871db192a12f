use crate::ConfigError;

/// Sizing and growth policy of a pool, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Number of instances allocated when the pool is constructed.
    pub initial_size: usize,
    /// Whether an empty free-list triggers allocation of a new batch.
    pub enable_dynamic_growth: bool,
    /// Number of instances allocated per growth event.
    pub growth_batch_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            initial_size: 512,
            enable_dynamic_growth: true,
            growth_batch_size: 32,
        }
    }
}

impl PoolConfig {
    /// Sets the initial size.
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Enables or disables dynamic growth.
    pub fn with_dynamic_growth(mut self, enabled: bool) -> Self {
        self.enable_dynamic_growth = enabled;
        self
    }

    /// Sets the growth batch size.
    pub fn with_growth_batch_size(mut self, growth_batch_size: usize) -> Self {
        self.growth_batch_size = growth_batch_size;
        self
    }

    /// Checks the configuration for combinations that can never work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enable_dynamic_growth {
            if self.growth_batch_size == 0 {
                return Err(ConfigError::ZeroGrowthBatch);
            }
        } else if self.initial_size == 0 {
            return Err(ConfigError::ZeroInitialSize);
        }
        Ok(())
    }
}
