//! Engine configuration
//!
//! Built once at start-up (from CLI flags in the binary, directly in tests)
//! and handed to the service by value.

use crate::types::Currency;

/// Default bound on lock acquisition attempts per account
pub const DEFAULT_LOCK_ATTEMPTS: u32 = 100_000;

/// Whether a missing account may be created on first access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningPolicy {
    /// Create a zero-balance account in the default currency
    AutoProvision,
    /// Report the account as missing
    Disallowed,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Currency for accounts created without an explicit one
    pub default_currency: Currency,

    pub provisioning: ProvisioningPolicy,

    /// Attempts made to take an account lock before failing with `Conflict`
    pub lock_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::Usd,
            provisioning: ProvisioningPolicy::AutoProvision,
            lock_attempts: DEFAULT_LOCK_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Create a config, falling back to the default for a zero attempt bound
    pub fn new(default_currency: Currency, provisioning: ProvisioningPolicy, lock_attempts: u32) -> Self {
        let lock_attempts = if lock_attempts == 0 {
            tracing::warn!(
                default = DEFAULT_LOCK_ATTEMPTS,
                "lock_attempts of 0 is invalid, using default"
            );
            DEFAULT_LOCK_ATTEMPTS
        } else {
            lock_attempts
        };

        Self {
            default_currency,
            provisioning,
            lock_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.default_currency, Currency::Usd);
        assert_eq!(config.provisioning, ProvisioningPolicy::AutoProvision);
        assert_eq!(config.lock_attempts, DEFAULT_LOCK_ATTEMPTS);
    }

    #[test]
    fn test_zero_lock_attempts_falls_back() {
        let config = EngineConfig::new(Currency::Eur, ProvisioningPolicy::Disallowed, 0);
        assert_eq!(config.lock_attempts, DEFAULT_LOCK_ATTEMPTS);
        assert_eq!(config.default_currency, Currency::Eur);
    }
}
