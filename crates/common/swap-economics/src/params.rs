use serde::{Deserialize, Serialize};

pub use swap_contracts::{DEFAULT_HARDDEPOSIT_TIMEOUT, DEPLOY_DELAY, DEPLOY_RETRIES};

/// Debt (in honey) at which we settle with a cheque.
pub const DEFAULT_PAYMENT_THRESHOLD: u64 = 1_000_000;
/// Credit (in honey) at which we stop serving a peer.
pub const DEFAULT_DISCONNECT_THRESHOLD: u64 = 1_500_000;
pub const DEFAULT_INITIAL_DEPOSIT_AMOUNT: u64 = 0;
/// Delay in seconds before a cheque may be cashed.
pub const DEFAULT_CASH_IN_DELAY: u64 = 86_400;

/// Economic parameters fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub initial_deposit_amount: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self { initial_deposit_amount: DEFAULT_INITIAL_DEPOSIT_AMOUNT }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapConfig {
    pub payment_threshold: u64,
    pub disconnect_threshold: u64,
    pub params: Params,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            payment_threshold: DEFAULT_PAYMENT_THRESHOLD,
            disconnect_threshold: DEFAULT_DISCONNECT_THRESHOLD,
            params: Params::default(),
        }
    }
}

impl SwapConfig {
    pub fn with_thresholds(payment_threshold: u64, disconnect_threshold: u64) -> Self {
        Self { payment_threshold, disconnect_threshold, ..Self::default() }
    }

    /// Payment threshold as a signed debt bound.
    pub fn payment_bound(&self) -> i64 {
        -(clamp_i64(self.payment_threshold))
    }

    pub fn disconnect_bound(&self) -> i64 {
        clamp_i64(self.disconnect_threshold)
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = SwapConfig::default();
        assert_eq!(config.payment_bound(), -1_000_000);
        assert_eq!(config.disconnect_bound(), 1_500_000);
        assert_eq!(config.params.initial_deposit_amount, 0);
    }

    #[test]
    fn huge_thresholds_saturate() {
        let config = SwapConfig::with_thresholds(u64::MAX, u64::MAX);
        assert_eq!(config.payment_bound(), -i64::MAX);
        assert_eq!(config.disconnect_bound(), i64::MAX);
    }
}
