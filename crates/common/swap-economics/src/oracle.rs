use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("price source unavailable: {0}")]
    Unavailable(String),

    #[error("conversion of {honey} honey overflows")]
    Overflow { honey: u64 },
}

/// Converts honey into the settlement currency.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_price(&self, honey: u64) -> Result<u64, OracleError>;
}

/// Fixed exchange rate: `rate` settlement units per honey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPriceOracle {
    rate: u64,
}

impl FixedPriceOracle {
    pub fn new(rate: u64) -> Self {
        Self { rate }
    }
}

impl Default for FixedPriceOracle {
    fn default() -> Self {
        Self { rate: 1 }
    }
}

#[async_trait]
impl PriceOracle for FixedPriceOracle {
    async fn get_price(&self, honey: u64) -> Result<u64, OracleError> {
        honey
            .checked_mul(self.rate)
            .ok_or(OracleError::Overflow { honey })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_rate_converts() {
        assert_eq!(FixedPriceOracle::default().get_price(101).await.unwrap(), 101);
        assert_eq!(FixedPriceOracle::new(3).get_price(7).await.unwrap(), 21);
        assert!(matches!(
            FixedPriceOracle::new(2).get_price(u64::MAX).await,
            Err(OracleError::Overflow { .. })
        ));
    }
}
