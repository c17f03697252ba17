//! Pluggable domain data sources.
//!
//! Tools are thin adapters over these traits: the tool shapes parameters
//! and formats results, the data source owns where the numbers come from.
//! The `Fixture*` implementations return deterministic synthetic data so
//! agents behave reproducibly in tests and offline deployments; a
//! production deployment swaps in implementations backed by real rate
//! sheets and listing APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Current mortgage rate sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortgageRates {
    /// 30-year fixed APR, percent
    pub thirty_year_fixed: f64,
    /// 15-year fixed APR, percent
    pub fifteen_year_fixed: f64,
    /// 5/1 ARM APR, percent
    pub five_one_arm: f64,
}

/// Market statistics for one area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub area: String,
    pub median_price: f64,
    pub average_days_on_market: u32,
    pub active_listings: u32,
    /// Year-over-year price change, percent
    pub yoy_price_change: f64,
}

/// One rental comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalComp {
    pub address: String,
    pub bedrooms: u32,
    pub monthly_rent: f64,
    pub square_feet: u32,
}

/// Source of mortgage rates and lending thresholds.
#[async_trait]
pub trait MortgageDataSource: Send + Sync {
    async fn current_rates(&self) -> anyhow::Result<MortgageRates>;

    /// Maximum debt-to-income ratio lenders will accept, percent.
    fn max_debt_to_income(&self) -> f64 {
        43.0
    }
}

/// Source of area market statistics.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn snapshot(&self, area: &str) -> anyhow::Result<MarketSnapshot>;
}

/// Source of rental comparables.
#[async_trait]
pub trait RentalDataSource: Send + Sync {
    async fn comparables(&self, area: &str, bedrooms: u32) -> anyhow::Result<Vec<RentalComp>>;
}

/// Deterministic mortgage rates for tests and offline use.
pub struct FixtureMortgageRates;

#[async_trait]
impl MortgageDataSource for FixtureMortgageRates {
    async fn current_rates(&self) -> anyhow::Result<MortgageRates> {
        Ok(MortgageRates {
            thirty_year_fixed: 6.85,
            fifteen_year_fixed: 6.10,
            five_one_arm: 6.40,
        })
    }
}

/// Deterministic market statistics for tests and offline use.
pub struct FixtureMarketStats;

#[async_trait]
impl MarketDataSource for FixtureMarketStats {
    async fn snapshot(&self, area: &str) -> anyhow::Result<MarketSnapshot> {
        Ok(MarketSnapshot {
            area: area.to_string(),
            median_price: 485_000.0,
            average_days_on_market: 34,
            active_listings: 127,
            yoy_price_change: 4.2,
        })
    }
}

/// Deterministic rental comparables for tests and offline use.
pub struct FixtureRentalComps;

#[async_trait]
impl RentalDataSource for FixtureRentalComps {
    async fn comparables(&self, area: &str, bedrooms: u32) -> anyhow::Result<Vec<RentalComp>> {
        Ok(vec![
            RentalComp {
                address: format!("118 Alder St, {}", area),
                bedrooms,
                monthly_rent: 2_150.0,
                square_feet: 980,
            },
            RentalComp {
                address: format!("42 Birchwood Ave, {}", area),
                bedrooms,
                monthly_rent: 2_325.0,
                square_feet: 1_040,
            },
            RentalComp {
                address: format!("7 Crescent Ct, {}", area),
                bedrooms,
                monthly_rent: 1_995.0,
                square_feet: 910,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_rates_deterministic() {
        let source = FixtureMortgageRates;
        let a = source.current_rates().await.unwrap();
        let b = source.current_rates().await.unwrap();
        assert_eq!(a.thirty_year_fixed, b.thirty_year_fixed);
        assert_eq!(a.fifteen_year_fixed, b.fifteen_year_fixed);
    }

    #[tokio::test]
    async fn test_fixture_comps_deterministic() {
        let source = FixtureRentalComps;
        let a = source.comparables("Springfield", 2).await.unwrap();
        let b = source.comparables("Springfield", 2).await.unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(a[0].address, b[0].address);
        assert_eq!(a[1].monthly_rent, b[1].monthly_rent);
    }
}
