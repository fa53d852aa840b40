use crate::{
    entity::PartnerLevel,
    error::{EngineError, EngineResult},
    filter::Role,
};
use serde::{Deserialize, Serialize};

/// Upper bounds keeping generation volumes and money sums inside u64.
const MAX_ENTITY_COUNT: u64 = 10_000;
const MAX_DAILY_TRANSACTIONS: u64 = 100_000;
const MAX_TRANSACTION_AMOUNT: u64 = 100_000_000;
const MAX_PARTNERS_PER_LEVEL: u32 = 1_000;
const MAX_USER_POOL: usize = 1_000_000;
const MAX_WINDOW_DAYS: u32 = 3_660;

/// Inclusive integer range used for every randomized count and amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountRange {
    pub min: u64,
    pub max: u64,
}

impl CountRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    fn check(&self, field: &'static str, limit: u64) -> EngineResult<()> {
        if self.min > self.max {
            return Err(EngineError::invalid(
                field,
                format!("a range with min <= max (got {}..={})", self.min, self.max),
            ));
        }
        if self.max > limit {
            return Err(EngineError::invalid(
                field,
                format!("a maximum of at most {limit} (got {})", self.max),
            ));
        }
        Ok(())
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// Partners created per province, per level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PartnerQuota {
    #[serde(rename = "5GP")]
    pub five_gp: u32,
    #[serde(rename = "4GP")]
    pub four_gp: u32,
    #[serde(rename = "3GP")]
    pub three_gp: u32,
    #[serde(rename = "2GP")]
    pub two_gp: u32,
    #[serde(rename = "LP")]
    pub lp: u32,
}

impl PartnerQuota {
    pub fn count(&self, level: PartnerLevel) -> u32 {
        match level {
            PartnerLevel::FiveGp => self.five_gp,
            PartnerLevel::FourGp => self.four_gp,
            PartnerLevel::ThreeGp => self.three_gp,
            PartnerLevel::TwoGp => self.two_gp,
            PartnerLevel::Lp => self.lp,
        }
    }

    pub fn per_province(&self) -> u32 {
        PartnerLevel::ALL.iter().map(|l| self.count(*l)).sum()
    }
}

impl Default for PartnerQuota {
    fn default() -> Self {
        Self {
            five_gp: 1,
            four_gp: 2,
            three_gp: 3,
            two_gp: 5,
            lp: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub seed: u64,
    pub partners_per_province: PartnerQuota,
    /// Drives each partner's `business_count`, i.e. its level-1 agents.
    pub business_per_partner: CountRange,
    /// Chance that an agent below the depth limit spawns children.
    pub sub_business_probability: f64,
    pub sub_business_fanout: CountRange,
    pub stores_per_root_business: CountRange,
    pub stores_per_sub_business: CountRange,
    /// Detailed users generated. Decoupled from any headline user KPI.
    pub user_pool: usize,
    /// Trailing window of generated transactions, in days.
    pub window_days: u32,
    pub daily_transactions: CountRange,
    pub transaction_amount: CountRange,
    /// Store discount rate in whole percent.
    pub discount_rate: CountRange,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_D1D0,
            partners_per_province: PartnerQuota::default(),
            business_per_partner: CountRange::new(5, 50),
            sub_business_probability: 0.3,
            sub_business_fanout: CountRange::new(1, 3),
            stores_per_root_business: CountRange::new(2, 20),
            stores_per_sub_business: CountRange::new(1, 5),
            user_pool: 1000,
            window_days: 30,
            daily_transactions: CountRange::new(500, 2000),
            transaction_amount: CountRange::new(20, 1000),
            discount_rate: CountRange::new(15, 25),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if let Some(level) = PartnerLevel::ALL
            .into_iter()
            .find(|l| self.partners_per_province.count(*l) > MAX_PARTNERS_PER_LEVEL)
        {
            return Err(EngineError::invalid(
                "generation.partners_per_province",
                format!("at most {MAX_PARTNERS_PER_LEVEL} partners per level (got {level})"),
            ));
        }
        if self.partners_per_province.per_province() == 0 {
            return Err(EngineError::invalid(
                "generation.partners_per_province",
                "at least one partner per province",
            ));
        }
        self.business_per_partner
            .check("generation.business_per_partner", MAX_ENTITY_COUNT)?;
        self.sub_business_fanout
            .check("generation.sub_business_fanout", MAX_ENTITY_COUNT)?;
        self.stores_per_root_business
            .check("generation.stores_per_root_business", MAX_ENTITY_COUNT)?;
        self.stores_per_sub_business
            .check("generation.stores_per_sub_business", MAX_ENTITY_COUNT)?;
        self.daily_transactions
            .check("generation.daily_transactions", MAX_DAILY_TRANSACTIONS)?;
        self.transaction_amount
            .check("generation.transaction_amount", MAX_TRANSACTION_AMOUNT)?;
        self.discount_rate.check("generation.discount_rate", 100)?;

        if !(0.0..=1.0).contains(&self.sub_business_probability) {
            return Err(EngineError::invalid(
                "generation.sub_business_probability",
                format!("a probability in [0, 1] (got {})", self.sub_business_probability),
            ));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(EngineError::invalid(
                "generation.window_days",
                format!("at most {MAX_WINDOW_DAYS} days (got {})", self.window_days),
            ));
        }
        if self.user_pool > MAX_USER_POOL {
            return Err(EngineError::invalid(
                "generation.user_pool",
                format!("at most {MAX_USER_POOL} users (got {})", self.user_pool),
            ));
        }
        if self.window_days == 0 {
            return Err(EngineError::invalid("generation.window_days", "at least 1 day"));
        }
        if self.user_pool == 0 && self.daily_transactions.max > 0 {
            return Err(EngineError::invalid(
                "generation.user_pool",
                "at least 1 user when transactions are generated",
            ));
        }
        Ok(())
    }
}

// ── Dividend policy ────────────────────────────────────────────────

/// Share of the dividend pool per role. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoleWeights {
    pub partners: f64,
    pub business: f64,
    pub stores: f64,
    pub users: f64,
}

impl RoleWeights {
    pub fn weight(&self, role: Role) -> f64 {
        match role {
            Role::Partners => self.partners,
            Role::Business => self.business,
            Role::Stores => self.stores,
            Role::Users => self.users,
        }
    }

    pub fn total(&self) -> f64 {
        self.partners + self.business + self.stores + self.users
    }
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            partners: 0.40,
            business: 0.25,
            stores: 0.20,
            users: 0.15,
        }
    }
}

/// The one source of truth for dividend percentages: both the
/// dividend view and the dividend chart read these weights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DividendPolicy {
    pub weights: RoleWeights,
    /// Fraction of platform revenue that feeds the dividend pool.
    pub pool_share: f64,
    /// Progress of the current round, 0..=100.
    pub progress: u8,
    pub estimated_amount: u64,
    pub estimated_days: u32,
}

impl Default for DividendPolicy {
    fn default() -> Self {
        Self {
            weights: RoleWeights::default(),
            pool_share: 0.8,
            progress: 73,
            estimated_amount: 680_000,
            estimated_days: 2,
        }
    }
}

impl DividendPolicy {
    pub const WEIGHT_TOLERANCE: f64 = 1e-9;

    pub fn validate(&self) -> EngineResult<()> {
        let w = &self.weights;
        if [w.partners, w.business, w.stores, w.users]
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err(EngineError::invalid(
                "dividend.weights",
                "non-negative finite weights",
            ));
        }
        if (w.total() - 1.0).abs() > Self::WEIGHT_TOLERANCE {
            return Err(EngineError::invalid(
                "dividend.weights",
                format!("weights summing to 1.0 (got {})", w.total()),
            ));
        }
        if !(0.0..=1.0).contains(&self.pool_share) {
            return Err(EngineError::invalid(
                "dividend.pool_share",
                format!("a fraction in [0, 1] (got {})", self.pool_share),
            ));
        }
        if self.progress > 100 {
            return Err(EngineError::invalid(
                "dividend.progress",
                format!("a percentage within 0..=100 (got {})", self.progress),
            ));
        }
        Ok(())
    }
}

// ── Business metrics ───────────────────────────────────────────────

/// Redemption shares applied to issued points and consumed vouchers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusinessPolicy {
    /// Fraction of issued consumption points spent as good points.
    pub good_points_redemption: f64,
    /// Fraction of consumed vouchers withdrawn by merchants.
    pub voucher_withdrawal: f64,
}

impl Default for BusinessPolicy {
    fn default() -> Self {
        Self {
            good_points_redemption: 0.35,
            voucher_withdrawal: 0.52,
        }
    }
}

impl BusinessPolicy {
    pub fn validate(&self) -> EngineResult<()> {
        for (field, rate) in [
            ("business.good_points_redemption", self.good_points_redemption),
            ("business.voucher_withdrawal", self.voucher_withdrawal),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::invalid(
                    field,
                    format!("a fraction in [0, 1] (got {rate})"),
                ));
            }
        }
        Ok(())
    }
}

// ── Charts ─────────────────────────────────────────────────────────

/// What an empty revenue bucket shows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBucketFill {
    /// Empty buckets report zero.
    Zero,
    /// Empty buckets get a random illustrative value, flagged `synthetic`.
    #[default]
    Illustrative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ChartConfig {
    pub empty_bucket: EmptyBucketFill,
}

// ── Engine ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub generation: GenerationConfig,
    pub dividend: DividendPolicy,
    pub business: BusinessPolicy,
    pub charts: ChartConfig,
    pub cache_ttl_secs: u64,
    /// Emulated request latency on cache misses. 0 disables it.
    pub simulated_latency_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            dividend: DividendPolicy::default(),
            business: BusinessPolicy::default(),
            charts: ChartConfig::default(),
            cache_ttl_secs: 300,
            simulated_latency_ms: 200,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// Call `validate()` (or let `DashboardEngine::new` do it) afterwards.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Config with small volumes and no latency for use in tests.
    pub fn default_test() -> Self {
        Self {
            generation: GenerationConfig {
                seed: 42,
                partners_per_province: PartnerQuota {
                    five_gp: 1,
                    four_gp: 1,
                    three_gp: 1,
                    two_gp: 1,
                    lp: 2,
                },
                business_per_partner: CountRange::new(2, 4),
                sub_business_probability: 0.3,
                sub_business_fanout: CountRange::new(1, 3),
                stores_per_root_business: CountRange::new(1, 3),
                stores_per_sub_business: CountRange::new(1, 2),
                user_pool: 120,
                window_days: 30,
                daily_transactions: CountRange::new(10, 30),
                transaction_amount: CountRange::new(20, 1000),
                discount_rate: CountRange::new(15, 25),
            },
            dividend: DividendPolicy::default(),
            business: BusinessPolicy::default(),
            charts: ChartConfig::default(),
            cache_ttl_secs: 300,
            simulated_latency_ms: 0,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.generation.validate()?;
        self.dividend.validate()?;
        self.business.validate()?;
        if self.cache_ttl_secs == 0 {
            return Err(EngineError::invalid("cache_ttl_secs", "at least 1 second"));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs as i64)
    }

    pub fn simulated_latency(&self) -> Option<std::time::Duration> {
        (self.simulated_latency_ms > 0)
            .then(|| std::time::Duration::from_millis(self.simulated_latency_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().expect("default config");
        EngineConfig::default_test().validate().expect("test config");
    }

    #[test]
    fn reference_partner_quota_is_nineteen_per_province() {
        assert_eq!(PartnerQuota::default().per_province(), 19);
    }

    #[test]
    fn reversed_range_names_the_field() {
        let mut config = EngineConfig::default_test();
        config.generation.daily_transactions = CountRange::new(50, 10);
        match config.validate() {
            Err(EngineError::InvalidConfig { field, expected }) => {
                assert_eq!(field, "generation.daily_transactions");
                assert!(expected.contains("min <= max"), "{expected}");
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn weights_must_close_to_one() {
        let mut config = EngineConfig::default_test();
        config.dividend.weights.users = 0.30;
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { field: "dividend.weights", .. })
        ));
    }

    #[test]
    fn oversized_ranges_are_rejected() {
        let mut config = EngineConfig::default_test();
        config.generation.transaction_amount = CountRange::new(20, u64::MAX);
        match config.validate() {
            Err(EngineError::InvalidConfig { field, expected }) => {
                assert_eq!(field, "generation.transaction_amount");
                assert!(expected.contains("at most"), "{expected}");
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let mut config = EngineConfig::default_test();
        config.generation.discount_rate = CountRange::new(15, 120);
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { field: "generation.discount_rate", .. })
        ));

        let mut config = EngineConfig::default_test();
        config.generation.partners_per_province.lp = 5_000;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default_test();
        config.generation.user_pool = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn business_rates_are_fractions() {
        let mut config = EngineConfig::default_test();
        config.business.voucher_withdrawal = 1.5;
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidConfig { field: "business.voucher_withdrawal", .. })
        ));
    }

    #[test]
    fn zero_window_is_rejected() {
        let mut config = EngineConfig::default_test();
        config.generation.window_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn progress_above_hundred_is_rejected() {
        let mut config = EngineConfig::default_test();
        config.dividend.progress = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{ "generation": { "seed": 9, "user_pool": 10 }, "simulated_latency_ms": 0 }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.generation.seed, 9);
        assert_eq!(config.generation.user_pool, 10);
        assert_eq!(config.generation.window_days, 30);
        assert_eq!(config.cache_ttl_secs, 300);
        assert!(config.simulated_latency().is_none());
        config.validate().unwrap();
    }
}
