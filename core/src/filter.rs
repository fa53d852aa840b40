//! Filter criteria and the filter engine.
//!
//! RULES:
//!   - Only `province` narrows stores and users. `city` and `district`
//!     are carried (and part of the cache key) but select nothing.
//!   - Only the time range narrows transactions. There is no upper
//!     bound: "now" is implicit.
//!   - Partners and business agents always pass through whole, so
//!     their rankings do not move when the region filter changes.

use crate::{
    entity::{BusinessAgent, Partner, Store, Transaction, User},
    error::EngineResult,
    types::RegionCode,
    world::World,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_ROUND: u32 = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Today,
    Week,
    #[default]
    Month,
    Quarter,
    Year,
    /// Trailing 30 days. Any unrecognized value deserializes to this.
    #[serde(rename = "rolling_30d")]
    #[serde(other)]
    Rolling30Days,
}

impl TimeRange {
    /// Inclusive lower bound of the window ending at `now`.
    pub fn start(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date();
        let date = match self {
            Self::Today => today,
            Self::Week => return now - Duration::days(7),
            Self::Month => first_of_month(today.year(), today.month()),
            Self::Quarter => first_of_month(today.year(), (today.month0() / 3) * 3 + 1),
            Self::Year => first_of_month(today.year(), 1),
            Self::Rolling30Days => return now - Duration::days(30),
        };
        date.and_time(NaiveTime::MIN)
    }

    pub fn chart_granularity(&self) -> ChartGranularity {
        match self {
            Self::Today | Self::Week => ChartGranularity::Week,
            Self::Month | Self::Quarter | Self::Rolling30Days => ChartGranularity::Month,
            Self::Year => ChartGranularity::Year,
        }
    }
}

/// Shape of the revenue time series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChartGranularity {
    /// 7 daily buckets.
    Week,
    /// 10 buckets at a 3-day stride.
    Month,
    /// 12 calendar-month buckets.
    Year,
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Partners,
    Business,
    Stores,
    Users,
}

impl Role {
    pub const ALL: [Role; 4] = [Self::Partners, Self::Business, Self::Stores, Self::Users];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Partners => "合伙人",
            Self::Business => "商务",
            Self::Stores => "商户",
            Self::Users => "用户",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub time_range: TimeRange,
    pub province: Option<RegionCode>,
    pub city: Option<RegionCode>,
    pub district: Option<RegionCode>,
    pub roles: BTreeSet<Role>,
    pub round: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            time_range: TimeRange::default(),
            province: None,
            city: None,
            district: None,
            roles: Role::ALL.into_iter().collect(),
            round: DEFAULT_ROUND,
        }
    }
}

impl FilterCriteria {
    pub fn new(time_range: TimeRange) -> Self {
        Self {
            time_range,
            ..Self::default()
        }
    }

    pub fn with_province(mut self, code: impl Into<RegionCode>) -> Self {
        self.province = Some(code.into());
        self
    }

    pub fn with_city(mut self, code: impl Into<RegionCode>) -> Self {
        self.city = Some(code.into());
        self
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = round;
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    /// Province filter, treating an empty string as "all provinces".
    pub fn province(&self) -> Option<&str> {
        non_empty(&self.province)
    }

    /// Same criteria with blank region codes dropped.
    pub fn normalized(&self) -> Self {
        Self {
            province: non_empty(&self.province).map(Into::into),
            city: non_empty(&self.city).map(Into::into),
            district: non_empty(&self.district).map(Into::into),
            ..self.clone()
        }
    }

    /// Canonical cache key: JSON of the normalized criteria.
    /// Field order is the struct order and roles are a sorted set,
    /// so equal criteria always produce equal keys.
    pub fn cache_key(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(&self.normalized())?)
    }
}

fn non_empty(code: &Option<RegionCode>) -> Option<&str> {
    code.as_deref().filter(|c| !c.is_empty())
}

/// The entities a criteria selects, borrowed from the world.
#[derive(Debug, Clone)]
pub struct FilteredSubset<'a> {
    pub stores: Vec<&'a Store>,
    pub users: Vec<&'a User>,
    pub transactions: Vec<&'a Transaction>,
    pub partners: &'a [Partner],
    pub business: &'a [BusinessAgent],
    /// Lower bound applied to transactions.
    pub start: NaiveDateTime,
}

pub struct FilterEngine;

impl FilterEngine {
    pub fn apply<'a>(
        world: &'a World,
        criteria: &FilterCriteria,
        now: NaiveDateTime,
    ) -> FilteredSubset<'a> {
        let province = criteria.province();
        let in_region = |code: &str| province.map_or(true, |p| p == code);

        if let Some(p) = province {
            if world.region(p).is_none() {
                log::debug!("unknown province filter {p:?}: empty store/user subset");
            }
        }

        let start = criteria.time_range.start(now);

        FilteredSubset {
            stores: world
                .stores
                .iter()
                .filter(|s| in_region(&s.region_code))
                .collect(),
            users: world
                .users
                .iter()
                .filter(|u| in_region(&u.region_code))
                .collect(),
            transactions: world
                .transactions
                .iter()
                .filter(|t| t.timestamp >= start)
                .collect(),
            partners: &world.partners,
            business: &world.business,
            start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn range_starts() {
        let now = at(2024, 8, 15, 10);
        assert_eq!(TimeRange::Today.start(now), at(2024, 8, 15, 0));
        assert_eq!(TimeRange::Week.start(now), at(2024, 8, 8, 10));
        assert_eq!(TimeRange::Month.start(now), at(2024, 8, 1, 0));
        assert_eq!(TimeRange::Quarter.start(now), at(2024, 7, 1, 0));
        assert_eq!(TimeRange::Year.start(now), at(2024, 1, 1, 0));
        assert_eq!(TimeRange::Rolling30Days.start(now), at(2024, 7, 16, 10));
    }

    #[test]
    fn quarter_boundaries() {
        assert_eq!(TimeRange::Quarter.start(at(2024, 3, 31, 23)), at(2024, 1, 1, 0));
        assert_eq!(TimeRange::Quarter.start(at(2024, 4, 1, 0)), at(2024, 4, 1, 0));
        assert_eq!(TimeRange::Quarter.start(at(2024, 12, 5, 8)), at(2024, 10, 1, 0));
    }

    #[test]
    fn unknown_time_range_falls_back_to_rolling_window() {
        let parsed: TimeRange = serde_json::from_str(r#""fortnight""#).unwrap();
        assert_eq!(parsed, TimeRange::Rolling30Days);
        let parsed: TimeRange = serde_json::from_str(r#""quarter""#).unwrap();
        assert_eq!(parsed, TimeRange::Quarter);
    }

    #[test]
    fn cache_key_ignores_blank_regions_and_role_order() {
        let a = FilterCriteria {
            province: Some(String::new()),
            ..FilterCriteria::new(TimeRange::Week)
        }
        .with_roles([Role::Users, Role::Partners]);
        let b = FilterCriteria::new(TimeRange::Week).with_roles([Role::Partners, Role::Users]);
        assert_eq!(a.cache_key().unwrap(), b.cache_key().unwrap());

        let c = b.clone().with_province("sichuan");
        assert_ne!(b.cache_key().unwrap(), c.cache_key().unwrap());
    }

    #[test]
    fn criteria_parse_from_ui_shape() {
        let json = r#"{"timeRange":"year","province":"","roles":["stores"],"round":30}"#;
        let criteria: FilterCriteria = serde_json::from_str(json).unwrap();
        assert_eq!(criteria.time_range, TimeRange::Year);
        assert_eq!(criteria.province(), None);
        assert_eq!(criteria.roles.len(), 1);
        assert_eq!(criteria.round, 30);
        assert_eq!(criteria.city, None);
    }
}
