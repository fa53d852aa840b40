//! Dashboard snapshot: the plain value handed to UI collaborators.
//!
//! A snapshot owns all of its data (no borrows into the World),
//! so it can be cached and shared across threads behind an Arc.

use crate::{
    config::RoleWeights,
    filter::{ChartGranularity, FilterCriteria, Role},
    types::{Coordinates, EntityId, Money},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub overview: OverviewView,
    pub business: BusinessView,
    pub dividend: DividendView,
    pub rankings: RankingsView,
    pub charts: ChartsView,
    pub map: Vec<MapPoint>,
    pub criteria: FilterCriteria,
    pub generated_at: NaiveDateTime,
}

// ── Overview ─────────────────────────────────────────────────────────

/// A headline number with its display trend, e.g. "+15.8%".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpi<T> {
    pub value: T,
    pub trend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverviewView {
    pub revenue: Kpi<Money>,
    pub platform_revenue: Kpi<Money>,
    pub stores: Kpi<u64>,
    pub users: Kpi<u64>,
    pub dividend_pool: Kpi<f64>,
}

// ── Business ─────────────────────────────────────────────────────────

/// A running total plus the share of it recorded since local midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessMetric {
    pub value: u64,
    pub today_new: u64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessView {
    pub points_issued: BusinessMetric,
    pub voucher_consumed: BusinessMetric,
    pub good_points_consumed: BusinessMetric,
    pub voucher_withdrawal: BusinessMetric,
}

// ── Dividend ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DistributionShare {
    pub amount: Money,
    pub percentage: f64,
    /// The role is among the criteria's selected roles.
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DividendView {
    pub current_round: u32,
    pub progress: u8,
    pub pool_balance: Money,
    pub estimated_amount: Money,
    pub estimated_days: u32,
    pub distribution: RoleWeights,
    pub current_distribution: BTreeMap<Role, DistributionShare>,
}

// ── Rankings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    /// 1-based position.
    pub rank: u32,
    pub id: EntityId,
    pub name: String,
    /// Region name for partners/business/users, category for stores.
    pub label: String,
    pub count: u64,
    pub amount: Money,
    /// Display-only change percentage.
    pub change: i64,
    /// amount as a percentage of the top row's amount.
    pub share_of_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RankingsView {
    pub partners: Vec<RankingRow>,
    pub stores: Vec<RankingRow>,
    pub business: Vec<RankingRow>,
    pub users: Vec<RankingRow>,
}

// ── Charts ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePoint {
    pub label: String,
    pub revenue: Money,
    pub transactions: u64,
    /// Revenue is an illustrative fill, not data.
    pub synthetic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DividendSlice {
    pub role: Role,
    pub name: String,
    pub value: u32,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegionComparison {
    pub code: String,
    pub name: String,
    pub revenue: Money,
    pub stores: u64,
    pub growth: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartsView {
    pub granularity: ChartGranularity,
    pub revenue: Vec<RevenuePoint>,
    pub dividend: Vec<DividendSlice>,
    pub region: Vec<RegionComparison>,
    pub user_activity: Vec<UserActivityPoint>,
}

/// Users who joined on `date`, and users whose join..last-active span covers it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserActivityPoint {
    pub date: NaiveDate,
    pub new_users: u64,
    pub active_users: u64,
}

// ── Map ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub name: String,
    pub code: String,
    pub value: Money,
    pub store_count: u64,
    pub coordinates: Coordinates,
}
