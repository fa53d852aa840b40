//! Generated entity records.
//!
//! Ownership chain: Region → Partner → BusinessAgent (tree, depth ≤ 3)
//! → Store → Transaction ← User. Every child carries its parent ids.
//! Records are never mutated after the world is built.

use crate::types::{EntityId, Money, RegionCode};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Partner ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartnerLevel {
    #[serde(rename = "5GP")]
    FiveGp,
    #[serde(rename = "4GP")]
    FourGp,
    #[serde(rename = "3GP")]
    ThreeGp,
    #[serde(rename = "2GP")]
    TwoGp,
    #[serde(rename = "LP")]
    Lp,
}

impl PartnerLevel {
    /// Highest tier first.
    pub const ALL: [PartnerLevel; 5] = [
        Self::FiveGp,
        Self::FourGp,
        Self::ThreeGp,
        Self::TwoGp,
        Self::Lp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::FiveGp => "5GP",
            Self::FourGp => "4GP",
            Self::ThreeGp => "3GP",
            Self::TwoGp => "2GP",
            Self::Lp => "LP",
        }
    }
}

impl fmt::Display for PartnerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Active,
    Inactive,
}

impl ActivityStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Partner {
    pub id: EntityId,
    pub name: String,
    pub level: PartnerLevel,
    pub region_code: RegionCode,
    pub revenue: Money,
    pub dividend_amount: Money,
    pub store_count: u32,
    pub business_count: u32,
    pub join_date: NaiveDateTime,
    pub status: ActivityStatus,
}

// ── Business agent ──────────────────────────────────────────────────

pub const MAX_BUSINESS_DEPTH: u8 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAgent {
    pub id: EntityId,
    pub name: String,
    pub partner_id: EntityId,
    pub parent_business_id: Option<EntityId>,
    pub region_code: RegionCode,
    /// 1 for agents directly under a partner, up to MAX_BUSINESS_DEPTH.
    pub level: u8,
    pub store_count: u32,
    pub revenue: Money,
    pub direct_dividend: Money,
    pub indirect_dividend: Money,
    pub join_date: NaiveDateTime,
    pub status: ActivityStatus,
}

// ── Store ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StoreCategory {
    Dining,
    Retail,
    Services,
    Entertainment,
    Beauty,
    Education,
    Medical,
    Automotive,
}

impl StoreCategory {
    pub const ALL: [StoreCategory; 8] = [
        Self::Dining,
        Self::Retail,
        Self::Services,
        Self::Entertainment,
        Self::Beauty,
        Self::Education,
        Self::Medical,
        Self::Automotive,
    ];

    /// Display label shown in rankings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dining => "餐饮",
            Self::Retail => "零售",
            Self::Services => "服务",
            Self::Entertainment => "娱乐",
            Self::Beauty => "美容",
            Self::Education => "教育",
            Self::Medical => "医疗",
            Self::Automotive => "汽车",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub id: EntityId,
    pub name: String,
    pub business_id: EntityId,
    pub partner_id: EntityId,
    pub region_code: RegionCode,
    #[serde(rename = "type")]
    pub category: StoreCategory,
    pub address: String,
    pub revenue: Money,
    pub dividend_amount: Money,
    /// Share of each sale given back, in whole percent.
    pub discount_rate: u8,
    pub transaction_count: u32,
    pub average_order_value: Money,
    pub join_date: NaiveDateTime,
    pub status: ActivityStatus,
    pub qr_code_id: String,
}

// ── User ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub phone: String,
    pub region_code: RegionCode,
    pub total_consumption: Money,
    pub total_dividend: Money,
    pub consumption_points: u64,
    pub dividend_count: u32,
    pub join_date: NaiveDateTime,
    /// Never earlier than `join_date`.
    pub last_active_date: NaiveDateTime,
    pub status: ActivityStatus,
}

// ── Transaction ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: EntityId,
    pub store_id: EntityId,
    pub user_id: EntityId,
    pub amount: Money,
    /// floor(amount * store.discount_rate / 100)
    pub discount_amount: Money,
    pub platform_amount: Money,
    /// amount - platform_amount
    pub merchant_amount: Money,
    pub consumption_points: u64,
    pub timestamp: NaiveDateTime,
    pub status: TransactionStatus,
    pub qr_code_id: String,
}
