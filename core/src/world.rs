//! The generated world and the generator that builds it.
//!
//! GENERATION ORDER (fixed, never reordered):
//!   1. Regions        (curated catalog)
//!   2. Partners       (per province, per level quota)
//!   3. BusinessAgents (level-1 roots per partner, then random subtrees)
//!   4. Stores         (per agent, count from the agent's store_count)
//!   5. Users          (fixed-size pool, uniform over provinces)
//!   6. Transactions   (per day of the trailing window)
//!
//! RULES:
//!   - Each stage draws only from its own RngBank stream.
//!   - Each stage reads only the output of earlier stages.
//!   - The finished World is never mutated.

use crate::{
    config::GenerationConfig,
    entity::{BusinessAgent, Partner, PartnerLevel, Store, Transaction, User, MAX_BUSINESS_DEPTH},
    error::EngineResult,
    factory::EntityFactory,
    region::{self, Region, RegionLevel},
    rng::{RngBank, StreamRng, StreamSlot},
};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// The complete immutable entity graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct World {
    pub regions: Vec<Region>,
    pub partners: Vec<Partner>,
    pub business: Vec<BusinessAgent>,
    pub stores: Vec<Store>,
    pub users: Vec<User>,
    pub transactions: Vec<Transaction>,
    pub generated_at: NaiveDateTime,
}

impl World {
    /// Assemble a world from pre-built parts. Used by fixtures and tests.
    pub fn from_parts(
        regions: Vec<Region>,
        partners: Vec<Partner>,
        business: Vec<BusinessAgent>,
        stores: Vec<Store>,
        users: Vec<User>,
        transactions: Vec<Transaction>,
        generated_at: NaiveDateTime,
    ) -> Self {
        Self {
            regions,
            partners,
            business,
            stores,
            users,
            transactions,
            generated_at,
        }
    }

    pub fn provinces(&self) -> impl Iterator<Item = &Region> {
        self.regions
            .iter()
            .filter(|r| r.level == RegionLevel::Province)
    }

    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    /// Display name for a region code, or the code itself when unknown.
    pub fn region_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.region(code).map(|r| r.name.as_str()).unwrap_or(code)
    }

    /// Direct children of `parent_code` at `level`, in catalog order.
    /// Unknown parents and mismatched levels yield an empty list.
    pub fn region_children(&self, parent_code: &str, level: RegionLevel) -> Vec<Region> {
        self.regions
            .iter()
            .filter(|r| r.level == level && r.parent_code.as_deref() == Some(parent_code))
            .cloned()
            .collect()
    }
}

pub struct WorldGenerator<'a> {
    config: &'a GenerationConfig,
    rng_bank: RngBank,
}

impl<'a> WorldGenerator<'a> {
    pub fn new(config: &'a GenerationConfig) -> Self {
        Self {
            config,
            rng_bank: RngBank::new(config.seed),
        }
    }

    /// Build one consistent world anchored at `now`.
    pub fn generate(&self, now: NaiveDateTime) -> EngineResult<World> {
        self.config.validate()?;
        let started = Instant::now();

        let regions = region::catalog();
        let provinces: Vec<&Region> = regions
            .iter()
            .filter(|r| r.level == RegionLevel::Province)
            .collect();

        let partners = self.generate_partners(&provinces, now);
        let business = self.generate_business(&partners, now);
        let stores = self.generate_stores(&business, now);
        let users = self.generate_users(&provinces, now);
        let transactions = self.generate_transactions(&stores, &users, now);

        log::info!(
            "world generated in {:?}: {} regions, {} partners, {} business, {} stores, {} users, {} transactions",
            started.elapsed(),
            regions.len(),
            partners.len(),
            business.len(),
            stores.len(),
            users.len(),
            transactions.len(),
        );

        Ok(World {
            regions,
            partners,
            business,
            stores,
            users,
            transactions,
            generated_at: now,
        })
    }

    fn generate_partners(&self, provinces: &[&Region], now: NaiveDateTime) -> Vec<Partner> {
        let mut rng = self.rng_bank.for_stream(StreamSlot::Partner);
        let quota = &self.config.partners_per_province;
        let mut partners =
            Vec::with_capacity(provinces.len() * quota.per_province() as usize);

        for province in provinces {
            for level in PartnerLevel::ALL {
                for i in 0..quota.count(level) {
                    partners.push(EntityFactory::partner(
                        province,
                        level,
                        i,
                        self.config,
                        &mut rng,
                        now,
                    ));
                }
            }
        }
        partners
    }

    /// Each root is followed by its whole subtree, depth first.
    fn generate_business(&self, partners: &[Partner], now: NaiveDateTime) -> Vec<BusinessAgent> {
        let mut rng = self.rng_bank.for_stream(StreamSlot::Business);
        let mut business = Vec::new();

        for partner in partners {
            for i in 0..partner.business_count {
                let root = EntityFactory::root_business(partner, i, self.config, &mut rng, now);
                let mut subtree = Vec::new();
                self.grow_subtree(&root, &mut rng, now, &mut subtree);
                business.push(root);
                business.extend(subtree);
            }
        }
        business
    }

    fn grow_subtree(
        &self,
        parent: &BusinessAgent,
        rng: &mut StreamRng,
        now: NaiveDateTime,
        out: &mut Vec<BusinessAgent>,
    ) {
        if parent.level >= MAX_BUSINESS_DEPTH || !rng.chance(self.config.sub_business_probability) {
            return;
        }
        let fanout = self.config.sub_business_fanout;
        for j in 0..rng.between(fanout.min, fanout.max) as u32 {
            let child = EntityFactory::sub_business(parent, j, self.config, rng, now);
            let mut grandchildren = Vec::new();
            self.grow_subtree(&child, rng, now, &mut grandchildren);
            out.push(child);
            out.extend(grandchildren);
        }
    }

    fn generate_stores(&self, business: &[BusinessAgent], now: NaiveDateTime) -> Vec<Store> {
        let mut rng = self.rng_bank.for_stream(StreamSlot::Store);
        let total: usize = business.iter().map(|b| b.store_count as usize).sum();
        let mut stores = Vec::with_capacity(total);

        for agent in business {
            for i in 0..agent.store_count {
                stores.push(EntityFactory::store(agent, i, self.config, &mut rng, now));
            }
        }
        stores
    }

    fn generate_users(&self, provinces: &[&Region], now: NaiveDateTime) -> Vec<User> {
        let mut rng = self.rng_bank.for_stream(StreamSlot::User);
        let mut users = Vec::with_capacity(self.config.user_pool);

        for i in 0..self.config.user_pool {
            let Some(region) = rng.pick(provinces) else {
                break;
            };
            users.push(EntityFactory::user(i, region, &mut rng, now));
        }
        users
    }

    /// Day `d` of the window covers [now - (window - d) days, +1 day),
    /// so every timestamp lands in [now - window, now).
    fn generate_transactions(
        &self,
        stores: &[Store],
        users: &[User],
        now: NaiveDateTime,
    ) -> Vec<Transaction> {
        let mut rng = self.rng_bank.for_stream(StreamSlot::Transaction);
        let window = self.config.window_days as i64;
        let daily = self.config.daily_transactions;
        let amounts = self.config.transaction_amount;

        if stores.is_empty() || users.is_empty() {
            log::warn!(
                "no transactions generated: {} stores, {} users",
                stores.len(),
                users.len()
            );
            return Vec::new();
        }

        let mut transactions = Vec::new();
        for day in 0..window {
            let day_start = now - Duration::days(window - day);
            let day_tag = day_start.format("%Y%m%d").to_string();
            let count = rng.between(daily.min, daily.max);

            for i in 0..count {
                let (Some(store), Some(user)) = (rng.pick(stores), rng.pick(users)) else {
                    break;
                };
                let amount = rng.between(amounts.min, amounts.max);
                let offset = rng.between(0, SECONDS_PER_DAY - 1) as i64;
                transactions.push(EntityFactory::transaction(
                    format!("tx_{day_tag}_{i}"),
                    store,
                    user,
                    amount,
                    day_start + Duration::seconds(offset),
                ));
            }
        }
        transactions
    }
}
