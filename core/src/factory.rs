//! Entity factory: one pure constructor per entity kind.
//!
//! RULE: Factories only read their parent record and their RNG.
//! They never look anything up, so a child always carries exactly
//! the ids of the parent it was built from.

use crate::{
    config::GenerationConfig,
    entity::{
        ActivityStatus, BusinessAgent, Partner, PartnerLevel, Store, StoreCategory, Transaction,
        TransactionStatus, User,
    },
    name_generator::NameGenerator,
    region::Region,
    rng::StreamRng,
    types::{EntityId, Money},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use uuid::Uuid;

const STORE_ACTIVE_SHARE: f64 = 0.9;
const USER_ACTIVE_SHARE: f64 = 0.95;

pub struct EntityFactory;

impl EntityFactory {
    pub fn partner(
        province: &Region,
        level: PartnerLevel,
        index: u32,
        config: &GenerationConfig,
        rng: &mut StreamRng,
        now: NaiveDateTime,
    ) -> Partner {
        let range = config.business_per_partner;
        Partner {
            id: format!("{}_{}_{index}", province.code, level.label()),
            name: format!("{}{}合伙人{}", province.name, level.label(), index + 1),
            level,
            region_code: province.code.clone(),
            revenue: rng.between(50_000, 500_000),
            dividend_amount: rng.between(10_000, 100_000),
            store_count: rng.between(10, 100) as u32,
            business_count: rng.between(range.min, range.max) as u32,
            join_date: random_datetime(rng, anchor(2022, 1, 1), now),
            status: ActivityStatus::Active,
        }
    }

    /// Level-1 agent reporting directly to a partner.
    pub fn root_business(
        partner: &Partner,
        index: u32,
        config: &GenerationConfig,
        rng: &mut StreamRng,
        now: NaiveDateTime,
    ) -> BusinessAgent {
        let stores = config.stores_per_root_business;
        BusinessAgent {
            id: format!("{}_business_{index}", partner.id),
            name: format!("商务{}", index + 1),
            partner_id: partner.id.clone(),
            parent_business_id: None,
            region_code: partner.region_code.clone(),
            level: 1,
            store_count: rng.between(stores.min, stores.max) as u32,
            revenue: rng.between(5_000, 50_000),
            direct_dividend: rng.between(1_000, 10_000),
            indirect_dividend: rng.between(500, 5_000),
            join_date: random_datetime(rng, anchor(2022, 7, 1), now),
            status: ActivityStatus::Active,
        }
    }

    /// Agent one level below `parent`, owned by the same partner.
    pub fn sub_business(
        parent: &BusinessAgent,
        index: u32,
        config: &GenerationConfig,
        rng: &mut StreamRng,
        now: NaiveDateTime,
    ) -> BusinessAgent {
        let stores = config.stores_per_sub_business;
        BusinessAgent {
            id: format!("{}_sub_{index}", parent.id),
            name: format!("{}下级{}", parent.name, index + 1),
            partner_id: parent.partner_id.clone(),
            parent_business_id: Some(parent.id.clone()),
            region_code: parent.region_code.clone(),
            level: parent.level + 1,
            store_count: rng.between(stores.min, stores.max) as u32,
            revenue: rng.between(1_000, 10_000),
            direct_dividend: rng.between(200, 2_000),
            indirect_dividend: 0,
            join_date: random_datetime(rng, parent.join_date, now),
            status: ActivityStatus::Active,
        }
    }

    pub fn store(
        agent: &BusinessAgent,
        index: u32,
        config: &GenerationConfig,
        rng: &mut StreamRng,
        now: NaiveDateTime,
    ) -> Store {
        let rates = config.discount_rate;
        let category = rng
            .pick(&StoreCategory::ALL)
            .copied()
            .unwrap_or(StoreCategory::Retail);
        let status = if rng.chance(STORE_ACTIVE_SHARE) {
            ActivityStatus::Active
        } else {
            ActivityStatus::Inactive
        };
        let qr = Uuid::from_u128(((rng.next_u64() as u128) << 64) | rng.next_u64() as u128);

        Store {
            id: format!("{}_store_{index}", agent.id),
            name: NameGenerator::generate_store_name(rng),
            business_id: agent.id.clone(),
            partner_id: agent.partner_id.clone(),
            region_code: agent.region_code.clone(),
            category,
            address: NameGenerator::generate_address(rng),
            revenue: rng.between(10_000, 200_000),
            dividend_amount: rng.between(2_000, 40_000),
            discount_rate: rng.between(rates.min, rates.max) as u8,
            transaction_count: rng.between(100, 2_000) as u32,
            average_order_value: rng.between(50, 500),
            join_date: random_datetime(rng, anchor(2023, 1, 1), now),
            status,
            qr_code_id: format!("QR_{}", qr.simple()),
        }
    }

    pub fn user(index: usize, region: &Region, rng: &mut StreamRng, now: NaiveDateTime) -> User {
        let join_date = random_datetime(rng, anchor(2023, 1, 1), now);
        let active_from = join_date.max(anchor(2024, 1, 1));
        let status = if rng.chance(USER_ACTIVE_SHARE) {
            ActivityStatus::Active
        } else {
            ActivityStatus::Inactive
        };

        User {
            id: format!("user_{index}"),
            name: format!("用户{}", index + 1),
            phone: NameGenerator::generate_phone(rng),
            region_code: region.code.clone(),
            total_consumption: rng.between(100, 50_000),
            total_dividend: rng.between(20, 10_000),
            consumption_points: rng.between(10, 5_000),
            dividend_count: rng.between(1, 40) as u32,
            join_date,
            last_active_date: random_datetime(rng, active_from, now),
            status,
        }
    }

    /// Split a sale according to the store's discount rate.
    /// The platform keeps the discount; the merchant gets the rest,
    /// so `discount_amount + merchant_amount == amount` always holds.
    pub fn transaction(
        id: EntityId,
        store: &Store,
        user: &User,
        amount: Money,
        timestamp: NaiveDateTime,
    ) -> Transaction {
        let discount_amount = amount * store.discount_rate as u64 / 100;
        let platform_amount = discount_amount;
        Transaction {
            id,
            store_id: store.id.clone(),
            user_id: user.id.clone(),
            amount,
            discount_amount,
            platform_amount,
            merchant_amount: amount - platform_amount,
            consumption_points: discount_amount,
            timestamp,
            status: TransactionStatus::Completed,
            qr_code_id: store.qr_code_id.clone(),
        }
    }
}

/// Midnight on a fixed calendar date.
fn anchor(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or_default()
        .and_time(chrono::NaiveTime::MIN)
}

/// Uniform instant in [start, end]. Collapses to `end` when the
/// window is empty, so results never exceed `end`.
pub(crate) fn random_datetime(
    rng: &mut StreamRng,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> NaiveDateTime {
    let span = (end - start).num_seconds();
    if span <= 0 {
        return end;
    }
    start + Duration::seconds(rng.between(0, span as u64) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        region,
        rng::{RngBank, StreamSlot},
    };

    fn now() -> NaiveDateTime {
        anchor(2024, 6, 15) + Duration::hours(10)
    }

    fn sichuan() -> Region {
        region::catalog().remove(0)
    }

    #[test]
    fn children_carry_parent_ids() {
        let config = GenerationConfig::default();
        let mut rng = RngBank::new(3).for_stream(StreamSlot::Partner);
        let partner = EntityFactory::partner(&sichuan(), PartnerLevel::TwoGp, 4, &config, &mut rng, now());
        assert_eq!(partner.id, "sichuan_2GP_4");
        assert_eq!(partner.name, "四川省2GP合伙人5");

        let root = EntityFactory::root_business(&partner, 0, &config, &mut rng, now());
        let sub = EntityFactory::sub_business(&root, 1, &config, &mut rng, now());
        assert_eq!(sub.parent_business_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(sub.partner_id, partner.id);
        assert_eq!(sub.level, 2);
        assert!(sub.join_date >= root.join_date);

        let store = EntityFactory::store(&sub, 0, &config, &mut rng, now());
        assert_eq!(store.business_id, sub.id);
        assert_eq!(store.partner_id, partner.id);
        assert_eq!(store.region_code, "sichuan");
        assert!(store.qr_code_id.starts_with("QR_"));
        assert_eq!(store.qr_code_id.len(), 35);
    }

    #[test]
    fn transaction_split_conserves_amount() {
        let config = GenerationConfig::default();
        let mut rng = RngBank::new(8).for_stream(StreamSlot::Store);
        let partner = EntityFactory::partner(&sichuan(), PartnerLevel::Lp, 0, &config, &mut rng, now());
        let agent = EntityFactory::root_business(&partner, 0, &config, &mut rng, now());
        let mut store = EntityFactory::store(&agent, 0, &config, &mut rng, now());
        let user = EntityFactory::user(0, &sichuan(), &mut rng, now());

        store.discount_rate = 17;
        let tx = EntityFactory::transaction("tx".into(), &store, &user, 999, now());
        assert_eq!(tx.discount_amount, 169); // floor(999 * 0.17)
        assert_eq!(tx.discount_amount + tx.merchant_amount, tx.amount);
        assert_eq!(tx.qr_code_id, store.qr_code_id);
    }

    #[test]
    fn user_last_active_never_precedes_join() {
        let mut rng = RngBank::new(11).for_stream(StreamSlot::User);
        for i in 0..500 {
            let user = EntityFactory::user(i, &sichuan(), &mut rng, now());
            assert!(user.last_active_date >= user.join_date, "{}", user.id);
            assert!(user.last_active_date <= now());
        }
    }

    #[test]
    fn random_datetime_collapses_empty_window() {
        let mut rng = RngBank::new(1).for_stream(StreamSlot::User);
        let end = anchor(2021, 1, 1);
        assert_eq!(random_datetime(&mut rng, anchor(2022, 1, 1), end), end);
    }
}
