//! Aggregation engine: turns a filtered subset into a DashboardSnapshot.
//!
//! Scope of each view (kept deliberately uneven):
//!   - overview, business metrics, store/user rankings, region chart,
//!     user activity: filtered subset
//!   - partner/business rankings: whole partner population
//!   - map: every province, every store, regardless of filters
//!
//! Trends, ranking `change` values and empty-bucket fills are display
//! decoration drawn from the display RNG stream. Nothing else is random.

use crate::{
    config::{BusinessPolicy, ChartConfig, DividendPolicy, EmptyBucketFill, EngineConfig},
    entity::{Store, Transaction},
    filter::{ChartGranularity, FilterCriteria, FilteredSubset, Role},
    rng::StreamRng,
    snapshot::{
        BusinessMetric, BusinessView, ChartsView, DashboardSnapshot, DistributionShare,
        DividendSlice, DividendView, Kpi, MapPoint, OverviewView, RankingRow, RankingsView,
        RegionComparison, RevenuePoint, UserActivityPoint,
    },
    types::Money,
    world::World,
};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};

pub const RANKING_SIZE: usize = 10;
pub const REGION_CHART_SIZE: usize = 6;

const MONTH_BUCKETS: i64 = 10;
const MONTH_STRIDE_DAYS: i64 = 3;
const USER_ACTIVITY_DAYS: i64 = 7;

const POINTS_UNIT: &str = "点";
const CURRENCY_UNIT: &str = "元";

pub struct AggregationEngine<'a> {
    dividend: &'a DividendPolicy,
    business: &'a BusinessPolicy,
    charts: &'a ChartConfig,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            dividend: &config.dividend,
            business: &config.business,
            charts: &config.charts,
        }
    }

    pub fn compute(
        &self,
        subset: &FilteredSubset<'_>,
        world: &World,
        criteria: &FilterCriteria,
        now: NaiveDateTime,
        rng: &mut StreamRng,
    ) -> DashboardSnapshot {
        let overview = self.overview(subset, rng);
        let business = self.business_metrics(subset, now);
        let dividend = self.dividend_view(overview.dividend_pool.value, criteria);
        let rankings = self.rankings(subset, world, rng);
        let granularity = criteria.time_range.chart_granularity();
        let charts = ChartsView {
            granularity,
            revenue: self.revenue_series(subset, granularity, now, rng),
            dividend: self.dividend_chart(),
            region: self.region_comparison(subset, world, rng),
            user_activity: self.user_activity(subset, now),
        };

        DashboardSnapshot {
            overview,
            business,
            dividend,
            rankings,
            charts,
            map: self.map(world),
            criteria: criteria.normalized(),
            generated_at: now,
        }
    }

    pub fn overview(&self, subset: &FilteredSubset<'_>, rng: &mut StreamRng) -> OverviewView {
        let revenue: Money = subset.transactions.iter().map(|t| t.amount).sum();
        let platform_revenue: Money = subset.transactions.iter().map(|t| t.platform_amount).sum();
        let stores = subset.stores.iter().filter(|s| s.status.is_active()).count() as u64;
        let users = subset.users.iter().filter(|u| u.status.is_active()).count() as u64;

        OverviewView {
            revenue: kpi(revenue, rng),
            platform_revenue: kpi(platform_revenue, rng),
            stores: kpi(stores, rng),
            users: kpi(users, rng),
            dividend_pool: kpi(platform_revenue as f64 * self.dividend.pool_share, rng),
        }
    }

    /// Points and voucher totals over the filtered transactions, each
    /// with the part recorded since local midnight.
    pub fn business_metrics(&self, subset: &FilteredSubset<'_>, now: NaiveDateTime) -> BusinessView {
        let midnight = now.date().and_time(NaiveTime::MIN);
        let (points, points_today) = split_today(subset, midnight, |t| t.consumption_points);
        let (vouchers, vouchers_today) = split_today(subset, midnight, |t| t.discount_amount);
        let redeemed = self.business.good_points_redemption;
        let withdrawn = self.business.voucher_withdrawal;

        BusinessView {
            points_issued: metric(points, points_today, POINTS_UNIT),
            voucher_consumed: metric(vouchers, vouchers_today, CURRENCY_UNIT),
            good_points_consumed: metric(
                portion(points, redeemed),
                portion(points_today, redeemed),
                POINTS_UNIT,
            ),
            voucher_withdrawal: metric(
                portion(vouchers, withdrawn),
                portion(vouchers_today, withdrawn),
                CURRENCY_UNIT,
            ),
        }
    }

    pub fn dividend_view(&self, dividend_pool: f64, criteria: &FilterCriteria) -> DividendView {
        let weights = self.dividend.weights;
        let estimated = self.dividend.estimated_amount;

        let current_distribution = Role::ALL
            .into_iter()
            .map(|role| {
                let weight = weights.weight(role);
                let share = DistributionShare {
                    amount: (estimated as f64 * weight).floor() as Money,
                    percentage: weight * 100.0,
                    selected: criteria.roles.contains(&role),
                };
                (role, share)
            })
            .collect();

        DividendView {
            current_round: criteria.round,
            progress: self.dividend.progress.min(100),
            pool_balance: dividend_pool.max(0.0).floor() as Money,
            estimated_amount: estimated,
            estimated_days: self.dividend.estimated_days,
            distribution: weights,
            current_distribution,
        }
    }

    pub fn rankings(
        &self,
        subset: &FilteredSubset<'_>,
        world: &World,
        rng: &mut StreamRng,
    ) -> RankingsView {
        let partners = top_by(subset.partners.iter(), |p| p.revenue);
        let partners = ranking_rows(partners.iter(), (-10, 30), rng, |p| {
            (
                p.id.clone(),
                p.name.clone(),
                world.region_name(&p.region_code).to_string(),
                p.store_count as u64,
                p.revenue,
            )
        });

        let stores = top_by(subset.stores.iter().copied(), |s| s.revenue);
        let stores = ranking_rows(stores.iter(), (-15, 25), rng, |s: &&Store| {
            (
                s.id.clone(),
                s.name.clone(),
                s.category.label().to_string(),
                1,
                s.revenue,
            )
        });

        let business = top_by(subset.business.iter(), |b| b.revenue);
        let business = ranking_rows(business.iter(), (-5, 15), rng, |b| {
            (
                b.id.clone(),
                b.name.clone(),
                world.region_name(&b.region_code).to_string(),
                b.store_count as u64,
                b.revenue,
            )
        });

        let users = top_by(subset.users.iter().copied(), |u| u.total_consumption);
        let users = ranking_rows(users.iter(), (0, 5), rng, |u| {
            (
                u.id.clone(),
                u.name.clone(),
                world.region_name(&u.region_code).to_string(),
                u.dividend_count as u64,
                u.total_consumption,
            )
        });

        RankingsView {
            partners,
            stores,
            business,
            users,
        }
    }

    pub fn revenue_series(
        &self,
        subset: &FilteredSubset<'_>,
        granularity: ChartGranularity,
        now: NaiveDateTime,
        rng: &mut StreamRng,
    ) -> Vec<RevenuePoint> {
        let mut points = Vec::new();
        match granularity {
            ChartGranularity::Week => {
                for i in (0..7).rev() {
                    let day = (now - Duration::days(i)).date();
                    let label = format!("{}月{}日", day.month(), day.day());
                    points.push(self.bucket(subset, label, granularity, rng, |ts| ts.date() == day));
                }
            }
            ChartGranularity::Month => {
                for i in (0..MONTH_BUCKETS).rev() {
                    let end = now - Duration::days(i * MONTH_STRIDE_DAYS);
                    let start = end - Duration::days(MONTH_STRIDE_DAYS);
                    let label = format!("{}/{}", end.month(), end.day());
                    points.push(self.bucket(subset, label, granularity, rng, |ts| {
                        ts >= start && ts < end
                    }));
                }
            }
            ChartGranularity::Year => {
                for i in (0..12).rev() {
                    let (year, month) = months_back(now.year(), now.month(), i);
                    let label = format!("{month}月");
                    points.push(self.bucket(subset, label, granularity, rng, |ts| {
                        ts.year() == year && ts.month() == month
                    }));
                }
            }
        }
        points
    }

    fn bucket(
        &self,
        subset: &FilteredSubset<'_>,
        label: String,
        granularity: ChartGranularity,
        rng: &mut StreamRng,
        contains: impl Fn(NaiveDateTime) -> bool,
    ) -> RevenuePoint {
        let (revenue, transactions) = subset
            .transactions
            .iter()
            .filter(|t| contains(t.timestamp))
            .fold((0, 0), |(sum, n), t| (sum + t.amount, n + 1));

        let fill = transactions == 0 && self.charts.empty_bucket == EmptyBucketFill::Illustrative;
        let revenue = if fill {
            let (min, max) = illustrative_range(granularity);
            rng.between(min, max)
        } else {
            revenue
        };

        RevenuePoint {
            label,
            revenue,
            transactions,
            synthetic: fill,
        }
    }

    /// Percent split per role, read from the same policy weights
    /// as the dividend view.
    pub fn dividend_chart(&self) -> Vec<DividendSlice> {
        Role::ALL
            .into_iter()
            .map(|role| DividendSlice {
                role,
                name: role.label().to_string(),
                value: (self.dividend.weights.weight(role) * 100.0).round() as u32,
                color: slice_color(role).to_string(),
            })
            .collect()
    }

    pub fn region_comparison(
        &self,
        subset: &FilteredSubset<'_>,
        world: &World,
        rng: &mut StreamRng,
    ) -> Vec<RegionComparison> {
        world
            .provinces()
            .take(REGION_CHART_SIZE)
            .map(|province| {
                let (revenue, stores) = subset
                    .stores
                    .iter()
                    .filter(|s| s.region_code == province.code)
                    .fold((0, 0), |(sum, n), s| (sum + s.revenue, n + 1));
                RegionComparison {
                    code: province.code.clone(),
                    name: province.name.clone(),
                    revenue,
                    stores,
                    growth: rng.between_i64(-5, 30),
                }
            })
            .collect()
    }

    /// One point per day for the trailing week, ending today.
    pub fn user_activity(&self, subset: &FilteredSubset<'_>, now: NaiveDateTime) -> Vec<UserActivityPoint> {
        (0..USER_ACTIVITY_DAYS)
            .rev()
            .map(|i| {
                let date = (now - Duration::days(i)).date();
                let (new_users, active_users) =
                    subset.users.iter().fold((0, 0), |(joined, active), u| {
                        let (from, to) = (u.join_date.date(), u.last_active_date.date());
                        (
                            joined + u64::from(from == date),
                            active + u64::from(from <= date && date <= to),
                        )
                    });
                UserActivityPoint {
                    date,
                    new_users,
                    active_users,
                }
            })
            .collect()
    }

    /// National rollup over all stores, one point per province.
    pub fn map(&self, world: &World) -> Vec<MapPoint> {
        world
            .provinces()
            .map(|province| {
                let (value, store_count) = world
                    .stores
                    .iter()
                    .filter(|s| s.region_code == province.code)
                    .fold((0, 0), |(sum, n), s| (sum + s.revenue, n + 1));
                MapPoint {
                    name: province.name.clone(),
                    code: province.code.clone(),
                    value,
                    store_count,
                    coordinates: province.coordinates,
                }
            })
            .collect()
    }
}

fn kpi<T>(value: T, rng: &mut StreamRng) -> Kpi<T> {
    Kpi {
        value,
        trend: format_trend(rng.between_i64(-50, 300)),
    }
}

/// (total, part since `midnight`) of `pick` over the subset's transactions.
fn split_today(
    subset: &FilteredSubset<'_>,
    midnight: NaiveDateTime,
    pick: impl Fn(&Transaction) -> Money,
) -> (Money, Money) {
    subset.transactions.iter().fold((0, 0), |(all, today), t| {
        let v = pick(t);
        let today = if t.timestamp >= midnight { today + v } else { today };
        (all + v, today)
    })
}

fn portion(value: Money, rate: f64) -> Money {
    (value as f64 * rate).floor() as Money
}

fn metric(value: Money, today_new: Money, unit: &str) -> BusinessMetric {
    BusinessMetric {
        value,
        today_new,
        unit: unit.to_string(),
    }
}

/// Format tenths of a percent as a signed one-decimal string, e.g. 158 → "+15.8%".
pub fn format_trend(tenths: i64) -> String {
    let sign = if tenths < 0 { '-' } else { '+' };
    let abs = tenths.unsigned_abs();
    format!("{sign}{}.{}%", abs / 10, abs % 10)
}

/// Top RANKING_SIZE items by `key`, descending. The sort is stable,
/// so ties keep their insertion order.
fn top_by<T, I, K>(items: I, key: K) -> Vec<T>
where
    I: Iterator<Item = T>,
    K: Fn(&T) -> Money,
{
    let mut sorted: Vec<T> = items.collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted.truncate(RANKING_SIZE);
    sorted
}

/// (id, name, label, count, amount)
type RowFields = (String, String, String, u64, Money);

fn ranking_rows<'t, T: 't>(
    items: impl Iterator<Item = &'t T>,
    change: (i64, i64),
    rng: &mut StreamRng,
    fields: impl Fn(&T) -> RowFields,
) -> Vec<RankingRow> {
    let rows: Vec<RowFields> = items.map(|item| fields(item)).collect();
    // Guard the percentage-of-max against an all-zero ranking.
    let max = rows.first().map_or(0, |r| r.4).max(1);

    rows.into_iter()
        .enumerate()
        .map(|(i, (id, name, label, count, amount))| RankingRow {
            rank: i as u32 + 1,
            id,
            name,
            label,
            count,
            amount,
            change: rng.between_i64(change.0, change.1),
            share_of_max: amount as f64 * 100.0 / max as f64,
        })
        .collect()
}

fn illustrative_range(granularity: ChartGranularity) -> (u64, u64) {
    match granularity {
        ChartGranularity::Week => (100_000, 299_999),
        ChartGranularity::Month => (150_000, 449_999),
        ChartGranularity::Year => (1_000_000, 2_999_999),
    }
}

fn slice_color(role: Role) -> &'static str {
    match role {
        Role::Partners => "#667eea",
        Role::Business => "#764ba2",
        Role::Stores => "#f093fb",
        Role::Users => "#f5576c",
    }
}

/// (year, month) `back` calendar months before (year, month).
fn months_back(year: i32, month: u32, back: i64) -> (i32, u32) {
    let index = year as i64 * 12 + (month as i64 - 1) - back;
    (index.div_euclid(12) as i32, (index.rem_euclid(12) + 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_formatting() {
        assert_eq!(format_trend(158), "+15.8%");
        assert_eq!(format_trend(0), "+0.0%");
        assert_eq!(format_trend(-32), "-3.2%");
        assert_eq!(format_trend(-5), "-0.5%");
        assert_eq!(format_trend(300), "+30.0%");
    }

    #[test]
    fn months_back_wraps_years() {
        assert_eq!(months_back(2024, 6, 0), (2024, 6));
        assert_eq!(months_back(2024, 6, 5), (2024, 1));
        assert_eq!(months_back(2024, 6, 6), (2023, 12));
        assert_eq!(months_back(2024, 1, 11), (2023, 2));
    }

    #[test]
    fn top_by_is_stable_and_bounded() {
        let items: Vec<(u32, Money)> = (0..15).map(|i| (i, if i % 2 == 0 { 5 } else { 9 })).collect();
        let top = top_by(items.iter(), |(_, v)| *v);
        assert_eq!(top.len(), RANKING_SIZE);
        // all the 9s first, in insertion order, then the leading 5s
        let ids: Vec<u32> = top.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, vec![1, 3, 5, 7, 9, 11, 13, 0, 2, 4]);
    }
}
