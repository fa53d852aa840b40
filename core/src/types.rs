//! Shared primitive types used across the entire engine.

/// A stable identifier for any generated entity.
/// Unique within one generated world, not across process restarts.
pub type EntityId = String;

/// A region code such as `sichuan` or `chengdu`.
pub type RegionCode = String;

/// Whole-yuan monetary amount. The reference data never uses fractions.
pub type Money = u64;

/// (longitude, latitude)
pub type Coordinates = (f64, f64);
