//! Deterministic display strings from curated lists.
//!
//! Store names, street addresses and mobile numbers.
//! All generation is deterministic (same RNG seed = same strings).

use crate::rng::StreamRng;

/// Deterministic name generator using curated lists
pub struct NameGenerator;

impl NameGenerator {
    /// Store name: prefix + suffix, e.g. "老王餐厅"
    pub fn generate_store_name(rng: &mut StreamRng) -> String {
        let prefix = Self::pick(rng, Self::store_prefixes());
        let suffix = Self::pick(rng, Self::store_suffixes());
        format!("{prefix}{suffix}")
    }

    /// Street address: street + house number, e.g. "人民路128号"
    pub fn generate_address(rng: &mut StreamRng) -> String {
        let street = Self::pick(rng, Self::streets());
        let number = rng.between(1, 999);
        format!("{street}{number}号")
    }

    /// 11-digit mainland mobile number
    pub fn generate_phone(rng: &mut StreamRng) -> String {
        let prefix = Self::pick(rng, Self::phone_prefixes());
        let suffix = rng.next_u64_below(100_000_000);
        format!("{prefix}{suffix:08}")
    }

    fn pick(rng: &mut StreamRng, list: &'static [&'static str]) -> &'static str {
        rng.pick(list).copied().unwrap_or_default()
    }

    fn store_prefixes() -> &'static [&'static str] {
        &[
            "老王", "小李", "阿华", "大众", "新时代", "金牌", "品味", "优选", "精品", "时尚",
        ]
    }

    fn store_suffixes() -> &'static [&'static str] {
        &[
            "餐厅", "小吃店", "超市", "便利店", "理发店", "美容院", "药店", "书店", "咖啡厅",
            "奶茶店",
        ]
    }

    fn streets() -> &'static [&'static str] {
        &["中山路", "人民路", "解放路", "建设路", "文化路", "商业街", "步行街"]
    }

    fn phone_prefixes() -> &'static [&'static str] {
        &["130", "131", "132", "133", "134", "135", "136", "137", "138", "139"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{RngBank, StreamSlot};

    #[test]
    fn name_generation_is_deterministic() {
        let mut rng1 = RngBank::new(12345).for_stream(StreamSlot::Store);
        let mut rng2 = RngBank::new(12345).for_stream(StreamSlot::Store);

        let name1 = NameGenerator::generate_store_name(&mut rng1);
        let name2 = NameGenerator::generate_store_name(&mut rng2);

        assert_eq!(name1, name2, "Same seed should produce same name");
    }

    #[test]
    fn generates_valid_phones() {
        let mut rng = RngBank::new(12345).for_stream(StreamSlot::User);

        for _ in 0..100 {
            let phone = NameGenerator::generate_phone(&mut rng);
            assert_eq!(phone.len(), 11, "{phone}");
            assert!(phone.starts_with("13"), "{phone}");
            assert!(phone.chars().all(|c| c.is_ascii_digit()), "{phone}");
        }
    }

    #[test]
    fn addresses_end_with_house_number() {
        let mut rng = RngBank::new(12345).for_stream(StreamSlot::Store);

        for _ in 0..50 {
            let address = NameGenerator::generate_address(&mut rng);
            assert!(address.ends_with('号'), "{address}");
            assert!(address.chars().any(|c| c.is_ascii_digit()), "{address}");
        }
    }
}
