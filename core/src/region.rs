//! Curated region catalog: provinces, cities and districts.
//!
//! The catalog is fixed. Every generated entity references a province
//! code from here; cities and districts exist for region-selector lookups.

use crate::types::{Coordinates, RegionCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RegionLevel {
    Province,
    City,
    District,
}

impl RegionLevel {
    /// The level a `parent_code` must point at. None for provinces.
    pub fn parent_level(&self) -> Option<RegionLevel> {
        match self {
            Self::Province => None,
            Self::City => Some(Self::Province),
            Self::District => Some(Self::City),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub code: RegionCode,
    pub name: String,
    pub level: RegionLevel,
    pub parent_code: Option<RegionCode>,
    pub coordinates: Coordinates,
}

impl Region {
    fn new(
        code: &str,
        name: &str,
        level: RegionLevel,
        parent_code: Option<&str>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            level,
            parent_code: parent_code.map(Into::into),
            coordinates,
        }
    }
}

// (code, name, lon, lat)
const PROVINCES: &[(&str, &str, f64, f64)] = &[
    ("sichuan", "四川省", 104.066, 30.651),
    ("guangdong", "广东省", 113.266, 23.132),
    ("beijing", "北京市", 116.407, 39.904),
    ("shanghai", "上海市", 121.473, 31.230),
    ("zhejiang", "浙江省", 120.152, 30.267),
    ("jiangsu", "江苏省", 118.763, 32.061),
    ("shandong", "山东省", 117.020, 36.670),
    ("henan", "河南省", 113.649, 34.757),
    ("hubei", "湖北省", 114.342, 30.546),
    ("hunan", "湖南省", 112.983, 28.112),
];

// (code, name, parent, lon, lat)
const CITIES: &[(&str, &str, &str, f64, f64)] = &[
    ("chengdu", "成都市", "sichuan", 104.066, 30.573),
    ("ziyang", "资阳市", "sichuan", 104.627, 30.129),
    ("mianyang", "绵阳市", "sichuan", 104.679, 31.468),
    ("deyang", "德阳市", "sichuan", 104.398, 31.127),
    ("guangzhou", "广州市", "guangdong", 113.264, 23.129),
    ("shenzhen", "深圳市", "guangdong", 114.058, 22.543),
    ("dongguan", "东莞市", "guangdong", 113.752, 23.021),
    ("foshan", "佛山市", "guangdong", 113.122, 23.029),
];

const DISTRICTS: &[(&str, &str, &str, f64, f64)] = &[
    ("anyue", "安岳县", "ziyang", 105.336, 30.098),
    ("lezhi", "乐至县", "ziyang", 105.031, 30.276),
    ("yanjiang", "雁江区", "ziyang", 104.652, 30.121),
    ("jinjiang", "锦江区", "chengdu", 104.083, 30.656),
    ("qingyang", "青羊区", "chengdu", 104.062, 30.674),
    ("jinniu", "金牛区", "chengdu", 104.052, 30.692),
    ("wuhou", "武侯区", "chengdu", 104.043, 30.642),
];

/// The full catalog, provinces first, then cities, then districts.
pub fn catalog() -> Vec<Region> {
    let provinces = PROVINCES
        .iter()
        .map(|&(code, name, lon, lat)| Region::new(code, name, RegionLevel::Province, None, (lon, lat)));
    let cities = CITIES.iter().map(|&(code, name, parent, lon, lat)| {
        Region::new(code, name, RegionLevel::City, Some(parent), (lon, lat))
    });
    let districts = DISTRICTS.iter().map(|&(code, name, parent, lon, lat)| {
        Region::new(code, name, RegionLevel::District, Some(parent), (lon, lat))
    });
    provinces.chain(cities).chain(districts).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn every_parent_is_one_level_coarser() {
        let regions = catalog();
        let by_code: HashMap<&str, &Region> =
            regions.iter().map(|r| (r.code.as_str(), r)).collect();

        for region in &regions {
            match (&region.parent_code, region.level.parent_level()) {
                (None, None) => {}
                (Some(parent), Some(expected_level)) => {
                    let parent = by_code
                        .get(parent.as_str())
                        .unwrap_or_else(|| panic!("{} has dangling parent {parent}", region.code));
                    assert_eq!(parent.level, expected_level, "{}", region.code);
                }
                other => panic!("{} has inconsistent parent {other:?}", region.code),
            }
        }
    }

    #[test]
    fn codes_are_unique() {
        let regions = catalog();
        let mut codes: Vec<_> = regions.iter().map(|r| r.code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), regions.len());
    }

    #[test]
    fn ten_provinces_in_reference_order() {
        let provinces: Vec<_> = catalog()
            .into_iter()
            .filter(|r| r.level == RegionLevel::Province)
            .collect();
        assert_eq!(provinces.len(), 10);
        assert_eq!(provinces[0].code, "sichuan");
        assert_eq!(provinces[9].code, "hunan");
    }
}
