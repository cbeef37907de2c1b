//! Content-addressed memoization of analysis runs.
//!
//! Repeated runs over byte-identical source files with the same pharmacy
//! count reuse the previous result set; touching either file or changing
//! the count misses the cache. The engine itself stays stateless — the
//! cache lives in the caller's app state.

use crate::types::DerivedRecord;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::Hasher;

/// 64-bit digest of a source file's raw bytes.
pub fn digest_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

/// Cache key: the two source digests plus the pharmacy count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    pub value_digest: u64,
    pub units_digest: u64,
    pub n_pharmacies: u32,
}

#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: HashMap<AnalysisKey, Vec<DerivedRecord>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &AnalysisKey) -> Option<&Vec<DerivedRecord>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: AnalysisKey, records: Vec<DerivedRecord>) {
        self.entries.insert(key, records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn record(code: &str) -> DerivedRecord {
        DerivedRecord {
            code: code.to_string(),
            name: "X".to_string(),
            own_value: 1.0,
            own_qty: 1.0,
            total_region_value: 2.0,
            total_region_qty: 2.0,
            competitor_value: 1.0,
            competitor_qty: 1.0,
            own_unit_price: 1.0,
            competitor_unit_price: 1.0,
            price_diff_pct: 0.0,
            market_share_pct: 50.0,
            position: Position::Dominant,
            suggested_price: 1.0,
            opportunity_value: 0.0,
            avg_unit_per_competitor: 1.0,
        }
    }

    #[test]
    fn hit_requires_identical_sources_and_count() {
        let mut cache = AnalysisCache::new();
        let key = AnalysisKey {
            value_digest: digest_bytes(b"value"),
            units_digest: digest_bytes(b"units"),
            n_pharmacies: 6,
        };
        cache.insert(key, vec![record("1")]);

        assert!(cache.get(&key).is_some());
        assert!(cache
            .get(&AnalysisKey {
                n_pharmacies: 7,
                ..key
            })
            .is_none());
        assert!(cache
            .get(&AnalysisKey {
                value_digest: digest_bytes(b"value changed"),
                ..key
            })
            .is_none());
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }
}
