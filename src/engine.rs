//! Reconciliation and metric derivation.
//!
//! The source data only ever exposes a per-pharmacy *average* for the
//! region, never the competitors themselves. The engine reconstructs the
//! absolute regional total by multiplying the average back by the known
//! pharmacy count, subtracts this pharmacy's own figures to isolate the
//! aggregate of "everyone else", and derives comparable unit prices and
//! positioning metrics from there.
//!
//! Anomalies inside a row (unparseable cells, zero volumes, negative
//! competitor aggregates from source rounding) never abort the batch; they
//! degrade to `0` or row exclusion so a hand-exported spreadsheet still
//! yields the largest usable result set.

use crate::error::AnalysisError;
use crate::types::{
    AnalysisRow, DerivedRecord, KpiSummary, Position, ProductRecord, SourceRow, SourceTable,
};
use crate::util::{coerce_f64, format_number, mean, round_to};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Codes containing this marker (case-insensitive) are summary lines from
/// the export, not products.
pub const TOTALS_MARKER: &str = "totais";

/// Decimal places kept in the reconstructed competitor quantity before the
/// noise guard; reconciles float artifacts from the average-times-N step.
pub const QTY_ROUND_DECIMALS: u32 = 4;

/// Competitor quantities at or below this (after rounding) count as "no
/// competitor volume": the implied unit price is 0 rather than a division
/// by a rounding artifact.
pub const DEFAULT_NOISE_THRESHOLD: f64 = 0.1;

/// Regional totals at or below this contribute no market share.
pub const DEFAULT_SHARE_EPSILON: f64 = 0.001;

/// The subtraction `total - own` needs at least two pharmacies to mean
/// anything; the reference UI offers 2–20.
pub const MIN_PHARMACIES: u32 = 2;

/// Ambient parameters for one analysis run, passed explicitly so the
/// computation stays pure. The thresholds are configurable so boundary
/// behavior can be probed in tests; `new` applies the documented defaults.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisParams {
    pub n_pharmacies: u32,
    pub noise_threshold: f64,
    pub share_epsilon: f64,
}

impl AnalysisParams {
    pub fn new(n_pharmacies: u32) -> Self {
        AnalysisParams {
            n_pharmacies: n_pharmacies.max(MIN_PHARMACIES),
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
            share_epsilon: DEFAULT_SHARE_EPSILON,
        }
    }
}

fn is_totals_code(code: &str) -> bool {
    code.to_lowercase().contains(TOTALS_MARKER)
}

/// Inner merge of the two normalized tables on product code.
///
/// Products present in only one source are dropped silently (expected due to
/// timing differences between the exports). Duplicate codes within one table
/// keep their first occurrence so the merge stays key-unique. Numeric cells
/// are coerced here, after the join, with unparseable text degrading to 0.
fn merge_sources(value: &SourceTable, units: &SourceTable) -> Vec<ProductRecord> {
    let mut units_by_code: HashMap<&str, &SourceRow> = HashMap::new();
    for row in &units.rows {
        if row.code.is_empty() {
            continue;
        }
        units_by_code.entry(row.code.as_str()).or_insert(row);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();
    for vrow in &value.rows {
        if vrow.code.is_empty() || !seen.insert(vrow.code.as_str()) {
            continue;
        }
        let Some(urow) = units_by_code.get(vrow.code.as_str()) else {
            continue;
        };
        merged.push(ProductRecord {
            code: vrow.code.clone(),
            name: vrow.name.clone().unwrap_or_default(),
            own_value: coerce_f64(&vrow.own_raw),
            region_avg_value: coerce_f64(&vrow.region_avg_raw),
            own_qty: coerce_f64(&urow.own_raw),
            region_avg_qty: coerce_f64(&urow.region_avg_raw),
        });
    }
    merged
}

fn derive(p: &ProductRecord, params: &AnalysisParams) -> DerivedRecord {
    let n = params.n_pharmacies as f64;

    // Extrapolate the regional totals back out of the per-pharmacy average,
    // then subtract ourselves to isolate the rest of the market.
    let total_region_value = p.region_avg_value * n;
    let total_region_qty = p.region_avg_qty * n;
    let competitor_value = total_region_value - p.own_value;
    let competitor_qty = round_to(total_region_qty - p.own_qty, QTY_ROUND_DECIMALS);

    let own_unit_price = if p.own_qty > 0.0 {
        (p.own_value / p.own_qty).max(0.0)
    } else {
        0.0
    };
    // The competitor aggregate may be legitimately negative when this
    // pharmacy outsells the reconstructed total (source rounding); a
    // negative or near-zero denominator means there is no discoverable
    // market price, not an error.
    let competitor_unit_price = if competitor_qty > params.noise_threshold {
        (competitor_value / competitor_qty).max(0.0)
    } else {
        0.0
    };

    // A pharmacy with no sales, or a market with no discoverable price,
    // contributes no signal rather than a misleading percentage.
    let price_diff_pct = if own_unit_price > 0.0 && competitor_unit_price > 0.0 {
        (own_unit_price - competitor_unit_price) / competitor_unit_price * 100.0
    } else {
        0.0
    };

    let market_share_pct = if total_region_qty > params.share_epsilon {
        p.own_qty / total_region_qty * 100.0
    } else {
        0.0
    };
    let position = Position::from_market_share(market_share_pct);

    // Upside only: being priced above the market is not penalized here.
    let opportunity_value = if own_unit_price < competitor_unit_price {
        (competitor_unit_price - own_unit_price) * p.own_qty
    } else {
        0.0
    };

    let competitors = params.n_pharmacies.saturating_sub(1).max(1) as f64;
    let avg_unit_per_competitor = (competitor_qty / competitors).round().max(0.0);

    DerivedRecord {
        code: p.code.clone(),
        name: p.name.clone(),
        own_value: p.own_value,
        own_qty: p.own_qty,
        total_region_value,
        total_region_qty,
        competitor_value,
        competitor_qty,
        own_unit_price,
        competitor_unit_price,
        price_diff_pct,
        market_share_pct,
        position,
        suggested_price: competitor_unit_price,
        opportunity_value,
        avg_unit_per_competitor,
    }
}

/// Run the full reconciliation over two normalized tables.
///
/// Returns one [`DerivedRecord`] per product surviving the inner merge and
/// the totals-row strip, sorted by own sales volume descending. Fails only
/// on an empty join; every row-level anomaly resolves to a sentinel value.
pub fn analyze(
    value: &SourceTable,
    units: &SourceTable,
    params: &AnalysisParams,
) -> Result<Vec<DerivedRecord>, AnalysisError> {
    let products: Vec<ProductRecord> = merge_sources(value, units)
        .into_iter()
        .filter(|p| !is_totals_code(&p.code))
        .collect();
    if products.is_empty() {
        return Err(AnalysisError::JoinEmpty);
    }

    let mut records: Vec<DerivedRecord> =
        products.iter().map(|p| derive(p, params)).collect();
    records.sort_by(|a, b| b.own_qty.partial_cmp(&a.own_qty).unwrap_or(Ordering::Equal));
    Ok(records)
}

/// Optional consumer-side filter: keep only products this pharmacy actually
/// sold. The engine itself retains zero-volume rows.
pub fn retain_sold(records: Vec<DerivedRecord>) -> Vec<DerivedRecord> {
    records.into_iter().filter(|r| r.own_qty > 0.0).collect()
}

/// Restrict the result to a set of product names; an empty selection means
/// "all products".
pub fn filter_by_names(records: &[DerivedRecord], names: &[String]) -> Vec<DerivedRecord> {
    if names.is_empty() {
        return records.to_vec();
    }
    let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
    records
        .iter()
        .filter(|r| wanted.contains(r.name.as_str()))
        .cloned()
        .collect()
}

/// Aggregate indicators over the active subset, including the what-if gain
/// of raising every selected product by `sim_increase` per unit. Must be
/// recomputed whenever the subset changes.
pub fn kpi_summary(records: &[DerivedRecord], sim_increase: f64) -> KpiSummary {
    let own_prices: Vec<f64> = records
        .iter()
        .filter(|r| r.own_unit_price > 0.0)
        .map(|r| r.own_unit_price)
        .collect();
    let market_prices: Vec<f64> = records
        .iter()
        .filter(|r| r.competitor_unit_price > 0.0)
        .map(|r| r.competitor_unit_price)
        .collect();

    let avg_own_price = mean(&own_prices);
    let avg_competitor_price = mean(&market_prices);
    let total_opportunity: f64 = records.iter().map(|r| r.opportunity_value).sum();
    let total_qty: f64 = records.iter().map(|r| r.own_qty).sum();

    KpiSummary {
        products: records.len(),
        avg_own_price,
        avg_competitor_price,
        price_delta: avg_own_price - avg_competitor_price,
        total_opportunity,
        simulated_gain: total_qty * sim_increase,
    }
}

/// Render derived records into display/export rows with the dashboard's
/// formatting (whole units, one decimal for percentages, two for prices).
pub fn to_analysis_rows(records: &[DerivedRecord]) -> Vec<AnalysisRow> {
    records
        .iter()
        .map(|r| AnalysisRow {
            code: r.code.clone(),
            name: r.name.clone(),
            own_qty: format_number(r.own_qty, 0),
            avg_unit_per_competitor: format_number(r.avg_unit_per_competitor, 0),
            market_share_pct: format_number(r.market_share_pct, 1),
            own_unit_price: format_number(r.own_unit_price, 2),
            competitor_unit_price: format_number(r.competitor_unit_price, 2),
            price_diff_pct: format_number(r.price_diff_pct, 1),
            position: r.position.to_string(),
            suggested_price: format_number(r.suggested_price, 2),
            opportunity_value: format_number(r.opportunity_value, 2),
        })
        .collect()
}
