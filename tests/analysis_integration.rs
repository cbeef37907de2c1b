// End-to-end run over in-memory CSV exports: loader -> engine -> KPIs,
// exercising the totals-row strip, unmatched products, zero-sales rows and
// the memoization cache.

use pvp_market::cache::{AnalysisCache, AnalysisKey};
use pvp_market::engine::{self, AnalysisParams};
use pvp_market::error::AnalysisError;
use pvp_market::loader::load_source;
use pvp_market::types::{Position, SourceKind};

const VALUE_CSV: &str = "\
Cód,Produto,Stock,Farmácia Nov/2025,V1,V2,V3,V4,Região Nov/2025,Obs
1001,Ben-u-ron 1g,10,100,,,,,20,
1002,Brufen 400mg,5,50,,,,,25,
1003,Sem Vendas,0,0,,,,,10,
2000,Só no Valor,1,30,,,,,5,
Totais,,,99999,,,,,99999,
";

const UNITS_CSV: &str = "\
Cód,Produto,Stock,Farmácia Nov/2025,V1,V2,V3,V4,Região Nov/2025,Obs
1001,Ben-u-ron 1g,10,20,,,,,5,
1002,Brufen 400mg,5,10,,,,,5,
1003,Sem Vendas,0,0,,,,,2,
3000,Só nas Unidades,1,4,,,,,2,
Totais,,,99999,,,,,99999,
";

fn approx(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

#[test]
fn full_pipeline_over_csv_sources() {
    let value = load_source(SourceKind::Value, VALUE_CSV.as_bytes()).unwrap();
    let units = load_source(SourceKind::Units, UNITS_CSV.as_bytes()).unwrap();
    let params = AnalysisParams::new(6);

    let records = engine::analyze(&value, &units, &params).unwrap();

    // 1001, 1002 and 1003 merge; the unmatched products and the totals line
    // do not survive. Zero-sales rows stay at the engine level.
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| !r.code.to_lowercase().contains("totais")));
    assert!(records.iter().all(|r| r.own_unit_price >= 0.0));
    assert!(records.iter().all(|r| r.competitor_unit_price >= 0.0));

    let ben = records.iter().find(|r| r.code == "1001").unwrap();
    assert_eq!(ben.name, "Ben-u-ron 1g");
    approx(ben.total_region_qty, 30.0);
    approx(ben.competitor_qty, 10.0);
    approx(ben.own_unit_price, 5.0);
    approx(ben.competitor_unit_price, 2.0);
    approx(ben.price_diff_pct, 150.0);
    assert_eq!(ben.position, Position::Dominant);

    let brufen = records.iter().find(|r| r.code == "1002").unwrap();
    approx(brufen.own_unit_price, 5.0);
    approx(brufen.competitor_unit_price, 5.0);
    approx(brufen.price_diff_pct, 0.0);
    assert_eq!(brufen.position, Position::Competitive);

    // Consumer-side filter drops the zero-sales row; KPIs follow the subset.
    let sold = engine::retain_sold(records.clone());
    assert_eq!(sold.len(), 2);
    assert_eq!(sold[0].code, "1001");

    let kpi = engine::kpi_summary(&sold, 0.15);
    approx(kpi.avg_own_price, 5.0);
    approx(kpi.avg_competitor_price, 3.5);
    approx(kpi.price_delta, 1.5);
    approx(kpi.total_opportunity, 0.0);
    approx(kpi.simulated_gain, 30.0 * 0.15);

    // Narrowing to one product changes every aggregate with it.
    let only_brufen = engine::filter_by_names(&sold, &["Brufen 400mg".to_string()]);
    let kpi_b = engine::kpi_summary(&only_brufen, 0.15);
    assert_eq!(kpi_b.products, 1);
    approx(kpi_b.avg_competitor_price, 5.0);
    approx(kpi_b.simulated_gain, 10.0 * 0.15);
}

#[test]
fn rerun_yields_identical_records() {
    let value = load_source(SourceKind::Value, VALUE_CSV.as_bytes()).unwrap();
    let units = load_source(SourceKind::Units, UNITS_CSV.as_bytes()).unwrap();
    let params = AnalysisParams::new(6);

    let a = engine::analyze(&value, &units, &params).unwrap();
    let b = engine::analyze(&value, &units, &params).unwrap();
    assert_eq!(a, b);
}

#[test]
fn cache_reuses_results_for_identical_inputs() {
    let value = load_source(SourceKind::Value, VALUE_CSV.as_bytes()).unwrap();
    let units = load_source(SourceKind::Units, UNITS_CSV.as_bytes()).unwrap();
    let records = engine::analyze(&value, &units, &AnalysisParams::new(6)).unwrap();

    let mut cache = AnalysisCache::new();
    let key = AnalysisKey {
        value_digest: value.digest,
        units_digest: units.digest,
        n_pharmacies: 6,
    };
    cache.insert(key, records.clone());

    // Reloading the same bytes lands on the same key.
    let reloaded = load_source(SourceKind::Value, VALUE_CSV.as_bytes()).unwrap();
    assert_eq!(reloaded.digest, value.digest);
    assert_eq!(cache.get(&key), Some(&records));

    // A different pharmacy count or a touched file misses.
    let other_n = AnalysisKey {
        n_pharmacies: 7,
        ..key
    };
    assert!(cache.get(&other_n).is_none());
    let touched = load_source(
        SourceKind::Value,
        VALUE_CSV.replace("100", "101").as_bytes(),
    )
    .unwrap();
    assert_ne!(touched.digest, value.digest);
}

#[test]
fn structurally_invalid_source_aborts_ingestion() {
    let narrow = "Cód,Produto,Farmácia\n1001,X,10\n";
    let err = load_source(SourceKind::Value, narrow.as_bytes()).unwrap_err();
    match err {
        AnalysisError::MalformedInput { kind, found } => {
            assert_eq!(kind, SourceKind::Value);
            assert_eq!(found, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn disjoint_exports_signal_empty_join() {
    let value = "Cód,Produto,S,F,a,b,c,d,R,O\n1,X,,10,,,,,5,\n";
    let units = "Cód,Produto,S,F,a,b,c,d,R,O\n2,Y,,10,,,,,5,\n";
    let value = load_source(SourceKind::Value, value.as_bytes()).unwrap();
    let units = load_source(SourceKind::Units, units.as_bytes()).unwrap();
    let err = engine::analyze(&value, &units, &AnalysisParams::new(6)).unwrap_err();
    assert!(matches!(err, AnalysisError::JoinEmpty));
}
