use serde::Serialize;
use std::fmt;
use tabled::Tabled;

/// Which of the two source exports a table came from. Used for error
/// messages and for deciding whether the product-name column exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Revenue per product ("Valor Vendido").
    Value,
    /// Unit volume per product ("Unidades Vendidas").
    Units,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Value => write!(f, "valor"),
            SourceKind::Units => write!(f, "unidades"),
        }
    }
}

/// One normalized row straight out of a source file. Numeric cells stay as
/// raw text here; coercion happens inside the engine so the loader remains a
/// purely structural transform.
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub code: String,
    /// Only the value export carries the product name column.
    pub name: Option<String>,
    pub own_raw: String,
    pub region_avg_raw: String,
}

/// A normalized source table plus the display metadata captured from its
/// header (the own/region column captions embed the reporting period, e.g.
/// "Farmácia Nov/2025").
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub kind: SourceKind,
    pub rows: Vec<SourceRow>,
    pub own_label: String,
    pub region_label: String,
    /// Content digest of the raw bytes, used as the memoization key.
    pub digest: u64,
}

/// One merged product before derivation: both sources joined on `code`,
/// numeric fields coerced.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub code: String,
    pub name: String,
    pub own_value: f64,
    pub own_qty: f64,
    pub region_avg_value: f64,
    pub region_avg_qty: f64,
}

/// Market-share tier used to frame pricing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Dominant,
    Competitive,
    Follower,
}

impl Position {
    /// Band boundaries are inclusive on the lower bound: 40 is Dominant,
    /// 15 is Competitive.
    pub fn from_market_share(share_pct: f64) -> Self {
        if share_pct >= 40.0 {
            Position::Dominant
        } else if share_pct >= 15.0 {
            Position::Competitive
        } else {
            Position::Follower
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Position::Dominant => "Dominante",
            Position::Competitive => "Competitivo",
            Position::Follower => "Seguidor",
        };
        write!(f, "{}", label)
    }
}

/// The fully derived analysis for one product. Monetary fields are in the
/// currency of the source export; percentages are 0..=100-scaled.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub code: String,
    pub name: String,
    pub own_value: f64,
    pub own_qty: f64,
    pub total_region_value: f64,
    pub total_region_qty: f64,
    pub competitor_value: f64,
    /// Rounded and noise-guarded; see `AnalysisParams`.
    pub competitor_qty: f64,
    pub own_unit_price: f64,
    pub competitor_unit_price: f64,
    pub price_diff_pct: f64,
    pub market_share_pct: f64,
    pub position: Position,
    pub suggested_price: f64,
    pub opportunity_value: f64,
    /// Estimated units sold by each rival pharmacy, whole units.
    pub avg_unit_per_competitor: f64,
}

/// Display/export row with formatted strings, mirroring the dashboard's
/// detailed table.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AnalysisRow {
    #[serde(rename = "Cód")]
    #[tabled(rename = "Cód")]
    pub code: String,
    #[serde(rename = "Produto")]
    #[tabled(rename = "Produto")]
    pub name: String,
    #[serde(rename = "Vendas (Qtd)")]
    #[tabled(rename = "Vendas (Qtd)")]
    pub own_qty: String,
    #[serde(rename = "Venda Média/Rival")]
    #[tabled(rename = "Venda Média/Rival")]
    pub avg_unit_per_competitor: String,
    #[serde(rename = "Quota (%)")]
    #[tabled(rename = "Quota (%)")]
    pub market_share_pct: String,
    #[serde(rename = "Meu PVP")]
    #[tabled(rename = "Meu PVP")]
    pub own_unit_price: String,
    #[serde(rename = "PVP Mercado")]
    #[tabled(rename = "PVP Mercado")]
    pub competitor_unit_price: String,
    #[serde(rename = "Dif Preço (%)")]
    #[tabled(rename = "Dif Preço (%)")]
    pub price_diff_pct: String,
    #[serde(rename = "Posição")]
    #[tabled(rename = "Posição")]
    pub position: String,
    #[serde(rename = "Preço Sugerido")]
    #[tabled(rename = "Preço Sugerido")]
    pub suggested_price: String,
    #[serde(rename = "Oportunidade (€)")]
    #[tabled(rename = "Oportunidade (€)")]
    pub opportunity_value: String,
}

/// Aggregate indicators over the currently selected subset of products.
#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub products: usize,
    /// Mean own unit price over rows with a positive own price.
    pub avg_own_price: f64,
    /// Mean competitor unit price over rows with a positive market price.
    pub avg_competitor_price: f64,
    /// avg_own_price - avg_competitor_price.
    pub price_delta: f64,
    pub total_opportunity: f64,
    /// What-if gain: total own quantity times the simulated per-unit increase.
    pub simulated_gain: f64,
}
