use crate::cache::digest_bytes;
use crate::error::AnalysisError;
use crate::types::{SourceKind, SourceRow, SourceTable};
use csv::ReaderBuilder;

/// Fixed positional layout of the two source exports.
///
/// The columns are selected by index on purpose: the exports have a fixed
/// layout but their header captions embed the reporting month (e.g.
/// "Farmácia Nov/2025"), so a header-name lookup would break every month.
/// Declaring the mapping once here keeps the positional contract in a single
/// place.
#[derive(Debug, Clone, Copy)]
pub struct ColumnLayout {
    pub code: usize,
    /// Product name; present (and read) only in the value export.
    pub name: usize,
    /// "This pharmacy" metric column.
    pub own: usize,
    /// "Regional average" metric column.
    pub region_avg: usize,
}

pub const LAYOUT: ColumnLayout = ColumnLayout {
    code: 0,
    name: 1,
    own: 3,
    region_avg: 8,
};

/// Minimum header width for a structurally valid export.
pub const MIN_COLUMNS: usize = LAYOUT.region_avg + 1;

/// Load one source export into a normalized table.
///
/// Structural validation is all-or-nothing: a header narrower than
/// [`MIN_COLUMNS`] fails the whole ingestion with no partial table. Cell
/// contents are *not* validated here; numeric coercion is an engine concern,
/// so rows shorter than the layout simply yield empty cells.
pub fn load_source(kind: SourceKind, bytes: &[u8]) -> Result<SourceTable, AnalysisError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = rdr.headers()?.clone();
    if headers.len() < MIN_COLUMNS {
        return Err(AnalysisError::MalformedInput {
            kind,
            found: headers.len(),
        });
    }
    let own_label = headers.get(LAYOUT.own).unwrap_or("").trim().to_string();
    let region_label = headers
        .get(LAYOUT.region_avg)
        .unwrap_or("")
        .trim()
        .to_string();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let rec = result?;
        let cell = |idx: usize| rec.get(idx).unwrap_or("").trim().to_string();
        let name = match kind {
            SourceKind::Value => Some(cell(LAYOUT.name)),
            SourceKind::Units => None,
        };
        rows.push(SourceRow {
            code: cell(LAYOUT.code),
            name,
            own_raw: cell(LAYOUT.own),
            region_avg_raw: cell(LAYOUT.region_avg),
        });
    }

    Ok(SourceTable {
        kind,
        rows,
        own_label,
        region_label,
        digest: digest_bytes(bytes),
    })
}
