use crate::loader;
use crate::types::SourceKind;
use thiserror::Error;

/// Errors the analysis pipeline can surface to the caller.
///
/// Only structural problems are fatal: a source file without the expected
/// column layout, or a merge that leaves nothing to analyze. Row-level
/// anomalies (unparseable cells, zero volumes, negative competitor
/// aggregates) never raise; they degrade to defined sentinel values inside
/// the engine.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The source header has fewer columns than the fixed positional layout
    /// requires. Ingestion is all-or-nothing, so no partial table is kept.
    #[error(
        "ficheiro de {kind} com estrutura inválida: esperadas pelo menos {} colunas, encontradas {found}",
        loader::MIN_COLUMNS
    )]
    MalformedInput { kind: SourceKind, found: usize },

    /// The inner merge on product code (after stripping totals rows) left
    /// zero products. Usually means the two exports cover disjoint periods.
    #[error("nenhum produto em comum entre os ficheiros de valor e de unidades")]
    JoinEmpty,

    #[error("erro de leitura CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("erro de E/S: {0}")]
    Io(#[from] std::io::Error),
}
