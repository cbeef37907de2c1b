// Entry point and high-level CLI flow.
//
// The binary is a thin interactive shell around the analysis engine:
// - Option [1] loads the two CSV exports and prints diagnostics.
// - Option [2] asks for the pharmacy count and the simulated per-unit
//   increase, runs (or reuses) the analysis, previews the table and
//   exports the full result plus a KPI summary.
// - After an analysis, the user can go back to the menu or exit.

use once_cell::sync::Lazy;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::sync::Mutex;

use pvp_market::cache::{AnalysisCache, AnalysisKey};
use pvp_market::engine::{self, AnalysisParams};
use pvp_market::loader;
use pvp_market::output;
use pvp_market::types::{SourceKind, SourceTable};
use pvp_market::util;

const DEFAULT_VALUE_FILE: &str = "valor_vendido.csv";
const DEFAULT_UNITS_FILE: &str = "unidades_vendidas.csv";
const EXPORT_FILE: &str = "analise_pvp_mercado.csv";
const SUMMARY_FILE: &str = "resumo_kpi.json";

const DEFAULT_N_PHARMACIES: u32 = 6;
const MAX_N_PHARMACIES: u32 = 20;
const DEFAULT_SIM_INCREASE: f64 = 0.15;
const PREVIEW_ROWS: usize = 10;

// Simple in-memory app state so the files are loaded once but analyses can
// be re-run with different parameters in a single session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        sources: None,
        cache: AnalysisCache::new(),
    })
});

struct AppState {
    sources: Option<(SourceTable, SourceTable)>,
    cache: AnalysisCache,
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn prompt_path(label: &str, default: &str) -> String {
    let input = read_line(&format!("{} [{}]: ", label, default));
    if input.is_empty() {
        default.to_string()
    } else {
        input
    }
}

/// Ask for the number of pharmacies in the region (the `N` of the
/// extrapolation). The reference range mirrors the dashboard slider: 2–20.
fn prompt_n_pharmacies() -> u32 {
    loop {
        let input = read_line(&format!(
            "Nº de farmácias na região (2-{}) [{}]: ",
            MAX_N_PHARMACIES, DEFAULT_N_PHARMACIES
        ));
        if input.is_empty() {
            return DEFAULT_N_PHARMACIES;
        }
        match input.parse::<u32>() {
            Ok(n) if (engine::MIN_PHARMACIES..=MAX_N_PHARMACIES).contains(&n) => return n,
            _ => println!("Valor inválido. Introduza um número entre 2 e {}.", MAX_N_PHARMACIES),
        }
    }
}

fn prompt_sim_increase() -> f64 {
    loop {
        let input = read_line(&format!(
            "Aumento unitário simulado (€) [{:.2}]: ",
            DEFAULT_SIM_INCREASE
        ));
        if input.is_empty() {
            return DEFAULT_SIM_INCREASE;
        }
        match util::parse_f64_lenient(&input) {
            Some(v) => return v,
            None => println!("Valor inválido. Exemplo: 0.15"),
        }
    }
}

/// Optional comma-separated product-name filter; empty means all products.
fn prompt_name_filter() -> Vec<String> {
    let input = read_line("Filtrar produtos (nomes separados por vírgula, vazio = todos): ");
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn prompt_back_to_menu() -> bool {
    loop {
        let resp = read_line("Voltar ao menu (S/N): ").to_uppercase();
        match resp.as_str() {
            "S" => return true,
            "N" => return false,
            _ => println!("Opção inválida. Introduza S ou N."),
        }
    }
}

fn load_table(kind: SourceKind, path: &str) -> Result<SourceTable, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    Ok(loader::load_source(kind, &bytes)?)
}

/// Handle option [1]: load and normalize both exports.
fn handle_load() {
    let value_path = prompt_path("Ficheiro de valor (€)", DEFAULT_VALUE_FILE);
    let units_path = prompt_path("Ficheiro de unidades (Qtd)", DEFAULT_UNITS_FILE);

    let value = match load_table(SourceKind::Value, &value_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Erro ao carregar {}: {}\n", value_path, e);
            return;
        }
    };
    let units = match load_table(SourceKind::Units, &units_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Erro ao carregar {}: {}\n", units_path, e);
            return;
        }
    };

    println!(
        "Dados carregados: {} produtos (valor), {} produtos (unidades).",
        util::format_int(value.rows.len() as i64),
        util::format_int(units.rows.len() as i64)
    );
    println!(
        "Período detetado: \"{}\" / \"{}\"\n",
        value.own_label, value.region_label
    );

    let mut state = APP_STATE.lock().unwrap();
    state.sources = Some((value, units));
}

/// Handle option [2]: run the market analysis over the loaded tables.
fn handle_analyze() {
    let sources = {
        let state = APP_STATE.lock().unwrap();
        state.sources.clone()
    };
    let Some((value, units)) = sources else {
        println!("Erro: nenhum ficheiro carregado. Use primeiro a opção 1.\n");
        return;
    };

    let n_pharmacies = prompt_n_pharmacies();
    let sim_increase = prompt_sim_increase();
    let name_filter = prompt_name_filter();

    let key = AnalysisKey {
        value_digest: value.digest,
        units_digest: units.digest,
        n_pharmacies,
    };

    let records = {
        let mut state = APP_STATE.lock().unwrap();
        if let Some(hit) = state.cache.get(&key) {
            println!("(a reutilizar resultado em cache)\n");
            hit.clone()
        } else {
            let params = AnalysisParams::new(n_pharmacies);
            match engine::analyze(&value, &units, &params) {
                Ok(records) => {
                    state.cache.insert(key, records.clone());
                    records
                }
                Err(e) => {
                    eprintln!("Análise falhou: {}\n", e);
                    return;
                }
            }
        }
    };

    // The dashboard's base filter: only products we actually sold, then the
    // user's optional name selection on top.
    let sold = engine::retain_sold(records);
    let selected = engine::filter_by_names(&sold, &name_filter);

    println!(
        "Análise de PVP de Mercado (N={}, {} produtos)\n",
        n_pharmacies,
        util::format_int(selected.len() as i64)
    );

    let rows = engine::to_analysis_rows(&selected);
    output::preview_table_rows(&rows, PREVIEW_ROWS);
    if let Err(e) = output::write_csv(EXPORT_FILE, &rows) {
        eprintln!("Erro ao exportar: {}", e);
    }
    println!("(Tabela completa exportada para {})\n", EXPORT_FILE);

    let kpi = engine::kpi_summary(&selected, sim_increase);
    if let Err(e) = output::write_json(SUMMARY_FILE, &kpi) {
        eprintln!("Erro ao exportar: {}", e);
    }
    println!("Indicadores chave ({}):", SUMMARY_FILE);
    println!(
        "  Meu PVP médio:      {} €",
        util::format_number(kpi.avg_own_price, 2)
    );
    println!(
        "  PVP mercado:        {} € (delta {} €)",
        util::format_number(kpi.avg_competitor_price, 2),
        util::format_number(kpi.price_delta, 2)
    );
    println!(
        "  Oportunidade real:  {} €",
        util::format_number(kpi.total_opportunity, 2)
    );
    println!(
        "  Simulação (+{:.2}€): {} €\n",
        sim_increase,
        util::format_number(kpi.simulated_gain, 2)
    );
}

fn main() {
    loop {
        println!("PVP Mercado — análise de preços da concorrência");
        println!("[1] Carregar ficheiros");
        println!("[2] Executar análise de mercado\n");
        match read_line("Escolha uma opção: ").as_str() {
            "1" => handle_load(),
            "2" => {
                println!();
                handle_analyze();
                if !prompt_back_to_menu() {
                    println!("A sair.");
                    break;
                }
            }
            _ => println!("Opção inválida. Introduza 1 ou 2.\n"),
        }
    }
}
