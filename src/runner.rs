// Flujo completo sobre un roster en disco: usado por el CLI y por el servidor.
use std::path::Path;

use crate::algorithm::{IterationManager, IterationOutcome};
use crate::config::GroupingConfig;
use crate::error::Result;
use crate::excel::SpreadsheetRoster;
use crate::report::PairingReport;
use crate::roster::RosterStore;

/// Abre el roster, reconstruye el historial y ejecuta la iteración pendiente.
/// Con `dry_run` no se escribe nada.
pub fn run_roster_iteration(
    config: &GroupingConfig,
    path: &Path,
    seed: Option<u64>,
    dry_run: bool,
) -> Result<IterationOutcome> {
    config.validate()?;
    let seed = seed.unwrap_or_else(|| config.resolve_seed());
    tracing::info!(roster = %path.display(), seed, dry_run, "🧠 ejecutando iteración");

    let mut store = SpreadsheetRoster::open(path, &config.absent_marker)?;
    let mut manager = IterationManager::rehydrate(&store, config.labels.clone(), config.optimizer())?;
    if dry_run {
        manager.preview_next(&mut store, seed)
    } else {
        manager.run_next(&mut store, seed)
    }
}

/// Reporte de frecuencia de emparejamientos para el roster.
pub fn build_roster_report(config: &GroupingConfig, path: &Path) -> Result<PairingReport> {
    config.validate()?;
    let store = SpreadsheetRoster::open(path, &config.absent_marker)?;
    let iterations = store.recorded_iterations()?.len();
    let manager = IterationManager::rehydrate(&store, config.labels.clone(), config.optimizer())?;
    Ok(PairingReport::build(manager.students(), manager.history(), iterations))
}
