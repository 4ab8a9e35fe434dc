//! Módulo `excel`: lectura y escritura de rosters en planillas.
//!
//! Submódulos:
//! - `io`: helpers de lectura con calamine y normalización de encabezados
//! - `roster`: `SpreadsheetRoster`, implementación de `RosterStore` sobre `.xlsx`

/// Helpers de IO y utilidades para parsing de Excel
mod io;

/// Roster persistido en planilla
pub mod roster;

pub use io::{SheetRows, cell_to_string, iteration_number, normalize_header, read_first_sheet};
pub use roster::SpreadsheetRoster;

use std::path::{Component, Path, PathBuf};

use crate::error::{GroupingError, Result};

/// Resuelve el nombre de un roster dentro de `dir`. Rechaza rutas absolutas
/// o con `..` para que la API no pueda salir del directorio configurado.
pub fn resolve_roster_path(dir: &Path, name: &str) -> Result<PathBuf> {
    let candidate = Path::new(name.trim());
    if name.trim().is_empty() {
        return Err(GroupingError::Roster("falta el nombre del roster".to_string()));
    }
    let safe = candidate.components().all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(GroupingError::Roster(format!("ruta de roster no permitida '{}'", name)));
    }
    Ok(dir.join(candidate))
}
