use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use crate::error::{GroupingError, Result};

/// Convierte un `Data` de calamine a String (versión genérica para celdas)
pub fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if (f.floor() - f).abs() < f64::EPSILON {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        Data::Bool(b) => format!("{}", b),
        Data::Empty => String::new(),
        Data::Error(_) => String::new(),
        Data::DateTime(s) => s.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

/// Normaliza encabezados eliminando espacios y pasando a minúsculas.
pub fn normalize_header(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect()
}

/// Número de iteración de un encabezado tipo "Iteration 3" (sin importar
/// mayúsculas ni espacios). `None` si no es una columna de iteración.
pub fn iteration_number(header: &str) -> Option<usize> {
    let norm = normalize_header(header);
    norm.strip_prefix("iteration")?.parse::<usize>().ok()
}

/// Primera hoja de un libro: nombre, esquina superior izquierda del rango
/// usado (fila, columna; base 0) y filas como texto desde esa esquina.
#[derive(Debug, Clone)]
pub struct SheetRows {
    pub name: String,
    pub origin: (u32, u32),
    pub rows: Vec<Vec<String>>,
}

/// Lee la primera hoja del archivo.
pub fn read_first_sheet<P: AsRef<Path>>(path: P) -> Result<SheetRows> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| GroupingError::Spreadsheet(format!("no se pudo abrir '{}': {}", path.display(), e)))?;

    let names = workbook.sheet_names().to_owned();
    let Some(first) = names.first().cloned() else {
        return Err(GroupingError::Roster(format!("'{}' no tiene hojas", path.display())));
    };

    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| GroupingError::Spreadsheet(format!("no se pudo leer la hoja '{}': {}", first, e)))?;
    let rows = range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<String>>())
        .collect();
    Ok(SheetRows { name: first, origin: range.start().unwrap_or((0, 0)), rows })
}
