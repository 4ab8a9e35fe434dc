// Nombres visibles de los grupos (lista ordenada inyectada por configuración).
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GroupingError, Result};

/// Nombres de árboles usados por defecto, en orden.
pub const DEFAULT_GROUP_NAMES: [&str; 11] = [
    "cedar", "cypress", "spruce", "pine", "fir", "oak", "maple", "birch", "ash", "elm", "chestnut",
];

/// Fuente de etiquetas para los grupos de una iteración.
pub trait GroupNameProvider {
    /// Etiqueta para el grupo `index`, o `None` si no hay suficientes.
    fn label_for(&self, index: usize) -> Option<&str>;
    fn available(&self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupLabels {
    names: Vec<String>,
}

impl GroupLabels {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupLabels { names: names.into_iter().map(Into::into).collect() }
    }

    /// Parsea una lista separada por comas, ignorando entradas vacías.
    pub fn from_csv_list(s: &str) -> Self {
        GroupLabels::new(s.split(',').map(str::trim).filter(|p| !p.is_empty()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Ver `check_label_names`.
    pub fn validate(&self, absent_marker: Option<&str>) -> Result<()> {
        check_label_names(self.names.iter().map(String::as_str), absent_marker)
    }
}

/// Las etiquetas deben ser no vacías, distintas entre sí sin importar
/// mayúsculas y distintas de la marca de ausencia. Si no, al releer el roster
/// dos grupos se fusionan o un grupo se lee como ausencias.
pub fn check_label_names<'a>(names: impl IntoIterator<Item = &'a str>, absent_marker: Option<&str>) -> Result<()> {
    let marker = absent_marker.map(|m| m.trim().to_lowercase());
    let mut seen: HashSet<String> = HashSet::new();
    for name in names {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return Err(GroupingError::InvalidLabels("hay un nombre de grupo vacío".to_string()));
        }
        if marker.as_deref() == Some(key.as_str()) {
            return Err(GroupingError::InvalidLabels(format!(
                "'{}' coincide con la marca de ausencia",
                name.trim()
            )));
        }
        if !seen.insert(key) {
            return Err(GroupingError::InvalidLabels(format!("'{}' está repetido", name.trim())));
        }
    }
    Ok(())
}

impl Default for GroupLabels {
    fn default() -> Self {
        GroupLabels::new(DEFAULT_GROUP_NAMES)
    }
}

impl GroupNameProvider for GroupLabels {
    fn label_for(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    fn available(&self) -> usize {
        self.names.len()
    }
}
