//! Configuración del motor y del servidor.
//!
//! Se parte de los valores por defecto, luego se aplican las variables de
//! entorno (`.env` incluido, vía dotenv) y por último las banderas del CLI.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::algorithm::{GroupOptimizer, SearchConfig};
use crate::error::Result;
use crate::roster::GroupLabels;

/// Marca de ausencia por defecto en las celdas de iteración.
pub const DEFAULT_ABSENT_MARKER: &str = "x";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Semilla fija; si falta se sortea una por ejecución.
    pub seed: Option<u64>,
    pub search: SearchConfig,
    pub labels: GroupLabels,
    pub absent_marker: String,
    /// Directorio desde el que el servidor resuelve los rosters.
    pub roster_dir: PathBuf,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        GroupingConfig {
            seed: None,
            search: SearchConfig::default(),
            labels: GroupLabels::default(),
            absent_marker: DEFAULT_ABSENT_MARKER.to_string(),
            roster_dir: PathBuf::from("."),
        }
    }
}

// load .env if present
fn load_dotenv() {
    let _ = dotenv::dotenv();
}

impl GroupingConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        GroupingConfig::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero leyendo de cualquier fuente clave -> valor.
    /// Los valores inválidos se ignoran con una advertencia.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = GroupingConfig::default();
        if let Some(seed) = parse_var(&lookup, "GROUPSHIFT_SEED") {
            cfg.seed = Some(seed);
        }
        if let Some(v) = parse_var(&lookup, "GROUPSHIFT_RESTARTS") {
            cfg.search.restarts = v;
        }
        if let Some(v) = parse_var(&lookup, "GROUPSHIFT_SWAPS") {
            cfg.search.swaps_per_restart = v;
        }
        if let Some(v) = parse_var(&lookup, "GROUPSHIFT_EXACT_LIMIT") {
            cfg.search.exact_limit = v;
        }
        if let Some(v) = parse_var(&lookup, "GROUPSHIFT_NODE_BUDGET") {
            cfg.search.node_budget = v;
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, "GROUPSHIFT_ESCAPE_PROB") {
            if (0.0..=1.0).contains(&v) {
                cfg.search.escape_probability = v;
            } else {
                tracing::warn!(value = v, "GROUPSHIFT_ESCAPE_PROB fuera de [0, 1]; se ignora");
            }
        }
        if let Some(v) = parse_var(&lookup, "GROUPSHIFT_WORKERS") {
            cfg.search.workers = v;
        }
        if let Some(list) = lookup("GROUPSHIFT_LABELS") {
            let labels = GroupLabels::from_csv_list(&list);
            if labels.names().is_empty() {
                tracing::warn!("GROUPSHIFT_LABELS vacío; se usan los nombres por defecto");
            } else {
                cfg.labels = labels;
            }
        }
        if let Some(marker) = lookup("GROUPSHIFT_ABSENT_MARKER") {
            if !marker.trim().is_empty() {
                cfg.absent_marker = marker.trim().to_string();
            }
        }
        if let Some(dir) = lookup("GROUPSHIFT_ROSTER_DIR") {
            cfg.roster_dir = PathBuf::from(dir);
        }
        if let Err(e) = cfg.validate() {
            tracing::warn!(error = %e, "GROUPSHIFT_LABELS inválido; se usan los nombres por defecto");
            cfg.labels = GroupLabels::default();
        }
        cfg
    }

    /// Etiquetas distintas entre sí y distintas de la marca de ausencia.
    pub fn validate(&self) -> Result<()> {
        self.labels.validate(Some(self.absent_marker.as_str()))
    }

    /// Semilla a usar en esta ejecución (la configurada o una al azar).
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    pub fn optimizer(&self) -> GroupOptimizer {
        GroupOptimizer::new(self.search.clone())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "valor de configuración inválido; se ignora");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults_and_skips_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GROUPSHIFT_SEED", "42"),
            ("GROUPSHIFT_RESTARTS", "not-a-number"),
            ("GROUPSHIFT_LABELS", "red, blue ,,green"),
            ("GROUPSHIFT_ESCAPE_PROB", "1.5"),
        ]);
        let cfg = GroupingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.search.restarts, SearchConfig::default().restarts);
        assert_eq!(cfg.labels.names(), &["red", "blue", "green"]);
        assert_eq!(cfg.search.escape_probability, SearchConfig::default().escape_probability);
        assert_eq!(cfg.absent_marker, "x");
    }

    #[test]
    fn clashing_labels_fall_back_to_defaults() {
        let repeated = GroupingConfig::from_lookup(|k| (k == "GROUPSHIFT_LABELS").then(|| "a,b,A".to_string()));
        assert_eq!(repeated.labels, GroupLabels::default());

        let vars: HashMap<&str, &str> =
            HashMap::from([("GROUPSHIFT_LABELS", "X,oak"), ("GROUPSHIFT_ABSENT_MARKER", "x")]);
        let cfg = GroupingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.labels, GroupLabels::default());
        assert!(cfg.validate().is_ok());

        let mut bad = GroupingConfig::default();
        bad.labels = GroupLabels::new(["x", "oak"]);
        assert_eq!(bad.validate().unwrap_err().kind(), "invalid_labels");
    }
}
