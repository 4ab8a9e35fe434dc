// Biblioteca raíz del crate `groupshift`.
// Reexporta los módulos principales: el motor de agrupación (`algorithm`), el
// acceso a rosters (`roster`, `excel`), el reporte y el servidor HTTP.
pub mod algorithm;
pub mod config;
pub mod error;
pub mod excel;
pub mod models;
pub mod report;
pub mod roster;
pub mod runner;
pub mod server;

pub use algorithm::{GroupOptimizer, IterationManager, PairingHistory, SearchConfig, solve_shape};
pub use config::GroupingConfig;
pub use error::{GroupingError, Result};

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
