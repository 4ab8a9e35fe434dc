// Módulo de alto nivel del motor de agrupación
// Declarar submódulos (archivos en la carpeta `src/algorithm`)
pub mod history;
pub mod iteration;
pub mod optimizer;
pub mod shape;

// Reexportar la API pública
pub use history::PairingHistory;
pub use iteration::{IterationManager, IterationOutcome, IterationPlan};
pub use optimizer::{GroupOptimizer, SearchConfig, SearchOutcome, SearchTier, partition_cost};
pub use shape::solve_shape;
