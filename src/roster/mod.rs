//! Acceso al roster: lista de estudiantes, marcas de ausencia por iteración y
//! registro de las iteraciones ya asignadas.
//!
//! - `labels`: nombres visibles de los grupos
//! - `MemoryRoster`: implementación en memoria (pruebas y API)
//!
//! La implementación sobre planillas `.xlsx` vive en `crate::excel`.

pub mod labels;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::models::{Cell, IterationRecord, Student, StudentId};

pub use labels::{DEFAULT_GROUP_NAMES, GroupLabels, GroupNameProvider, check_label_names};

/// Encabezado de columna de la iteración `index` (1-based).
pub fn iteration_header(index: usize) -> String {
    format!("Iteration {}", index)
}

/// Lo que el motor necesita de un roster persistido.
pub trait RosterStore {
    /// Estudiantes en el orden del roster.
    fn list_students(&self) -> Vec<Student>;

    /// Iteración a ejecutar: la primera columna sin grupos asignados (sólo
    /// vacíos o ausencias). Si no hay ninguna se crea la siguiente.
    fn pending_iteration(&mut self) -> Result<usize>;

    /// Claves marcadas como ausentes en la iteración. Puede contener claves
    /// que no están en el roster; el llamador las valida.
    fn absence_markers_for(&self, iteration: usize) -> Result<BTreeSet<StudentId>>;

    /// Guarda la iteración completa (etiqueta o ausencia por estudiante).
    fn record_iteration(&mut self, record: &IterationRecord) -> Result<()>;

    /// Iteraciones que ya tienen grupos, en orden, para reconstruir el historial.
    fn recorded_iterations(&self) -> Result<Vec<IterationRecord>>;

    /// Texto con que el roster marca ausencias, si las guarda como texto.
    /// Ninguna etiqueta de grupo puede coincidir con él.
    fn absence_marker(&self) -> Option<&str> {
        None
    }
}

/// Roster en memoria. Las ausencias se marcan por clave y no se validan
/// hasta ejecutar la iteración.
#[derive(Debug, Clone, Default)]
pub struct MemoryRoster {
    students: Vec<Student>,
    columns: BTreeMap<usize, BTreeMap<StudentId, Cell>>,
}

impl MemoryRoster {
    pub fn new(students: Vec<Student>) -> Self {
        MemoryRoster { students, columns: BTreeMap::new() }
    }

    /// Marca una ausencia para la iteración (crea la columna si no existe).
    pub fn mark_absent(&mut self, iteration: usize, id: impl Into<StudentId>) {
        self.columns.entry(iteration).or_default().insert(id.into(), Cell::Absent);
    }

    pub fn column(&self, iteration: usize) -> Option<&BTreeMap<StudentId, Cell>> {
        self.columns.get(&iteration)
    }
}

impl RosterStore for MemoryRoster {
    fn list_students(&self) -> Vec<Student> {
        self.students.clone()
    }

    fn pending_iteration(&mut self) -> Result<usize> {
        let pending = self
            .columns
            .iter()
            .find(|(_, cells)| !cells.values().any(|c| matches!(c, Cell::Group(_))))
            .map(|(i, _)| *i);
        if let Some(i) = pending {
            return Ok(i);
        }
        let next = self.columns.keys().next_back().map_or(1, |last| last + 1);
        self.columns.insert(next, BTreeMap::new());
        Ok(next)
    }

    fn absence_markers_for(&self, iteration: usize) -> Result<BTreeSet<StudentId>> {
        Ok(self
            .columns
            .get(&iteration)
            .map(|cells| {
                cells
                    .iter()
                    .filter(|(_, c)| **c == Cell::Absent)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn record_iteration(&mut self, record: &IterationRecord) -> Result<()> {
        self.columns.insert(record.index, record.cells.clone());
        Ok(())
    }

    fn recorded_iterations(&self) -> Result<Vec<IterationRecord>> {
        Ok(self
            .columns
            .iter()
            .filter(|(_, cells)| cells.values().any(|c| matches!(c, Cell::Group(_))))
            .map(|(i, cells)| IterationRecord { index: *i, header: iteration_header(*i), cells: cells.clone() })
            .collect())
    }
}
