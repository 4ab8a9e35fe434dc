// Estructuras de datos principales
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Clave estable de un estudiante (número de roster).
pub type StudentId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Student { id: id.into(), name: name.into() }
    }
}

/// Multiconjunto de tamaños de grupo (sólo 3 y 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupShape {
    pub threes: usize,
    pub fours: usize,
}

impl GroupShape {
    /// Tamaños en orden: primero los grupos de 3, luego los de 4.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![3; self.threes];
        sizes.extend(std::iter::repeat(4).take(self.fours));
        sizes
    }

    pub fn group_count(&self) -> usize {
        self.threes + self.fours
    }

    pub fn total(&self) -> usize {
        self.threes * 3 + self.fours * 4
    }
}

/// Costo de una partición: suma de repeticiones y, como desempate, la
/// repetición máxima de un par. El orden derivado es lexicográfico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
pub struct Cost {
    pub total: u32,
    pub max_pair: u32,
}

impl Cost {
    pub const ZERO: Cost = Cost { total: 0, max_pair: 0 };

    pub fn is_zero(&self) -> bool {
        self.total == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledGroup {
    pub label: String,
    pub members: Vec<StudentId>,
    /// Puntaje de conflicto del grupo (suma de veces que sus pares ya estuvieron juntos)
    pub conflict: u32,
}

/// Resultado de una iteración: grupos etiquetados y su costo total.
#[derive(Debug, Clone, Serialize)]
pub struct GroupAssignment {
    pub groups: Vec<LabeledGroup>,
    pub cost: Cost,
}

impl GroupAssignment {
    pub fn label_of(&self, id: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.members.iter().any(|m| m == id))
            .map(|g| g.label.as_str())
    }

    pub fn student_count(&self) -> usize {
        self.groups.iter().map(|g| g.members.len()).sum()
    }
}

/// Contenido de una celda de iteración para un estudiante.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Group(String),
    Absent,
    Blank,
}

/// Una iteración registrada (columna del roster).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationRecord {
    pub index: usize,
    pub header: String,
    pub cells: BTreeMap<StudentId, Cell>,
}

impl IterationRecord {
    /// Agrupa los estudiantes por etiqueta, ignorando ausentes y celdas vacías.
    pub fn groups(&self) -> BTreeMap<&str, Vec<&StudentId>> {
        let mut out: BTreeMap<&str, Vec<&StudentId>> = BTreeMap::new();
        for (id, cell) in self.cells.iter() {
            if let Cell::Group(label) = cell {
                out.entry(label.as_str()).or_default().push(id);
            }
        }
        out
    }

    pub fn has_groups(&self) -> bool {
        self.cells.values().any(|c| matches!(c, Cell::Group(_)))
    }
}
