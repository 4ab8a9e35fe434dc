//! Historial de emparejamientos: cuántas iteraciones previas pusieron a cada
//! par de estudiantes en el mismo grupo.
//!
//! Se guarda como matriz densa simétrica indexada por la posición del
//! estudiante en el roster; la diagonal no se usa.

use std::collections::HashMap;

use crate::error::{GroupingError, Result};
use crate::models::{Student, StudentId};

#[derive(Debug, Clone)]
pub struct PairingHistory {
    ids: Vec<StudentId>,
    index: HashMap<StudentId, usize>,
    counts: Vec<u32>,
}

impl PairingHistory {
    /// Historial vacío (todos los conteos en 0) para los estudiantes dados.
    pub fn new(students: &[Student]) -> Result<Self> {
        let mut ids = Vec::with_capacity(students.len());
        let mut index = HashMap::with_capacity(students.len());
        for s in students {
            if index.insert(s.id.clone(), ids.len()).is_some() {
                return Err(GroupingError::Roster(format!("clave de estudiante duplicada '{}'", s.id)));
            }
            ids.push(s.id.clone());
        }
        let n = ids.len();
        Ok(PairingHistory { ids, index, counts: vec![0; n * n] })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[StudentId] {
        &self.ids
    }

    /// Posición densa del estudiante, o `UnknownStudent` con sugerencia.
    pub fn index_of(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| unknown_student(id, self.ids.iter().map(String::as_str)))
    }

    pub fn count(&self, a: &str, b: &str) -> Result<u32> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Ok(self.count_at(i, j))
    }

    /// Conteo por índices densos. `i == j` devuelve 0.
    pub fn count_at(&self, i: usize, j: usize) -> u32 {
        if i == j {
            return 0;
        }
        self.counts[i * self.ids.len() + j]
    }

    /// Suma 1 a cada par no ordenado del grupo. Valida todo antes de mutar.
    pub fn increment_group<S: AsRef<str>>(&mut self, group: &[S]) -> Result<()> {
        let idx = group
            .iter()
            .map(|s| self.index_of(s.as_ref()))
            .collect::<Result<Vec<usize>>>()?;
        self.increment_indices(&idx);
        Ok(())
    }

    pub(crate) fn increment_indices(&mut self, idx: &[usize]) {
        let n = self.ids.len();
        for (p, &i) in idx.iter().enumerate() {
            for &j in idx.iter().skip(p + 1) {
                if i == j {
                    continue;
                }
                self.counts[i * n + j] += 1;
                self.counts[j * n + i] += 1;
            }
        }
    }

    /// Cantidad de pares distintos que ya estuvieron juntos al menos una vez.
    pub fn total_pairs_seen(&self) -> usize {
        let n = self.ids.len();
        let mut seen = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                if self.counts[i * n + j] > 0 {
                    seen += 1;
                }
            }
        }
        seen
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Puntaje de conflicto de un grupo: suma de los conteos de sus pares.
    pub fn group_cost<S: AsRef<str>>(&self, group: &[S]) -> Result<u32> {
        let idx = group
            .iter()
            .map(|s| self.index_of(s.as_ref()))
            .collect::<Result<Vec<usize>>>()?;
        let mut total = 0;
        for (p, &i) in idx.iter().enumerate() {
            for &j in idx.iter().skip(p + 1) {
                total += self.count_at(i, j);
            }
        }
        Ok(total)
    }

    /// Sub-matriz de pesos para un subconjunto de índices (orden del subconjunto).
    pub(crate) fn weights_for(&self, subset: &[usize]) -> Vec<Vec<u32>> {
        subset
            .iter()
            .map(|&i| subset.iter().map(|&j| self.count_at(i, j)).collect())
            .collect()
    }
}

/// Construye `UnknownStudent` sugiriendo la clave conocida más parecida.
pub(crate) fn unknown_student<'a>(id: &str, known: impl Iterator<Item = &'a str>) -> GroupingError {
    let suggestion = known
        .map(|k| (strsim::jaro_winkler(id, k), k))
        .filter(|(score, _)| *score >= 0.85)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, k)| k.to_string());
    GroupingError::UnknownStudent { id: id.to_string(), suggestion }
}
