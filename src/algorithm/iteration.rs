// Orquestador de una iteración: presentes -> forma -> optimización ->
// etiquetas -> registro en el roster -> actualización del historial.
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::algorithm::history::{PairingHistory, unknown_student};
use crate::algorithm::optimizer::{GroupOptimizer, SearchTier};
use crate::algorithm::shape::solve_shape;
use crate::error::{GroupingError, Result};
use crate::models::{Cell, GroupAssignment, GroupShape, IterationRecord, LabeledGroup, Student, StudentId};
use crate::roster::{GroupLabels, GroupNameProvider, RosterStore, check_label_names, iteration_header};

/// Iteración calculada pero todavía no registrada.
#[derive(Debug, Clone)]
pub struct IterationPlan {
    pub record: IterationRecord,
    pub assignment: GroupAssignment,
    pub shape: GroupShape,
    pub absent: Vec<StudentId>,
    pub tier: SearchTier,
    pub seed: u64,
    groups_idx: Vec<Vec<usize>>,
}

/// Resumen serializable de una iteración ejecutada.
#[derive(Debug, Clone, Serialize)]
pub struct IterationOutcome {
    pub iteration: usize,
    pub header: String,
    pub seed: u64,
    pub present: usize,
    pub absent: Vec<StudentId>,
    pub shape: GroupShape,
    pub tier: SearchTier,
    pub assignment: GroupAssignment,
    pub recorded: bool,
    pub computed_at: DateTime<Utc>,
}

impl IterationOutcome {
    fn from_plan(plan: IterationPlan, recorded: bool) -> Self {
        IterationOutcome {
            iteration: plan.record.index,
            header: plan.record.header,
            seed: plan.seed,
            present: plan.assignment.student_count(),
            absent: plan.absent,
            shape: plan.shape,
            tier: plan.tier,
            assignment: plan.assignment,
            recorded,
            computed_at: Utc::now(),
        }
    }
}

pub struct IterationManager<L: GroupNameProvider = GroupLabels> {
    students: Vec<Student>,
    history: PairingHistory,
    labels: L,
    optimizer: GroupOptimizer,
}

impl<L: GroupNameProvider> IterationManager<L> {
    /// Manager con historial vacío. Falla si las etiquetas no son distintas.
    pub fn new(students: Vec<Student>, labels: L, optimizer: GroupOptimizer) -> Result<Self> {
        check_label_names(label_names(&labels), None)?;
        let history = PairingHistory::new(&students)?;
        Ok(IterationManager { students, history, labels, optimizer })
    }

    /// Reconstruye el historial reproduciendo todas las iteraciones ya
    /// registradas en el roster.
    pub fn rehydrate<S: RosterStore + ?Sized>(store: &S, labels: L, optimizer: GroupOptimizer) -> Result<Self> {
        let mut manager = IterationManager::new(store.list_students(), labels, optimizer)?;
        let records = store.recorded_iterations()?;
        for record in records.iter() {
            for (_label, members) in record.groups() {
                manager.history.increment_group(&members)?;
            }
        }
        tracing::info!(
            students = manager.students.len(),
            iterations = records.len(),
            pairs_seen = manager.history.total_pairs_seen(),
            "historial reconstruido"
        );
        Ok(manager)
    }

    pub fn history(&self) -> &PairingHistory {
        &self.history
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// Ninguna etiqueta puede leerse como ausencia en este roster.
    fn check_labels_for<S: RosterStore + ?Sized>(&self, store: &S) -> Result<()> {
        match store.absence_marker() {
            Some(marker) => check_label_names(label_names(&self.labels), Some(marker)),
            None => Ok(()),
        }
    }

    /// Calcula la iteración `index` sin tocar el historial ni el roster.
    pub fn plan(&self, index: usize, absent: &BTreeSet<StudentId>, seed: u64) -> Result<IterationPlan> {
        for id in absent.iter() {
            if self.history.index_of(id).is_err() {
                return Err(unknown_student(id, self.students.iter().map(|s| s.id.as_str())));
            }
        }

        let present: Vec<usize> = self
            .students
            .iter()
            .enumerate()
            .filter(|(_, s)| !absent.contains(&s.id))
            .map(|(i, _)| i)
            .collect();

        let shape = solve_shape(present.len())?;
        if shape.group_count() > self.labels.available() {
            return Err(GroupingError::TooManyGroups {
                required: shape.group_count(),
                available: self.labels.available(),
            });
        }

        let outcome = self.optimizer.optimize(&present, &shape, &self.history, seed)?;

        // orden estable dentro de la iteración: grupos grandes primero, luego
        // por la posición en el roster de su primer miembro
        let mut groups_idx = outcome.groups;
        for g in groups_idx.iter_mut() {
            g.sort_unstable();
        }
        groups_idx.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));

        let mut groups = Vec::with_capacity(groups_idx.len());
        let mut cells: BTreeMap<StudentId, Cell> = BTreeMap::new();
        for (i, g) in groups_idx.iter().enumerate() {
            let label = self.labels.label_for(i).ok_or(GroupingError::TooManyGroups {
                required: groups_idx.len(),
                available: self.labels.available(),
            })?;
            let members: Vec<StudentId> = g.iter().map(|&ix| self.students[ix].id.clone()).collect();
            let conflict = self.history.group_cost(&members)?;
            for m in members.iter() {
                cells.insert(m.clone(), Cell::Group(label.to_string()));
            }
            groups.push(LabeledGroup { label: label.to_string(), members, conflict });
        }
        for id in absent.iter() {
            cells.insert(id.clone(), Cell::Absent);
        }

        Ok(IterationPlan {
            record: IterationRecord { index, header: iteration_header(index), cells },
            assignment: GroupAssignment { groups, cost: outcome.cost },
            shape,
            absent: absent.iter().cloned().collect(),
            tier: outcome.tier,
            seed,
            groups_idx,
        })
    }

    /// Aplica al historial los grupos de un plan ya registrado.
    fn commit(&mut self, plan: &IterationPlan) {
        for g in plan.groups_idx.iter() {
            self.history.increment_indices(g);
        }
    }

    /// Ejecuta la iteración pendiente del roster. Primero se registra en el
    /// roster y sólo si eso funciona se actualiza el historial.
    pub fn run_next<S: RosterStore + ?Sized>(&mut self, store: &mut S, seed: u64) -> Result<IterationOutcome> {
        self.check_labels_for(store)?;
        let index = store.pending_iteration()?;
        let absent = store.absence_markers_for(index)?;
        let plan = self.plan(index, &absent, seed)?;
        store.record_iteration(&plan.record)?;
        self.commit(&plan);

        tracing::info!(
            iteration = index,
            groups = plan.assignment.groups.len(),
            absent = plan.absent.len(),
            total_conflict = plan.assignment.cost.total,
            max_pair = plan.assignment.cost.max_pair,
            "✅ iteración registrada"
        );
        Ok(IterationOutcome::from_plan(plan, true))
    }

    /// Igual que `run_next` pero sin registrar nada (modo simulación).
    pub fn preview_next<S: RosterStore + ?Sized>(&self, store: &mut S, seed: u64) -> Result<IterationOutcome> {
        self.check_labels_for(store)?;
        let index = store.pending_iteration()?;
        let absent = store.absence_markers_for(index)?;
        let plan = self.plan(index, &absent, seed)?;
        Ok(IterationOutcome::from_plan(plan, false))
    }
}

fn label_names<L: GroupNameProvider>(labels: &L) -> impl Iterator<Item = &str> {
    (0..labels.available()).filter_map(|i| labels.label_for(i))
}
