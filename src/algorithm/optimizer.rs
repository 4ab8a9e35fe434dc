//! optimizer.rs - Búsqueda de la partición con menos parejas repetidas.
//!
//! Dos niveles según el tamaño del curso:
//! - exacto (branch-and-bound) hasta `exact_limit` presentes, acotado por un
//!   presupuesto de nodos;
//! - búsqueda local con reinicios aleatorios (intercambios entre grupos,
//!   aceptando de vez en cuando un intercambio que no mejora).
//!
//! El costo se compara como `(total, max_pair)`: primero la suma de
//! repeticiones, luego la repetición máxima de un mismo par.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::algorithm::history::PairingHistory;
use crate::error::{GroupingError, Result};
use crate::models::{Cost, GroupShape};

/// Parámetros de la búsqueda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Máximo de presentes para intentar la búsqueda exacta.
    pub exact_limit: usize,
    /// Nodos visitados antes de abandonar la búsqueda exacta.
    pub node_budget: usize,
    pub restarts: usize,
    pub swaps_per_restart: usize,
    /// Probabilidad de aceptar un intercambio que no mejora.
    pub escape_probability: f64,
    /// Hilos para los reinicios; 0 = uno por CPU.
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            exact_limit: 12,
            node_budget: 200_000,
            restarts: 48,
            swaps_per_restart: 4_000,
            escape_probability: 0.05,
            workers: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchTier {
    Exact,
    LocalSearch,
}

/// Resultado de la búsqueda. `groups` usa índices densos del historial; el
/// orden de los grupos no sigue necesariamente `GroupShape::sizes`.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub groups: Vec<Vec<usize>>,
    pub cost: Cost,
    pub tier: SearchTier,
    pub nodes: usize,
    pub restarts: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GroupOptimizer {
    config: SearchConfig,
}

impl GroupOptimizer {
    pub fn new(config: SearchConfig) -> Self {
        GroupOptimizer { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Busca la mejor partición de `present` (índices densos del historial)
    /// con la forma dada. Sólo falla si la forma no suma los presentes.
    pub fn optimize(
        &self,
        present: &[usize],
        shape: &GroupShape,
        history: &PairingHistory,
        seed: u64,
    ) -> Result<SearchOutcome> {
        if shape.total() != present.len() {
            return Err(GroupingError::ShapeMismatch { expected: shape.total(), present: present.len() });
        }
        let sizes = shape.sizes();
        let w = history.weights_for(present);
        let n = present.len();

        let mut exact_partial: Option<(Cost, Vec<Vec<usize>>)> = None;
        let mut nodes = 0;
        if n <= self.config.exact_limit {
            let mut search = ExactSearch::new(&w, shape, self.config.node_budget, seed);
            search.run();
            nodes = search.nodes;
            if !search.exhausted {
                if let Some((cost, groups)) = search.best {
                    tracing::debug!(nodes, total = cost.total, "búsqueda exacta completa");
                    return Ok(SearchOutcome {
                        groups: to_history_indices(&groups, present),
                        cost,
                        tier: SearchTier::Exact,
                        nodes,
                        restarts: 0,
                    });
                }
            }
            tracing::warn!(
                nodes,
                budget = self.config.node_budget,
                "⚠️ presupuesto de la búsqueda exacta agotado; se usa búsqueda local"
            );
            exact_partial = search.best;
        }

        let (mut cost, mut groups, restarts) = self.local_search(&w, &sizes, seed);
        if let Some((partial_cost, partial_groups)) = exact_partial {
            if partial_cost < cost {
                cost = partial_cost;
                groups = partial_groups;
            }
        }
        Ok(SearchOutcome {
            groups: to_history_indices(&groups, present),
            cost,
            tier: SearchTier::LocalSearch,
            nodes,
            restarts,
        })
    }

    /// Reinicios independientes repartidos entre hilos. Gana el menor
    /// `(costo, índice de reinicio)`; tras encontrar costo 0 sólo siguen los
    /// reinicios de índice menor, así el resultado no depende de los hilos.
    fn local_search(&self, w: &[Vec<u32>], sizes: &[usize], seed: u64) -> (Cost, Vec<Vec<usize>>, usize) {
        let restarts = self.config.restarts.max(1);
        let workers = match self.config.workers {
            0 => num_cpus::get(),
            n => n,
        }
        .clamp(1, restarts);
        let first_zero = AtomicUsize::new(usize::MAX);

        let mut results: Vec<(usize, Cost, Vec<Vec<usize>>)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let first_zero = &first_zero;
                    scope.spawn(move || {
                        let mut local = Vec::new();
                        let mut r = worker;
                        while r < restarts {
                            if r > first_zero.load(Ordering::Acquire) {
                                break;
                            }
                            let (cost, groups) = self.run_restart(w, sizes, restart_seed(seed, r));
                            tracing::debug!(restart = r, total = cost.total, max_pair = cost.max_pair, "reinicio terminado");
                            if cost.is_zero() {
                                first_zero.fetch_min(r, Ordering::AcqRel);
                            }
                            local.push((r, cost, groups));
                            r += workers;
                        }
                        local
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let run = results.len();
        results.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
        match results.into_iter().next() {
            Some((_, cost, groups)) => (cost, groups, run),
            None => (Cost::ZERO, Vec::new(), run),
        }
    }

    /// Un reinicio: reparto round-robin sobre un orden barajado y luego
    /// intercambios entre pares de grupos.
    fn run_restart(&self, w: &[Vec<u32>], sizes: &[usize], seed: u64) -> (Cost, Vec<Vec<usize>>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = w.len();
        let k = sizes.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);

        let mut groups: Vec<Vec<usize>> = sizes.iter().map(|&s| Vec::with_capacity(s)).collect();
        let mut g = 0;
        for s in order {
            while groups[g].len() >= sizes[g] {
                g = (g + 1) % k;
            }
            groups[g].push(s);
            g = (g + 1) % k;
        }

        let mut best_cost = partition_cost(&groups, w);
        let mut best_groups = groups.clone();
        if best_cost.is_zero() || k < 2 {
            return (best_cost, best_groups);
        }

        let p = self.config.escape_probability.clamp(0.0, 1.0);
        let mut current = i64::from(best_cost.total);
        for _ in 0..self.config.swaps_per_restart {
            let ga = rng.gen_range(0..k);
            let mut gb = rng.gen_range(0..k - 1);
            if gb >= ga {
                gb += 1;
            }
            let ia = rng.gen_range(0..groups[ga].len());
            let ib = rng.gen_range(0..groups[gb].len());
            let a = groups[ga][ia];
            let b = groups[gb][ib];

            let delta = swap_delta(w, &groups[ga], a, b) + swap_delta(w, &groups[gb], b, a);
            if delta < 0 || rng.gen_bool(p) {
                groups[ga][ia] = b;
                groups[gb][ib] = a;
                current += delta;
                if current <= i64::from(best_cost.total) {
                    let cost = partition_cost(&groups, w);
                    if cost < best_cost {
                        best_cost = cost;
                        best_groups = groups.clone();
                        if best_cost.is_zero() {
                            break;
                        }
                    }
                }
            }
        }
        (best_cost, best_groups)
    }
}

/// Cambio en el costo del grupo `group` al reemplazar `out` por `inn`.
fn swap_delta(w: &[Vec<u32>], group: &[usize], out: usize, inn: usize) -> i64 {
    group
        .iter()
        .filter(|&&m| m != out)
        .map(|&m| i64::from(w[inn][m]) - i64::from(w[out][m]))
        .sum()
}

fn restart_seed(seed: u64, restart: usize) -> u64 {
    seed ^ (restart as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn to_history_indices(groups: &[Vec<usize>], present: &[usize]) -> Vec<Vec<usize>> {
    groups.iter().map(|g| g.iter().map(|&l| present[l]).collect()).collect()
}

/// Costo `(total, max_pair)` de una partición sobre la matriz `w`.
pub fn partition_cost(groups: &[Vec<usize>], w: &[Vec<u32>]) -> Cost {
    let mut cost = Cost::ZERO;
    for g in groups {
        for (p, &i) in g.iter().enumerate() {
            for &j in g.iter().skip(p + 1) {
                cost.total += w[i][j];
                cost.max_pair = cost.max_pair.max(w[i][j]);
            }
        }
    }
    cost
}

/// Branch-and-bound sobre particiones canónicas: el primer estudiante sin
/// asignar (según `order`) abre el siguiente grupo, se elige el tamaño de ese
/// grupo y luego sus demás miembros entre los estudiantes posteriores.
struct ExactSearch<'a> {
    w: &'a [Vec<u32>],
    order: Vec<usize>,
    assigned: Vec<bool>,
    threes_left: usize,
    fours_left: usize,
    groups: Vec<Vec<usize>>,
    best: Option<(Cost, Vec<Vec<usize>>)>,
    nodes: usize,
    budget: usize,
    exhausted: bool,
}

impl<'a> ExactSearch<'a> {
    fn new(w: &'a [Vec<u32>], shape: &GroupShape, budget: usize, seed: u64) -> Self {
        let n = w.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        ExactSearch {
            w,
            order,
            assigned: vec![false; n],
            threes_left: shape.threes,
            fours_left: shape.fours,
            groups: Vec::with_capacity(shape.group_count()),
            best: None,
            nodes: 0,
            budget,
            exhausted: false,
        }
    }

    fn run(&mut self) {
        self.search(Cost::ZERO);
    }

    fn is_done(&self) -> bool {
        self.exhausted || matches!(&self.best, Some((c, _)) if c.is_zero())
    }

    fn search(&mut self, partial: Cost) {
        self.nodes += 1;
        if self.nodes > self.budget {
            self.exhausted = true;
            return;
        }
        if self.is_done() {
            return;
        }
        let Some(p) = self.assigned.iter().position(|a| !a) else {
            let better = match &self.best {
                Some((c, _)) => partial < *c,
                None => true,
            };
            if better {
                self.best = Some((partial, self.groups.clone()));
            }
            return;
        };

        for size in [3usize, 4] {
            let left = if size == 3 { self.threes_left } else { self.fours_left };
            if left == 0 {
                continue;
            }
            self.take_size(size);
            self.assigned[p] = true;
            let mut group = vec![self.order[p]];
            self.extend(&mut group, p + 1, size - 1, partial);
            self.assigned[p] = false;
            self.give_size(size);
            if self.is_done() {
                return;
            }
        }
    }

    fn extend(&mut self, group: &mut Vec<usize>, start: usize, need: usize, partial: Cost) {
        if self.is_done() {
            return;
        }
        if need == 0 {
            self.groups.push(group.clone());
            self.search(partial);
            self.groups.pop();
            return;
        }
        for q in start..self.order.len() {
            if self.assigned[q] {
                continue;
            }
            let s = self.order[q];
            let mut next = partial;
            for &m in group.iter() {
                next.total += self.w[s][m];
                next.max_pair = next.max_pair.max(self.w[s][m]);
            }
            // el costo sólo crece: si ya no mejora al mejor, se poda
            if let Some((best, _)) = &self.best {
                if next >= *best {
                    continue;
                }
            }
            self.assigned[q] = true;
            group.push(s);
            self.extend(group, q + 1, need - 1, next);
            group.pop();
            self.assigned[q] = false;
            if self.is_done() {
                return;
            }
        }
    }

    fn take_size(&mut self, size: usize) {
        if size == 3 {
            self.threes_left -= 1;
        } else {
            self.fours_left -= 1;
        }
    }

    fn give_size(&mut self, size: usize) {
        if size == 3 {
            self.threes_left += 1;
        } else {
            self.fours_left += 1;
        }
    }
}
