//! Differential evolution over a bounded box.
//!
//! Strategy `best1bin`:
//!
//! - mutant `v = x_best + F·(x_r0 − x_r1)`, with `F` dithered once per generation
//! - binomial crossover with rate `CR` (one coordinate always taken from `v`)
//! - greedy selection (`trial ≤ target` replaces the target)
//!
//! The population lives in the unit cube and is scaled to the bounds only for
//! evaluation. Coordinates that leave `[0, 1]` after mutation are redrawn
//! uniformly, so every evaluated vector lies inside the box.
//!
//! Determinism: all random draws happen on one seeded `StdRng`, sequentially,
//! before a generation is evaluated. Trial vectors are then evaluated in
//! parallel (rayon) and selected in index order, so results do not depend on
//! the number of worker threads.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::domain::EvolutionStats;
use crate::error::AppError;

/// Smallest population that still allows `best1bin` to pick two distinct donors.
const MIN_POPULATION: usize = 5;

#[derive(Debug, Clone)]
pub struct EvolutionOptions {
    /// Maximum number of generations.
    pub max_iter: usize,
    /// Population multiplier; the population has `popsize × dimensions` members.
    pub popsize: usize,
    /// Relative convergence tolerance on the spread of population energies.
    pub tol: f64,
    /// Absolute convergence tolerance on the spread of population energies.
    pub atol: f64,
    /// Dithering range for the mutation factor `F`.
    pub mutation: (f64, f64),
    /// Crossover probability `CR`.
    pub recombination: f64,
    pub seed: u64,
}

impl Default for EvolutionOptions {
    fn default() -> Self {
        Self {
            max_iter: 500,
            popsize: 10,
            tol: 1e-4,
            atol: 1e-4,
            mutation: (0.5, 1.0),
            recombination: 0.9,
            seed: 42,
        }
    }
}

impl EvolutionOptions {
    fn validate(&self) -> Result<(), AppError> {
        if self.popsize == 0 {
            return Err(AppError::input("Population size must be > 0."));
        }
        let (f_lo, f_hi) = self.mutation;
        if !(f_lo.is_finite() && f_hi.is_finite() && 0.0 <= f_lo && f_lo <= f_hi && f_hi <= 2.0) {
            return Err(AppError::input(format!(
                "Invalid mutation range ({f_lo}, {f_hi}); expected 0 <= min <= max <= 2."
            )));
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(AppError::input(format!(
                "Recombination must be in [0, 1], got {}.",
                self.recombination
            )));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0 && self.atol.is_finite() && self.atol >= 0.0) {
            return Err(AppError::input("Convergence tolerances must be finite and >= 0."));
        }
        Ok(())
    }
}

/// Best member found by the search.
#[derive(Debug, Clone)]
pub struct EvolutionResult {
    /// Best vector, in problem coordinates.
    pub best: Vec<f64>,
    /// Objective value at `best` (always finite on success).
    pub energy: f64,
    pub stats: EvolutionStats,
}

/// Minimize `f` over the box `bounds` with differential evolution.
///
/// Non-finite objective values are treated as `+∞`: such candidates never win a
/// selection and can never become the reported best. If no member of the final
/// population has a finite energy the search fails.
pub fn differential_evolution<F>(
    f: F,
    bounds: &[(f64, f64)],
    opts: &EvolutionOptions,
) -> Result<EvolutionResult, AppError>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    opts.validate()?;
    let dim = bounds.len();
    if dim == 0 {
        return Err(AppError::input("Differential evolution needs at least one dimension."));
    }
    for (i, &(lo, hi)) in bounds.iter().enumerate() {
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(AppError::input(format!(
                "Invalid bounds for dimension {i}: [{lo}, {hi}]."
            )));
        }
    }

    let pop_size = (opts.popsize * dim).max(MIN_POPULATION);
    let mut rng = StdRng::seed_from_u64(opts.seed);

    let scale = |unit: &[f64]| -> Vec<f64> {
        unit.iter()
            .zip(bounds)
            .map(|(&u, &(lo, hi))| lo + u * (hi - lo))
            .collect()
    };
    let energy = |unit: &Vec<f64>| -> f64 {
        let e = f(&scale(unit));
        if e.is_finite() { e } else { f64::INFINITY }
    };

    let mut population = latin_hypercube(&mut rng, pop_size, dim);
    let mut energies: Vec<f64> = population.par_iter().map(energy).collect();
    let mut nfev = pop_size;
    let mut best = argmin(&energies);

    let mut generations = 0;
    let mut converged = converged_spread(&energies, opts);

    while !converged && generations < opts.max_iter {
        generations += 1;

        let f_scale = if opts.mutation.1 > opts.mutation.0 {
            rng.gen_range(opts.mutation.0..opts.mutation.1)
        } else {
            opts.mutation.0
        };

        let trials: Vec<Vec<f64>> = (0..pop_size)
            .map(|i| {
                let (r0, r1) = pick_donors(&mut rng, pop_size, i);
                let fill = rng.gen_range(0..dim);
                (0..dim)
                    .map(|j| {
                        let target = population[i][j];
                        if j != fill && rng.r#gen::<f64>() >= opts.recombination {
                            return target;
                        }
                        let v = population[best][j] + f_scale * (population[r0][j] - population[r1][j]);
                        if (0.0..=1.0).contains(&v) { v } else { rng.r#gen::<f64>() }
                    })
                    .collect()
            })
            .collect();

        let trial_energies: Vec<f64> = trials.par_iter().map(energy).collect();
        nfev += pop_size;

        for (i, (trial, e)) in trials.into_iter().zip(trial_energies).enumerate() {
            if e <= energies[i] {
                population[i] = trial;
                energies[i] = e;
            }
        }
        best = argmin(&energies);

        tracing::debug!(
            generation = generations,
            best = energies[best],
            mutation = f_scale,
            "differential evolution generation"
        );

        converged = converged_spread(&energies, opts);
    }

    let best_energy = energies[best];
    if !best_energy.is_finite() {
        return Err(AppError::fit(
            "Differential evolution found no candidate with a finite loss.",
        ));
    }

    Ok(EvolutionResult {
        best: scale(&population[best]),
        energy: best_energy,
        stats: EvolutionStats {
            generations,
            nfev,
            converged,
        },
    })
}

/// Latin hypercube sample of `n` points in `[0, 1]^dim`.
///
/// Each axis is split into `n` equal strata; every stratum receives exactly one
/// point, and the strata are shuffled independently per axis.
fn latin_hypercube(rng: &mut StdRng, n: usize, dim: usize) -> Vec<Vec<f64>> {
    let seg = 1.0 / n as f64;
    let columns: Vec<Vec<f64>> = (0..dim)
        .map(|_| {
            let mut col: Vec<f64> = (0..n)
                .map(|k| (k as f64 + rng.r#gen::<f64>()) * seg)
                .collect();
            col.shuffle(rng);
            col
        })
        .collect();

    (0..n)
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect()
}

/// Two distinct indices, both different from `exclude`.
fn pick_donors(rng: &mut StdRng, n: usize, exclude: usize) -> (usize, usize) {
    let r0 = loop {
        let r = rng.gen_range(0..n);
        if r != exclude {
            break r;
        }
    };
    let r1 = loop {
        let r = rng.gen_range(0..n);
        if r != exclude && r != r0 {
            break r;
        }
    };
    (r0, r1)
}

/// Index of the smallest energy; ties resolve to the lowest index.
fn argmin(energies: &[f64]) -> usize {
    let mut best = 0;
    for (i, &e) in energies.iter().enumerate().skip(1) {
        if e < energies[best] {
            best = i;
        }
    }
    best
}

/// `std(E) <= atol + tol·|mean(E)|`. Never true while any energy is infinite.
fn converged_spread(energies: &[f64], opts: &EvolutionOptions) -> bool {
    if energies.iter().any(|e| !e.is_finite()) {
        return false;
    }
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() <= opts.atol + opts.tol * mean.abs()
}
