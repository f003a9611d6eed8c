//! Mutation strategies
//!
//! Per-gene perturbation of tick values. Every mutated tick stays within
//! `0..=total_ticks` of its gene.

use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::ConfigurationError;
use crate::genome::gene::Tick;
use crate::genome::tick_genome::TickGenome;
use crate::operators::traits::MutationStrategy;

fn check_rate(rate: f64) -> Result<f64, ConfigurationError> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigurationError::InvalidRate {
            name: "mutation rate",
            value: rate,
        })
    }
}

/// Uniform reset mutation
///
/// Each gene is redrawn uniformly over its whole tick range with
/// probability `rate`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformMutation {
    rate: f64,
}

impl UniformMutation {
    /// Create a uniform mutation with per-gene probability `rate`
    pub fn new(rate: f64) -> Result<Self, ConfigurationError> {
        Ok(Self {
            rate: check_rate(rate)?,
        })
    }
}

impl MutationStrategy for UniformMutation {
    fn mutate<R: Rng>(&self, genome: &mut TickGenome, total_ticks: &[Tick], rng: &mut R) {
        for (tick, &total) in genome.ticks_mut().iter_mut().zip(total_ticks) {
            if rng.gen::<f64>() < self.rate {
                *tick = rng.gen_range(0..=total.max(0));
            }
        }
    }

    fn mutation_probability(&self) -> f64 {
        self.rate
    }
}

/// Creep mutation
///
/// Each gene moves by a normally distributed number of ticks with
/// probability `rate`. The standard deviation is `step` times the gene's
/// tick count, and never less than one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreepMutation {
    rate: f64,
    step: f64,
}

impl CreepMutation {
    /// Create a creep mutation
    ///
    /// `step` is a fraction of each gene's range in `(0, 1]`.
    pub fn new(rate: f64, step: f64) -> Result<Self, ConfigurationError> {
        if !(step > 0.0 && step <= 1.0) {
            return Err(ConfigurationError::InvalidRate {
                name: "creep step",
                value: step,
            });
        }
        Ok(Self {
            rate: check_rate(rate)?,
            step,
        })
    }

    /// Step size as a fraction of the range
    pub fn step(&self) -> f64 {
        self.step
    }
}

impl MutationStrategy for CreepMutation {
    fn mutate<R: Rng>(&self, genome: &mut TickGenome, total_ticks: &[Tick], rng: &mut R) {
        for (tick, &total) in genome.ticks_mut().iter_mut().zip(total_ticks) {
            if total <= 0 || rng.gen::<f64>() >= self.rate {
                continue;
            }
            let sigma = (self.step * total as f64).max(1.0);
            let z: f64 = rng.sample(StandardNormal);
            let mut delta = (z * sigma).round() as Tick;
            if delta == 0 {
                delta = if z < 0.0 { -1 } else { 1 };
            }
            *tick = tick.saturating_add(delta).clamp(0, total);
        }
    }

    fn mutation_probability(&self) -> f64 {
        self.rate
    }
}

/// Closed set of mutation strategies
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mutation {
    /// Redraw over the whole range
    Uniform(UniformMutation),
    /// Small normally distributed steps
    Creep(CreepMutation),
}

impl Default for Mutation {
    fn default() -> Self {
        Self::Uniform(UniformMutation { rate: 0.1 })
    }
}

impl MutationStrategy for Mutation {
    fn mutate<R: Rng>(&self, genome: &mut TickGenome, total_ticks: &[Tick], rng: &mut R) {
        match self {
            Self::Uniform(m) => m.mutate(genome, total_ticks, rng),
            Self::Creep(m) => m.mutate(genome, total_ticks, rng),
        }
    }

    fn mutation_probability(&self) -> f64 {
        match self {
            Self::Uniform(m) => m.mutation_probability(),
            Self::Creep(m) => m.mutation_probability(),
        }
    }
}
