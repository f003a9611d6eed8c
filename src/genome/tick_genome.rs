//! Tick-vector genome
//!
//! A genome is one tick per gene, in gene pool order.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use super::gene::Tick;
use crate::error::ConfigurationError;

/// Ordered tick values, one per gene
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TickGenome {
    ticks: Vec<Tick>,
}

impl TickGenome {
    /// Create a genome from tick values
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self { ticks }
    }

    /// Number of genes
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Whether the genome has no genes
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Tick values
    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    /// Mutable tick values
    pub fn ticks_mut(&mut self) -> &mut [Tick] {
        &mut self.ticks
    }

    /// Take the tick vector out
    pub fn into_ticks(self) -> Vec<Tick> {
        self.ticks
    }

    /// Euclidean distance between tick vectors
    pub fn euclidean_distance(&self, other: &Self) -> f64 {
        self.ticks
            .iter()
            .zip(&other.ticks)
            .map(|(a, b)| {
                let d = (a - b) as f64;
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Manhattan distance between tick vectors
    pub fn manhattan_distance(&self, other: &Self) -> f64 {
        self.ticks
            .iter()
            .zip(&other.ticks)
            .map(|(a, b)| (a - b).unsigned_abs() as f64)
            .sum()
    }
}

impl From<Vec<Tick>> for TickGenome {
    fn from(ticks: Vec<Tick>) -> Self {
        Self::new(ticks)
    }
}

impl FromIterator<Tick> for TickGenome {
    fn from_iter<I: IntoIterator<Item = Tick>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Index<usize> for TickGenome {
    type Output = Tick;

    fn index(&self, index: usize) -> &Self::Output {
        &self.ticks[index]
    }
}

impl IndexMut<usize> for TickGenome {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.ticks[index]
    }
}

/// Genetic distance function over tick vectors
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Selector 0
    #[default]
    Euclidean,
    /// Selector 1
    Manhattan,
}

impl DistanceMetric {
    /// Resolve the host's numeric selector
    pub fn from_selector(selector: u8) -> Result<Self, ConfigurationError> {
        match selector {
            0 => Ok(Self::Euclidean),
            1 => Ok(Self::Manhattan),
            other => Err(ConfigurationError::UnknownDistanceMetric(other)),
        }
    }

    /// The host's numeric selector
    pub fn selector(self) -> u8 {
        match self {
            Self::Euclidean => 0,
            Self::Manhattan => 1,
        }
    }

    /// Distance between two genomes
    pub fn distance(self, a: &TickGenome, b: &TickGenome) -> f64 {
        match self {
            Self::Euclidean => a.euclidean_distance(b),
            Self::Manhattan => a.manhattan_distance(b),
        }
    }
}
