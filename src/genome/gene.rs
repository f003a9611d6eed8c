//! Gene descriptor and tick codec
//!
//! A gene is one host parameter discretized into integer ticks. The codec
//! converts between a tick index and the parameter's actual decimal value:
//!
//! ```text
//! total_ticks = round((maximum - minimum) * 10^decimals)
//! value       = round(minimum + (tick / total_ticks) * (maximum - minimum), decimals)
//! ```
//!
//! All range arithmetic is done in `Decimal` so repeated round-trips do not
//! drift. `total_ticks` is derived from the current bounds on every call.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// Integer index into a gene's discretized range
pub type Tick = i64;

/// Largest supported decimal precision
pub const MAX_DECIMALS: u32 = 12;

const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

/// One optimizable host parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// Identifier of the host parameter this gene drives
    pub id: String,
    /// Lower bound (inclusive)
    pub minimum: Decimal,
    /// Upper bound (inclusive)
    pub maximum: Decimal,
    /// Decimal places of the parameter
    pub decimals: u32,
    /// Current tick value
    #[serde(default)]
    pub tick: Tick,
}

impl Gene {
    /// Create a new gene positioned at tick 0
    pub fn new(
        id: impl Into<String>,
        minimum: Decimal,
        maximum: Decimal,
        decimals: u32,
    ) -> Result<Self, EncodingError> {
        let gene = Self {
            id: id.into(),
            minimum,
            maximum,
            decimals,
            tick: 0,
        };
        gene.total_ticks()?;
        Ok(gene)
    }

    /// Create a gene from floating-point bounds as reported by a host
    pub fn from_f64(
        id: impl Into<String>,
        minimum: f64,
        maximum: f64,
        decimals: u32,
    ) -> Result<Self, EncodingError> {
        let id = id.into();
        let min = to_decimal(&id, minimum)?;
        let max = to_decimal(&id, maximum)?;
        Self::new(id, min, max, decimals)
    }

    /// Width of the range
    pub fn range(&self) -> Result<Decimal, EncodingError> {
        self.maximum
            .checked_sub(self.minimum)
            .ok_or_else(|| self.overflow())
    }

    fn overflow(&self) -> EncodingError {
        EncodingError::TickOverflow {
            gene: self.id.clone(),
        }
    }

    /// Number of ticks above zero; valid ticks are `0..=total_ticks`
    pub fn total_ticks(&self) -> Result<Tick, EncodingError> {
        if self.decimals > MAX_DECIMALS {
            return Err(EncodingError::UnsupportedPrecision {
                gene: self.id.clone(),
                decimals: self.decimals,
                max: MAX_DECIMALS,
            });
        }
        if self.minimum > self.maximum {
            return Err(EncodingError::InvalidBounds {
                gene: self.id.clone(),
                minimum: self.minimum,
                maximum: self.maximum,
            });
        }

        self.range()?
            .checked_mul(decimal_scale(self.decimals))
            .map(|scaled| scaled.round_dp_with_strategy(0, ROUNDING))
            .and_then(|ticks| ticks.to_i64())
            .ok_or_else(|| self.overflow())
    }

    /// Convert a tick index to the actual value
    pub fn decode(&self, tick: Tick) -> Result<Decimal, EncodingError> {
        let total = self.total_ticks()?;
        if tick < 0 || tick > total {
            return Err(EncodingError::TickOutOfRange {
                gene: self.id.clone(),
                tick,
                total_ticks: total,
            });
        }
        if total == 0 {
            return Ok(self.minimum.round_dp_with_strategy(self.decimals, ROUNDING));
        }

        let offset = scale_ratio(self.range()?, Decimal::from(tick), Decimal::from(total))
            .ok_or_else(|| self.overflow())?;
        let value = self
            .minimum
            .checked_add(offset)
            .ok_or_else(|| self.overflow())?;
        Ok(value.round_dp_with_strategy(self.decimals, ROUNDING))
    }

    /// Convert an actual value to the nearest valid tick
    pub fn encode(&self, value: Decimal) -> Result<Tick, EncodingError> {
        let total = self.total_ticks()?;

        // Half a step either side of the bounds still rounds onto them.
        let tolerance = Decimal::new(5, self.decimals + 1);
        let lower = self.minimum.checked_sub(tolerance).unwrap_or(self.minimum);
        let upper = self.maximum.checked_add(tolerance).unwrap_or(self.maximum);
        if value < lower || value > upper {
            return Err(EncodingError::ValueOutOfRange {
                gene: self.id.clone(),
                value,
                minimum: self.minimum,
                maximum: self.maximum,
            });
        }
        if total == 0 {
            return Ok(0);
        }

        let offset = value
            .checked_sub(self.minimum)
            .ok_or_else(|| self.overflow())?;
        let tick = scale_ratio(offset, Decimal::from(total), self.range()?)
            .map(|ratio| ratio.round_dp_with_strategy(0, ROUNDING))
            .and_then(|ratio| ratio.to_i64())
            .ok_or_else(|| self.overflow())?;
        Ok(tick.clamp(0, total))
    }

    /// Encode a floating-point value reported by a host
    pub fn encode_f64(&self, value: f64) -> Result<Tick, EncodingError> {
        self.encode(to_decimal(&self.id, value)?)
    }

    /// Actual value at the current tick
    pub fn value(&self) -> Result<Decimal, EncodingError> {
        self.decode(self.tick)
    }

    /// Move the gene to a tick, validating it first
    pub fn set_tick(&mut self, tick: Tick) -> Result<(), EncodingError> {
        self.decode(tick)?;
        self.tick = tick;
        Ok(())
    }

    /// Move the gene to the tick nearest `value`
    pub fn set_value(&mut self, value: Decimal) -> Result<(), EncodingError> {
        self.tick = self.encode(value)?;
        Ok(())
    }
}

/// Decode `tick` against `gene`
pub fn decode(tick: Tick, gene: &Gene) -> Result<Decimal, EncodingError> {
    gene.decode(tick)
}

/// Encode `value` against `gene`
pub fn encode(value: Decimal, gene: &Gene) -> Result<Tick, EncodingError> {
    gene.encode(value)
}

/// `a * b / c`, dividing first when the product does not fit
fn scale_ratio(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    a.checked_mul(b)
        .and_then(|product| product.checked_div(c))
        .or_else(|| a.checked_div(c).and_then(|quotient| quotient.checked_mul(b)))
}

/// `10^decimals` as a decimal
fn decimal_scale(decimals: u32) -> Decimal {
    (0..decimals).fold(Decimal::ONE, |acc, _| acc * Decimal::TEN)
}

fn to_decimal(gene: &str, value: f64) -> Result<Decimal, EncodingError> {
    Decimal::from_f64(value).ok_or_else(|| EncodingError::NonFinite {
        gene: gene.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_integer_gene_ticks() {
        let gene = Gene::new("count", dec("0"), dec("10"), 0).unwrap();
        assert_eq!(gene.total_ticks().unwrap(), 10);
        assert_eq!(gene.decode(5).unwrap(), dec("5"));
        assert_eq!(gene.decode(0).unwrap(), dec("0"));
        assert_eq!(gene.decode(10).unwrap(), dec("10"));
    }

    #[test]
    fn test_decimal_gene_ticks() {
        let gene = Gene::new("angle", dec("-1.5"), dec("2.25"), 2).unwrap();
        assert_eq!(gene.total_ticks().unwrap(), 375);
        assert_eq!(gene.decode(0).unwrap(), dec("-1.5"));
        assert_eq!(gene.decode(150).unwrap(), dec("0"));
        assert_eq!(gene.decode(375).unwrap(), dec("2.25"));
        assert_eq!(gene.encode(dec("0.01")).unwrap(), 151);
    }

    #[test]
    fn test_decode_rejects_out_of_range_ticks() {
        let gene = Gene::new("count", dec("0"), dec("10"), 0).unwrap();
        assert!(matches!(
            gene.decode(-1),
            Err(EncodingError::TickOutOfRange { tick: -1, .. })
        ));
        assert!(matches!(
            gene.decode(11),
            Err(EncodingError::TickOutOfRange { tick: 11, .. })
        ));
    }

    #[test]
    fn test_encode_rounds_to_nearest_tick() {
        let gene = Gene::new("width", dec("0"), dec("1"), 1).unwrap();
        assert_eq!(gene.encode(dec("0.34")).unwrap(), 3);
        assert_eq!(gene.encode(dec("0.36")).unwrap(), 4);
        // Within half a step of the bounds
        assert_eq!(gene.encode(dec("1.04")).unwrap(), 10);
        assert_eq!(gene.encode(dec("-0.04")).unwrap(), 0);
    }

    #[test]
    fn test_encode_rejects_values_outside_bounds() {
        let gene = Gene::new("width", dec("0"), dec("1"), 1).unwrap();
        assert!(matches!(
            gene.encode(dec("1.2")),
            Err(EncodingError::ValueOutOfRange { .. })
        ));
        assert!(gene.encode(dec("-0.5")).is_err());
    }

    #[test]
    fn test_total_ticks_follow_bound_changes() {
        let mut gene = Gene::new("height", dec("0"), dec("10"), 0).unwrap();
        assert_eq!(gene.total_ticks().unwrap(), 10);

        gene.maximum = dec("20");
        assert_eq!(gene.total_ticks().unwrap(), 20);
        assert_eq!(gene.decode(20).unwrap(), dec("20"));

        gene.minimum = dec("30");
        assert!(matches!(
            gene.total_ticks(),
            Err(EncodingError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_degenerate_range() {
        let gene = Gene::new("fixed", dec("3.5"), dec("3.5"), 1).unwrap();
        assert_eq!(gene.total_ticks().unwrap(), 0);
        assert_eq!(gene.decode(0).unwrap(), dec("3.5"));
        assert!(gene.decode(1).is_err());
        assert_eq!(gene.encode(dec("3.5")).unwrap(), 0);
    }

    #[test]
    fn test_wide_gene_round_trips() {
        let gene = Gene::new("span", dec("0"), dec("1000000000000000"), 0).unwrap();
        let total = gene.total_ticks().unwrap();
        assert_eq!(total, 1_000_000_000_000_000);
        assert_eq!(gene.decode(total).unwrap(), gene.maximum);
        assert_eq!(gene.decode(total / 2).unwrap(), dec("500000000000000"));
        assert_eq!(gene.encode(gene.maximum).unwrap(), total);
        assert_eq!(gene.encode(dec("250000000000000")).unwrap(), total / 4);
    }

    #[test]
    fn test_unrepresentable_range_is_an_error() {
        let result = Gene::new("huge", Decimal::MIN, Decimal::MAX, 0);
        assert!(matches!(result, Err(EncodingError::TickOverflow { .. })));
    }

    #[test]
    fn test_unsupported_precision() {
        let result = Gene::new("fine", dec("0"), dec("1"), MAX_DECIMALS + 1);
        assert!(matches!(
            result,
            Err(EncodingError::UnsupportedPrecision { .. })
        ));
    }

    #[test]
    fn test_from_f64_bounds() {
        let gene = Gene::from_f64("radius", 0.5, 2.5, 1).unwrap();
        assert_eq!(gene.total_ticks().unwrap(), 20);
        assert_eq!(gene.encode_f64(1.5).unwrap(), 10);
        assert!(Gene::from_f64("bad", f64::NAN, 1.0, 0).is_err());
    }

    #[test]
    fn test_set_tick_and_value() {
        let mut gene = Gene::new("count", dec("0"), dec("10"), 0).unwrap();
        gene.set_tick(7).unwrap();
        assert_eq!(gene.value().unwrap(), dec("7"));
        assert!(gene.set_tick(12).is_err());
        assert_eq!(gene.tick, 7);

        gene.set_value(dec("2.4")).unwrap();
        assert_eq!(gene.tick, 2);
    }

    #[test]
    fn test_free_function_codec() {
        let gene = Gene::new("count", dec("0"), dec("10"), 0).unwrap();
        assert_eq!(decode(5, &gene).unwrap(), dec("5"));
        assert_eq!(encode(dec("5"), &gene).unwrap(), 5);
    }
}
