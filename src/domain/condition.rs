//! Declarative entry/exit conditions.
//!
//! A condition compares one indicator key against either a numeric literal,
//! another indicator key, or (for `between`) an inclusive pair of either.
//! Keys are stored lowercased.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Above,
    Below,
    Between,
    CrossesAbove,
    CrossesBelow,
    Equals,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Above,
        Comparator::Below,
        Comparator::Between,
        Comparator::CrossesAbove,
        Comparator::CrossesBelow,
        Comparator::Equals,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Above => "above",
            Comparator::Below => "below",
            Comparator::Between => "between",
            Comparator::CrossesAbove => "crosses_above",
            Comparator::CrossesBelow => "crosses_below",
            Comparator::Equals => "equals",
        }
    }

    pub fn is_crossing(self) -> bool {
        matches!(self, Comparator::CrossesAbove | Comparator::CrossesBelow)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Comparator::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or(BacktestError::UnknownComparator { name: lowered })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    IndicatorRef(String),
}

impl Operand {
    pub fn indicator(key: &str) -> Self {
        Operand::IndicatorRef(key.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::IndicatorRef(key) => f.write_str(key),
        }
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Literal(v)
    }
}

impl From<&str> for Operand {
    fn from(key: &str) -> Self {
        Operand::indicator(key)
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Single(Operand),
    Range(Operand, Operand),
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionValue::Single(op) => write!(f, "{op}"),
            ConditionValue::Range(lo, hi) => write!(f, "[{lo}, {hi}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub indicator: String,
    pub comparator: Comparator,
    pub value: ConditionValue,
}

impl Condition {
    /// Build a condition, checking that the value shape fits the comparator:
    /// `between` takes a range, everything else a single operand.
    pub fn new(
        indicator: &str,
        comparator: Comparator,
        value: ConditionValue,
    ) -> Result<Self, BacktestError> {
        let shape_ok = match (&value, comparator) {
            (ConditionValue::Range(..), Comparator::Between) => true,
            (ConditionValue::Single(_), Comparator::Between) => false,
            (ConditionValue::Range(..), _) => false,
            (ConditionValue::Single(_), _) => true,
        };
        if !shape_ok {
            let reason = if comparator == Comparator::Between {
                "expected a [lower, upper] pair"
            } else {
                "expected a single value"
            };
            return Err(BacktestError::InvalidOperand {
                comparator: comparator.to_string(),
                reason: reason.to_string(),
            });
        }
        for op in value.operands() {
            if let Operand::Literal(v) = op {
                if !v.is_finite() {
                    return Err(BacktestError::InvalidOperand {
                        comparator: comparator.to_string(),
                        reason: format!("literal {v} is not finite"),
                    });
                }
            }
        }
        Ok(Self {
            indicator: indicator.trim().to_ascii_lowercase(),
            comparator,
            value,
        })
    }

    pub fn single(
        indicator: &str,
        comparator: Comparator,
        operand: impl Into<Operand>,
    ) -> Result<Self, BacktestError> {
        Self::new(indicator, comparator, ConditionValue::Single(operand.into()))
    }

    pub fn between(
        indicator: &str,
        lower: impl Into<Operand>,
        upper: impl Into<Operand>,
    ) -> Result<Self, BacktestError> {
        Self::new(
            indicator,
            Comparator::Between,
            ConditionValue::Range(lower.into(), upper.into()),
        )
    }
}

impl ConditionValue {
    fn operands(&self) -> Vec<&Operand> {
        match self {
            ConditionValue::Single(op) => vec![op],
            ConditionValue::Range(lo, hi) => vec![lo, hi],
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.indicator, self.comparator, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparator_parse_case_insensitive() {
        assert_eq!("ABOVE".parse::<Comparator>().unwrap(), Comparator::Above);
        assert_eq!(
            "crosses_above".parse::<Comparator>().unwrap(),
            Comparator::CrossesAbove
        );
    }

    #[test]
    fn unknown_comparator() {
        let err = "greater_than".parse::<Comparator>().unwrap_err();
        assert!(matches!(err, BacktestError::UnknownComparator { name } if name == "greater_than"));
    }

    #[test]
    fn keys_are_lowercased() {
        let c = Condition::single("EMA_5", Comparator::CrossesAbove, "EMA_20").unwrap();
        assert_eq!(c.indicator, "ema_5");
        assert_eq!(c.value, ConditionValue::Single(Operand::IndicatorRef("ema_20".into())));
    }

    #[test]
    fn between_requires_range() {
        let err = Condition::single("rsi", Comparator::Between, 30.0).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidOperand { .. }));

        let err = Condition::new(
            "rsi",
            Comparator::Above,
            ConditionValue::Range(Operand::Literal(1.0), Operand::Literal(2.0)),
        )
        .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidOperand { .. }));
    }

    #[test]
    fn non_finite_literal_rejected() {
        assert!(Condition::single("rsi", Comparator::Above, f64::NAN).is_err());
    }

    #[test]
    fn display() {
        let c = Condition::between("rsi", 30.0, "bb_upper").unwrap();
        assert_eq!(c.to_string(), "rsi between [30, bb_upper]");
        let c = Condition::single("close", Comparator::Below, 10.5).unwrap();
        assert_eq!(c.to_string(), "close below 10.5");
    }
}
