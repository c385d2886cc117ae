//! Condition evaluation.
//!
//! Conditions are compiled against a [`ColumnSchema`] before simulation so that
//! every key is known to exist; evaluation itself cannot fail.
//!
//! # Evaluation Semantics
//!
//! - `above` / `below`: strict comparison at the current bar
//! - `equals`: exact float equality
//! - `between`: inclusive on both ends
//! - `crosses_above`: `cur > other && prev <= other_prev`
//! - `crosses_below`: `cur < other && prev >= other_prev`
//! - a literal operand has the same value at the current and previous bar
//! - any NaN among the values read makes the condition false (not yet
//!   evaluable during warm-up)
//! - entry conditions are AND-ed, exit conditions are OR-ed

use crate::domain::condition::{Comparator, Condition, ConditionValue, Operand};
use crate::domain::enriched::{ColumnId, ColumnSchema, EnrichedRow};
use crate::domain::error::BacktestError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ResolvedOperand {
    Literal(f64),
    Column(ColumnId),
}

impl ResolvedOperand {
    fn current(self, row: &EnrichedRow) -> f64 {
        match self {
            ResolvedOperand::Literal(v) => v,
            ResolvedOperand::Column(id) => row.current(id),
        }
    }

    fn previous(self, row: &EnrichedRow) -> f64 {
        match self {
            ResolvedOperand::Literal(v) => v,
            ResolvedOperand::Column(id) => row.previous(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Test {
    Above(ResolvedOperand),
    Below(ResolvedOperand),
    Equals(ResolvedOperand),
    CrossesAbove(ResolvedOperand),
    CrossesBelow(ResolvedOperand),
    Between(ResolvedOperand, ResolvedOperand),
}

/// A condition with every key resolved to a column.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCondition {
    column: ColumnId,
    test: Test,
}

fn resolve(schema: &ColumnSchema, key: &str) -> Result<ColumnId, BacktestError> {
    schema
        .resolve(key)
        .ok_or_else(|| BacktestError::UndeclaredIndicator {
            key: key.to_string(),
        })
}

fn resolve_operand(schema: &ColumnSchema, op: &Operand) -> Result<ResolvedOperand, BacktestError> {
    match op {
        Operand::Literal(v) => Ok(ResolvedOperand::Literal(*v)),
        Operand::IndicatorRef(key) => resolve(schema, key).map(ResolvedOperand::Column),
    }
}

impl CompiledCondition {
    pub fn compile(condition: &Condition, schema: &ColumnSchema) -> Result<Self, BacktestError> {
        let column = resolve(schema, &condition.indicator)?;
        let shape_error = || BacktestError::InvalidOperand {
            comparator: condition.comparator.to_string(),
            reason: "operand shape does not match comparator".to_string(),
        };

        let test = match (&condition.value, condition.comparator) {
            (ConditionValue::Range(lo, hi), Comparator::Between) => Test::Between(
                resolve_operand(schema, lo)?,
                resolve_operand(schema, hi)?,
            ),
            (ConditionValue::Single(op), comparator) => {
                let op = resolve_operand(schema, op)?;
                match comparator {
                    Comparator::Above => Test::Above(op),
                    Comparator::Below => Test::Below(op),
                    Comparator::Equals => Test::Equals(op),
                    Comparator::CrossesAbove => Test::CrossesAbove(op),
                    Comparator::CrossesBelow => Test::CrossesBelow(op),
                    Comparator::Between => return Err(shape_error()),
                }
            }
            (ConditionValue::Range(..), _) => return Err(shape_error()),
        };

        Ok(Self { column, test })
    }

    /// Evaluate against one enriched row. Non-finite inputs yield `false`.
    pub fn evaluate(&self, row: &EnrichedRow) -> bool {
        let cur = row.current(self.column);
        if !cur.is_finite() {
            return false;
        }

        match self.test {
            Test::Above(op) => {
                let other = op.current(row);
                other.is_finite() && cur > other
            }
            Test::Below(op) => {
                let other = op.current(row);
                other.is_finite() && cur < other
            }
            Test::Equals(op) => {
                let other = op.current(row);
                other.is_finite() && cur == other
            }
            Test::Between(lo, hi) => {
                let (lo, hi) = (lo.current(row), hi.current(row));
                lo.is_finite() && hi.is_finite() && cur >= lo && cur <= hi
            }
            Test::CrossesAbove(op) | Test::CrossesBelow(op) => {
                let prev = row.previous(self.column);
                let other = op.current(row);
                let other_prev = op.previous(row);
                if !(prev.is_finite() && other.is_finite() && other_prev.is_finite()) {
                    return false;
                }
                if matches!(self.test, Test::CrossesAbove(_)) {
                    cur > other && prev <= other_prev
                } else {
                    cur < other && prev >= other_prev
                }
            }
        }
    }
}

/// Compiled entry and exit condition lists of a strategy.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    entry: Vec<CompiledCondition>,
    exit: Vec<CompiledCondition>,
}

impl CompiledRules {
    pub fn compile(
        entry: &[Condition],
        exit: &[Condition],
        schema: &ColumnSchema,
    ) -> Result<Self, BacktestError> {
        let compile_all = |conditions: &[Condition]| {
            conditions
                .iter()
                .map(|c| CompiledCondition::compile(c, schema))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            entry: compile_all(entry)?,
            exit: compile_all(exit)?,
        })
    }

    /// True only if every entry condition holds. An empty list never fires.
    pub fn entry_signal(&self, row: &EnrichedRow) -> bool {
        !self.entry.is_empty() && self.entry.iter().all(|c| c.evaluate(row))
    }

    /// True if any exit condition holds.
    pub fn exit_signal(&self, row: &EnrichedRow) -> bool {
        self.exit.iter().any(|c| c.evaluate(row))
    }

    pub fn has_exit_conditions(&self) -> bool {
        !self.exit.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition_parser::parse_conditions;
    use crate::domain::enriched::ColumnPair;
    use crate::domain::ohlcv::Bar;
    use chrono::NaiveDate;

    fn schema() -> ColumnSchema {
        let mut schema = ColumnSchema::new();
        schema.add_column("fast").unwrap();
        schema.add_column("slow").unwrap();
        schema
    }

    /// Row with close = 10 and the given (current, previous) for fast/slow.
    fn row(fast: (f64, f64), slow: (f64, f64)) -> EnrichedRow {
        let bar = Bar {
            symbol: "T".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 100.0,
        };
        let pair = |(current, previous): (f64, f64)| ColumnPair { current, previous };
        let mut values: Vec<ColumnPair> = (0..5).map(|_| pair((10.0, 10.0))).collect();
        values.push(pair(fast));
        values.push(pair(slow));
        EnrichedRow::new(bar, values)
    }

    fn compile(c: Condition) -> CompiledCondition {
        CompiledCondition::compile(&c, &schema()).unwrap()
    }

    #[test]
    fn crosses_above_requires_transition() {
        let c = compile(Condition::single("fast", Comparator::CrossesAbove, "slow").unwrap());
        assert!(c.evaluate(&row((101.0, 99.0), (100.0, 100.0))));
        // already above on the previous bar
        assert!(!c.evaluate(&row((102.0, 101.0), (100.0, 100.0))));
        // touching then crossing counts
        assert!(c.evaluate(&row((101.0, 100.0), (100.0, 100.0))));
    }

    #[test]
    fn crosses_below() {
        let c = compile(Condition::single("fast", Comparator::CrossesBelow, "slow").unwrap());
        assert!(c.evaluate(&row((99.0, 101.0), (100.0, 100.0))));
        assert!(!c.evaluate(&row((99.0, 98.0), (100.0, 100.0))));
    }

    #[test]
    fn crossing_against_literal() {
        let c = compile(Condition::single("fast", Comparator::CrossesAbove, 50.0).unwrap());
        assert!(c.evaluate(&row((51.0, 49.0), (0.0, 0.0))));
        assert!(!c.evaluate(&row((51.0, 50.5), (0.0, 0.0))));
    }

    #[test]
    fn crossing_false_on_first_bar() {
        let c = compile(Condition::single("fast", Comparator::CrossesAbove, "slow").unwrap());
        assert!(!c.evaluate(&row((101.0, f64::NAN), (100.0, f64::NAN))));
    }

    #[test]
    fn above_below_strict() {
        let above = compile(Condition::single("fast", Comparator::Above, 10.0).unwrap());
        let below = compile(Condition::single("fast", Comparator::Below, 10.0).unwrap());
        assert!(!above.evaluate(&row((10.0, 0.0), (0.0, 0.0))));
        assert!(!below.evaluate(&row((10.0, 0.0), (0.0, 0.0))));
        assert!(above.evaluate(&row((10.5, 0.0), (0.0, 0.0))));
        assert!(below.evaluate(&row((9.5, 0.0), (0.0, 0.0))));
    }

    #[test]
    fn between_inclusive() {
        let c = compile(Condition::between("fast", 30.0, 70.0).unwrap());
        assert!(c.evaluate(&row((30.0, 0.0), (0.0, 0.0))));
        assert!(c.evaluate(&row((70.0, 0.0), (0.0, 0.0))));
        assert!(!c.evaluate(&row((70.1, 0.0), (0.0, 0.0))));
    }

    #[test]
    fn between_with_indicator_bound() {
        let c = compile(Condition::between("close", 5.0, "slow").unwrap());
        assert!(c.evaluate(&row((0.0, 0.0), (12.0, 0.0))));
        assert!(!c.evaluate(&row((0.0, 0.0), (9.0, 0.0))));
    }

    #[test]
    fn equals_is_exact() {
        let c = compile(Condition::single("fast", Comparator::Equals, "slow").unwrap());
        assert!(c.evaluate(&row((1.5, 0.0), (1.5, 0.0))));
        assert!(!c.evaluate(&row((1.5, 0.0), (1.5 + 1e-12, 0.0))));
    }

    #[test]
    fn nan_is_never_true() {
        let warm = row((f64::NAN, f64::NAN), (f64::NAN, f64::NAN));
        for comparator in [
            Comparator::Above,
            Comparator::Below,
            Comparator::Equals,
            Comparator::CrossesAbove,
            Comparator::CrossesBelow,
        ] {
            let c = compile(Condition::single("fast", comparator, "slow").unwrap());
            assert!(!c.evaluate(&warm), "{comparator}");
        }
        let c = compile(Condition::between("fast", 0.0, 1.0).unwrap());
        assert!(!c.evaluate(&warm));
    }

    #[test]
    fn undeclared_key_rejected() {
        let c = Condition::single("ema_200", Comparator::Above, 1.0).unwrap();
        let err = CompiledCondition::compile(&c, &schema()).unwrap_err();
        assert!(matches!(err, BacktestError::UndeclaredIndicator { key } if key == "ema_200"));

        let c = Condition::single("fast", Comparator::Above, "missing").unwrap();
        assert!(CompiledCondition::compile(&c, &schema()).is_err());
    }

    #[test]
    fn bare_macd_crossing_reads_signal_column() {
        let mut schema = ColumnSchema::new();
        schema.add_column("macd").unwrap();
        schema.add_column("macd_signal").unwrap();
        let conditions = parse_conditions("macd crosses_above").unwrap();
        let rules = CompiledRules::compile(&conditions, &[], &schema).unwrap();

        // line (fast slot) moves from below to above the signal (slow slot)
        assert!(rules.entry_signal(&row((0.5, -0.2), (0.1, 0.0))));
        assert!(!rules.entry_signal(&row((0.5, 0.3), (0.1, 0.0))));

        let err = CompiledRules::compile(&conditions, &[], &ColumnSchema::new()).unwrap_err();
        assert!(matches!(err, BacktestError::UndeclaredIndicator { key } if key == "macd"));
    }

    #[test]
    fn entry_all_exit_any() {
        let entry = vec![
            Condition::single("fast", Comparator::Above, 1.0).unwrap(),
            Condition::single("slow", Comparator::Above, 1.0).unwrap(),
        ];
        let exit = entry.clone();
        let rules = CompiledRules::compile(&entry, &exit, &schema()).unwrap();

        let both = row((2.0, 0.0), (2.0, 0.0));
        let one = row((2.0, 0.0), (0.0, 0.0));
        let none = row((0.0, 0.0), (0.0, 0.0));

        assert!(rules.entry_signal(&both));
        assert!(!rules.entry_signal(&one));
        assert!(rules.exit_signal(&one));
        assert!(!rules.exit_signal(&none));
    }

    #[test]
    fn empty_lists() {
        let rules = CompiledRules::compile(&[], &[], &schema()).unwrap();
        let r = row((1.0, 1.0), (1.0, 1.0));
        assert!(!rules.entry_signal(&r));
        assert!(!rules.exit_signal(&r));
        assert!(!rules.has_exit_conditions());
    }
}
