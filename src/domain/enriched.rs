//! Indicator pipeline: turns a symbol's bars into enriched rows.
//!
//! Every row carries, for each column, its value at this bar and at the
//! previous bar of the same symbol (`NaN` on the first bar). Columns are
//! addressed by [`ColumnId`], resolved once from lowercase keys through the
//! [`ColumnSchema`], so evaluation never does string lookups.

use log::{debug, info};
use std::collections::HashMap;

use crate::domain::error::BacktestError;
use crate::domain::indicator::{IndicatorKind, IndicatorSpec};
use crate::domain::ohlcv::{Bar, validate_series};

/// Price columns present in every schema, in this order.
pub const PRICE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(usize);

impl ColumnId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Maps lowercase keys (names and aliases) to column positions.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    names: Vec<String>,
    lookup: HashMap<String, ColumnId>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnSchema {
    /// A schema holding only the price columns.
    pub fn new() -> Self {
        let mut schema = Self {
            names: Vec::new(),
            lookup: HashMap::new(),
        };
        for name in PRICE_COLUMNS {
            let id = ColumnId(schema.names.len());
            schema.names.push(name.to_string());
            schema.lookup.insert(name.to_string(), id);
        }
        schema
    }

    pub fn add_column(&mut self, name: &str) -> Result<ColumnId, BacktestError> {
        let key = name.trim().to_ascii_lowercase();
        if self.lookup.contains_key(&key) {
            return Err(BacktestError::DuplicateColumn { column: key });
        }
        let id = ColumnId(self.names.len());
        self.names.push(key.clone());
        self.lookup.insert(key, id);
        Ok(id)
    }

    /// Register `alias` for an existing column unless the key is taken.
    pub fn add_alias(&mut self, alias: &str, id: ColumnId) -> bool {
        let key = alias.trim().to_ascii_lowercase();
        if self.lookup.contains_key(&key) {
            return false;
        }
        self.lookup.insert(key, id);
        true
    }

    pub fn resolve(&self, key: &str) -> Option<ColumnId> {
        self.lookup.get(&key.trim().to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every resolvable key, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.lookup.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnPair {
    pub current: f64,
    pub previous: f64,
}

#[derive(Debug, Clone)]
pub struct EnrichedRow {
    pub bar: Bar,
    values: Vec<ColumnPair>,
}

impl EnrichedRow {
    pub fn new(bar: Bar, values: Vec<ColumnPair>) -> Self {
        Self { bar, values }
    }

    /// Value at this bar; NaN for an unknown column.
    pub fn current(&self, id: ColumnId) -> f64 {
        self.values.get(id.0).map_or(f64::NAN, |p| p.current)
    }

    /// Value at the previous bar of the same symbol; NaN on the first bar.
    pub fn previous(&self, id: ColumnId) -> f64 {
        self.values.get(id.0).map_or(f64::NAN, |p| p.previous)
    }
}

/// One symbol's enriched rows in timestamp order.
#[derive(Debug, Clone)]
pub struct EnrichedSeries {
    pub symbol: String,
    pub rows: Vec<EnrichedRow>,
}

/// Resolved indicator set plus the column schema it produces.
#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    kinds: Vec<IndicatorKind>,
    schema: ColumnSchema,
}

impl IndicatorPipeline {
    /// Resolve every declared indicator and lay out the columns. Unknown
    /// names, bad parameters and column collisions fail here, once, before
    /// any data is touched.
    pub fn new(specs: &[IndicatorSpec]) -> Result<Self, BacktestError> {
        let kinds = specs
            .iter()
            .map(IndicatorKind::from_spec)
            .collect::<Result<Vec<_>, _>>()?;

        let mut schema = ColumnSchema::new();
        let mut alias_counts: HashMap<String, usize> = HashMap::new();
        let mut pending_aliases = Vec::new();
        for kind in &kinds {
            for column in kind.columns() {
                let id = schema.add_column(&column.name)?;
                if let Some(alias) = column.alias {
                    *alias_counts.entry(alias.clone()).or_default() += 1;
                    pending_aliases.push((alias, id));
                }
            }
        }
        for (alias, id) in pending_aliases {
            if alias_counts.get(&alias) == Some(&1) {
                schema.add_alias(&alias, id);
            }
        }

        debug!("indicator columns: {}", schema.keys().join(", "));
        Ok(Self { kinds, schema })
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn kinds(&self) -> &[IndicatorKind] {
        &self.kinds
    }

    /// Validate the bars and build enriched rows for one symbol. The previous
    /// values never cross into another symbol because each call sees a single
    /// symbol's series.
    pub fn enrich(&self, symbol: &str, bars: &[Bar]) -> Result<EnrichedSeries, BacktestError> {
        validate_series(symbol, bars)?;

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(self.schema.len());
        columns.push(bars.iter().map(|b| b.open).collect());
        columns.push(bars.iter().map(|b| b.high).collect());
        columns.push(bars.iter().map(|b| b.low).collect());
        columns.push(bars.iter().map(|b| b.close).collect());
        columns.push(bars.iter().map(|b| b.volume).collect());
        for kind in &self.kinds {
            columns.extend(kind.calculate(bars).column_values());
        }

        let rows = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| {
                let values = columns
                    .iter()
                    .map(|column| ColumnPair {
                        current: column[i],
                        previous: if i == 0 { f64::NAN } else { column[i - 1] },
                    })
                    .collect();
                EnrichedRow::new(bar.clone(), values)
            })
            .collect();

        info!(
            "{symbol}: computed {} indicator(s) over {} bars",
            self.kinds.len(),
            bars.len()
        );
        Ok(EnrichedSeries {
            symbol: symbol.to_string(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    fn ema(period: f64) -> IndicatorSpec {
        IndicatorSpec::new("ema").with_param("period", period)
    }

    #[test]
    fn schema_has_price_columns() {
        let schema = ColumnSchema::new();
        for name in PRICE_COLUMNS {
            assert!(schema.resolve(name).is_some());
        }
        assert_eq!(schema.resolve("CLOSE"), schema.resolve("close"));
    }

    #[test]
    fn duplicate_column_rejected() {
        let err = IndicatorPipeline::new(&[ema(5.0), ema(5.0)]).unwrap_err();
        assert!(matches!(err, BacktestError::DuplicateColumn { column } if column == "ema_5"));
    }

    #[test]
    fn alias_only_when_unique() {
        let pipeline = IndicatorPipeline::new(&[ema(5.0), ema(20.0), IndicatorSpec::new("rsi")])
            .unwrap();
        let schema = pipeline.schema();
        assert!(schema.resolve("ema_5").is_some());
        assert!(schema.resolve("ema_20").is_some());
        assert!(schema.resolve("ema").is_none());
        assert_eq!(schema.resolve("rsi"), schema.resolve("rsi_14"));
    }

    #[test]
    fn bbands_keys() {
        let pipeline = IndicatorPipeline::new(&[IndicatorSpec::new("bbands")]).unwrap();
        let schema = pipeline.schema();
        assert_eq!(schema.resolve("lowerband"), schema.resolve("bb_lower"));
        assert!(schema.resolve("bb_upper").is_some());
        assert!(schema.resolve("bb_middle").is_some());
    }

    #[test]
    fn unknown_indicator_reported_at_construction() {
        let err = IndicatorPipeline::new(&[IndicatorSpec::new("nope")]).unwrap_err();
        assert!(matches!(err, BacktestError::UnknownIndicator { .. }));
    }

    #[test]
    fn previous_is_shifted_by_one() {
        let pipeline = IndicatorPipeline::new(&[IndicatorSpec::new("sma").with_param("period", 2.0)])
            .unwrap();
        let bars = make_bars(&[1.0, 3.0, 5.0, 7.0]);
        let series = pipeline.enrich("TEST", &bars).unwrap();
        let sma = pipeline.schema().resolve("sma_2").unwrap();
        let close = pipeline.schema().resolve("close").unwrap();

        assert_eq!(series.rows.len(), 4);
        assert!(series.rows[0].previous(close).is_nan());
        assert!((series.rows[1].previous(close) - 1.0).abs() < f64::EPSILON);

        assert!(series.rows[0].current(sma).is_nan());
        assert!((series.rows[1].current(sma) - 2.0).abs() < f64::EPSILON);
        assert!(series.rows[1].previous(sma).is_nan());
        assert!((series.rows[2].previous(sma) - 2.0).abs() < f64::EPSILON);
        assert!((series.rows[3].current(sma) - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn enrich_rejects_bad_data() {
        let pipeline = IndicatorPipeline::new(&[]).unwrap();
        let mut bars = make_bars(&[1.0, 2.0]);
        bars[1].timestamp = bars[0].timestamp;
        let err = pipeline.enrich("TEST", &bars).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn unknown_column_reads_nan() {
        let pipeline = IndicatorPipeline::new(&[]).unwrap();
        let series = pipeline.enrich("TEST", &make_bars(&[1.0])).unwrap();
        assert!(series.rows[0].current(ColumnId(99)).is_nan());
    }
}
