//! Seeded random-walk bar generator.
//!
//! Deterministic for a given (seed, symbol, timeframe, range). Weekends are
//! skipped for daily and intraday timeframes; intraday bars start at 09:30 and
//! stop before 16:00.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::Bar;
use crate::domain::timeframe::{TRADING_DAYS_PER_YEAR, Timeframe};
use crate::ports::data_port::DataPort;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest absolute daily return drawn by the walk.
const DAILY_RETURN_RANGE: f64 = 0.03;

pub struct SyntheticAdapter {
    seed: u64,
    timeframe: Timeframe,
    start_price: f64,
}

impl SyntheticAdapter {
    pub fn new(seed: u64, timeframe: Timeframe, start_price: f64) -> Self {
        Self {
            seed,
            timeframe,
            start_price,
        }
    }

    /// Mix the symbol into the seed so symbols get distinct walks.
    fn symbol_seed(&self, symbol: &str) -> u64 {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in symbol.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        hash ^ self.seed
    }

    fn timestamps(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDateTime> {
        let step = self.timeframe.step();
        let intraday = step < chrono::Duration::days(1);
        let skip_weekends = step <= chrono::Duration::days(1);
        let mut stamps = Vec::new();

        if intraday {
            let (Some(open), Some(close)) = (
                NaiveTime::from_hms_opt(9, 30, 0),
                NaiveTime::from_hms_opt(16, 0, 0),
            ) else {
                return stamps;
            };
            let mut day = start;
            while day <= end {
                if !is_weekend(day) {
                    let mut ts = day.and_time(open);
                    let session_end = day.and_time(close);
                    while ts < session_end {
                        stamps.push(ts);
                        ts += step;
                    }
                }
                let Some(next) = day.succ_opt() else { break };
                day = next;
            }
            return stamps;
        }

        let Some(mut ts) = start.and_hms_opt(0, 0, 0) else {
            return stamps;
        };
        while ts.date() <= end {
            if !(skip_weekends && is_weekend(ts.date())) {
                stamps.push(ts);
            }
            ts += step;
        }
        stamps
    }

    pub fn generate(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        let scale = (TRADING_DAYS_PER_YEAR / self.timeframe.periods_per_year()).sqrt();
        let range = DAILY_RETURN_RANGE * scale;
        let mut price = self.start_price;

        let bars: Vec<Bar> = self
            .timestamps(start, end)
            .into_iter()
            .map(|timestamp| {
                let bar_return: f64 = rng.gen_range(-range..range);
                let open = price;
                let close = (price * (1.0 + bar_return)).max(0.01);
                let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
                let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
                let volume = rng.gen_range(500_000..5_000_000u64) as f64;
                price = close;
                Bar {
                    symbol: symbol.to_string(),
                    timestamp,
                    open,
                    high,
                    low,
                    close,
                    volume,
                }
            })
            .collect();
        debug!(
            "generated {} synthetic {} bars for {symbol}",
            bars.len(),
            self.timeframe
        );
        bars
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

impl DataPort for SyntheticAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<Bar>, BacktestError> {
        Ok(self.generate(symbol, start_date, end_date))
    }
}
