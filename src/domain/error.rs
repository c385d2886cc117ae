//! Domain error types.

/// A parse error with position information for condition and indicator text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    /// `position` is a byte offset; the caret column counts characters.
    pub fn display_with_context(&self, input: &str) -> String {
        let column = input
            .get(..self.position)
            .map_or(self.position, |prefix| prefix.chars().count());
        let caret = " ".repeat(column) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Violations of the portfolio's calling contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortfolioError {
    #[error("no open position for {symbol}")]
    NoOpenPosition { symbol: String },

    #[error("position already open for {symbol}")]
    PositionAlreadyOpen { symbol: String },
}

/// Top-level error type for signalbench.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("unknown indicator '{name}'")]
    UnknownIndicator { name: String },

    #[error("invalid parameter '{param}' for indicator {indicator}: {reason}")]
    InvalidIndicatorParam {
        indicator: String,
        param: String,
        reason: String,
    },

    #[error("unknown comparator '{name}'")]
    UnknownComparator { name: String },

    #[error("condition references undeclared indicator '{key}'")]
    UndeclaredIndicator { key: String },

    #[error("invalid operand for {comparator}: {reason}")]
    InvalidOperand { comparator: String, reason: String },

    #[error("column '{column}' is produced by more than one indicator")]
    DuplicateColumn { column: String },

    #[error("strategy '{strategy}' has no entry conditions")]
    EmptyEntryConditions { strategy: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("bar {index} of {symbol} is not after its predecessor ({timestamp})")]
    NonMonotonicTimestamp {
        symbol: String,
        index: usize,
        timestamp: String,
    },

    #[error("bar {index} of {symbol} has a non-finite {field}")]
    InvalidBar {
        symbol: String,
        index: usize,
        field: &'static str,
    },

    #[error("bar {index} belongs to {found}, expected {expected}")]
    SymbolMismatch {
        expected: String,
        found: String,
        index: usize,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("backtest cancelled")]
    Cancelled,

    #[error(transparent)]
    Portfolio(#[from] PortfolioError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// True for errors raised while validating a strategy or configuration,
    /// before any bar is simulated.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BacktestError::UnknownIndicator { .. }
                | BacktestError::InvalidIndicatorParam { .. }
                | BacktestError::UnknownComparator { .. }
                | BacktestError::UndeclaredIndicator { .. }
                | BacktestError::InvalidOperand { .. }
                | BacktestError::DuplicateColumn { .. }
                | BacktestError::EmptyEntryConditions { .. }
                | BacktestError::ConfigParse { .. }
                | BacktestError::ConfigMissing { .. }
                | BacktestError::ConfigInvalid { .. }
                | BacktestError::ConditionParse(_)
        )
    }

    /// True for malformed or missing market data.
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            BacktestError::NoData { .. }
                | BacktestError::NonMonotonicTimestamp { .. }
                | BacktestError::InvalidBar { .. }
                | BacktestError::SymbolMismatch { .. }
                | BacktestError::DataSource { .. }
        )
    }
}

fn outcome(cause: &BacktestError) -> &'static str {
    match cause {
        BacktestError::Cancelled => "cancelled",
        _ => "failed",
    }
}

/// A failed or cancelled run, identified by its run id.
#[derive(Debug, thiserror::Error)]
#[error("backtest run '{run_id}' {}: {cause}", outcome(.cause))]
pub struct RunError {
    pub run_id: String,
    #[source]
    pub cause: BacktestError,
}

impl RunError {
    pub fn new(run_id: impl Into<String>, cause: BacktestError) -> Self {
        Self {
            run_id: run_id.into(),
            cause,
        }
    }

    /// Cancellation is reported through the same channel but is not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause, BacktestError::Cancelled)
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Serialization(_) => 1,
            BacktestError::ConditionParse(_) => 4,
            BacktestError::Cancelled => 6,
            BacktestError::Portfolio(_) => 7,
            e if e.is_configuration() => 2,
            e if e.is_data() => 5,
            _ => 1,
        };
        std::process::ExitCode::from(code)
    }
}
