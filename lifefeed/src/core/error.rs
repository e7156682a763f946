use thiserror::Error;

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum DecodeError {
    #[error("missing generation counter")]
    MissingCounter,
    #[error("invalid generation counter '{0}'")]
    InvalidCounter(String),
    #[error("malformed world document: {0}")]
    Malformed(String),
    #[error("world is {width}x{height} but row {row} has {found} cells")]
    RowWidth {
        width: usize,
        height: usize,
        row: usize,
        found: usize,
    },
    #[error("world height is {expected} but {found} rows were sent")]
    RowCount { expected: usize, found: usize },
    #[error("unknown cell state '{0}'")]
    CellState(char),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server responded with status {status}")]
    Status { status: u16 },
    #[error("could not read response body: {0}")]
    Body(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse config '{path}': {reason}")]
    Parse { path: String, reason: String },
    #[error("invalid feed url '{url}': {reason}")]
    Url { url: String, reason: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("invalid value '{value}' for {name}")]
    Env { name: String, value: String },
}
