use thiserror::Error;

/// Coarse classification of [`TdoaError`] variants.
///
/// Callers that only need to know *what class* of failure occurred (bad input,
/// bad configuration, unsolvable geometry) match on this instead of on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: wrong argument count, non-numeric or non-finite value.
    Input,
    /// Invalid solve setup or tuning parameter.
    Configuration,
    /// Singular or non-converging geometry, or non-finite numerical output.
    DegenerateGeometry,
}

#[derive(Error, Debug)]
pub enum TdoaError {
    #[error("Expected {expected} arguments, got {got}")]
    InvalidArgumentCount { expected: String, got: usize },

    #[error("Argument {position} is not a number: {value:?}")]
    NonNumericArgument { position: usize, value: String },

    #[error("Argument {position} is not finite: {value}")]
    NonFiniteArgument { position: usize, value: f64 },

    #[error("Invalid station coordinate for station {station}: {reason}")]
    InvalidStationCoordinate { station: usize, reason: String },

    #[error("At least {required} stations are required for this solve, got {got}")]
    NotEnoughStations { required: usize, got: usize },

    #[error("Station subset is inconsistent: {0}")]
    InvalidStationSubset(String),

    #[error("Invalid locator parameter: {0}")]
    InvalidLocatorParameter(String),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Root finding error: {0}")]
    RootFindingError(#[from] roots::SearchError),

    #[error("JSON encoding error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal failure while locating: {0}")]
    InternalFailure(String),
}

impl TdoaError {
    /// Map this error onto the [`ErrorKind`] taxonomy.
    ///
    /// Root-finding failures, encoding failures and internal failures all
    /// belong to the degenerate-geometry class: they only arise when the
    /// numerical problem itself is ill-posed.
    pub fn kind(&self) -> ErrorKind {
        use TdoaError::*;
        match self {
            InvalidArgumentCount { .. }
            | NonNumericArgument { .. }
            | NonFiniteArgument { .. }
            | InvalidStationCoordinate { .. } => ErrorKind::Input,
            NotEnoughStations { .. } | InvalidStationSubset(_) | InvalidLocatorParameter(_) => {
                ErrorKind::Configuration
            }
            DegenerateGeometry(_) | RootFindingError(_) | JsonError(_) | InternalFailure(_) => {
                ErrorKind::DegenerateGeometry
            }
        }
    }
}

impl PartialEq for TdoaError {
    fn eq(&self, other: &Self) -> bool {
        use TdoaError::*;
        match (self, other) {
            (
                InvalidArgumentCount {
                    expected: a,
                    got: b,
                },
                InvalidArgumentCount {
                    expected: c,
                    got: d,
                },
            ) => a == c && b == d,
            (
                NonNumericArgument {
                    position: a,
                    value: b,
                },
                NonNumericArgument {
                    position: c,
                    value: d,
                },
            ) => a == c && b == d,
            (
                NonFiniteArgument {
                    position: a,
                    value: b,
                },
                NonFiniteArgument {
                    position: c,
                    value: d,
                },
            ) => a == c && (b == d || (b.is_nan() && d.is_nan())),
            (
                InvalidStationCoordinate {
                    station: a,
                    reason: b,
                },
                InvalidStationCoordinate {
                    station: c,
                    reason: d,
                },
            ) => a == c && b == d,
            (
                NotEnoughStations {
                    required: a,
                    got: b,
                },
                NotEnoughStations {
                    required: c,
                    got: d,
                },
            ) => a == c && b == d,
            (InvalidStationSubset(a), InvalidStationSubset(b)) => a == b,
            (InvalidLocatorParameter(a), InvalidLocatorParameter(b)) => a == b,
            (DegenerateGeometry(a), DegenerateGeometry(b)) => a == b,
            (RootFindingError(a), RootFindingError(b)) => a == b,
            (InternalFailure(a), InternalFailure(b)) => a == b,

            // serde_json errors carry no comparable payload: same variant is enough
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}
