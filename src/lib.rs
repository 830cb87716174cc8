mod io;
mod config;
mod network;
mod analyzer;
mod vna;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A reply that should have contained numbers could not be parsed.
    Parse(String),
    /// The instrument replied with something outside its documented vocabulary.
    UnexpectedReply { expected: &'static str, reply: String },
    /// A setting lies outside the range the instrument accepts.
    OutOfRange { param: &'static str, value: f64 },
    /// Malformed IEEE 488.2 definite-length block framing.
    BlockFormat(&'static str),
    /// A binary trace did not match the point count the instrument reported.
    TraceLength { expected: usize, actual: usize },
    Other(Box<dyn std::error::Error + Sync + Send + 'static>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(io_error) =>
                write!(f, "I/O error: {}", io_error),
            Self::Parse(reply) =>
                write!(f, "cannot parse reply: {:?}", reply),
            Self::UnexpectedReply { expected, reply } =>
                write!(f, "expected {}, instrument replied {:?}", expected, reply),
            Self::OutOfRange { param, value } =>
                write!(f, "{} out of range: {}", param, value),
            Self::BlockFormat(reason) =>
                write!(f, "malformed binary block: {}", reason),
            Self::TraceLength { expected, actual } =>
                write!(f, "trace has {} points, sweep has {}", actual, expected),
            Self::Other(error) =>
                write!(f, "{}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            &Self::Io(ref io_error) => Some(io_error),
            _ => None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(error: std::num::ParseFloatError) -> Self {
        Error::Parse(error.to_string())
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use io::{Transport, FloatFormat};

#[cfg(feature = "hardware")]
pub use io::visa::VisaTransport;

pub use config::{
    Channel,
    Function,
    OutputMode,
    Spacing,
    IntegrationTime,
    ChannelConfig,
    SweepSetup,
};

pub use analyzer::{
    Spa415x,
    OperatingMode,
    Measurement,
};

pub use vna::{
    Anritsu37xx,
    IfBandwidth,
};

pub use network::TwoPortNetwork;

/// Parameter analyzer bound to the VISA transport.
#[cfg(feature = "hardware")]
pub type Spa = analyzer::Spa415x<io::visa::VisaTransport>;

/// Network analyzer bound to the VISA transport.
#[cfg(feature = "hardware")]
pub type Vna = vna::Anritsu37xx<io::visa::VisaTransport>;
