use std::net::SocketAddr;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by the hardware access layer.
#[derive(Debug)]
pub struct GatewayError(String);

impl From<&str> for GatewayError {
    fn from(error_message: &str) -> Self {
        Self(error_message.to_string())
    }
}

impl From<String> for GatewayError {
    fn from(error_message: String) -> Self {
        Self(error_message)
    }
}

impl std::error::Error for GatewayError {}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not initiate the robot library: {0}")]
    GatewayInit(GatewayError),

    #[error("could not initiate communication with the motor controller: {0}")]
    DeviceOpen(GatewayError),

    #[error("failed to connect to the host {address}: {source}")]
    Connect {
        address: SocketAddr,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("report error: {0}")]
    Report(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for errors that abort the client.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Connect { .. } => 1,
            Error::GatewayInit(_) => 2,
            Error::DeviceOpen(_) => 3,
            Error::Config(_) => 4,
            Error::Gateway(_) | Error::Report(_) | Error::Io(_) => 5,
        }
    }
}
