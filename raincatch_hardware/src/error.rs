use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("spi error: {0}")]
    Spi(String),
    #[error("echo start timeout (no echo received)")]
    EchoStartTimeout,
    #[error("echo end timeout (echo line stuck high)")]
    EchoEndTimeout,
    #[error("line did not reach level {want_high} before timeout")]
    LevelTimeout { want_high: bool },
    #[error("adc channel {0} out of range (0..=7)")]
    AdcChannel(u8),
    #[error("http transport: {0}")]
    Http(String),
    #[error("network unreachable: {0}")]
    Unreachable(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
