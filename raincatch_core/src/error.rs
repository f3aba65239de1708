use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LidError {
    #[error("sensing timeout: echo pulse never arrived or never ended")]
    SensingTimeout,
    #[error("volume read failed: sample {failed_at} of {samples} timed out")]
    SensingAggregate { failed_at: u32, samples: u32 },
    #[error("network transport error: {0}")]
    NetworkTransport(String),
    #[error("unexpected http status {0}")]
    NetworkStatus(u16),
    #[error("remote data malformed: {0}")]
    RemoteDataMalformed(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing range sensor")]
    MissingRanger,
    #[error("missing rain sensor")]
    MissingRainSensor,
    #[error("missing stepper driver")]
    MissingStepper,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
