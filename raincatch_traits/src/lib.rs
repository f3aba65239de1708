//! Device and collaborator seams for the rain-lid controller.
//!
//! Everything the control core touches outside its own memory goes through
//! one of these traits: the ultrasonic ranger, the analog rain sensor, the
//! stepper driver lines, the HTTP transport and the network link.
pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type used at trait boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Ultrasonic range finder.
pub trait RangeSensor {
    /// Fire one ping and return the echo pulse width in microseconds,
    /// or `None` if the echo never started or never ended in time.
    fn measure(&mut self) -> Option<u32>;
}

/// Analog rain sensor. Lower readings mean wetter.
pub trait RainSensor {
    fn read_raw(&mut self) -> Result<u16, BoxError>;
}

/// Rotation sense of the lid stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Step/direction/enable lines of a stepper driver (A4988 style).
pub trait StepperDriver {
    /// Energize (`true`) or release (`false`) the driver.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError>;
    fn set_direction(&mut self, rotation: Rotation) -> Result<(), BoxError>;
    /// Drive the step line high or low; the driver steps on the rising edge.
    fn set_step(&mut self, high: bool) -> Result<(), BoxError>;
}

/// Status code and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP transport.
///
/// Any response that arrives, whatever its status, is `Ok`; `Err` is reserved
/// for transport failures (DNS, connect, TLS, timeouts).
pub trait HttpClient {
    fn get(&mut self, url: &str) -> Result<HttpResponse, BoxError>;
    fn post_json(&mut self, url: &str, body: &str) -> Result<HttpResponse, BoxError>;
}

/// Network association credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

/// Network link owner. The core only asks; it never manages the association.
pub trait Connectivity {
    fn is_connected(&mut self) -> bool;
    fn ensure_connected(&mut self, credentials: &Credentials) -> Result<(), BoxError>;
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn measure(&mut self) -> Option<u32> {
        (**self).measure()
    }
}

impl<T: RainSensor + ?Sized> RainSensor for Box<T> {
    fn read_raw(&mut self) -> Result<u16, BoxError> {
        (**self).read_raw()
    }
}

impl<T: StepperDriver + ?Sized> StepperDriver for Box<T> {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        (**self).set_enabled(enabled)
    }
    fn set_direction(&mut self, rotation: Rotation) -> Result<(), BoxError> {
        (**self).set_direction(rotation)
    }
    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        (**self).set_step(high)
    }
}

impl<T: HttpClient + ?Sized> HttpClient for Box<T> {
    fn get(&mut self, url: &str) -> Result<HttpResponse, BoxError> {
        (**self).get(url)
    }
    fn post_json(&mut self, url: &str, body: &str) -> Result<HttpResponse, BoxError> {
        (**self).post_json(url, body)
    }
}

impl<T: Connectivity + ?Sized> Connectivity for Box<T> {
    fn is_connected(&mut self) -> bool {
        (**self).is_connected()
    }
    fn ensure_connected(&mut self, credentials: &Credentials) -> Result<(), BoxError> {
        (**self).ensure_connected(credentials)
    }
}
