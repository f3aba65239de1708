//! Blocking HTTP transport (ureq) and a host-managed network link.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use raincatch_traits::{BoxError, Connectivity, Credentials, HttpClient, HttpResponse};
use tracing::{debug, info, warn};

use crate::error::HwError;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// ureq agent with a whole-request timeout.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }

    fn finish(result: Result<ureq::Response, ureq::Error>) -> Result<HttpResponse, BoxError> {
        match result {
            Ok(resp) => read_response(resp),
            // ureq reports 4xx/5xx as errors; to us they are still responses.
            Err(ureq::Error::Status(_, resp)) => read_response(resp),
            Err(ureq::Error::Transport(t)) => Err(Box::new(HwError::Http(t.to_string()))),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}

fn read_response(resp: ureq::Response) -> Result<HttpResponse, BoxError> {
    let status = resp.status();
    let body = resp.into_string()?;
    Ok(HttpResponse { status, body })
}

impl HttpClient for UreqClient {
    fn get(&mut self, url: &str) -> Result<HttpResponse, BoxError> {
        debug!(url, "GET");
        Self::finish(self.agent.get(url).call())
    }

    fn post_json(&mut self, url: &str, body: &str) -> Result<HttpResponse, BoxError> {
        debug!(url, bytes = body.len(), "POST");
        Self::finish(
            self.agent
                .post(url)
                .set("Content-Type", "application/json")
                .send_string(body),
        )
    }
}

/// Link owned by the OS (NetworkManager / wpa_supplicant).
///
/// "Connected" means a TCP connect to the probe host succeeds. Reconnecting
/// cannot be forced from here; `ensure_connected` waits one probe interval
/// and reports whether the OS brought the link back.
pub struct HostConnectivity {
    probe: String,
    probe_timeout: Duration,
}

impl HostConnectivity {
    /// `probe` is a `host:port` pair, typically the telemetry server on 443.
    pub fn new(probe: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probe: probe.into(),
            probe_timeout,
        }
    }

    fn probe_once(&self) -> Result<(), HwError> {
        let addrs = self
            .probe
            .to_socket_addrs()
            .map_err(|e| HwError::Unreachable(format!("resolve {}: {e}", self.probe)))?;
        let mut last = HwError::Unreachable(format!("{} resolved to no address", self.probe));
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.probe_timeout) {
                Ok(_) => return Ok(()),
                Err(e) => last = HwError::Unreachable(format!("connect {addr}: {e}")),
            }
        }
        Err(last)
    }
}

impl Connectivity for HostConnectivity {
    fn is_connected(&mut self) -> bool {
        self.probe_once().is_ok()
    }

    fn ensure_connected(&mut self, credentials: &Credentials) -> Result<(), BoxError> {
        info!(ssid = %credentials.ssid, "network down; waiting for the OS to reassociate");
        std::thread::sleep(self.probe_timeout);
        self.probe_once().map_err(|e| {
            warn!(error = %e, "network still unreachable");
            Box::new(e) as BoxError
        })
    }
}
