//! Stand-in collaborators for builds without a network stack.

use raincatch_traits::{BoxError, Connectivity, Credentials, HttpClient, HttpResponse};

/// HTTP client with no transport; every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineHttp;

impl HttpClient for OfflineHttp {
    fn get(&mut self, _url: &str) -> Result<HttpResponse, BoxError> {
        Err(Box::new(std::io::Error::other("no http transport configured")))
    }

    fn post_json(&mut self, _url: &str, _body: &str) -> Result<HttpResponse, BoxError> {
        Err(Box::new(std::io::Error::other("no http transport configured")))
    }
}

/// Link that reports itself connected and never needs re-association.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConnected;

impl Connectivity for AlwaysConnected {
    fn is_connected(&mut self) -> bool {
        true
    }

    fn ensure_connected(&mut self, _credentials: &Credentials) -> Result<(), BoxError> {
        Ok(())
    }
}
