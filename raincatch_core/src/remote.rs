//! JSON GET helper shared by the weather and lid-status queries.

use raincatch_traits::HttpClient;
use serde::de::DeserializeOwned;

use crate::error::LidError;

/// GET `url` and decode a 200 response body as `T`.
pub fn fetch_json<T: DeserializeOwned>(
    http: &mut dyn HttpClient,
    url: &str,
) -> Result<T, LidError> {
    let resp = http
        .get(url)
        .map_err(|e| LidError::NetworkTransport(e.to_string()))?;
    if resp.status != 200 {
        return Err(LidError::NetworkStatus(resp.status));
    }
    serde_json::from_str(&resp.body).map_err(|e| LidError::RemoteDataMalformed(e.to_string()))
}
