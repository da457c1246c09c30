// Blocking HTTP access shared by every outbound call.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = "BMLT PDF Generator/1.0";

/// Upper bound for a single response body (images, HTML, JSON).
const MAX_BODY_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct HttpClient {
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirects(5)
            .build();
        HttpClient { agent }
    }

    fn call(&self, url: &str) -> Result<ureq::Response, String> {
        debug!(%url, "GET");
        match self.agent.get(url).call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(code, _)) => Err(format!("{} returned HTTP {}", url, code)),
            Err(e) => Err(format!("{}: {}", url, e)),
        }
    }

    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self.call(url)?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|e| format!("Failed to read response from {}: {}", url, e))?;
        Ok(bytes)
    }

    pub fn get_text(&self, url: &str) -> Result<String, String> {
        let bytes = self.get_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        self.call(url)?
            .into_json()
            .map_err(|e| format!("Invalid JSON from {}: {}", url, e))
    }
}

/// Bytes left as-is in a query value; everything else is `%XX`.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Percent-encodes a query value.
pub fn encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}
