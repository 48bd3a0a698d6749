//! Shared blocking HTTP plumbing.

use std::time::Duration;

use serde::de::DeserializeOwned;

use lotus_engine::AccessorError;

pub(crate) fn agent(user_agent: &str, timeout_secs: u64) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
}

/// Send `request` once and decode its JSON body.
///
/// `Ok(None)` means the server answered 404.
pub(crate) fn call_json<T: DeserializeOwned>(
    endpoint: &str,
    request: ureq::Request,
) -> Result<Option<T>, AccessorError> {
    tracing::debug!("GET {endpoint}");
    match request.call() {
        Ok(response) => decode(endpoint, response).map(Some),
        Err(ureq::Error::Status(404, _)) => Ok(None),
        Err(err) => Err(transport(endpoint, err)),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    endpoint: &str,
    response: ureq::Response,
) -> Result<T, AccessorError> {
    response
        .into_json::<T>()
        .map_err(|err| AccessorError::Decode {
            endpoint: endpoint.to_owned(),
            message: err.to_string(),
        })
}

pub(crate) fn transport(endpoint: &str, err: ureq::Error) -> AccessorError {
    let message = match err {
        ureq::Error::Status(code, response) => {
            format!("HTTP {code} {}", response.status_text())
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    };
    AccessorError::Transport {
        endpoint: endpoint.to_owned(),
        message,
    }
}

/// Percent-encode a query component (RFC 3986 unreserved characters pass).
pub(crate) fn encode_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smiles_is_percent_encoded() {
        assert_eq!(encode_component("C=C(O)#N"), "C%3DC%28O%29%23N");
        assert_eq!(encode_component("a-b_c.d~"), "a-b_c.d~");
    }
}
