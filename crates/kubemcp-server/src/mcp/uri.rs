//! `k8s://` resource URIs
//!
//! `k8s://<kind>[?namespace=<ns>]`. Query parameters other than
//! `namespace` are ignored so clients can pass through extra selectors
//! without breaking older servers.

use url::Url;

use kubemcp_core::domain::request::ResourceKind;
use kubemcp_core::error::RequestError;

pub const SCHEME: &str = "k8s";

pub fn parse(uri: &str) -> Result<(ResourceKind, Option<String>), RequestError> {
    let url = Url::parse(uri).map_err(|err| {
        RequestError::invalid_argument(format!("invalid resource uri {uri:?}: {err}"))
    })?;
    if url.scheme() != SCHEME {
        return Err(RequestError::invalid_argument(format!(
            "unsupported uri scheme '{}', expected '{SCHEME}'",
            url.scheme()
        )));
    }
    let kind = url
        .host_str()
        .ok_or_else(|| {
            RequestError::invalid_argument(format!("resource uri {uri:?} names no kind"))
        })?
        .parse::<ResourceKind>()
        .map_err(RequestError::invalid_argument)?;

    let namespace = url
        .query_pairs()
        .find(|(key, _)| key == "namespace")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());

    Ok((kind, namespace))
}
