//! Endpoint construction for the relay client.

use reqwest::Url;

/// Join an endpoint path onto a base URL without doubling slashes.
///
/// ```
/// use chatmux::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://relay.local/v1/", "/events"),
///     "http://relay.local/v1/events"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}

/// `{base}/servers/{server}/channels/{channel}/messages`, with each name
/// percent-encoded as a single path segment.
pub fn channel_messages_url(base_url: &str, server: &str, channel: &str) -> Result<Url, String> {
    let mut url = Url::parse(base_url).map_err(|err| format!("invalid endpoint {base_url:?}: {err}"))?;
    url.path_segments_mut()
        .map_err(|_| format!("endpoint {base_url:?} cannot carry a path"))?
        .pop_if_empty()
        .extend(["servers", server, "channels", channel, "messages"]);
    Ok(url)
}
