use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("No playlist URL configured (set playlist.url or IPMPV_M3U_URL)")]
    NotConfigured,
    #[error("HTTP request for playlist {0} failed: {1}")]
    Http(String, #[source] ureq::Error),
    #[error("Failed to read playlist body from {0}: {1}")]
    Body(String, #[source] ureq::Error),
}
