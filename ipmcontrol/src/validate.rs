use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STREAM_URL_RE: Regex =
        Regex::new(r"^(https?|rtmp|rtmps|udp|tcp)://[\w\-]+(\.[\w\-]+)*(:\d+)?([/?].*)?$")
            .expect("valid stream URL regex");
}

/// Accepts `http`, `https`, `rtmp`, `rtmps`, `udp` and `tcp` URLs with a
/// host, an optional port and an optional path or query.
pub fn is_valid_stream_url(url: &str) -> bool {
    STREAM_URL_RE.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_whitelisted_schemes() {
        assert!(is_valid_stream_url("rtmp://host:1935/app/stream"));
        assert!(is_valid_stream_url("http://example.com/live.m3u8"));
        assert!(is_valid_stream_url("https://cdn.example.com?token=abc"));
        assert!(is_valid_stream_url("udp://239.0.0.1:1234"));
        assert!(is_valid_stream_url("tcp://encoder"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!is_valid_stream_url("javascript:alert(1)"));
        assert!(!is_valid_stream_url(""));
        assert!(!is_valid_stream_url("file:///etc/passwd"));
        assert!(!is_valid_stream_url("http://"));
        assert!(!is_valid_stream_url("http://host:port/"));
        assert!(!is_valid_stream_url("ftp://host/file"));
    }
}
