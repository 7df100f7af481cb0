use std::time::Duration;

use ipmconfig::Config;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};
use ureq::Agent;

use crate::{Channel, ChannelError};

/// Groupe attribué aux entrées sans `group-title`
pub const DEFAULT_GROUP: &str = "Other";

lazy_static! {
    static ref LOGO_RE: Regex =
        Regex::new(r#"(?i)tvg-logo\s*=\s*"([^"]*)""#).expect("valid tvg-logo regex");
    static ref GROUP_RE: Regex =
        Regex::new(r#"(?i)group-title\s*=\s*"([^"]*)""#).expect("valid group-title regex");
}

/// Parse le texte d'une playlist M3U étendue.
///
/// Chaque ligne `#EXTINF` est associée à la ligne d'URL qui la suit. Les
/// groupes séparés par `;` produisent une entrée par groupe, dans l'ordre.
pub fn parse_playlist(text: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut lines = text.lines().map(str::trim).peekable();

    while let Some(line) = lines.next() {
        if !line.starts_with("#EXTINF") {
            continue;
        }

        // L'URL est la prochaine ligne utile ; un nouvel #EXTINF l'invalide
        let url = loop {
            match lines.peek() {
                None => break None,
                Some(next) if next.starts_with("#EXTINF") => break None,
                Some(next) if next.is_empty() || next.starts_with('#') => {
                    lines.next();
                }
                Some(next) => {
                    let url = next.to_string();
                    lines.next();
                    break Some(url);
                }
            }
        };

        let Some(url) = url else {
            warn!("Skipping #EXTINF entry without URL: {}", line);
            continue;
        };

        let name = line
            .rsplit_once(',')
            .map(|(_, name)| name.trim())
            .unwrap_or_default()
            .to_string();

        let logo = LOGO_RE
            .captures(line)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();

        let mut groups: Vec<String> = GROUP_RE
            .captures(line)
            .map(|c| {
                c[1].split(';')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if groups.is_empty() {
            groups.push(DEFAULT_GROUP.to_string());
        }

        for group in groups {
            channels.push(Channel {
                name: name.clone(),
                url: url.clone(),
                logo: logo.clone(),
                group,
            });
        }
    }

    debug!("Parsed {} channel entries", channels.len());
    channels
}

/// Télécharge le texte de la playlist.
pub fn fetch_playlist(url: &str, timeout: Duration) -> Result<String, ChannelError> {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    let agent: Agent = config.into();

    let response = agent
        .get(url)
        .call()
        .map_err(|e| ChannelError::Http(url.to_string(), e))?;

    let (_parts, mut body) = response.into_parts();
    body.read_to_string()
        .map_err(|e| ChannelError::Body(url.to_string(), e))
}

/// Charge les chaînes depuis la playlist configurée.
///
/// L'absence d'URL est fatale ; un échec de téléchargement ne l'est pas et
/// donne une liste vide.
pub fn load_channels(config: &Config) -> Result<Vec<Channel>, ChannelError> {
    let url = config.get_playlist_url().ok_or(ChannelError::NotConfigured)?;

    info!("📺 Fetching playlist from {}", url);
    match fetch_playlist(&url, config.get_playlist_timeout()) {
        Ok(text) => {
            let channels = parse_playlist(&text);
            info!("✅ Loaded {} channels", channels.len());
            Ok(channels)
        }
        Err(e) => {
            error!("❌ Error fetching M3U playlist: {}", e);
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_text_after_last_comma() {
        let text = "#EXTINF:-1 tvg-name=\"a,b\",Canal 24, Horas\nhttp://s/1\n";
        let channels = parse_playlist(text);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Horas");
    }

    #[test]
    fn attributes_are_order_independent_and_case_insensitive() {
        let text = "#EXTINF:-1 GROUP-TITLE=\"Kids\" TVG-LOGO=\"http://x/k.png\",Kids TV\nudp://239.0.0.1:1234\n";
        let channels = parse_playlist(text);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].group, "Kids");
        assert_eq!(channels[0].logo, "http://x/k.png");
    }

    #[test]
    fn comments_and_blank_lines_between_extinf_and_url_are_skipped() {
        let text = "#EXTINF:-1,One\n\n#EXTVLCOPT:network-caching=1000\nhttp://s/1\n";
        let channels = parse_playlist(text);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].url, "http://s/1");
    }

    #[test]
    fn extinf_without_url_is_skipped() {
        let text = "#EXTINF:-1,Orphan\n#EXTINF:-1,Real\nhttp://s/real\n#EXTINF:-1,Trailing\n";
        let channels = parse_playlist(text);
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].name, "Real");
    }

    #[test]
    fn empty_groups_in_list_are_dropped() {
        let text = "#EXTINF:-1 group-title=\";Music; ;\",Radio\nhttp://s/r\n";
        let groups: Vec<_> = parse_playlist(text).into_iter().map(|c| c.group).collect();
        assert_eq!(groups, vec!["Music"]);
    }

    #[test]
    fn empty_group_title_defaults_to_other() {
        let text = "#EXTINF:-1 group-title=\"\",Radio\nhttp://s/r\n";
        let channels = parse_playlist(text);
        assert_eq!(channels[0].group, DEFAULT_GROUP);
    }
}
