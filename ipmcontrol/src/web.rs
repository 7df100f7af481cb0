//! Interface web : page d'accueil localisée, sélection de langue, manifeste
//! et fichiers statiques embarqués.

use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use htmlescape::{encode_attribute, encode_minimal};
use ipmchannels::{ChannelDirectory, DEFAULT_GROUP};
use rust_embed::RustEmbed;
use tracing::{debug, error};

use crate::dispatcher::{Dispatcher, RemoteStatus};
use crate::i18n::{LANGUAGE_COOKIE, LANGUAGE_COOKIE_MAX_AGE, Localization};
use crate::server_ext::RemoteApiState;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Fichiers servis sous `/static`
#[derive(RustEmbed, Clone)]
#[folder = "static/"]
pub struct StaticAssets;

/// Valeur d'un cookie dans les en-têtes de la requête
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

fn request_language(localization: &Localization, headers: &HeaderMap) -> String {
    let accept = headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok());
    localization.resolve(cookie_value(headers, LANGUAGE_COOKIE), accept)
}

fn render_channel_groups(
    channels: &ChannelDirectory,
    localization: &Localization,
    language: &str,
) -> String {
    let mut html = String::new();

    for (group, members) in channels.groups() {
        let title = if group == DEFAULT_GROUP {
            localization.translate(language, "other")
        } else {
            group.to_string()
        };
        html.push_str(&format!("<div class=\"group\">{}", encode_minimal(&title)));
        for (index, channel) in members {
            html.push_str(&format!(
                "<div class=\"channel\"><img src=\"{}\" onerror=\"this.style.display='none'\">\
                 <button onclick=\"changeChannel({})\">{}</button></div>",
                encode_attribute(&channel.logo),
                index,
                encode_minimal(&channel.name),
            ));
        }
        html.push_str("</div>");
    }

    html
}

fn render_language_selector(localization: &Localization, language: &str) -> String {
    localization
        .languages()
        .into_iter()
        .map(|(code, name)| {
            let selected = if code == language { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                encode_attribute(code),
                selected,
                encode_minimal(name)
            )
        })
        .collect()
}

/// Rend la page d'accueil pour `language` à partir de l'état courant
pub fn render_index(
    status: &RemoteStatus,
    channels: &ChannelDirectory,
    localization: &Localization,
    language: &str,
) -> String {
    let t = |key: &str| localization.translate(language, key);
    let on_off = |state: bool| if state { t("on") } else { t("off") };

    let current = status
        .current_channel
        .clone()
        .unwrap_or_else(|| t("none"));
    let latency = if status.session.low_latency {
        t("latency_low")
    } else {
        t("latency_high")
    };
    let retroarch = if status.retroarch {
        t("stop_retroarch")
    } else {
        t("start_retroarch")
    };

    let text = [
        ("%LANGUAGE%", language.to_string()),
        ("%WELCOME_TEXT%", t("welcome_to_ipmpv")),
        ("%CURRENT_CHANNEL_LABEL%", t("current_channel")),
        ("%CURRENT_CHANNEL%", current),
        ("%RETROARCH_LABEL%", retroarch),
        ("%START_RETROARCH_LABEL%", t("start_retroarch")),
        ("%STOP_RETROARCH_LABEL%", t("stop_retroarch")),
        ("%DEINTERLACE_LABEL%", t("deinterlacing")),
        ("%DEINTERLACE_STATE%", on_off(status.session.deinterlace)),
        ("%RESOLUTION_LABEL%", t("resolution")),
        ("%RESOLUTION%", status.resolution.label().to_string()),
        ("%LATENCY_LABEL%", latency),
        ("%LATENCY_LOW_LABEL%", t("latency_low")),
        ("%LATENCY_HIGH_LABEL%", t("latency_high")),
        ("%VOLUME_LABEL%", t("volume")),
        ("%MUTE_LABEL%", t("mute")),
        ("%TOGGLE_OSD_LABEL%", t("toggle_osd")),
        ("%ON_LABEL%", t("on")),
        ("%OFF_LABEL%", t("off")),
        ("%PLAY_CUSTOM_URL_LABEL%", t("play_custom_url")),
        ("%ENTER_URL_PLACEHOLDER%", t("enter_stream_url")),
        ("%INVALID_URL_LABEL%", t("invalid_url")),
        ("%PLAY_LABEL%", t("play")),
        ("%ALL_CHANNELS_LABEL%", t("all_channels")),
        ("%STOP_LABEL%", t("stop")),
    ];

    let mut html = INDEX_TEMPLATE.to_string();
    for (placeholder, value) in text {
        html = html.replace(placeholder, &encode_minimal(&value));
    }
    html = html.replace(
        "%LANGUAGE_SELECTOR%",
        &render_language_selector(localization, language),
    );
    html.replace(
        "%CHANNEL_GROUPS%",
        &render_channel_groups(channels, localization, language),
    )
}

async fn index(State(state): State<RemoteApiState>, headers: HeaderMap) -> Response {
    let dispatcher = state.dispatcher.clone();
    let page = tokio::task::spawn_blocking(move || {
        let localization = dispatcher.localization();
        let language = request_language(localization, &headers);
        render_page(&dispatcher, &language)
    })
    .await;

    match page {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Index rendering failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn render_page(dispatcher: &Dispatcher, language: &str) -> String {
    render_index(
        &dispatcher.status(),
        dispatcher.channels(),
        dispatcher.localization(),
        language,
    )
}

async fn switch_language(
    State(state): State<RemoteApiState>,
    Path(language): Path<String>,
    headers: HeaderMap,
) -> Response {
    let target = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("/")
        .to_string();
    let redirect = Redirect::to(&target).into_response();

    if !state.dispatcher.localization().is_available(&language) {
        debug!(%language, "Ignoring unknown language");
        return redirect;
    }

    let cookie = format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Strict",
        LANGUAGE_COOKIE, language, LANGUAGE_COOKIE_MAX_AGE
    );
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            let mut response = redirect;
            response.headers_mut().insert(header::SET_COOKIE, value);
            response
        }
        Err(e) => {
            error!("Invalid language cookie: {}", e);
            redirect
        }
    }
}

async fn manifest() -> Response {
    match StaticAssets::get("manifest.json") {
        Some(file) => (
            [(header::CONTENT_TYPE, "application/manifest+json")],
            file.data.into_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Router de l'interface web (monté à la racine)
pub fn create_web_router(state: RemoteApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/switch_language/{language}", get(switch_language))
        .route("/manifest.json", get(manifest))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipmchannels::Channel;
    use std::collections::{BTreeMap, HashMap};

    fn localization() -> Localization {
        let mut catalogs = BTreeMap::new();
        catalogs.insert(
            "en".to_string(),
            HashMap::from([
                ("language_name".to_string(), "English".to_string()),
                ("other".to_string(), "Other".to_string()),
            ]),
        );
        catalogs.insert(
            "es".to_string(),
            HashMap::from([
                ("language_name".to_string(), "Español".to_string()),
                ("other".to_string(), "Otros".to_string()),
            ]),
        );
        Localization::from_catalogs("en", catalogs)
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("session=abc; ipmpv_language=es"),
        );
        assert_eq!(cookie_value(&headers, LANGUAGE_COOKIE), Some("es"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn language_falls_back_to_accept_language() {
        let l10n = localization();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-FR,es;q=0.8,en;q=0.5"),
        );
        assert_eq!(request_language(&l10n, &headers), "es");
    }

    #[test]
    fn groups_are_escaped_and_default_group_translated() {
        let channels = ChannelDirectory::new(vec![
            Channel {
                name: "News <24>".into(),
                url: "http://a/1".into(),
                logo: String::new(),
                group: "Other".into(),
            },
            Channel {
                name: "Sport".into(),
                url: "http://a/2".into(),
                logo: "http://logo/\"x\"".into(),
                group: "Sports".into(),
            },
        ]);

        let html = render_channel_groups(&channels, &localization(), "es");

        assert!(html.contains("<div class=\"group\">Otros"));
        assert!(html.contains("News &lt;24&gt;"));
        assert!(html.contains("changeChannel(1)"));
        assert!(!html.contains("\"x\""));
    }

    #[test]
    fn selector_marks_current_language() {
        let html = render_language_selector(&localization(), "es");
        assert!(html.contains("<option value=\"es\" selected>Español</option>"));
        assert!(html.contains("<option value=\"en\">English</option>"));
    }
}
