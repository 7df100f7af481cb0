//! # Serveur HTTP d'IPMPV
//!
//! Enveloppe un `axum::Router` que les différentes crates complètent avant
//! le démarrage :
//!
//! - routes JSON simples : [`Server::add_route`]
//! - handlers avec état : [`Server::add_handler_with_state`]
//! - fichiers embarqués : [`Server::add_dir`]
//! - APIs documentées (OpenAPI + Swagger UI) : [`Server::add_openapi`]
//!
//! Les routes doivent être enregistrées avant [`Server::start`] : le router
//! est figé au démarrage.

use crate::logs::{LogState, LogsApiDoc, create_logs_router, init_logging, log_dump, log_sse};
use axum::handler::Handler;
use axum::routing::get;
use axum::{Json, Router};
use axum_embed::ServeEmbed;
use ipmconfig::get_config;
use rust_embed::RustEmbed;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::{signal, task::JoinHandle};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Identité du serveur, servie par `/info`
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
}

pub struct Server {
    info: ServerInfo,
    router: Router,
    join_handle: Option<JoinHandle<()>>,
    log_state: Option<LogState>,
}

impl Server {
    /// * `base_url` - hôte annoncé dans les logs (ex: "192.168.1.20")
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            info: ServerInfo {
                name: name.into(),
                base_url: base_url.into(),
                http_port,
            },
            router: Router::new(),
            join_handle: None,
            log_state: None,
        }
    }

    /// Serveur nommé "IPMPV", hôte et port lus dans la configuration
    pub fn new_configured() -> Self {
        ServerBuilder::new_configured().build()
    }

    fn mount(&mut self, path: &str, route: Router) {
        let current = std::mem::take(&mut self.router);
        self.router = match path {
            "" | "/" => current.merge(route),
            _ => current.nest(&format!("/{}", path.trim_start_matches('/')), route),
        };
    }

    /// Route `GET path` qui sérialise en JSON le résultat de `f`
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = Arc::clone(&f);
            async move { Json(f().await) }
        };
        self.mount(path, Router::new().route("/", get(handler)));
    }

    /// Route `GET path` servie par un handler Axum avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.mount(path, route);
    }

    /// Sert les fichiers embarqués `E` sous `path`
    pub async fn add_dir<E>(&mut self, path: &str)
    where
        E: RustEmbed + Clone + Send + Sync + 'static,
    {
        let files = Router::new().fallback_service(ServeEmbed::<E>::new());
        self.mount(path, files);
    }

    /// Monte `api_router` sous `/api/{name}`, avec la spécification sous
    /// `/api-docs/{name}.json` et Swagger UI sous `/swagger-ui/{name}`
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger = SwaggerUi::new(format!("/swagger-ui/{}", name))
            .url(format!("/api-docs/{}.json", name), openapi);

        self.mount(&format!("/api/{}", name), api_router);
        self.mount("/", swagger.into());
    }

    /// Fusionne (`path` = "/") ou imbrique un router complet
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        self.mount(path, sub_router);
    }

    /// Copie du router courant (utile pour les tests `oneshot`)
    pub async fn router(&self) -> Router {
        self.router.clone()
    }

    /// Ouvre le port et sert les requêtes jusqu'à Ctrl+C
    pub async fn start(&mut self) {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.info.http_port));
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("Cannot bind HTTP listener on {}: {}", addr, e);
                return;
            }
        };
        info!(
            "Server {} running at http://{}:{}",
            self.info.name, self.info.base_url, self.info.http_port
        );

        let router = self.router.clone();
        self.join_handle = Some(tokio::spawn(async move {
            let shutdown = async {
                match signal::ctrl_c().await {
                    Ok(()) => info!("Ctrl+C reçu, arrêt gracieux"),
                    Err(e) => {
                        warn!("Cannot listen for Ctrl+C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server stopped with error: {}", e);
            }
        }));
    }

    /// Attend l'arrêt du serveur
    pub async fn wait(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            if let Err(e) = handle.await {
                error!("HTTP server task failed: {}", e);
            }
        }
    }

    pub fn info(&self) -> ServerInfo {
        self.info.clone()
    }

    pub fn log_state(&self) -> Option<&LogState> {
        self.log_state.as_ref()
    }

    /// Installe la couche `tracing` puis expose les logs :
    /// `/log-sse`, `/log-dump` et `/api/logs/level`.
    pub async fn init_logging(&mut self) {
        let log_state = init_logging();

        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_openapi(
            create_logs_router(log_state.clone()),
            LogsApiDoc::openapi(),
            "logs",
        )
        .await;

        self.log_state = Some(log_state);
    }
}

pub struct ServerBuilder {
    name: String,
    base_url: String,
    http_port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            http_port,
        }
    }

    pub fn new_configured() -> Self {
        let config = get_config();
        Self::new("IPMPV", config.get_base_url(), config.get_http_port())
    }

    pub fn build(self) -> Server {
        Server::new(self.name, self.base_url, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn json_route_is_served() {
        let mut server = ServerBuilder::new("Test", "localhost", 0).build();
        let info = server.info();
        server
            .add_route("/info", move || {
                let info = info.clone();
                async move { info }
            })
            .await;

        let response = server
            .router()
            .await
            .oneshot(Request::get("/info").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_spec_is_published() {
        #[derive(OpenApi)]
        #[openapi(info(title = "Test API"))]
        struct TestDoc;

        let mut server = ServerBuilder::new("Test", "localhost", 0).build();
        let api = Router::new().route("/ping", get(|| async { "pong" }));
        server.add_openapi(api, TestDoc::openapi(), "test").await;

        let router = server.router().await;
        let ping = router
            .clone()
            .oneshot(Request::get("/api/test/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ping.status(), StatusCode::OK);

        let spec = router
            .oneshot(Request::get("/api-docs/test.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(spec.status(), StatusCode::OK);
    }
}
