//! # ipmserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit l'enveloppe HTTP d'IPMPV : routes JSON, handlers avec
//! état, fichiers statiques embarqués, APIs documentées par OpenAPI, et le
//! système de logs temps réel.
//!
//! ## Architecture
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : couche `tracing` qui alimente un buffer circulaire et un flux SSE
//! - `config_ext` : branchement de l'API REST de `ipmconfig`
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use ipmserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = ServerBuilder::new("Remote", "localhost", 5000).build();
//!     server.init_logging().await;
//!
//!     server.add_route("/info", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await;
//!     server.wait().await;
//! }
//! ```

pub mod config_ext;
pub mod logs;
pub mod server;

pub use config_ext::ConfigExt;
pub use logs::{LogEntry, LogState, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
