//! Branche l'API REST de `ipmconfig` sur le serveur.

use crate::Server;
use anyhow::Result;
use ipmconfig::{ApiDoc, api, get_config};
use tracing::info;
use utoipa::OpenApi;

pub trait ConfigExt {
    /// Monte `/api/config` et sa documentation `/swagger-ui/config`
    ///
    /// - `GET /api/config` : toute la configuration
    /// - `GET /api/config/{path}` : une valeur, ex: `osd.channel_timeout_ms`
    /// - `PUT /api/config/{path}` : remplace une valeur et réécrit `config.yaml`
    async fn init_config_api(&mut self) -> Result<()>;
}

impl ConfigExt for Server {
    async fn init_config_api(&mut self) -> Result<()> {
        let config = get_config();
        info!(directory = config.directory(), "⚙️ Configuration API enabled");

        self.add_openapi(api::create_router(config), ApiDoc::openapi(), "config")
            .await;
        Ok(())
    }
}
