use utoipa::OpenApi;

/// Documentation de l'API de configuration
#[derive(OpenApi)]
#[openapi(
    info(
        title = "IPMPV Configuration API",
        version = "0.1.0",
        description = "Lecture et modification de `config.yaml` (chemins pointés, ex: `volume.step`)",
    ),
    paths(
        crate::api::get_full_config,
        crate::api::get_config_value,
        crate::api::put_config_value,
    ),
    components(schemas(
        crate::api::ConfigEntry,
        crate::api::ConfigUpdate,
        crate::api::ConfigError,
    )),
    tags(
        (name = "config", description = "Configuration persistante d'IPMPV")
    )
)]
pub struct ApiDoc;
