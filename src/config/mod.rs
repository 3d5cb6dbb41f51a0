pub mod templates;
pub mod tracing;

use std::path::PathBuf;

use figment::providers::{Env, Format, Json};
use figment::Figment;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub listen_addr: String,
    /// Used when `RUST_LOG` is not set.
    pub log_level: String,
    pub templates_dir: PathBuf,
    pub watch_templates: bool,
    pub assets_dir: PathBuf,
    pub media_dir: PathBuf,
    pub feed_limit: i64,
    pub max_upload_bytes: usize,
    pub backend: BackendCfg,
}

impl Default for AppCfg {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_owned(),
            log_level: "info".to_owned(),
            templates_dir: PathBuf::from("src/templates"),
            watch_templates: false,
            assets_dir: PathBuf::from("./dist/assets"),
            media_dir: PathBuf::from("./media"),
            feed_limit: 50,
            max_upload_bytes: 10 * 1024 * 1024,
            backend: BackendCfg::Memory,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendCfg {
    Memory,
    Postgres {
        database_url: String,
        #[serde(default = "default_max_connections")]
        max_connections: usize,
    },
}

fn default_max_connections() -> usize {
    10
}

impl AppCfg {
    /// `appsettings.json`, then `APP_*` variables (`APP_BACKEND__KIND=postgres`).
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Json::file("appsettings.json"))
            .merge(Env::prefixed("APP_").split("__"))
    }

    pub fn load(figment: Figment) -> anyhow::Result<Self> {
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let cfg = AppCfg::load(Figment::from(Json::string(r#"{ "feed_limit": 20 }"#))).unwrap();
        assert_eq!(cfg.feed_limit, 20);
        assert_eq!(cfg.listen_addr, "0.0.0.0:3000");
        assert_eq!(cfg.backend, BackendCfg::Memory);
    }

    #[test]
    fn postgres_backend() {
        let cfg = AppCfg::load(Figment::from(Json::string(
            r#"{ "backend": { "kind": "postgres", "database_url": "postgres://localhost/hive" } }"#,
        )))
        .unwrap();
        assert_eq!(
            cfg.backend,
            BackendCfg::Postgres {
                database_url: "postgres://localhost/hive".into(),
                max_connections: 10,
            }
        );
    }

    #[test]
    fn unknown_backend_rejected() {
        let res = AppCfg::load(Figment::from(Json::string(
            r#"{ "backend": { "kind": "sqlite" } }"#,
        )));
        assert!(res.is_err());
    }
}
