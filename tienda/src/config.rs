use std::{env, fmt::Display, str::FromStr};

use media::CdnConfig;
use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub cdn: CdnConfig,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("TIENDA_PORT", "8000"),
            database_url: require("DATABASE_URL"),
            jwt_secret: require("JWT_SECRET"),
            frontend_url: try_load("FRONTEND_URL", "http://localhost:5173"),
            cdn: CdnConfig {
                cloud_name: require("CLOUDINARY_CLOUD_NAME"),
                api_key: require("CLOUDINARY_API_KEY"),
                api_secret: require("CLOUDINARY_API_SECRET"),
                fallback_url: try_load(
                    "CLOUDINARY_FALLBACK_URL",
                    "https://res.cloudinary.com/demo/image/upload/productos/fallback.webp",
                ),
            },
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn require(key: &str) -> String {
    var(key).expect("Environment misconfigured!")
}
