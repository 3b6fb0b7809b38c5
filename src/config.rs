use anyhow::{anyhow, Result};
use std::ffi::OsStr;
use std::fs::File;
use std::time::Duration;

use justconfig::item::ValueExtractor;
use justconfig::processors::Trim;
use justconfig::sources::env::Env;
use justconfig::sources::text::ConfigText;
use justconfig::ConfPath;
use justconfig::Config;

use crate::cf::cache::DEFAULT_REFRESH_INTERVAL;
use crate::cf::scorer::DEFAULT_MAX_SIMILAR_CUSTOMERS;
use crate::config_processors::Unquote;
use crate::service::{DEFAULT_MAX_NUM_RECOMMENDATIONS, DEFAULT_NUM_RECOMMENDATIONS};

const DEFAULT_PORT: usize = 5000;

pub struct AppConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: usize,
    pub num_workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

pub struct DataConfig {
    pub purchases_path: String,
    pub products_path: String,
}

pub struct ModelConfig {
    pub refresh_interval: Duration,
    pub num_recommendations: usize,
    pub max_num_recommendations: usize,
    pub max_similar_customers: usize,
    pub warm_cache_on_startup: bool,
}

impl AppConfig {
    pub fn new(config_path: &str) -> Result<AppConfig> {
        let mut conf = Config::default();

        // The config file is optional, everything can come from the environment
        if let Ok(config_file) = File::open(config_path) {
            let config_text = ConfigText::new(config_file, config_path)
                .map_err(|err| anyhow!("loading configuration file {} failed: {:?}", config_path, err))?;
            conf.add_source(config_text);
        }

        let config_env = Env::new(&[
            (
                ConfPath::from(&["data", "purchases_path"]),
                OsStr::new("PURCHASES_DATA"),
            ),
            (
                ConfPath::from(&["data", "products_path"]),
                OsStr::new("PRODUCTS_DATA"),
            ),
            (
                ConfPath::from(&["server", "num_workers"]),
                OsStr::new("NUM_WORKERS"),
            ),
            (ConfPath::from(&["log", "level"]), OsStr::new("LOG_LEVEL")),
            (ConfPath::from(&["log", "format"]), OsStr::new("LOG_FORMAT")),
            (
                ConfPath::from(&["model", "refresh_interval_secs"]),
                OsStr::new("REFRESH_INTERVAL_SECS"),
            ),
        ]);
        conf.add_source(config_env);

        AppConfig::parse(&conf)
    }

    pub fn parse(conf: &Config) -> Result<AppConfig> {
        Ok(AppConfig {
            server: ServerConfig::parse(conf, ConfPath::from(&["server"])),
            log: LogConfig::parse(conf, ConfPath::from(&["log"]))?,
            data: DataConfig::parse(conf, ConfPath::from(&["data"]))?,
            model: ModelConfig::parse(conf, ConfPath::from(&["model"])),
        })
    }
}

impl ServerConfig {
    fn parse(conf: &Config, path: ConfPath) -> ServerConfig {
        ServerConfig {
            host: conf
                .get(path.push("host"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from("0.0.0.0")),
            port: conf.get(path.push("port")).trim().value().unwrap_or(DEFAULT_PORT),
            num_workers: conf
                .get(path.push("num_workers"))
                .trim()
                .value()
                // Detect number of CPUs
                .unwrap_or_else(|_| {
                    sys_info::cpu_num()
                        .ok()
                        .and_then(|cpus| cpus.try_into().ok())
                        .unwrap_or(1)
                }),
        }
    }
}

impl LogConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<LogConfig> {
        let format: String = conf
            .get(path.push("format"))
            .unquote()
            .value()
            .unwrap_or_else(|_| String::from("compact"));
        let format = match format.to_lowercase().as_str() {
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(anyhow!("unknown log format: {}", other)),
        };
        Ok(LogConfig {
            level: conf
                .get(path.push("level"))
                .unquote()
                .value()
                .unwrap_or_else(|_| String::from("info")),
            format,
        })
    }
}

impl DataConfig {
    fn parse(conf: &Config, path: ConfPath) -> Result<DataConfig> {
        Ok(DataConfig {
            purchases_path: conf
                .get(path.push("purchases_path"))
                .unquote()
                .value()
                .map_err(|err| anyhow!("data.purchases_path is required: {:?}", err))?,
            products_path: conf
                .get(path.push("products_path"))
                .unquote()
                .value()
                .map_err(|err| anyhow!("data.products_path is required: {:?}", err))?,
        })
    }
}

impl ModelConfig {
    fn parse(conf: &Config, path: ConfPath) -> ModelConfig {
        ModelConfig {
            refresh_interval: conf
                .get(path.push("refresh_interval_secs"))
                .trim()
                .value()
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REFRESH_INTERVAL),
            num_recommendations: conf
                .get(path.push("num_recommendations"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_NUM_RECOMMENDATIONS),
            max_num_recommendations: conf
                .get(path.push("max_num_recommendations"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_MAX_NUM_RECOMMENDATIONS),
            max_similar_customers: conf
                .get(path.push("max_similar_customers"))
                .trim()
                .value()
                .unwrap_or(DEFAULT_MAX_SIMILAR_CUSTOMERS),
            warm_cache_on_startup: conf
                .get(path.push("warm_cache_on_startup"))
                .trim()
                .value()
                .unwrap_or(true),
        }
    }
}
