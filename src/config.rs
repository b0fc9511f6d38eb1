use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::document::{CanvasSize, DEFAULT_AUTHOR};
use crate::error::MapperError;
use crate::esi::DEFAULT_ESI_BASE_URL;
use crate::fetch::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::layout::{DEFAULT_LAYOUT_REGIONS, DEFAULT_LAYOUT_URL_TEMPLATE};
use crate::pipeline::{PipelineTuning, Stage, StageTuning};
use crate::store::{DEFAULT_GALAXY_FILE, DEFAULT_MAPS_DIR, validate_layout};

pub const DEFAULT_CONFIG_FILE: &str = "spyglass.json";
pub const DEFAULT_BIND: &str = "0.0.0.0:8334";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub esi_base_url: Option<String>,
    #[serde(default)]
    pub layout_url_template: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub stages: StagesConfig,
    #[serde(default)]
    pub layout_regions: Option<Vec<String>>,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct StagesConfig {
    #[serde(default)]
    pub region: Option<StageConfig>,
    #[serde(default)]
    pub constellation: Option<StageConfig>,
    #[serde(default)]
    pub system: Option<StageConfig>,
    #[serde(default)]
    pub stargate: Option<StageConfig>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize)]
pub struct StageConfig {
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub input_capacity: Option<usize>,
    #[serde(default)]
    pub output_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CanvasConfig {
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub galaxy_path: Option<String>,
    #[serde(default)]
    pub maps_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub bind: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub esi_base_url: String,
    pub layout_url_template: String,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub tuning: PipelineTuning,
    pub layout_regions: Vec<String>,
    pub canvas: CanvasSize,
    /// `None` when configured as an empty string.
    pub author: Option<String>,
    pub galaxy_file: String,
    pub maps_dir: String,
    pub bind: SocketAddr,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            esi_base_url: DEFAULT_ESI_BASE_URL.to_string(),
            layout_url_template: DEFAULT_LAYOUT_URL_TEMPLATE.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            tuning: PipelineTuning::default(),
            layout_regions: DEFAULT_LAYOUT_REGIONS.iter().map(|r| r.to_string()).collect(),
            canvas: CanvasSize::default(),
            author: Some(DEFAULT_AUTHOR.to_string()),
            galaxy_file: DEFAULT_GALAXY_FILE.to_string(),
            maps_dir: DEFAULT_MAPS_DIR.to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8334)),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `spyglass.json` when it exists. Without either the
    /// defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MapperError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MapperError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MapperError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MapperError> {
        let defaults = ResolvedConfig::default();

        let esi_base_url = non_empty("esi_base_url", config.esi_base_url, defaults.esi_base_url)?;
        let layout_url_template = non_empty(
            "layout_url_template",
            config.layout_url_template,
            defaults.layout_url_template,
        )?;
        if !layout_url_template.contains("{region}") {
            return Err(invalid(
                "layout_url_template",
                "must contain the {region} placeholder",
            ));
        }
        let user_agent = non_empty("user_agent", config.user_agent, defaults.user_agent)?;

        let request_timeout = match config.request_timeout_secs {
            Some(0) => return Err(invalid("request_timeout_secs", "must be positive")),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.request_timeout,
        };
        let max_attempts = match config.max_attempts {
            Some(0) => return Err(invalid("max_attempts", "must be at least 1")),
            Some(attempts) => attempts,
            None => defaults.max_attempts,
        };

        let tuning = PipelineTuning {
            region: resolve_stage(Stage::Region, config.stages.region)?,
            constellation: resolve_stage(Stage::Constellation, config.stages.constellation)?,
            system: resolve_stage(Stage::System, config.stages.system)?,
            stargate: resolve_stage(Stage::Stargate, config.stages.stargate)?,
        };

        let layout_regions = config.layout_regions.unwrap_or(defaults.layout_regions);
        if let Some(region) = layout_regions.iter().find(|r| r.trim().is_empty()) {
            return Err(invalid("layout_regions", &format!("empty region name {region:?}")));
        }

        let canvas = CanvasSize {
            width: config.canvas.width.unwrap_or(defaults.canvas.width),
            height: config.canvas.height.unwrap_or(defaults.canvas.height),
        };
        if canvas.width <= 0 || canvas.height <= 0 {
            return Err(invalid("canvas", "width and height must be positive"));
        }

        let author = match config.author {
            Some(author) if author.is_empty() => None,
            Some(author) => Some(author),
            None => defaults.author,
        };

        let galaxy_file = non_empty("output.galaxy_path", config.output.galaxy_path, defaults.galaxy_file)?;
        let maps_dir = non_empty("output.maps_dir", config.output.maps_dir, defaults.maps_dir)?;
        validate_layout(&galaxy_file, &maps_dir)?;

        let bind = match config.server.bind {
            Some(bind) => parse_bind(&bind)?,
            None => defaults.bind,
        };

        Ok(ResolvedConfig {
            esi_base_url,
            layout_url_template,
            user_agent,
            request_timeout,
            max_attempts,
            tuning,
            layout_regions,
            canvas,
            author,
            galaxy_file,
            maps_dir,
            bind,
        })
    }
}

pub fn parse_bind(value: &str) -> Result<SocketAddr, MapperError> {
    value
        .parse()
        .map_err(|err| invalid("server.bind", &format!("{value:?}: {err}")))
}

fn resolve_stage(stage: Stage, config: Option<StageConfig>) -> Result<StageTuning, MapperError> {
    let defaults = StageTuning::default_for(stage);
    let config = config.unwrap_or_default();
    let tuning = StageTuning {
        workers: config.workers.unwrap_or(defaults.workers),
        input_capacity: config.input_capacity.unwrap_or(defaults.input_capacity),
        output_capacity: config.output_capacity.unwrap_or(defaults.output_capacity),
    };
    for (name, value) in [
        ("workers", tuning.workers),
        ("input_capacity", tuning.input_capacity),
        ("output_capacity", tuning.output_capacity),
    ] {
        if value == 0 {
            return Err(invalid(&format!("stages.{stage}.{name}"), "must be at least 1"));
        }
    }
    Ok(tuning)
}

fn non_empty(field: &str, value: Option<String>, default: String) -> Result<String, MapperError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(invalid(field, "must not be empty")),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

fn invalid(field: &str, message: &str) -> MapperError {
    MapperError::InvalidConfig {
        field: field.to_string(),
        message: message.to_string(),
    }
}
