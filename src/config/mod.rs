use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

use crate::models::layout::{LayoutError, PageConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Recognition provider client id (API key)
    pub ocr_client_id: String,

    /// Recognition provider client secret
    pub ocr_client_secret: String,

    /// OAuth token endpoint of the recognition provider
    #[serde(default = "default_token_url")]
    pub ocr_token_url: String,

    /// Identity-card recognition endpoint
    #[serde(default = "default_recognition_url")]
    pub ocr_recognition_url: String,

    /// Route recognition through a remote proxy instead of calling the provider directly
    #[serde(default)]
    pub ocr_proxy_url: Option<String>,

    /// Remote synthetic-data endpoint, tried after the provider fails.
    /// Defaults to this server's own `/api/mock-ocr`.
    #[serde(default)]
    pub synthetic_url: Option<String>,

    #[serde(default = "default_token_timeout_secs")]
    pub token_timeout_secs: u64,

    #[serde(default = "default_recognition_timeout_secs")]
    pub recognition_timeout_secs: u64,

    #[serde(default = "default_synthetic_timeout_secs")]
    pub synthetic_timeout_secs: u64,

    /// Seconds subtracted from the token lifetime before it is considered expired
    #[serde(default = "default_token_safety_margin_secs")]
    pub token_safety_margin_secs: u64,

    /// Page geometry in millimetres
    #[serde(default = "default_page_width_mm")]
    pub page_width_mm: f64,

    #[serde(default = "default_page_height_mm")]
    pub page_height_mm: f64,

    #[serde(default = "default_page_margin_mm")]
    pub page_margin_mm: f64,

    #[serde(default = "default_image_gap_mm")]
    pub image_gap_mm: f64,

    /// Largest accepted single image, in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Largest accepted request body, in bytes (batches carry many images)
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Title written into generated PDF metadata
    #[serde(default = "default_document_title")]
    pub document_title: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_token_url() -> String {
    "https://aip.baidubce.com/oauth/2.0/token".to_string()
}

fn default_recognition_url() -> String {
    "https://aip.baidubce.com/rest/2.0/ocr/v1/idcard".to_string()
}

fn default_token_timeout_secs() -> u64 {
    15
}

fn default_recognition_timeout_secs() -> u64 {
    30
}

fn default_synthetic_timeout_secs() -> u64 {
    10
}

fn default_token_safety_margin_secs() -> u64 {
    300
}

fn default_page_width_mm() -> f64 {
    210.0
}

fn default_page_height_mm() -> f64 {
    297.0
}

fn default_page_margin_mm() -> f64 {
    20.0
}

fn default_image_gap_mm() -> f64 {
    10.0
}

fn default_max_image_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_request_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_document_title() -> String {
    "Identity Document".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.page_config()?;
        Ok(config)
    }

    /// Validated page geometry.
    pub fn page_config(&self) -> Result<PageConfig, ConfigError> {
        let page = PageConfig {
            page_width: self.page_width_mm,
            page_height: self.page_height_mm,
            margin: self.page_margin_mm,
            image_gap: self.image_gap_mm,
        };
        page.validate()?;
        Ok(page)
    }

    /// Endpoint of the remote synthetic tier: the configured URL, else the
    /// synthetic route of this server reached over loopback.
    pub fn synthetic_endpoint(&self) -> String {
        if let Some(url) = &self.synthetic_url {
            return url.clone();
        }
        let authority = match self.bind_addr.parse::<SocketAddr>() {
            Ok(mut addr) => {
                if addr.ip().is_unspecified() {
                    let loopback = match addr.ip() {
                        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
                    };
                    addr.set_ip(loopback);
                }
                addr.to_string()
            }
            Err(_) => self.bind_addr.clone(),
        };
        format!("http://{}/api/mock-ocr", authority)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout_secs)
    }

    pub fn synthetic_timeout(&self) -> Duration {
        Duration::from_secs(self.synthetic_timeout_secs)
    }

    pub fn token_safety_margin(&self) -> Duration {
        Duration::from_secs(self.token_safety_margin_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid page geometry: {0}")]
    Page(#[from] LayoutError),
}
