use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use url::Url;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:2346";
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:2346/api";

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to (`RIPPLE_ADDR`).
    pub bind_addr: SocketAddr,
    /// Directory for disk-backed uploads (`RIPPLE_UPLOAD_DIR`).
    pub upload_dir: PathBuf,
    /// When set, uploads are forwarded to this service instead of saved
    /// locally (`RIPPLE_UPLOAD_PROXY`).
    pub upload_proxy: Option<Url>,
    /// Base url clients resolve `/chat` and `/upload` against
    /// (`RIPPLE_API_URL`).
    pub api_base_url: Url,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("RIPPLE_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("invalid RIPPLE_ADDR: {}", bind_addr))?;

        let upload_dir = std::env::var("RIPPLE_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let upload_proxy = match std::env::var("RIPPLE_UPLOAD_PROXY") {
            Ok(raw) => {
                Some(Url::parse(&raw).with_context(|| format!("invalid RIPPLE_UPLOAD_PROXY: {}", raw))?)
            }
            Err(_) => None,
        };

        let api_base_url =
            std::env::var("RIPPLE_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_base_url = Url::parse(&api_base_url)
            .with_context(|| format!("invalid RIPPLE_API_URL: {}", api_base_url))?;

        Ok(Self {
            bind_addr,
            upload_dir,
            upload_proxy,
            api_base_url,
        })
    }
}
