//! Server configuration, read from flags or `ALGODECK_*` environment
//! variables.

use algodeck_core::auth::GateConfig;
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// Listen address
    #[arg(long, env = "ALGODECK_ADDR", default_value = "127.0.0.1:5000")]
    pub addr: SocketAddr,

    /// Directory holding the record collections
    #[arg(long, env = "ALGODECK_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// HS256 secret for bearer tokens
    #[arg(long, env = "ALGODECK_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// JWKS endpoint for RS256 bearer tokens
    #[arg(long, env = "ALGODECK_JWKS_URL")]
    pub jwks_url: Option<String>,

    /// Accept an unverified X-User-Id header (development only)
    #[arg(long, env = "ALGODECK_TRUST_USER_HEADER")]
    pub trust_user_header: bool,

    /// Include failure details in 500 responses
    #[arg(long, env = "ALGODECK_DEBUG_ERRORS")]
    pub debug_errors: bool,

    /// Origin allowed by CORS
    #[arg(long, env = "ALGODECK_CORS_ORIGIN", default_value = "http://localhost:5173")]
    pub cors_origin: String,
}

impl Config {
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            jwt_secret: self.jwt_secret.clone(),
            jwks_url: self.jwks_url.clone(),
            trust_user_header: self.trust_user_header,
        }
    }
}
