use clap::Args;
use std::path::PathBuf;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Process configuration. Every flag can also come from the environment.
#[derive(Debug, Clone, Args)]
pub struct AppConfig {
    /// Directory holding `dealmind.db`
    #[arg(long, env = "DEALMIND_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the collaborating REST backend
    #[arg(long, env = "DEALMIND_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Where exported datasets are written
    #[arg(long, env = "DEALMIND_EXPORT_DIR", default_value = ".")]
    pub export_dir: PathBuf,

    /// Log filter directive, e.g. `info` or `dealmind_lab_lib=debug`
    #[arg(long, env = "DEALMIND_LOG", default_value = "info")]
    pub log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            export_dir: PathBuf::from("."),
            log: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// The configured data dir, else the platform data dir, else `./.dealmind`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("dealmind-lab")))
            .unwrap_or_else(|| PathBuf::from(".dealmind"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        config: AppConfig,
    }

    #[test]
    fn explicit_data_dir_wins() {
        let cli = Cli::parse_from(["dealmind", "--data-dir", "/tmp/dm", "--backend-url", "http://api:9000"]);
        assert_eq!(cli.config.resolved_data_dir(), PathBuf::from("/tmp/dm"));
        assert_eq!(cli.config.backend_url, "http://api:9000");
    }

    #[test]
    fn default_data_dir_is_named_after_the_app() {
        let dir = AppConfig::default().resolved_data_dir();
        assert!(dir.ends_with("dealmind-lab") || dir.ends_with(".dealmind"));
    }
}
