use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const LOG_ENV: &str = "CLASSBOOKD_LOG";

#[derive(Parser, Debug)]
#[command(name = "classbookd")]
#[command(about = "Classroom gradebook sidecar speaking line-delimited JSON on stdio")]
#[command(version)]
pub struct Cli {
    /// Workspace folder holding the local cache database.
    #[arg(long)]
    pub workspace: Option<PathBuf>,
    /// Remote document store: `memory`, or a path to a SQLite file.
    #[arg(long, default_value = "memory")]
    pub remote: String,
    /// Quiet period before local changes are pushed.
    #[arg(long, default_value_t = 3000)]
    pub debounce_ms: u64,
    /// Log filter, overrides CLASSBOOKD_LOG.
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub remote: String,
    pub push_delay: Duration,
    pub log_filter: String,
}

impl Config {
    pub fn from_cli(cli: Cli, env_filter: Option<String>) -> Self {
        let log_filter = cli
            .log_level
            .or(env_filter)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "info".to_string());
        Self {
            workspace: cli.workspace,
            remote: cli.remote,
            push_delay: Duration::from_millis(cli.debounce_ms),
            log_filter,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            remote: "memory".to_string(),
            push_delay: crate::sync::DEFAULT_PUSH_DELAY,
            log_filter: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_three_second_push_delay() {
        let cli = Cli::parse_from(["classbookd"]);
        let config = Config::from_cli(cli, None);
        assert_eq!(config.push_delay, Duration::from_secs(3));
        assert_eq!(config.remote, "memory");
        assert_eq!(config.log_filter, "info");
        assert!(config.workspace.is_none());
    }

    #[test]
    fn flag_beats_environment_filter() {
        let cli = Cli::parse_from(["classbookd", "--log-level", "debug", "--debounce-ms", "50"]);
        let config = Config::from_cli(cli, Some("warn".into()));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.push_delay, Duration::from_millis(50));

        let cli = Cli::parse_from(["classbookd", "--workspace", "/tmp/ws"]);
        let config = Config::from_cli(cli, Some("warn".into()));
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.workspace, Some(PathBuf::from("/tmp/ws")));
    }
}
