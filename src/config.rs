//! Process-wide `Config`: explicit CLI flag > environment variable >
//! built-in default, for every knob an operator can tune.

const DEFAULT_MUX: &str = "tmux";
const DEFAULT_ASSISTANT: &str = "claude";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: log::LevelFilter,
    pub multiplexer_binary: String,
    pub assistant_command: String,
}

impl Config {
    /// Resolves from CLI flags (`-v` count, `--quiet` already folded into
    /// `verbosity` by the caller) and the environment. `CGWT_LOG_LEVEL`
    /// overrides `-v` per §6.
    pub fn resolve(verbosity: u8) -> Self {
        Self {
            log_level: Self::resolve_log_level(verbosity),
            multiplexer_binary: std::env::var("CGWT_MUX").unwrap_or_else(|_| DEFAULT_MUX.to_string()),
            assistant_command: std::env::var("CGWT_ASSISTANT").unwrap_or_else(|_| DEFAULT_ASSISTANT.to_string()),
        }
    }

    fn resolve_log_level(verbosity: u8) -> log::LevelFilter {
        if let Ok(from_env) = std::env::var("CGWT_LOG_LEVEL") {
            if let Some(level) = Self::parse_level(&from_env) {
                return level;
            }
            log::warn!("ignoring unrecognized CGWT_LOG_LEVEL={from_env:?}");
        }
        match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    fn parse_level(raw: &str) -> Option<log::LevelFilter> {
        match raw.to_ascii_lowercase().as_str() {
            "off" => Some(log::LevelFilter::Off),
            "error" => Some(log::LevelFilter::Error),
            "warn" => Some(log::LevelFilter::Warn),
            "info" => Some(log::LevelFilter::Info),
            "debug" => Some(log::LevelFilter::Debug),
            "trace" => Some(log::LevelFilter::Trace),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn verbosity_maps_to_level_without_env_override() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("CGWT_LOG_LEVEL");
        std::env::remove_var("CGWT_MUX");
        std::env::remove_var("CGWT_ASSISTANT");

        let config = Config::resolve(0);
        assert_eq!(config.log_level, log::LevelFilter::Warn);
        assert_eq!(config.multiplexer_binary, "tmux");
        assert_eq!(config.assistant_command, "claude");

        assert_eq!(Config::resolve(2).log_level, log::LevelFilter::Debug);
    }

    #[test]
    fn env_log_level_overrides_verbosity_flag() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("CGWT_LOG_LEVEL", "error");
        let config = Config::resolve(3);
        assert_eq!(config.log_level, log::LevelFilter::Error);
        std::env::remove_var("CGWT_LOG_LEVEL");
    }

    #[test]
    fn env_vars_override_mux_and_assistant_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("CGWT_MUX", "zellij");
        std::env::set_var("CGWT_ASSISTANT", "my-assistant");
        let config = Config::resolve(0);
        assert_eq!(config.multiplexer_binary, "zellij");
        assert_eq!(config.assistant_command, "my-assistant");
        std::env::remove_var("CGWT_MUX");
        std::env::remove_var("CGWT_ASSISTANT");
    }
}
