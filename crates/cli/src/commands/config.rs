use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use retrospect_core::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    let mut push = |key: &str, value: &str, env_key: Option<&str>| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push(
        "llm.provider",
        &format!("{:?}", config.llm.provider),
        Some("RETROSPECT_LLM_PROVIDER"),
    );
    push("llm.model", &config.llm.model, Some("RETROSPECT_LLM_MODEL"));
    push("llm.base_url", &config.llm.base_url, Some("RETROSPECT_LLM_BASE_URL"));
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    push("llm.api_key", llm_api_key, Some("RETROSPECT_LLM_API_KEY"));
    push(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        Some("RETROSPECT_LLM_TIMEOUT_SECS"),
    );

    push("server.bind_address", &config.server.bind_address, Some("RETROSPECT_SERVER_BIND_ADDRESS"));
    push("server.port", &config.server.port.to_string(), Some("RETROSPECT_SERVER_PORT"));
    push(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        Some("RETROSPECT_SERVER_GRACEFUL_SHUTDOWN_SECS"),
    );

    // Interview tunables are file-only; no env override exists for them.
    push(
        "interview.checkpoint_interval",
        &config.interview.checkpoint_interval.to_string(),
        None,
    );
    push(
        "interview.checkpoint_min_completion_pct",
        &config.interview.checkpoint_min_completion_pct.to_string(),
        None,
    );
    push(
        "interview.smart_exit_min_rounds",
        &config.interview.smart_exit_min_rounds.to_string(),
        None,
    );
    push(
        "interview.smart_exit_min_completion_pct",
        &config.interview.smart_exit_min_completion_pct.to_string(),
        None,
    );
    push(
        "interview.smart_exit_min_filled",
        &config.interview.smart_exit_min_filled.to_string(),
        None,
    );
    push(
        "interview.phrase_exit_min_rounds",
        &config.interview.phrase_exit_min_rounds.to_string(),
        None,
    );
    push(
        "interview.correct_medium_severity",
        &config.interview.correct_medium_severity.to_string(),
        None,
    );
    push("interview.history_window", &config.interview.history_window.to_string(), None);

    push("logging.level", &config.logging.level, Some("RETROSPECT_LOGGING_LEVEL"));
    push(
        "logging.format",
        &format!("{:?}", config.logging.format),
        Some("RETROSPECT_LOGGING_FORMAT"),
    );

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("retrospect.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/retrospect.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = r#"
            [llm]
            model = "deepseek-chat"
        "#
        .parse()
        .expect("toml");

        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
