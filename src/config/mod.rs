use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::screens::ListScreen;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    #[serde(alias = "api_url")]
    pub base_url: Option<String>,
    pub token_file: Option<String>,
    pub timeout: Option<usize>,
    pub proxy: Option<String>,
    pub follow_redirects: Option<bool>,
    pub retry: Option<bool>,
    pub rate: Option<u32>,
    pub page_size: Option<usize>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
    pub screens: Option<Vec<ListScreen>>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".leasedesk").join("config.yml"))
}

pub fn default_token_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".leasedesk").join("token"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str::<ConfigFile>(contents)
}

fn default_config_yaml() -> String {
    r#"# leasedesk config
#
# Location (default):
#   ~/.leasedesk/config.yml

# Backend
# base_url: https://api.example.com
# token_file: ~/.leasedesk/token

# HTTP
timeout: 10
# proxy: http://127.0.0.1:8080
follow_redirects: true
# one extra attempt when the backend cannot be reached
retry: true
# related-entity lookups per second (0 = unlimited)
rate: 0

# Lists
page_size: 10
output_format: text
no_color: false

# Extra or overriding list screens
# screens:
#   - name: invoices
#     title: Invoices
#     collection: { endpoint: invoices, response_key: invoices }
#     foreign_keys:
#       - { field: contract_id, collection: contracts, display_fields: [number] }
#     columns:
#       - { title: Contract, field: contract_id }
#       - { title: Amount, field: amount }
#     search_fields: [contract_id, amount]
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_parses() {
        let cfg = parse_config(&default_config_yaml()).unwrap();
        assert_eq!(cfg.timeout, Some(10));
        assert_eq!(cfg.page_size, Some(10));
        assert_eq!(cfg.retry, Some(true));
        assert!(cfg.base_url.is_none());
        assert!(cfg.screens.is_none());
    }

    #[test]
    fn api_url_alias_and_empty_file() {
        let cfg = parse_config("api_url: http://localhost:5000\n").unwrap();
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:5000"));
        assert!(parse_config("   \n").unwrap().base_url.is_none());
    }

    #[test]
    fn missing_file_is_allowed_only_when_asked() {
        let path = std::env::temp_dir().join(format!(
            "leasedesk-missing-{}/config.yml",
            std::process::id()
        ));
        assert!(load_config(&path, true).is_ok());
        assert!(load_config(&path, false).is_err());
    }

    #[test]
    fn default_file_is_written_once() {
        let path = std::env::temp_dir()
            .join(format!("leasedesk-config-{}", std::process::id()))
            .join("config.yml");
        ensure_default_config_file(&path).unwrap();
        std::fs::write(&path, "page_size: 3\n").unwrap();
        ensure_default_config_file(&path).unwrap();
        assert_eq!(load_config(&path, false).unwrap().page_size, Some(3));
    }
}
