//! ConfigSource resolution
//!
//! Four ranked sources feed resolution, highest precedence first:
//!
//! 1. Process environment, namespaced keys only (`KIOSK_CLIENT_APP_URL`)
//! 2. `client.env` in the current working directory
//! 3. `client.env` next to the executable
//! 4. `client.env` in the per-user config directory
//!
//! Precedence is per key: the first source that defines a key wins for that
//! key, and resolution walks on to lower tiers only for keys still
//! undefined. A file defining only `WINDOW_TITLE` at a higher tier does not
//! suppress `APP_URL` from a lower tier. File sources accept both the
//! namespaced and the legacy bare key names; the raw process environment
//! accepts only the namespaced form.
//!
//! If the per-user file does not exist at all it is synthesized with the
//! compiled-in default payload before resolution reads it, and a stale
//! historical default `APP_URL` is migrated in place. Both writes run at
//! most once per process start; they are the only persistent mutations the
//! core performs apart from the startup log.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::{
    ConfigError, DEFAULT_ALLOWED_HOSTS, DEFAULT_APP_URL, DEFAULT_HEIGHT, DEFAULT_TITLE,
    DEFAULT_WIDTH, ENV_PREFIX, RECOGNIZED_KEYS,
};
use crate::paths;

/// Marker line identifying a `client.env` this client wrote itself.
/// Migration only ever touches auto-generated files; operator-edited files
/// are left alone.
const GENERATED_HEADER: &str = "# Auto-generated default configuration for Kiosk Client.";

/// Historical default target that shipped in early auto-generated files
const STALE_DEFAULT_APP_URL_LINE: &str = "APP_URL=https://192.168.50.55";

/// Locations of the three file source tiers.
///
/// Any tier may be absent (no config dir, no executable parent). Tests
/// construct explicit layouts under a tempdir instead of touching the real
/// per-user directory.
#[derive(Debug, Clone, Default)]
pub struct SourceLayout {
    pub cwd_file: Option<PathBuf>,
    pub exe_file: Option<PathBuf>,
    pub user_file: Option<PathBuf>,
}

impl SourceLayout {
    /// Discover the standard locations for the running process
    pub fn discover() -> Self {
        let exe_file = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(paths::CLIENT_ENV_FILE)));

        Self {
            cwd_file: Some(PathBuf::from(paths::CLIENT_ENV_FILE)),
            exe_file,
            user_file: paths::user_config_file(),
        }
    }
}

/// Result of walking the four sources: resolved raw values with per-key
/// origin tracking, plus resolution diagnostics and non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSources {
    values: HashMap<String, ResolvedValue>,
    /// `key=value` lines for the startup log
    pub diagnostics: Vec<String>,
    /// Non-fatal degradations (unreadable sources, failed first-run writes)
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
struct ResolvedValue {
    value: String,
    origin: String,
}

impl ResolvedSources {
    /// Raw value for a bare key name, if any source defined it
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.value.as_str())
    }

    /// Human-readable origin of a resolved key ("process env …", "client.env …")
    pub fn origin(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.origin.as_str())
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&mut self, key: &str, value: &str) {
        self.values.insert(
            key.to_string(),
            ResolvedValue {
                value: value.to_string(),
                origin: "test".to_string(),
            },
        );
    }
}

/// Walks the four configuration sources and owns the one-shot first-run
/// file synthesis/migration guard.
///
/// The process constructs exactly one resolver at startup (inside
/// [`crate::gate::LaunchGate::initialize`]); invoking [`resolve`] more than
/// once on it performs no additional file writes.
///
/// [`resolve`]: ConfigResolver::resolve
#[derive(Debug)]
pub struct ConfigResolver {
    layout: SourceLayout,
    file_setup: OnceLock<Vec<String>>,
}

impl ConfigResolver {
    /// Resolver over the standard source locations
    pub fn new() -> Self {
        Self::with_layout(SourceLayout::discover())
    }

    /// Resolver over an explicit layout (tests, diagnostics tooling)
    pub fn with_layout(layout: SourceLayout) -> Self {
        Self {
            layout,
            file_setup: OnceLock::new(),
        }
    }

    /// Resolve raw configuration values from all four sources,
    /// reading namespaced keys from the real process environment.
    pub fn resolve(&self) -> ResolvedSources {
        let env: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self.resolve_with_env(&env)
    }

    /// Resolve against an explicit environment map. The map is keyed by the
    /// full namespaced variable names, exactly as the process environment is.
    pub fn resolve_with_env(&self, env: &HashMap<String, String>) -> ResolvedSources {
        let mut resolved = ResolvedSources::default();

        // First-run synthesis and stale-default migration, at most once per
        // process. Later invocations replay the recorded diagnostics.
        let setup_diags = self
            .file_setup
            .get_or_init(|| prepare_user_file(self.layout.user_file.as_deref()));
        resolved.diagnostics.extend(setup_diags.iter().cloned());

        let file_tiers = [
            ("client.env (cwd)", self.layout.cwd_file.as_deref()),
            ("client.env (exe dir)", self.layout.exe_file.as_deref()),
            ("client.env (user)", self.layout.user_file.as_deref()),
        ];

        let mut loaded_tiers: Vec<(&str, HashMap<String, String>)> = Vec::new();
        for (label, path) in file_tiers {
            let Some(path) = path else {
                continue;
            };
            if !path.exists() {
                continue;
            }
            match read_client_env(path) {
                Ok(values) => loaded_tiers.push((label, values)),
                Err(error) => {
                    tracing::warn!(source = label, %error, "configuration source degraded to empty");
                    resolved.warnings.push(error.to_string());
                    resolved
                        .diagnostics
                        .push(format!("source_unreadable={label}"));
                }
            }
        }

        for key in RECOGNIZED_KEYS {
            let hit = lookup_env(env, key).or_else(|| {
                loaded_tiers
                    .iter()
                    .find_map(|(label, values)| lookup_file(label, values, key))
            });

            let diag_key = key.to_ascii_lowercase();
            match hit {
                Some(resolved_value) => {
                    resolved
                        .diagnostics
                        .push(format!("{diag_key}_source={}", resolved_value.origin));
                    resolved.values.insert(key.to_string(), resolved_value);
                }
                None => resolved.diagnostics.push(format!("{diag_key}_source=unset")),
            }
        }

        resolved
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Process environment lookup: namespaced key only, blank values ignored
fn lookup_env(env: &HashMap<String, String>, key: &str) -> Option<ResolvedValue> {
    let namespaced = format!("{ENV_PREFIX}{key}");
    let value = env.get(&namespaced)?.trim();
    if value.is_empty() {
        return None;
    }
    Some(ResolvedValue {
        value: value.to_string(),
        origin: format!("process env {namespaced}"),
    })
}

/// File tier lookup: namespaced name first, then the legacy bare name
fn lookup_file(
    label: &str,
    values: &HashMap<String, String>,
    key: &str,
) -> Option<ResolvedValue> {
    let namespaced = format!("{ENV_PREFIX}{key}");
    for name in [namespaced.as_str(), key] {
        if let Some(value) = values.get(name) {
            let value = value.trim();
            if !value.is_empty() {
                return Some(ResolvedValue {
                    value: value.to_string(),
                    origin: format!("{label} {name}"),
                });
            }
        }
    }
    None
}

/// Read and parse one `client.env` tier.
///
/// Returns `ConfigError::SourceUnreadable` when the file exists but cannot
/// be read as UTF-8 text; malformed individual lines are skipped.
fn read_client_env(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|error| ConfigError::SourceUnreadable {
        source_path: path.display().to_string(),
        reason: error.to_string(),
    })?;
    Ok(parse_client_env(&content))
}

/// Parse newline-separated `KEY=VALUE` lines.
/// `#`-prefixed lines and blank lines are ignored; surrounding single or
/// double quotes on values are stripped; there is no escaping.
pub fn parse_client_env(content: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let value = value.trim().trim_matches('"').trim_matches('\'');
            values.insert(key.to_string(), value.to_string());
        }
    }

    values
}

/// Default payload written into a freshly synthesized per-user `client.env`
pub fn default_client_env_contents() -> String {
    format!(
        "{GENERATED_HEADER}\n\
         # Update APP_URL and ALLOWED_HOSTS if your deployment target changes.\n\
         APP_URL={DEFAULT_APP_URL}\n\
         ALLOWED_HOSTS={DEFAULT_ALLOWED_HOSTS}\n\
         WINDOW_TITLE={DEFAULT_TITLE}\n\
         WINDOW_WIDTH={DEFAULT_WIDTH}\n\
         WINDOW_HEIGHT={DEFAULT_HEIGHT}\n"
    )
}

/// One-shot per-user file maintenance: migrate a stale auto-generated
/// default in place, or synthesize the file if it is missing entirely.
/// Best effort: failures degrade to diagnostics, never abort resolution.
fn prepare_user_file(user_file: Option<&Path>) -> Vec<String> {
    let Some(path) = user_file else {
        return vec!["user_config=unavailable (no config dir)".to_string()];
    };

    if path.exists() {
        return migrate_stale_default(path);
    }

    if let Some(parent) = path.parent() {
        if let Err(error) = fs::create_dir_all(parent) {
            return vec![format!(
                "user_config=create-dir-failed '{}': {error}",
                parent.display()
            )];
        }
    }

    match fs::write(path, default_client_env_contents()) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "synthesized default client.env");
            vec![format!("user_config=created {}", path.display())]
        }
        Err(error) => vec![format!(
            "user_config=create-failed '{}': {error}",
            path.display()
        )],
    }
}

/// Rewrite the known-stale historical default `APP_URL` to the current one.
/// Only files still carrying the auto-generated header are ever touched.
fn migrate_stale_default(path: &Path) -> Vec<String> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return vec!["user_config=present (unreadable)".to_string()],
    };

    if !content.contains(GENERATED_HEADER) || !content.contains(STALE_DEFAULT_APP_URL_LINE) {
        return vec!["user_config=present".to_string()];
    }

    let updated = content.replace(
        STALE_DEFAULT_APP_URL_LINE,
        &format!("APP_URL={DEFAULT_APP_URL}"),
    );
    match fs::write(path, updated) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "migrated stale default APP_URL");
            vec!["user_config=migrated stale APP_URL default".to_string()]
        }
        Err(error) => vec![format!(
            "user_config=migrate-failed '{}': {error}",
            path.display()
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::super::{KEY_APP_URL, KEY_WINDOW_TITLE};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_key_value_lines_and_skips_comments() {
        let values = parse_client_env(
            "# comment\n\
             \n\
             APP_URL=http://example.com\n\
             WINDOW_TITLE=\"Ops Console\"\n\
             BROKEN LINE WITHOUT EQUALS\n\
             =no-key\n\
             ALLOWED_HOSTS='example.com'\n",
        );

        assert_eq!(values.get("APP_URL").map(String::as_str), Some("http://example.com"));
        assert_eq!(values.get("WINDOW_TITLE").map(String::as_str), Some("Ops Console"));
        assert_eq!(values.get("ALLOWED_HOSTS").map(String::as_str), Some("example.com"));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn env_lookup_rejects_bare_names() {
        let mut env = HashMap::new();
        env.insert("APP_URL".to_string(), "http://stray.example.com".to_string());

        let resolver = ConfigResolver::with_layout(SourceLayout::default());
        let resolved = resolver.resolve_with_env(&env);
        assert_eq!(resolved.get(KEY_APP_URL), None);
    }

    #[test]
    fn env_lookup_accepts_namespaced_names() {
        let mut env = HashMap::new();
        env.insert(
            format!("{ENV_PREFIX}APP_URL"),
            "http://env.example.com".to_string(),
        );

        let resolver = ConfigResolver::with_layout(SourceLayout::default());
        let resolved = resolver.resolve_with_env(&env);
        assert_eq!(resolved.get(KEY_APP_URL), Some("http://env.example.com"));
        assert_eq!(
            resolved.origin(KEY_APP_URL),
            Some("process env KIOSK_CLIENT_APP_URL")
        );
    }

    #[test]
    fn blank_env_values_are_treated_as_undefined() {
        let mut env = HashMap::new();
        env.insert(format!("{ENV_PREFIX}APP_URL"), "   ".to_string());

        let resolver = ConfigResolver::with_layout(SourceLayout::default());
        let resolved = resolver.resolve_with_env(&env);
        assert_eq!(resolved.get(KEY_APP_URL), None);
    }

    #[test]
    fn file_tier_accepts_both_namespaced_and_legacy_names() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("client.env");
        fs::write(
            &file,
            "KIOSK_CLIENT_APP_URL=http://ns.example.com\nWINDOW_TITLE=Legacy\n",
        )
        .unwrap();

        let resolver = ConfigResolver::with_layout(SourceLayout {
            cwd_file: Some(file),
            ..Default::default()
        });
        let resolved = resolver.resolve_with_env(&HashMap::new());

        assert_eq!(resolved.get(KEY_APP_URL), Some("http://ns.example.com"));
        assert_eq!(resolved.get(KEY_WINDOW_TITLE), Some("Legacy"));
    }
}
