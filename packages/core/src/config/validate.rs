//! Configuration validation
//!
//! Turns raw resolved values into a fully populated [`ClientConfig`], or
//! fails with the first violated check. Checks run in a fixed order and
//! short-circuit; later stages never see a partial or best-effort config.

use std::collections::HashSet;

use url::Url;

use super::{
    normalize_host, ClientConfig, ConfigError, ResolvedSources, DEFAULT_HEIGHT, DEFAULT_TITLE,
    DEFAULT_WIDTH, KEY_ALLOWED_HOSTS, KEY_ALLOW_LOCALHOST_RELEASE, KEY_APP_URL,
    KEY_ENFORCE_WEB_BUILD, KEY_MIN_WEB_BUILD_HASH, KEY_WINDOW_HEIGHT, KEY_WINDOW_TITLE,
    KEY_WINDOW_WIDTH, LOOPBACK_HOSTS,
};

/// Validate resolved sources for the build profile of this binary.
///
/// Release builds refuse loopback targets (check 3); debug builds skip that
/// check so developers can point the shell at a local dev server.
pub fn validate_sources(sources: &ResolvedSources) -> Result<ClientConfig, ConfigError> {
    validate_for_profile(sources, !cfg!(debug_assertions))
}

/// Profile-explicit validation. Checks run in a fixed order:
///
/// 1. `APP_URL` present, absolute, http(s), with a host
/// 2. `ALLOWED_HOSTS` present and non-empty
/// 3. Release only: loopback `APP_URL` host requires the explicit override
/// 4. `ALLOWED_HOSTS` must contain the `APP_URL` host
pub fn validate_for_profile(
    sources: &ResolvedSources,
    release: bool,
) -> Result<ClientConfig, ConfigError> {
    let app_url_raw = sources.get(KEY_APP_URL).ok_or(ConfigError::MissingAppUrl)?;

    let app_url = Url::parse(app_url_raw).map_err(|error| ConfigError::InvalidAppUrl {
        value: app_url_raw.to_string(),
        reason: error.to_string(),
    })?;

    if app_url.scheme() != "http" && app_url.scheme() != "https" {
        return Err(ConfigError::InvalidAppUrl {
            value: app_url_raw.to_string(),
            reason: format!("scheme '{}' is not http or https", app_url.scheme()),
        });
    }

    let app_host = app_url
        .host_str()
        .map(normalize_host)
        .ok_or_else(|| ConfigError::InvalidAppUrl {
            value: app_url_raw.to_string(),
            reason: "URL has no host".to_string(),
        })?;

    let allowed_hosts: HashSet<String> = sources
        .get(KEY_ALLOWED_HOSTS)
        .map(|raw| {
            raw.split(',')
                .map(normalize_host)
                .filter(|host| !host.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if allowed_hosts.is_empty() {
        return Err(ConfigError::MissingAllowedHosts);
    }

    let allow_localhost_release =
        parse_bool(sources, KEY_ALLOW_LOCALHOST_RELEASE)?.unwrap_or(false);

    if release && LOOPBACK_HOSTS.contains(&app_host.as_str()) && !allow_localhost_release {
        return Err(ConfigError::LocalhostNotAllowedInRelease { host: app_host });
    }

    if !allowed_hosts.contains(&app_host) {
        return Err(ConfigError::AppHostNotAllowlisted { host: app_host });
    }

    let window_title = sources
        .get(KEY_WINDOW_TITLE)
        .unwrap_or(DEFAULT_TITLE)
        .to_string();
    let window_width = parse_dimension(sources, KEY_WINDOW_WIDTH)?.unwrap_or(DEFAULT_WIDTH);
    let window_height = parse_dimension(sources, KEY_WINDOW_HEIGHT)?.unwrap_or(DEFAULT_HEIGHT);

    let min_web_build_hash = match sources.get(KEY_MIN_WEB_BUILD_HASH) {
        Some(raw) => Some(parse_hash_prefix(raw)?),
        None => None,
    };

    // Parity failures block launch by default only in release builds
    let enforce_web_build = parse_bool(sources, KEY_ENFORCE_WEB_BUILD)?.unwrap_or(release);

    Ok(ClientConfig {
        app_url,
        allowed_hosts,
        window_title,
        window_width,
        window_height,
        min_web_build_hash,
        enforce_web_build,
        allow_localhost_release,
    })
}

/// Boolean parsing shared by ENFORCE_WEB_BUILD and ALLOW_LOCALHOST_RELEASE
fn parse_bool(sources: &ResolvedSources, key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = sources.get(key) else {
        return Ok(None);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "n" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::invalid_value(
            key,
            "must be a boolean (true/false/1/0)",
            raw,
        )),
    }
}

fn parse_dimension(sources: &ResolvedSources, key: &str) -> Result<Option<u32>, ConfigError> {
    let Some(raw) = sources.get(key) else {
        return Ok(None);
    };

    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| ConfigError::invalid_value(key, "must be a positive integer", raw))
}

/// Lower-cases and checks the configured minimum build hash prefix
fn parse_hash_prefix(raw: &str) -> Result<String, ConfigError> {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::invalid_value(
            KEY_MIN_WEB_BUILD_HASH,
            "must be a hexadecimal hash prefix",
            raw,
        ));
    }
    Ok(normalized)
}
