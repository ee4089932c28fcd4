//! Startup update check.
//!
//! Queries a configured endpoint for the latest released version and, when
//! `auto_update` is set, downloads the matching asset. The check is best
//! effort: any failure is surfaced as a warning by the caller and never
//! blocks the sync itself. Installation is left to the operator.

use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use crate::config::UpdateConfig;
use crate::domain::errors::{Result, SyncError};

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Latest released version and where to fetch it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub url: String,
}

/// Checks for a newer version and optionally downloads it.
///
/// Returns `(newer_available, downloaded_path, info)`. An empty `check_url`
/// disables the whole flow.
pub fn run_update_flow(
    current_version: &str,
    cfg: &UpdateConfig,
) -> Result<(bool, Option<String>, UpdateInfo)> {
    if cfg.check_url.trim().is_empty() {
        debug!("No update endpoint configured, skipping check");
        return Ok((false, None, UpdateInfo::default()));
    }

    let info = fetch_update_info(&cfg.check_url)?;
    if !is_newer_version(current_version, &info.version) {
        debug!(
            "No newer version found (current={}, remote={})",
            current_version, info.version
        );
        return Ok((false, None, info));
    }

    if cfg.auto_update && !info.url.is_empty() {
        info!("Auto-update enabled, downloading {}", info.version);
        let path = download_update(&info.url, &cfg.download_dir)?;
        return Ok((true, Some(path), info));
    }

    Ok((true, None, info))
}

fn fetch_update_info(url: &str) -> Result<UpdateInfo> {
    // GitHub release pages go through the API; anything else must serve the
    // `{"version": ..., "url": ...}` JSON directly.
    if let Some((owner, repo)) = parse_github_owner_repo(url) {
        return fetch_from_github_api(&owner, &repo);
    }

    let client = http_client(CHECK_TIMEOUT)?;
    let response = client
        .get(url)
        .send()
        .map_err(|e| SyncError::UpdateCheck(e.to_string()))?;
    if !response.status().is_success() {
        return Err(SyncError::UpdateCheck(format!(
            "unexpected status code {}",
            response.status()
        )));
    }
    response
        .json::<UpdateInfo>()
        .map_err(|e| SyncError::UpdateCheck(format!("invalid update info: {}", e)))
}

fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent("stocksync-updater")
        .build()
        .map_err(|e| SyncError::UpdateCheck(e.to_string()))
}

/// Extracts owner and repo from GitHub release URLs such as
/// `https://github.com/owner/repo/releases/latest`.
fn parse_github_owner_repo(url: &str) -> Option<(String, String)> {
    let rest = url.strip_prefix("https://")?;
    let mut parts = rest.split('/');
    if parts.next()? != "github.com" {
        return None;
    }
    let owner = parts.next()?;
    let repo = parts.next()?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

fn fetch_from_github_api(owner: &str, repo: &str) -> Result<UpdateInfo> {
    #[derive(Deserialize)]
    struct ReleaseAsset {
        #[serde(default)]
        browser_download_url: String,
        #[serde(default)]
        name: String,
    }

    #[derive(Deserialize)]
    struct Release {
        #[serde(default)]
        tag_name: String,
        #[serde(default)]
        assets: Vec<ReleaseAsset>,
        #[serde(default)]
        zipball_url: String,
    }

    let api_url = format!(
        "https://api.github.com/repos/{}/{}/releases/latest",
        owner, repo
    );
    let client = http_client(CHECK_TIMEOUT)?;
    let response = client
        .get(&api_url)
        .header("Accept", "application/vnd.github+json")
        .send()
        .map_err(|e| SyncError::UpdateCheck(e.to_string()))?;
    if !response.status().is_success() {
        return Err(SyncError::UpdateCheck(format!(
            "GitHub API returned status {}",
            response.status()
        )));
    }

    let release: Release = response
        .json()
        .map_err(|e| SyncError::UpdateCheck(format!("invalid release info: {}", e)))?;

    let mut info = UpdateInfo {
        version: release.tag_name,
        url: String::new(),
    };

    // Prefer an asset built for this platform, fall back to any asset,
    // then to the source zipball.
    let os_tokens = os_tokens(std::env::consts::OS);
    let arch_tokens = arch_tokens(std::env::consts::ARCH);
    for asset in &release.assets {
        let name = asset.name.to_lowercase();
        if asset.browser_download_url.is_empty() {
            continue;
        }
        if matches_any(&name, &os_tokens) && matches_any(&name, &arch_tokens) {
            info.url = asset.browser_download_url.clone();
            return Ok(info);
        }
    }
    if let Some(asset) = release
        .assets
        .iter()
        .find(|a| !a.browser_download_url.is_empty())
    {
        info.url = asset.browser_download_url.clone();
    } else {
        info.url = release.zipball_url;
    }
    Ok(info)
}

/// Lenient `vMAJOR.MINOR.PATCH` comparison; parts beyond the patch are
/// ignored and unparsable parts read as zero.
fn is_newer_version(current: &str, remote: &str) -> bool {
    if current.is_empty() || remote.is_empty() {
        return false;
    }
    let current = normalize_version(current);
    let remote = normalize_version(remote);

    let current_parts: Vec<&str> = current.split('.').collect();
    let remote_parts: Vec<&str> = remote.split('.').collect();

    for i in 0..3 {
        let c: u64 = current_parts
            .get(i)
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        let r: u64 = remote_parts
            .get(i)
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        if r > c {
            return true;
        }
        if r < c {
            return false;
        }
    }
    false
}

fn normalize_version(version: &str) -> &str {
    version.trim().trim_start_matches('v')
}

fn os_tokens(os: &str) -> Vec<&'static str> {
    match os {
        "macos" => vec!["darwin", "macos", "mac", "osx"],
        "windows" => vec!["windows", "win"],
        "linux" => vec!["linux"],
        _ => vec![],
    }
}

fn arch_tokens(arch: &str) -> Vec<&'static str> {
    match arch {
        "x86_64" => vec!["amd64", "x86_64"],
        "aarch64" => vec!["arm64", "aarch64"],
        "x86" => vec!["386", "x86"],
        _ => vec![],
    }
}

fn matches_any(name: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| name.contains(t))
}

/// Downloads the release asset into `dest_dir` and returns the file path.
pub fn download_update(download_url: &str, dest_dir: &str) -> Result<String> {
    let client = http_client(DOWNLOAD_TIMEOUT)?;
    let mut response = client
        .get(download_url)
        .send()
        .map_err(|e| SyncError::UpdateCheck(e.to_string()))?;
    if !response.status().is_success() {
        return Err(SyncError::UpdateCheck(format!(
            "unexpected status code when downloading: {}",
            response.status()
        )));
    }

    std::fs::create_dir_all(dest_dir)?;
    let file_name = determine_filename(download_url);
    let dest_path = format!("{}/{}", dest_dir.trim_end_matches('/'), file_name);

    let mut file = std::fs::File::create(&dest_path)?;
    let bytes = response
        .copy_to(&mut file)
        .map_err(|e| SyncError::UpdateCheck(format!("download failed: {}", e)))?;

    info!("Downloaded update file {} ({} bytes)", dest_path, bytes);
    Ok(dest_path)
}

/// Picks a safe file name from the download URL, refusing anything that
/// could traverse out of the destination directory.
fn determine_filename(url: &str) -> String {
    let base = url
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    if base.is_empty() || base == "." || base.contains("..") || base.contains('\\') {
        return format!(
            "stocksync-{}.bin",
            chrono::Local::now().format("%Y%m%d%H%M%S")
        );
    }
    base.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comparison_table() {
        let cases = [
            ("1.0.0", "1.0.1", true),
            ("1.0.0", "1.0.0", false),
            ("1.0.1", "1.0.0", false),
            ("1.1.0", "1.0.0", false),
            ("1.0.0", "1.1.0", true),
            ("v1.0.0", "v1.0.1", true),
            ("v1.0.0", "1.0.1", true),
            ("1.0.0", "v1.0.1", true),
            ("", "1.0.0", false),
            ("1.0.0", "", false),
            ("1.0", "1.0.1", true),
            ("1.0.0", "1.0", false),
            ("1.0.0", "1.0.0.1", false),
        ];
        for (current, remote, expected) in cases {
            assert_eq!(
                is_newer_version(current, remote),
                expected,
                "is_newer_version({:?}, {:?})",
                current,
                remote
            );
        }
    }

    #[test]
    fn normalize_strips_prefix_and_whitespace() {
        assert_eq!(normalize_version("v1.0.0"), "1.0.0");
        assert_eq!(normalize_version(" v1.0.0 "), "1.0.0");
        assert_eq!(normalize_version("1.0.0"), "1.0.0");
        assert_eq!(normalize_version("v"), "");
    }

    #[test]
    fn github_urls_are_recognized() {
        let cases = [
            ("https://github.com/acme/stocksync/releases/latest", true),
            ("https://github.com/acme/stocksync/releases", true),
            ("https://example.com/foo/bar", false),
            ("", false),
        ];
        for (url, expected) in cases {
            assert_eq!(parse_github_owner_repo(url).is_some(), expected, "{}", url);
        }
        let (owner, repo) =
            parse_github_owner_repo("https://github.com/acme/stocksync/releases/latest").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "stocksync");
    }

    #[test]
    fn unsafe_download_names_are_replaced() {
        assert_eq!(
            determine_filename("https://host/path/stocksync-linux-amd64.tar.gz"),
            "stocksync-linux-amd64.tar.gz"
        );
        assert!(determine_filename("https://host/").starts_with("stocksync-"));
        assert!(determine_filename("https://host/a/..").starts_with("stocksync-"));
    }

    #[test]
    fn empty_check_url_skips_the_flow() {
        let cfg = UpdateConfig::default();
        let (newer, path, info) = run_update_flow("1.0.0", &cfg).unwrap();
        assert!(!newer);
        assert!(path.is_none());
        assert!(info.version.is_empty());
    }
}
