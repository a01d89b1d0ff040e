//! Locating and launching Chrome/Chromium
//!
//! Lookup order: the configured path, `CHROMIUM_PATH`, well-known install
//! locations, then executables on `PATH`. When every lookup misses, a
//! Chromium build is downloaded into the user cache and reused afterwards.

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Handler;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::utils::constants::CLIENT_IDENTITY;

/// Environment variable naming an explicit browser executable
pub const CHROMIUM_PATH_VAR: &str = "CHROMIUM_PATH";

/// Budget for a single CDP command round trip
const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Viewport used for rendering and document export
const WINDOW_SIZE: (u32, u32) = (1366, 900);

/// Quiet, single-purpose engine: no first-run UI, background services or
/// extensions. Nothing here hides automation.
const ENGINE_ARGS: &[&str] = &[
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-component-update",
    "--disable-sync",
    "--disable-notifications",
    "--disable-features=TranslateUI",
    "--metrics-recording-only",
    "--password-store=basic",
    "--use-mock-keychain",
    "--hide-scrollbars",
    "--mute-audio",
];

/// Executable names tried on `PATH`
const PATH_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "~/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/opt/google/chrome/chrome",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
];

/// Resolve a leading `~/` against `home`
fn expand_home(raw: &str, home: Option<&Path>) -> Option<PathBuf> {
    match raw.strip_prefix("~/") {
        Some(rest) => home.map(|h| h.join(rest)),
        None => Some(PathBuf::from(raw)),
    }
}

/// First `names` entry present as a file in any directory of `path_var`
fn search_path(path_var: &OsStr, names: &[&str]) -> Option<PathBuf> {
    std::env::split_paths(path_var).find_map(|dir| {
        names.iter().find_map(|name| {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
            let exe = candidate.with_extension("exe");
            exe.is_file().then_some(exe)
        })
    })
}

/// Locate an installed Chrome/Chromium executable
pub fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            debug!("Using configured browser {}", path.display());
            return Ok(path.to_path_buf());
        }
        warn!("Configured browser {} does not exist; searching", path.display());
    }

    if let Some(raw) = std::env::var_os(CHROMIUM_PATH_VAR) {
        let path = PathBuf::from(raw);
        if path.is_file() {
            debug!("Using browser from {CHROMIUM_PATH_VAR}: {}", path.display());
            return Ok(path);
        }
        warn!("{CHROMIUM_PATH_VAR} points at missing file {}", path.display());
    }

    let home = dirs::home_dir();
    if let Some(path) = INSTALL_LOCATIONS
        .iter()
        .filter_map(|raw| expand_home(raw, home.as_deref()))
        .find(|p| p.is_file())
    {
        debug!("Found installed browser {}", path.display());
        return Ok(path);
    }

    if let Some(path) = std::env::var_os("PATH").and_then(|p| search_path(&p, PATH_NAMES)) {
        debug!("Found browser on PATH: {}", path.display());
        return Ok(path);
    }

    Err(anyhow!("no Chrome/Chromium executable found"))
}

/// Download Chromium into the user cache (reused when already present)
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kodegen-pagefetch")
        .join("chromium");
    tokio::fs::create_dir_all(&cache_dir)
        .await
        .with_context(|| format!("Failed to create browser cache {}", cache_dir.display()))?;

    info!("Fetching managed Chromium into {}", cache_dir.display());
    let options = BrowserFetcherOptions::builder()
        .with_path(&cache_dir)
        .build()
        .context("Invalid browser fetcher options")?;
    let installed = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Failed to download Chromium")?;

    info!("Managed Chromium ready at {}", installed.executable_path.display());
    Ok(installed.executable_path)
}

/// What to launch and where its profile lives
#[derive(Debug, Clone, Copy)]
pub struct LaunchSpec<'a> {
    pub headless: bool,
    pub profile_dir: &'a Path,
    /// Skips discovery when it exists
    pub chrome_path: Option<&'a Path>,
}

/// Launch one engine process that identifies itself as [`CLIENT_IDENTITY`].
///
/// Returns the browser and the task pumping its CDP event stream; the task
/// ends when the process goes away.
pub async fn launch_browser(spec: &LaunchSpec<'_>) -> Result<(Browser, JoinHandle<()>)> {
    let executable = match find_browser_executable(spec.chrome_path) {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}; falling back to a managed download");
            download_managed_browser().await?
        }
    };

    let mut builder = BrowserConfigBuilder::default()
        .chrome_executable(&executable)
        .user_data_dir(spec.profile_dir)
        .request_timeout(CDP_REQUEST_TIMEOUT)
        .window_size(WINDOW_SIZE.0, WINDOW_SIZE.1)
        .arg(format!("--user-agent={CLIENT_IDENTITY}"));
    for arg in ENGINE_ARGS {
        builder = builder.arg(*arg);
    }
    builder = if spec.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    let config = builder
        .build()
        .map_err(|e| anyhow!("Invalid browser configuration: {e}"))?;

    let (browser, handler) = Browser::launch(config)
        .await
        .with_context(|| format!("Failed to launch {}", executable.display()))?;
    debug!(
        "Launched {} with profile {}",
        executable.display(),
        spec.profile_dir.display()
    );
    Ok((browser, spawn_handler_pump(handler)))
}

/// Chrome emits CDP messages chromiumoxide has no model for; failing to
/// decode them does not mean the engine is unhealthy.
fn is_benign_cdp_error(message: &str) -> bool {
    message.contains("data did not match any variant of untagged enum Message")
        || message.contains("Failed to deserialize WS response")
}

fn spawn_handler_pump(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else { continue };
            let message = e.to_string();
            if is_benign_cdp_error(&message) {
                trace!("Ignoring undecodable CDP message: {message}");
            } else {
                error!("CDP handler error: {message}");
            }
        }
        debug!("CDP handler stream ended");
    })
}
