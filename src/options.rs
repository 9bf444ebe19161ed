use crate::utils::{expand_path, read_url_file};
use clap::{Parser, ValueHint, value_parser};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// Default values used throughout the project.
pub mod defaults {
    /// Maximum number of concurrent report requests.
    pub const SEMAPHORE: u8 = 30;

    /// The PageSpeed Insights endpoint reports are requested from.
    pub const ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

    /// Where the collected score records are written.
    pub const REPORT_PATH: &str = "lighthouse_reports.json";

    /// Where the raw body of the last received response is written.
    pub const RESPONSE_PATH: &str = "response.json";

    /// Config file looked up in the current directory when `--config` is not given.
    pub const CONFIG_FILE: &str = ".pagescore.toml";

    /// The default user agent header value used for network requests.
    pub const USER_AGENT: &str = concat!(
        "Mozilla/5.0 (compatible; Pagescore/",
        env!("CARGO_PKG_VERSION"),
        ")"
    );
}

fn parse_path(s: &str) -> Result<PathBuf, String> {
    if s.trim().is_empty() {
        return Err(String::from("Path must not be empty"));
    }
    Ok(expand_path(s))
}

fn parse_config_path(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.is_file() {
        return Err(format!("Config file not found: {}", path.display()));
    }
    Ok(path)
}

#[derive(Debug, Parser)]
#[command(version, term_width = 80)]
pub struct Cli {
    #[arg(
        help = "URLs to fetch Lighthouse reports for. Entries not starting with http:// or https:// are skipped.",
        value_hint = ValueHint::Url
    )]
    pub urls: Vec<String>,

    #[arg(
        short = 'i',
        long,
        help = "File with one URL per line, read in addition to the URL arguments",
        value_hint = ValueHint::FilePath,
        value_parser = parse_path
    )]
    pub input_file: Option<PathBuf>,

    #[arg(
        short = 'k',
        long,
        env = "PAGESPEED_API_KEY",
        hide_env_values = true,
        help = "PageSpeed Insights API key"
    )]
    pub api_key: Option<String>,

    #[arg(
        short = 'c',
        long,
        help = "Maximum number of concurrent report requests",
        default_value_t = defaults::SEMAPHORE,
        value_parser = value_parser!(u8).range(1..=100)
    )]
    pub concurrency_limit: u8,

    #[arg(
        short = 'r',
        long,
        help = "File path for the collected score records",
        default_value = defaults::REPORT_PATH,
        value_hint = ValueHint::FilePath,
        value_parser = parse_path
    )]
    pub report_path: PathBuf,

    #[arg(
        long,
        help = "File path the raw body of the most recently received response is written to",
        default_value = defaults::RESPONSE_PATH,
        value_hint = ValueHint::FilePath,
        value_parser = parse_path
    )]
    pub response_path: PathBuf,

    #[arg(
        long,
        help = "PageSpeed Insights endpoint",
        default_value = defaults::ENDPOINT,
        value_hint = ValueHint::Url,
        value_parser = value_parser!(Url)
    )]
    pub endpoint: Url,

    #[arg(
        long,
        help = "Custom User-Agent header to be used in requests",
        default_value_t = defaults::USER_AGENT.to_string(),
    )]
    pub user_agent: String,

    #[arg(
        long,
        help = "Print the collected score records as JSON to stdout and suppress all other output",
        default_value = "false"
    )]
    pub json: bool,

    #[arg(
        long,
        help = "Path to a TOML config file. Defaults to `.pagescore.toml` in the current directory",
        value_hint = ValueHint::FilePath,
        value_parser = parse_config_path
    )]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Applies config file values for every option not given on the command line.
    pub fn apply_config(&mut self, config: &ConfigFile) -> Result<(), String> {
        if self.api_key.is_none() {
            self.api_key = config.api_key.clone();
        }
        if self.input_file.is_none() {
            if let Some(path) = &config.input_file {
                self.input_file = Some(parse_path(path)?);
            }
        }
        if let Some(limit) = config.concurrency_limit {
            if !arg_provided("concurrency-limit", Some('c')) {
                if !(1..=100).contains(&limit) {
                    return Err(format!(
                        "concurrency_limit must be between 1 and 100, got {}",
                        limit
                    ));
                }
                self.concurrency_limit = limit;
            }
        }
        if let Some(path) = &config.report_path {
            if !arg_provided("report-path", Some('r')) {
                self.report_path = parse_path(path)?;
            }
        }
        if let Some(path) = &config.response_path {
            if !arg_provided("response-path", None) {
                self.response_path = parse_path(path)?;
            }
        }
        if let Some(endpoint) = &config.endpoint {
            if !arg_provided("endpoint", None) {
                self.endpoint = Url::parse(endpoint)
                    .map_err(|e| format!("Invalid endpoint '{}': {}", endpoint, e))?;
            }
        }
        if let Some(user_agent) = &config.user_agent {
            if !arg_provided("user-agent", None) {
                self.user_agent = user_agent.clone();
            }
        }
        Ok(())
    }

    /// Returns the URL arguments followed by the entries of `--input-file`.
    pub fn collect_urls(&self) -> Result<Vec<String>, String> {
        let mut urls = self.urls.clone();
        if let Some(path) = &self.input_file {
            let lines = read_url_file(path)
                .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
            urls.extend(lines);
        }
        Ok(urls)
    }
}

/// Whether `--<long>` (or `-<short>`) appears on the actual command line.
fn arg_provided(long: &str, short: Option<char>) -> bool {
    let flag = format!("--{long}");
    let flag_with_value = format!("--{long}=");
    std::env::args().skip(1).any(|arg| {
        arg == flag
            || arg.starts_with(&flag_with_value)
            || short.is_some_and(|s| !arg.starts_with("--") && arg.starts_with(&format!("-{s}")))
    })
}

/// Values read from a TOML config file. Every key is optional.
///
/// ```toml
/// api_key = "..."
/// concurrency_limit = 10
/// report_path = "~/reports/lighthouse.json"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub input_file: Option<String>,
    pub concurrency_limit: Option<u8>,
    pub report_path: Option<String>,
    pub response_path: Option<String>,
    pub endpoint: Option<String>,
    pub user_agent: Option<String>,
}

impl ConfigFile {
    /// Loads the config from `path`, or from [`defaults::CONFIG_FILE`] in the
    /// current directory. A missing default file yields an empty config; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&PathBuf>) -> Result<Self, String> {
        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(format!("Config file not found: {}", path.display()));
                }
                Self::read(path)
            }
            None => Self::discover(Path::new(".")),
        }
    }

    /// Loads `.pagescore.toml` from `dir`, or an empty config if there is none.
    pub fn discover(dir: &Path) -> Result<Self, String> {
        let default = dir.join(defaults::CONFIG_FILE);
        if !default.is_file() {
            return Ok(ConfigFile::default());
        }
        Self::read(&default)
    }

    fn read(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))
    }
}
