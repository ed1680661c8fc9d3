// Configuration module: declares the command line with `clap` and turns
// the raw arguments into an immutable `RunConfig`. Validation collects
// every problem in one pass so the user sees all of them at once.

use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Endpoint used when `--api` is not given.
pub const DEFAULT_API_URL: &str = "https://bde-polytech-mtp.herokuapp.com/users/unregistered";

/// Raw command line as typed by the user. Required options are kept as
/// `Option` so `validate` can report each missing one with its own message.
#[derive(Parser, Debug)]
#[command(author, version, about = "Register users listed in a CSV file against a web service")]
pub struct Cli {
    /// File to get users from (required)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// A valid token to authenticate to the web service (required)
    #[arg(short = 't', long = "token", env = "BULK_REGISTER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// BDE UUID to register users to (required)
    #[arg(long = "bde")]
    pub bde: Option<String>,

    /// API url where to POST data
    #[arg(long = "api", default_value = DEFAULT_API_URL)]
    pub api: String,

    /// Name of the email column
    #[arg(long = "email", default_value = "email")]
    pub email_column: String,

    /// Name of the firstname column
    #[arg(long = "firstname", default_value = "firstname")]
    pub firstname_column: String,

    /// Name of the lastname column
    #[arg(long = "lastname", default_value = "lastname")]
    pub lastname_column: String,

    /// Name of the member column
    #[arg(long = "member", default_value = "member")]
    pub member_column: String,

    /// Skip the N first data rows after the header
    #[arg(long = "skip", value_name = "N", default_value_t = 0, allow_negative_numbers = true)]
    pub skip: i64,

    /// Columns delimiter
    #[arg(short = 'd', long = "delimiter", default_value = ",")]
    pub delimiter: String,

    /// Minimum time, in milliseconds, between two requests
    #[arg(short = 'w', long = "wait", default_value_t = 0, allow_negative_numbers = true)]
    pub wait: i64,

    /// Execute as a dry-run (does not really call API)
    #[arg(long = "dry")]
    pub dry: bool,

    /// Indicates if users should be members by default
    #[arg(long = "member-default")]
    pub member_default: bool,
}

/// One reason why the command line cannot be turned into a `RunConfig`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("You must specify a filename to parse users from")]
    MissingFile,
    #[error("You must specify a token to authenticate to the service")]
    MissingToken,
    #[error("You can't skip a negative number of lines")]
    NegativeSkip,
    #[error("You must provide a BDE UUID")]
    MissingBde,
    #[error("You can't specify a value lower than 0 for the wait option")]
    NegativeWait,
    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(String),
    #[error("Invalid API url {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

/// Header names looked up in the first row of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub member: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            email: "email".into(),
            firstname: "firstname".into(),
            lastname: "lastname".into(),
            member: "member".into(),
        }
    }
}

/// Validated, immutable settings for one run. Every step receives it by
/// reference; nothing reads options from anywhere else.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub file: PathBuf,
    pub delimiter: u8,
    pub columns: ColumnNames,
    pub skip: u64,
    /// Endpoint exactly as configured; checked to be an http(s) URL.
    pub api: String,
    pub token: String,
    pub bde: String,
    pub wait: Duration,
    pub dry_run: bool,
    pub member_default: bool,
}

impl Cli {
    /// Check every option and build the `RunConfig`. All problems are
    /// returned together, in the order the options are documented.
    pub fn validate(self) -> Result<RunConfig, Vec<ConfigError>> {
        let mut errors = Vec::new();

        if self.file.is_none() {
            errors.push(ConfigError::MissingFile);
        }
        if self.token.is_none() {
            errors.push(ConfigError::MissingToken);
        }
        if self.skip < 0 {
            errors.push(ConfigError::NegativeSkip);
        }
        if self.bde.is_none() {
            errors.push(ConfigError::MissingBde);
        }
        if self.wait < 0 {
            errors.push(ConfigError::NegativeWait);
        }

        let delimiter = parse_delimiter(&self.delimiter);
        if delimiter.is_none() {
            errors.push(ConfigError::InvalidDelimiter(self.delimiter.clone()));
        }

        let api = match parse_api_url(&self.api) {
            Ok(_) => Some(self.api.clone()),
            Err(reason) => {
                errors.push(ConfigError::InvalidApiUrl {
                    url: self.api.clone(),
                    reason,
                });
                None
            }
        };

        match (self.file, self.token, self.bde, delimiter, api) {
            (Some(file), Some(token), Some(bde), Some(delimiter), Some(api)) if errors.is_empty() => {
                Ok(RunConfig {
                    file,
                    delimiter,
                    columns: ColumnNames {
                        email: self.email_column,
                        firstname: self.firstname_column,
                        lastname: self.lastname_column,
                        member: self.member_column,
                    },
                    skip: self.skip as u64,
                    api,
                    token,
                    bde,
                    wait: Duration::from_millis(self.wait as u64),
                    dry_run: self.dry,
                    member_default: self.member_default,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Accepts a single ASCII character, plus `\t` and `tab` for tabs.
fn parse_delimiter(raw: &str) -> Option<u8> {
    match raw {
        "\\t" | "tab" => Some(b'\t'),
        _ => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Some(c as u8),
                _ => None,
            }
        }
    }
}

fn parse_api_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme {:?}", other)),
    }
}
