// Batch registration: reads the CSV file row by row, turns each row into a
// `UserRecord` and hands it to a `RegistrationEndpoint`. Rows are handled
// strictly in file order, one request at a time.

use crate::api::{Flow, Outcome, RegisterRequest, RegistrationEndpoint};
use crate::columns::ColumnMapping;
use crate::config::RunConfig;
use crate::ui::{Console, Summary};
use crate::user::UserRecord;
use csv::StringRecord;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use thiserror::Error;

/// Failures that end a run before the file is exhausted.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("{} is not a file", .0.display())]
    NotAFile(PathBuf),
    #[error("unable to find email column with name {0}")]
    MissingEmailColumn(String),
    #[error("failed to read CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("{0:#}")]
    Transport(anyhow::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How the row loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every row was read.
    Completed,
    /// A response stopped the run; the remaining rows were not read.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub status: RunStatus,
    pub summary: Summary,
}

/// Register every user of `config.file`. Fatal problems are reported on
/// the console before being returned, so callers only pick an exit code.
pub fn run<P, O, E>(
    config: &RunConfig,
    endpoint: &P,
    console: &mut Console<O, E>,
) -> Result<RunReport, RegistrarError>
where
    P: RegistrationEndpoint + ?Sized,
    O: Write,
    E: Write,
{
    let result = process_file(config, endpoint, console);
    if let Err(e) = &result {
        let reported = match e {
            RegistrarError::NotAFile(_) => console.not_a_file(),
            RegistrarError::MissingEmailColumn(name) => console.email_column_missing(name),
            other => console.fatal(other),
        };
        if let Err(io_err) = reported {
            tracing::warn!("failed to report error: {}", io_err);
        }
    }
    console.flush()?;
    result
}

fn process_file<P, O, E>(
    config: &RunConfig,
    endpoint: &P,
    console: &mut Console<O, E>,
) -> Result<RunReport, RegistrarError>
where
    P: RegistrationEndpoint + ?Sized,
    O: Write,
    E: Write,
{
    if !config.file.is_file() {
        return Err(RegistrarError::NotAFile(config.file.clone()));
    }

    let data = fs::read(&config.file)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_slice());

    let mut mapping: Option<ColumnMapping> = None;
    let mut summary = Summary::default();

    for (index, result) in reader.records().enumerate() {
        let row = result?;
        let line = start_line(&data, &row).unwrap_or(index as u64 + 1);

        let columns = match mapping {
            Some(columns) => columns,
            None => {
                mapping = Some(ColumnMapping::resolve(&row, &config.columns, console)?);
                continue;
            }
        };

        // `index` counts data rows from 1 once the header is consumed.
        if index as u64 <= config.skip {
            tracing::debug!(line, "skipped by --skip");
            continue;
        }

        let user = UserRecord::from_row(&row, &columns, config.member_default);
        if !user.has_email() {
            console.missing_email(line)?;
            summary.skipped += 1;
            continue;
        }

        if config.dry_run {
            console.dry_run(&user, &config.api)?;
            summary.simulated += 1;
            continue;
        }

        let outcome = submit(config, endpoint, &user, console)?;
        if outcome == Outcome::Created {
            summary.registered += 1;
        } else {
            summary.failed += 1;
        }
        if outcome.flow() == Flow::FatalStop {
            tracing::debug!(line, ?summary, "run stopped");
            console.summary(&summary)?;
            return Ok(RunReport { status: RunStatus::Stopped, summary });
        }
    }

    if mapping.is_some() {
        tracing::debug!(?summary, "run completed");
        console.summary(&summary)?;
    }
    Ok(RunReport { status: RunStatus::Completed, summary })
}

/// 1-based line of the file the row starts on. The reader positions a
/// record before the blank lines it drops, and before the `\n` of a
/// CRLF terminator, so those line breaks are added back here.
fn start_line(data: &[u8], row: &StringRecord) -> Option<u64> {
    let pos = row.position()?;
    let skipped = data
        .get(usize::try_from(pos.byte()).ok()?..)?
        .iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .filter(|&&b| b == b'\n')
        .count() as u64;
    Some(pos.line() + skipped)
}

/// Wait the configured delay, send one registration and report its
/// outcome. The caller decides from `Outcome::flow` whether to go on.
pub fn submit<P, O, E>(
    config: &RunConfig,
    endpoint: &P,
    user: &UserRecord,
    console: &mut Console<O, E>,
) -> Result<Outcome, RegistrarError>
where
    P: RegistrationEndpoint + ?Sized,
    O: Write,
    E: Write,
{
    if !config.wait.is_zero() {
        tracing::debug!(wait_ms = config.wait.as_millis() as u64, "throttling");
        thread::sleep(config.wait);
    }

    let spinner = console.spinner(&user.email);
    let response = endpoint.register(&RegisterRequest::new(user, &config.bde));
    spinner.finish_and_clear();

    let outcome = Outcome::classify(response.map_err(RegistrarError::Transport)?);
    match &outcome {
        Outcome::Created => console.registered(user)?,
        Outcome::ServerError => console.server_error(user)?,
        Outcome::NotFound => console.not_found()?,
        Outcome::BadRequest(body) => console.bad_request(user, body)?,
        Outcome::Unexpected { status, body } => console.unexpected(*status, user, body)?,
    }
    Ok(outcome)
}
