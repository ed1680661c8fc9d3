// UI layer: every line the user reads is written here. The console is
// generic over its two sinks so a run can be captured in tests, and it
// owns the spinner shown while a request is in flight.

use crate::user::UserRecord;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Stderr, Stdout, Write};
use std::time::Duration;

/// Informational and success lines go to `out`, errors to `err`.
pub struct Console<O: Write, E: Write> {
    out: O,
    err: E,
    interactive: bool,
}

/// Counters printed at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub registered: usize,
    pub simulated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Console<Stdout, Stderr> {
    /// Console on the process' stdout and stderr, with a spinner when
    /// stderr is a terminal.
    pub fn stdio() -> Self {
        Console {
            out: io::stdout(),
            err: io::stderr(),
            interactive: true,
        }
    }
}

impl Console<Vec<u8>, Vec<u8>> {
    /// Console writing into memory, never drawing a spinner.
    pub fn buffered() -> Self {
        Console::new(Vec::new(), Vec::new())
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }
}

impl<O: Write, E: Write> Console<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Console { out, err, interactive: false }
    }

    /// Spinner shown while `email` is being registered. Hidden when the
    /// console is not interactive; indicatif also hides it when stderr is
    /// not a terminal.
    pub fn spinner(&self, email: &str) -> ProgressBar {
        if !self.interactive {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("Registering {}...", email));
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }

    pub fn optional_column_missing(&mut self, role: &str, name: &str) -> io::Result<()> {
        writeln!(
            self.out,
            "Can't find {} column with name {}. Skipping (not mandatory) ...",
            role, name
        )
    }

    pub fn email_column_missing(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.err, "Unable to find email column with name {}. Exiting.", name)
    }

    pub fn not_a_file(&mut self) -> io::Result<()> {
        writeln!(self.err, "Specified filename is not a file")
    }

    pub fn missing_email(&mut self, line: u64) -> io::Result<()> {
        writeln!(self.out, "Skipping line {}, can't find email.", line)
    }

    pub fn dry_run(&mut self, user: &UserRecord, api: &str) -> io::Result<()> {
        writeln!(self.out, "Register user: {} --- POST {}", user, api)
    }

    pub fn registered(&mut self, user: &UserRecord) -> io::Result<()> {
        writeln!(self.out, "User: {} registered with success", user)
    }

    pub fn server_error(&mut self, user: &UserRecord) -> io::Result<()> {
        writeln!(self.err, "Server internal error. Canceling script.")?;
        writeln!(self.err, "Concerned user: {}", user)
    }

    pub fn not_found(&mut self) -> io::Result<()> {
        writeln!(self.err, "Got a 404. Is the API URL correct ? Exiting.")
    }

    pub fn bad_request(&mut self, user: &UserRecord, body: &str) -> io::Result<()> {
        writeln!(self.err, "Invalid request for : {}", user)?;
        writeln!(self.err, "Error: {}", body)
    }

    pub fn unexpected(&mut self, status: u16, user: &UserRecord, body: &str) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Got error code {} for user : {}", status, user)?;
        writeln!(self.out, "Body: {}", body)?;
        writeln!(self.out)
    }

    pub fn fatal(&mut self, message: &dyn std::fmt::Display) -> io::Result<()> {
        writeln!(self.err, "Error: {}", message)
    }

    pub fn summary(&mut self, summary: &Summary) -> io::Result<()> {
        writeln!(
            self.out,
            "Done: {} registered, {} simulated, {} skipped, {} failed",
            summary.registered, summary.simulated, summary.skipped, summary.failed
        )
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}
