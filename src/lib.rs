// Library root
// -----------
// This crate exposes the pieces of the bulk registration CLI. The binary
// (`main.rs`) parses options, builds an `ApiClient` and calls
// `registrar::run`.
//
// Module responsibilities:
// - `config`: command line declaration and validation into `RunConfig`.
// - `columns`: resolving user fields to positions in the header row.
// - `user`: the typed record built from each data row.
// - `api`: the HTTP endpoint client and status classification.
// - `registrar`: the row loop tying everything together.
// - `ui`: every user-facing line and the request spinner.
pub mod api;
pub mod columns;
pub mod config;
pub mod registrar;
pub mod ui;
pub mod user;

pub use api::{ApiClient, ApiResponse, Flow, Outcome, RegisterRequest, RegistrationEndpoint};
pub use columns::ColumnMapping;
pub use config::{Cli, ColumnNames, ConfigError, RunConfig};
pub use registrar::{run, RegistrarError, RunReport, RunStatus};
pub use ui::{Console, Summary};
pub use user::UserRecord;
