// Column resolution: finds where each user field lives in the header row.

use crate::config::ColumnNames;
use crate::registrar::RegistrarError;
use crate::ui::Console;
use csv::StringRecord;
use std::io::Write;

/// Zero-based positions of the user fields in each row. Email is always
/// mapped; the others are optional and simply absent from every record
/// when the header does not name them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub email: usize,
    pub firstname: Option<usize>,
    pub lastname: Option<usize>,
    pub member: Option<usize>,
}

impl ColumnMapping {
    /// Resolve the configured names against `header`. Optional columns
    /// that are missing are reported on the console; a missing email
    /// column is an error and nothing should be processed.
    pub fn resolve<O: Write, E: Write>(
        header: &StringRecord,
        names: &ColumnNames,
        console: &mut Console<O, E>,
    ) -> Result<Self, RegistrarError> {
        let firstname = position(header, &names.firstname);
        if firstname.is_none() {
            console.optional_column_missing("firstname", &names.firstname)?;
        }
        let lastname = position(header, &names.lastname);
        if lastname.is_none() {
            console.optional_column_missing("lastname", &names.lastname)?;
        }
        let member = position(header, &names.member);
        if member.is_none() {
            console.optional_column_missing("member", &names.member)?;
        }

        let email = position(header, &names.email)
            .ok_or_else(|| RegistrarError::MissingEmailColumn(names.email.clone()))?;

        let mapping = ColumnMapping { email, firstname, lastname, member };
        tracing::debug!(?mapping, "resolved columns");
        Ok(mapping)
    }
}

/// First cell equal to `name`. A byte-order mark left on the first cell by
/// spreadsheet exports is ignored.
fn position(header: &StringRecord, name: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell.strip_prefix('\u{feff}').unwrap_or(cell) == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> ColumnNames {
        ColumnNames::default()
    }

    fn resolve(header: &[&str]) -> (Result<ColumnMapping, RegistrarError>, String) {
        let mut console = Console::buffered();
        let result = ColumnMapping::resolve(&StringRecord::from(header.to_vec()), &names(), &mut console);
        (result, console.stdout_text())
    }

    #[test]
    fn test_all_columns_found() {
        let (mapping, out) = resolve(&["member", "email", "lastname", "firstname"]);
        assert_eq!(
            mapping.unwrap(),
            ColumnMapping { email: 1, firstname: Some(3), lastname: Some(2), member: Some(0) }
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_optional_columns_missing() {
        let (mapping, out) = resolve(&["email"]);
        assert_eq!(
            mapping.unwrap(),
            ColumnMapping { email: 0, firstname: None, lastname: None, member: None }
        );
        assert!(out.contains("Can't find firstname column with name firstname. Skipping (not mandatory) ..."));
        assert!(out.contains("Can't find lastname column with name lastname."));
        assert!(out.contains("Can't find member column with name member."));
    }

    #[test]
    fn test_missing_email_column() {
        let (mapping, _) = resolve(&["firstname", "lastname", "mail"]);
        assert!(matches!(mapping, Err(RegistrarError::MissingEmailColumn(name)) if name == "email"));
    }

    #[test]
    fn test_match_is_exact() {
        let (mapping, _) = resolve(&["Email", " email"]);
        assert!(mapping.is_err());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let (mapping, _) = resolve(&["email", "email"]);
        assert_eq!(mapping.unwrap().email, 0);
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let (mapping, _) = resolve(&["\u{feff}email", "firstname"]);
        let mapping = mapping.unwrap();
        assert_eq!(mapping.email, 0);
        assert_eq!(mapping.firstname, Some(1));
    }
}
