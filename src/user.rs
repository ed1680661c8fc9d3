// Typed view of one CSV data row.

use crate::columns::ColumnMapping;
use csv::StringRecord;
use std::fmt;

/// User fields extracted from a row. Cells that are unmapped or beyond
/// the end of a short row become empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub member: bool,
}

impl UserRecord {
    /// Build a record from a row. `member` is true for any non-empty
    /// cell, so "0" and "false" count as members too; `member_default`
    /// applies only when the cell does not exist.
    pub fn from_row(row: &StringRecord, mapping: &ColumnMapping, member_default: bool) -> Self {
        let cell = |index: Option<usize>| index.and_then(|i| row.get(i));

        UserRecord {
            email: cell(Some(mapping.email)).unwrap_or_default().to_string(),
            firstname: cell(mapping.firstname).unwrap_or_default().to_string(),
            lastname: cell(mapping.lastname).unwrap_or_default().to_string(),
            member: cell(mapping.member).map_or(member_default, |raw| !raw.is_empty()),
        }
    }

    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }
}

/// `email, firstname, lastname, True|False`, the form used in every
/// console line about a user.
impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let member = if self.member { "True" } else { "False" };
        write!(f, "{}, {}, {}, {}", self.email, self.firstname, self.lastname, member)
    }
}
