use std::fmt;

/// Access a transaction requests when fetching a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permissions::ReadOnly => write!(f, "READ_ONLY"),
            Permissions::ReadWrite => write!(f, "READ_WRITE"),
        }
    }
}
