//! Read-only guard over generated SQL.
//!
//! This is the one safety boundary between the generation service and the
//! store: only statements whose leading keyword is SELECT are allowed
//! through. No further statement-level sanitization is attempted.

/// Proof that a generated statement passed the guard. The executor only
/// accepts this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedQuery(String);

impl AuthorizedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A statement the guard refused, carried back to the caller for
/// transparency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedQuery {
    pub query: String,
}

/// Authorize a generated statement for execution.
///
/// The trimmed statement must start with the keyword `SELECT`,
/// case-insensitively, followed by a non-alphanumeric boundary (so
/// `SELECT*FROM t` passes while `selectx` does not). Trailing content is
/// not inspected.
pub fn authorize(query: &str) -> Result<AuthorizedQuery, RejectedQuery> {
    let trimmed = query.trim();

    if starts_with_select(trimmed) {
        Ok(AuthorizedQuery(trimmed.to_string()))
    } else {
        Err(RejectedQuery {
            query: query.to_string(),
        })
    }
}

fn starts_with_select(statement: &str) -> bool {
    const KEYWORD: &str = "select";

    let head = match statement.get(..KEYWORD.len()) {
        Some(head) => head,
        None => return false,
    };
    if !head.eq_ignore_ascii_case(KEYWORD) {
        return false;
    }
    // Word boundary: either nothing follows, or the next char is not part
    // of an identifier.
    match statement[KEYWORD.len()..].chars().next() {
        None => true,
        Some(c) => !c.is_ascii_alphanumeric() && c != '_',
    }
}
