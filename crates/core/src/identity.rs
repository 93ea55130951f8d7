use crate::constants::PENDING_ID_PREFIX;

/// A record with a stable logical identity inside a resource list.
///
/// Two records with the same identity are the same item; lists keep at most one.
pub trait Identified {
    fn identity(&self) -> &str;
}

/// Generate an id for a record created locally and not yet confirmed.
#[must_use]
pub fn pending_id(suffix: &str) -> String {
    format!("{PENDING_ID_PREFIX}{suffix}")
}

/// Whether an id was produced by [`pending_id`].
#[must_use]
pub fn is_pending_id(id: &str) -> bool {
    id.starts_with(PENDING_ID_PREFIX)
}
