//! Application configuration constants
//!
//! Central location for configuration constants, resource limits,
//! and validation boundaries used throughout the core.

// ===== Collaborator Search Limits =====

/// Minimum number of characters before the email typeahead queries the store.
/// Shorter prefixes match too many accounts to be useful.
pub const MIN_SEARCH_PREFIX_LEN: usize = 3;

/// Maximum number of accounts returned by one typeahead query
pub const USER_SEARCH_LIMIT: usize = 5;

// ===== Workspace Limits =====

/// Maximum length for list, card and subtask titles.
/// Prevents excessively long values from being stored.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length for free-text descriptions (events and cards)
pub const MAX_DESCRIPTION_LENGTH: usize = 4_000;

// ===== Attachment Limits =====

/// Maximum length for a stored attachment filename
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum attachment size in bytes (25 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 25 * 1024 * 1024;

// ===== Event Defaults =====

/// Location recorded when the organizer leaves the field empty
pub const DEFAULT_LOCATION: &str = "To be decided";

/// Event type presets offered by the new-event form.
/// "Others" is replaced by the organizer's free-text type on submission.
pub const EVENT_TYPE_PRESETS: &[&str] =
    &["Wedding", "Birthday Party", "Corporate", "Charity", "Others"];
