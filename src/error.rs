//! Error taxonomy for the cache engine.
//!
//! Mirrors the teacher's manual `Error` enum rather than reaching for
//! `thiserror`: there is no `std::error::Error` consumer on the target and
//! the set of failure kinds is small and stable.

/// Failure modes surfaced by the cache engine.
///
/// `OverCapacity`, `UnknownFontKey` and `RemoveMissing` from spec.md §7 are
/// intentionally absent here — they are locally recovered control flow, not
/// reported errors (see `registry::draw_text`, `registry::resolve_font_key`
/// and `registry::Registry::remove_by_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The source font image fails a structural check: a table falls outside
    /// the buffer, or a codepoint requested for insertion has no entry.
    MalformedFont,
    /// `current_thread_role()` returned `Other`. Logged; the caller gets a
    /// sentinel handle and every subsequent call on it is a no-op.
    UnknownThreadRole,
}
