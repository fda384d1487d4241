//! Identifier helpers.
//!
//! Task IDs are the slugified title plus 4 random hex characters, e.g.
//! `hang-finish-banner-3fa2`. Category status keys and staff keys are the
//! display name with path-unsafe characters replaced, so existing
//! `status_Course_&_Traffic` documents keep resolving.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Global counter for deterministic ID generation in tests.
static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Whether to use deterministic IDs (for testing).
static USE_DETERMINISTIC_IDS: AtomicBool = AtomicBool::new(false);

/// Enable deterministic ID generation for testing.
///
/// When enabled, IDs will use a counter instead of random hex.
pub fn enable_deterministic_ids() {
    USE_DETERMINISTIC_IDS.store(true, Ordering::SeqCst);
    TEST_COUNTER.store(0, Ordering::SeqCst);
}

/// Disable deterministic ID generation.
pub fn disable_deterministic_ids() {
    USE_DETERMINISTIC_IDS.store(false, Ordering::SeqCst);
}

/// Convert a title to a slug of at most 50 characters.
///
/// Lowercases ASCII alphanumerics, turns every other run of characters into
/// one hyphen and trims hyphens from both ends.
#[must_use]
pub fn slugify(title: &str) -> String {
    slugify_with_max_len(title, 50)
}

/// Convert a title to a slug with a custom maximum length.
#[must_use]
pub fn slugify_with_max_len(title: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    if slug.len() > max_len {
        slug.truncate(max_len);
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Generate a random 4-character hex suffix.
#[allow(clippy::cast_possible_truncation)]
fn random_suffix() -> String {
    if USE_DETERMINISTIC_IDS.load(Ordering::SeqCst) {
        let count = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        format!("{count:04x}")
    } else {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};

        let mut hasher = RandomState::new().build_hasher();
        // Only entropy matters here, so truncating the nanos is fine.
        hasher.write_u64(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos() as u64),
        );
        format!("{:04x}", hasher.finish() & 0xFFFF)
    }
}

/// Generate a task ID from a title.
#[must_use]
pub fn generate_task_id(title: &str) -> String {
    let slug = slugify(title);
    let suffix = random_suffix();

    if slug.is_empty() {
        format!("task-{suffix}")
    } else {
        format!("{slug}-{suffix}")
    }
}

/// Replace path-unsafe characters in a display name with `_`.
///
/// ASCII alphanumerics, `-`, `_` and `&` are kept as is.
#[must_use]
pub fn sanitize_key(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '&') { c } else { '_' })
        .collect()
}

/// Storage key of a category's status document.
#[must_use]
pub fn status_key(category: &str) -> String {
    format!("status_{}", sanitize_key(category))
}
