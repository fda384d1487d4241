//! Template loading and rendering using Tera.
//!
//! Board output is rendered from template files, with embedded fallbacks for
//! when no `templates/` directory sits next to the board.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tera::{Context, Tera};

/// Default templates directory relative to the working directory.
const TEMPLATES_DIR: &str = "templates";

/// Template for the full status board.
pub const BOARD_TEMPLATE: &str = "board/board.tera";

/// Template shown when the store is unreachable.
pub const HALTED_TEMPLATE: &str = "board/halted.tera";

/// Template for the staff check-in list.
pub const STAFF_TEMPLATE: &str = "board/staff.tera";

/// Embedded default templates for fallback when files don't exist.
static EMBEDDED_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(BOARD_TEMPLATE, include_str!("../templates/board/board.tera"));
    m.insert(HALTED_TEMPLATE, include_str!("../templates/board/halted.tera"));
    m.insert(STAFF_TEMPLATE, include_str!("../templates/board/staff.tera"));
    m
});

/// Global template engine with caching.
static TERA: Lazy<RwLock<Option<Tera>>> = Lazy::new(|| RwLock::new(None));

/// Initialize the template engine with templates from the specified directory.
///
/// If the directory doesn't exist, templates are loaded from embedded defaults.
/// Files on disk override embedded templates of the same name.
///
/// # Errors
///
/// Returns an error if the templates directory exists but contains invalid
/// templates, or if an embedded template fails to parse.
pub fn init_templates(templates_dir: Option<&Path>) -> Result<()> {
    let dir = templates_dir.map_or_else(
        || std::env::current_dir().unwrap_or_default().join(TEMPLATES_DIR),
        Path::to_path_buf,
    );

    let mut tera = Tera::default();

    if dir.exists() {
        let glob_pattern = format!("{}/**/*.tera", dir.display());
        tera = Tera::new(&glob_pattern).map_err(|e| {
            Error::Template(format!("Failed to load templates from {}: {e}", dir.display()))
        })?;
    }

    for (name, content) in EMBEDDED_TEMPLATES.iter() {
        if tera.get_template(name).is_err() {
            tera.add_raw_template(name, content)
                .map_err(|e| Error::Template(format!("Embedded template {name} is invalid: {e}")))?;
        }
    }

    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = Some(tera);
    tracing::debug!(dir = %dir.display(), "templates initialized");

    Ok(())
}

/// Render a template with the given context.
///
/// Templates are lazy-loaded on first use.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render(name: &str, context: &Context) -> Result<String> {
    let needs_init = TERA.read().map_err(|e| Error::Template(e.to_string()))?.is_none();

    if needs_init {
        init_templates(None)?;
    }

    let guard = TERA.read().map_err(|e| Error::Template(e.to_string()))?;
    let tera = guard.as_ref().ok_or_else(|| Error::Template("Templates not initialized".into()))?;
    let rendered = tera
        .render(name, context)
        .map_err(|e| Error::Template(format!("Failed to render template {name}: {e}")))?;
    drop(guard);

    Ok(rendered)
}

/// Render a template from any serializable value.
///
/// The value must serialize to a map; its keys become template variables.
///
/// # Errors
///
/// Returns an error if the value cannot become a context or rendering fails.
pub fn render_value<T: serde::Serialize>(name: &str, value: &T) -> Result<String> {
    let context = Context::from_serialize(value)
        .map_err(|e| Error::Template(format!("Bad context for {name}: {e}")))?;
    render(name, &context)
}

/// Reset the template cache, forcing re-initialization on next use.
///
/// # Errors
///
/// Returns an error if the write lock cannot be acquired.
pub fn reset_cache() -> Result<()> {
    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = None;
    Ok(())
}

/// Names of all embedded templates.
#[must_use]
pub fn embedded_template_names() -> Vec<&'static str> {
    EMBEDDED_TEMPLATES.keys().copied().collect()
}

/// Verify all embedded templates render with sample data.
///
/// # Errors
///
/// Returns an error if any template fails to render.
pub fn verify_all_templates() -> Result<()> {
    reset_cache()?;
    init_templates(Some(Path::new("/nonexistent")))?;

    for name in embedded_template_names() {
        render(name, &sample_context())
            .map_err(|e| Error::Template(format!("Template {name} failed to render: {e}")))?;
    }

    Ok(())
}

/// A context with every variable any embedded template reads.
fn sample_context() -> Context {
    let mut ctx = Context::new();
    ctx.insert("notice", "Task order is still indexing, try again shortly");
    ctx.insert("message", "connection refused");
    ctx.insert(
        "categories",
        &serde_json::json!([{
            "name": "Finish Line",
            "order": 0,
            "label": "NO GO",
            "unavailable": false,
            "status": {"completed": false, "note": "Banner late", "timestamp": "06:05 AM", "show_start_msg": true},
            "tasks": [{"id": "hang-banner-0000", "category": "Finish Line", "title": "Hang banner",
                       "notes": "", "completed": true, "locked": true, "sort_order": 0}]
        }]),
    );
    ctx.insert(
        "orphaned",
        &serde_json::json!([{"id": "ice-0001", "category": "Vendors", "title": "Ice",
                             "notes": "", "completed": false, "locked": false, "sort_order": 0}]),
    );
    ctx.insert(
        "locations",
        &serde_json::json!([{"name": "Dana", "latitude": 37.77, "longitude": -122.42,
                             "timestamp": "2026-04-18T13:05:00Z"}]),
    );
    ctx
}
