// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem-safe directory names for registry entries.

/// Maximum length of a model directory name.
pub const MAX_MODEL_DIR_LEN: usize = 64;

/// Directory name used for a model inside the artifact registry.
///
/// `<slug>-<model_id>`: the slug lowercases the name, replaces every run of
/// characters outside `[a-z0-9_]` with a single hyphen, trims hyphens from
/// both ends and truncates to [`MAX_MODEL_DIR_LEN`]. The id suffix keeps two
/// models whose names slugify alike in separate directories. Names that
/// slugify to nothing (e.g. `"..."`) give `model-<id>`.
pub fn model_dir_name(name: &str, model_id: &str) -> String {
    let id: String = model_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_MODEL_DIR_LEN)
        .collect();
    let id = if id.is_empty() { "unknown".to_string() } else { id };

    let slug = slugify(name);
    if slug.is_empty() {
        format!("model-{}", id)
    } else {
        format!("{}-{}", slug, id)
    }
}

fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();

    let mut slug = String::with_capacity(lower.len());
    let mut last_was_hyphen = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            slug.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    let mut result = slug.trim_matches('-').to_string();
    if result.len() > MAX_MODEL_DIR_LEN {
        result.truncate(MAX_MODEL_DIR_LEN);
        result = result.trim_end_matches('-').to_string();
    }
    result
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
