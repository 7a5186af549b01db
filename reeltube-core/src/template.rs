//! Caption placeholder rendering for upload titles and descriptions.

pub const CAPTION_PLACEHOLDER: &str = "{caption}";

/// Replaces the first `{caption}` in `template` with `caption`.
///
/// Later occurrences are left as written, and a template without the
/// placeholder is returned unchanged.
pub fn render_caption(template: &str, caption: &str) -> String {
    template.replacen(CAPTION_PLACEHOLDER, caption, 1)
}

pub fn has_placeholder(template: &str) -> bool {
    template.contains(CAPTION_PLACEHOLDER)
}
