//! Theory HTML sanitizer.
//!
//! Lesson theory is rendered as HTML and may come from the AI generator, so it
//! is reduced to a small set of formatting tags with no attributes.

use std::collections::{HashMap, HashSet};

/// Tags kept in theory HTML.
pub const ALLOWED_TAGS: &[&str] = &["h3", "h4", "p", "ul", "li", "code", "pre", "strong"];

/// Strips every tag outside [`ALLOWED_TAGS`] and every attribute.
///
/// Text inside removed tags is kept, except for `script` and `style`
/// elements which are dropped with their content.
///
/// # Example
///
/// ```
/// use learn2earn_course::sanitize::sanitize_theory;
///
/// let html = r#"<p onclick="steal()">Hi <b>there</b></p>"#;
/// assert_eq!(sanitize_theory(html), "<p>Hi there</p>");
/// ```
pub fn sanitize_theory(html: &str) -> String {
    ammonia::Builder::default()
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(HashMap::new())
        .link_rel(None)
        .clean(html)
        .to_string()
}
