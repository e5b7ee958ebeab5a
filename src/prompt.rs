/// Prompt template rendering
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::tab_data::ClassifyInput;

pub const PLACEHOLDER_URL: &str = "tabURL";
pub const PLACEHOLDER_TITLE: &str = "tabTitle";
pub const PLACEHOLDER_TYPES: &str = "types";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex"));

/// Substitute `{{tabURL}}`, `{{tabTitle}}` and `{{types}}`.
/// Unknown placeholders render as empty text. Values are inserted verbatim.
pub fn render(template: &str, tab: &ClassifyInput, categories: &[String]) -> String {
    let types = categories.join(", ");

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[1] {
            PLACEHOLDER_URL => tab.url.clone(),
            PLACEHOLDER_TITLE => tab.title.clone(),
            PLACEHOLDER_TYPES => types.clone(),
            _ => String::new(),
        })
        .into_owned()
}

/// Placeholders the template does not mention. The options page refuses to
/// save a template while this is non-empty.
pub fn missing_placeholders(template: &str) -> Vec<&'static str> {
    let present: Vec<String> = PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect();

    [PLACEHOLDER_URL, PLACEHOLDER_TITLE, PLACEHOLDER_TYPES]
        .into_iter()
        .filter(|name| !present.iter().any(|p| p == name))
        .collect()
}
