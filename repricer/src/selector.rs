use regex::Regex;

use crate::errors::AutomationError;
use crate::UINode;

/// Thousands separator stripped before numeric parsing.
pub const THOUSANDS_SEPARATOR: char = ',';

/// Parse an integer amount, ignoring surrounding whitespace and thousands separators.
pub fn parse_amount(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .chars()
        .filter(|c| *c != THOUSANDS_SEPARATOR)
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Represents ways to match a node of a snapshot
#[derive(Debug, Clone)]
pub enum Selector {
    /// Select by widget class name (exact)
    ClassName(String),
    /// Select by display text, compared after trimming
    Text(String),
    /// Select by display text equal to any of the given labels, compared after trimming
    TextIn(Vec<String>),
    /// Select nodes whose hint contains any of the given markers
    HintContains(Vec<String>),
    /// Select nodes whose text parses as an integer once separators are stripped
    NumericText,
    /// Select nodes whose trimmed text matches a regular expression
    TextPattern(Regex),
    /// Filter by the enabled flag
    Enabled(bool),
    /// Filter by visibility to the user
    Visible(bool),
    /// Filter by the clickable flag
    Clickable(bool),
    /// Filter by the scrollable flag
    Scrollable(bool),
    /// All inner selectors must match
    And(Vec<Selector>),
    /// At least one inner selector must match
    Or(Vec<Selector>),
    /// Inner selector must not match
    Not(Box<Selector>),
    /// Represents an invalid selector string, with a reason. Matches nothing.
    Invalid(String),
}

impl Selector {
    pub fn matches(&self, node: &UINode) -> bool {
        let attrs = &node.attributes;
        match self {
            Selector::ClassName(class) => attrs.class_name == *class,
            Selector::Text(text) => attrs.trimmed_text() == Some(text.trim()),
            Selector::TextIn(labels) => attrs
                .trimmed_text()
                .is_some_and(|t| labels.iter().any(|l| l.trim() == t)),
            Selector::HintContains(markers) => attrs
                .hint
                .as_deref()
                .is_some_and(|h| markers.iter().any(|m| h.contains(m.as_str()))),
            Selector::NumericText => attrs.text.as_deref().and_then(parse_amount).is_some(),
            Selector::TextPattern(re) => attrs.trimmed_text().is_some_and(|t| re.is_match(t)),
            Selector::Enabled(v) => attrs.enabled == *v,
            Selector::Visible(v) => attrs.visible == *v,
            Selector::Clickable(v) => attrs.clickable == *v,
            Selector::Scrollable(v) => attrs.scrollable == *v,
            Selector::And(selectors) => selectors.iter().all(|s| s.matches(node)),
            Selector::Or(selectors) => selectors.iter().any(|s| s.matches(node)),
            Selector::Not(inner) => !inner.matches(node),
            Selector::Invalid(_) => false,
        }
    }

    /// Reject selectors that contain an [`Selector::Invalid`] anywhere in their tree.
    pub fn validate(&self) -> Result<(), AutomationError> {
        match self {
            Selector::Invalid(reason) => Err(AutomationError::InvalidSelector(reason.clone())),
            Selector::And(selectors) | Selector::Or(selectors) => {
                selectors.iter().try_for_each(Selector::validate)
            }
            Selector::Not(inner) => inner.validate(),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        let s = s.trim();

        // `||` binds looser than `&&`
        let alternatives: Vec<&str> = s.split("||").map(str::trim).collect();
        if alternatives.len() > 1 {
            return Selector::Or(alternatives.into_iter().map(Selector::from).collect());
        }
        let parts: Vec<&str> = s.split("&&").map(str::trim).collect();
        if parts.len() > 1 {
            return Selector::And(parts.into_iter().map(Selector::from).collect());
        }

        if let Some(inner) = s.strip_prefix('!') {
            return Selector::Not(Box::new(Selector::from(inner)));
        }

        let Some((key, value)) = s.split_once(':') else {
            return match s.to_lowercase().as_str() {
                "numeric" => Selector::NumericText,
                _ => Selector::Invalid(format!(
                    "Unknown selector format: \"{s}\". Use prefixes like 'classname:', 'text:', 'label:', 'hint:', 'pattern:', 'visible:', 'enabled:', 'clickable:', 'scrollable:' or the bare word 'numeric'."
                )),
            };
        };

        let flag = |build: fn(bool) -> Selector| match parse_bool(value) {
            Some(v) => build(v),
            None => Selector::Invalid(format!("Expected true or false in '{s}'")),
        };

        match key.trim().to_lowercase().as_str() {
            "classname" | "class" => Selector::ClassName(value.trim().to_string()),
            "text" => Selector::Text(value.trim().to_string()),
            "label" => Selector::TextIn(parse_list(value)),
            "hint" => Selector::HintContains(parse_list(value)),
            "pattern" => match Regex::new(value.trim()) {
                Ok(re) => Selector::TextPattern(re),
                Err(e) => Selector::Invalid(format!("Invalid pattern '{}': {e}", value.trim())),
            },
            "visible" => flag(Selector::Visible),
            "enabled" => flag(Selector::Enabled),
            "clickable" => flag(Selector::Clickable),
            "scrollable" => flag(Selector::Scrollable),
            other => Selector::Invalid(format!("Unknown selector key '{other}' in \"{s}\"")),
        }
    }
}
