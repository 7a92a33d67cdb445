//! Tunables of the automation: target application, price rule, retry ceilings and delays
//!
//! Two controller variants were observed in the field. Both are available as presets
//! ([`AutomationConfig::fallback_search`] and [`AutomationConfig::terminate_on_exhaustion`]);
//! the `Default` is the fallback-search variant.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::AutomationError;

/// What the controller does once the forced-scroll budget is used up without the price
/// field turning up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Move to a passive find phase that re-checks once per notification.
    #[default]
    FallbackSearch,
    /// Give up and park in the terminal phase.
    Finish,
}

/// How the price field is focused before its text is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusStrategy {
    /// Click the field like a finger tap would, then request accessibility focus.
    #[default]
    TapThenFocus,
    /// Request accessibility focus only.
    DirectFocus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Package name of the only application whose events are acted on
    pub target_package: String,
    /// Amount subtracted from the detected price
    pub price_decrement: i64,
    /// Forced scrolls allowed per entry into the scroll phase
    pub max_scroll_attempts: u32,
    pub exhaustion: ExhaustionPolicy,
    pub focus: FocusStrategy,
    /// Wait after pressing edit before forced scrolling starts
    pub settle_delay_ms: u64,
    /// Interval between forced scrolls
    pub scroll_retry_interval_ms: u64,
    /// Wait between focusing the field and replacing its text
    pub focus_delay_ms: u64,
    /// Wait between replacing the text and clearing focus
    pub commit_delay_ms: u64,
    /// Wait before looking for the save control
    pub save_check_delay_ms: u64,
    /// Wait after pressing save before navigating back
    pub back_delay_ms: u64,
    /// Widget class of single-line text entry fields
    pub text_entry_class: String,
    /// Full-match pattern for a displayed price
    pub price_pattern: String,
    /// Substrings of the price field's hint that identify it when it is empty
    pub price_hint_markers: Vec<String>,
    pub edit_labels: Vec<String>,
    pub save_labels: Vec<String>,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self::fallback_search()
    }
}

impl AutomationConfig {
    /// Ten forced scrolls, then a passive find phase; tap-then-focus input.
    pub fn fallback_search() -> Self {
        Self {
            target_package: "com.example.marketplace".to_string(),
            price_decrement: 200,
            max_scroll_attempts: 10,
            exhaustion: ExhaustionPolicy::FallbackSearch,
            focus: FocusStrategy::TapThenFocus,
            settle_delay_ms: 1500,
            scroll_retry_interval_ms: 400,
            focus_delay_ms: 150,
            commit_delay_ms: 300,
            save_check_delay_ms: 500,
            back_delay_ms: 800,
            text_entry_class: "android.widget.EditText".to_string(),
            price_pattern: r"^[0-9]{1,3}(,[0-9]{3})+$".to_string(),
            price_hint_markers: vec![
                "価格".to_string(),
                "price".to_string(),
                "Price".to_string(),
            ],
            edit_labels: vec!["編集する".to_string(), "Edit".to_string()],
            save_labels: vec![
                "変更する".to_string(),
                "保存する".to_string(),
                "完了".to_string(),
                "Save changes".to_string(),
                "Save".to_string(),
                "Done".to_string(),
            ],
        }
    }

    /// Fifteen forced scrolls, then give up; direct focus; longer edit-screen settle.
    pub fn terminate_on_exhaustion() -> Self {
        Self {
            max_scroll_attempts: 15,
            exhaustion: ExhaustionPolicy::Finish,
            focus: FocusStrategy::DirectFocus,
            settle_delay_ms: 5000,
            ..Self::fallback_search()
        }
    }

    pub fn with_target_package(mut self, package: impl Into<String>) -> Self {
        self.target_package = package.into();
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, AutomationError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.target_package.trim().is_empty() {
            return Err(AutomationError::Config(
                "target_package must not be empty".to_string(),
            ));
        }
        if self.max_scroll_attempts == 0 {
            return Err(AutomationError::Config(
                "max_scroll_attempts must be at least 1".to_string(),
            ));
        }
        if self.text_entry_class.trim().is_empty() {
            return Err(AutomationError::Config(
                "text_entry_class must not be empty".to_string(),
            ));
        }
        for (name, labels) in [
            ("edit_labels", &self.edit_labels),
            ("save_labels", &self.save_labels),
        ] {
            if labels.iter().all(|l| l.trim().is_empty()) {
                return Err(AutomationError::Config(format!(
                    "{name} needs at least one non-empty label"
                )));
            }
        }
        self.price_regex()?;
        Ok(())
    }

    pub fn price_regex(&self) -> Result<Regex, AutomationError> {
        Regex::new(&self.price_pattern).map_err(|e| {
            AutomationError::Config(format!("price_pattern '{}': {e}", self.price_pattern))
        })
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn scroll_retry_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_retry_interval_ms)
    }

    pub fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.focus_delay_ms)
    }

    pub fn commit_delay(&self) -> Duration {
        Duration::from_millis(self.commit_delay_ms)
    }

    pub fn save_check_delay(&self) -> Duration {
        Duration::from_millis(self.save_check_delay_ms)
    }

    pub fn back_delay(&self) -> Duration {
        Duration::from_millis(self.back_delay_ms)
    }
}
