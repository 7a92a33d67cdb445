use crate::locator::ElementLocators;
use crate::selector::{parse_amount, Selector};
use crate::session::AutomationSession;
use crate::{AutomationConfig, AutomationError, Locator, UINode};
use tokio::time::Instant;

use super::{button_row, edit_page, label, price_field, product_page};

fn locators() -> ElementLocators {
    ElementLocators::from_config(&AutomationConfig::default()).unwrap()
}

#[test]
fn test_price_pattern_accepts_grouped_amounts() {
    let locators = locators();
    for (text, expected) in [
        ("1,000", 1_000),
        ("12,800", 12_800),
        ("999,999", 999_999),
        ("1,234,567", 1_234_567),
        ("  3,500 ", 3_500),
    ] {
        let root = UINode::new("root").with_child(label(text));
        assert_eq!(locators.find_price(&root), Some(expected), "text {text:?}");
    }
}

#[test]
fn test_price_pattern_rejects_other_text() {
    let locators = locators();
    for text in ["999", "1000", "12800", "1,00", "1234,567", "¥12,800", "12,800円", "", "Edit"] {
        let root = UINode::new("root").with_child(label(text));
        assert_eq!(locators.find_price(&root), None, "text {text:?}");
    }
}

#[test]
fn test_product_page_price_and_target() {
    // Scenario: price label and edit row on the product page
    let locators = locators();
    let root = product_page("12,800");

    let price = locators.find_price(&root).unwrap();
    assert_eq!(price, 12_800);

    let mut session = AutomationSession::new(Instant::now());
    assert_eq!(session.record_price(price, 200), Some(12_600));
    assert_eq!(session.current_price(), Some(12_800));
    assert_eq!(session.target_price(), Some(12_600));

    let edit = locators.find_edit_button(&root).unwrap();
    assert_eq!(edit.id.as_deref(), Some("edit_button"));
    assert!(edit.attributes.clickable);
}

#[test]
fn test_first_price_in_preorder_wins() {
    let locators = locators();
    let root = UINode::new("root").with_children([
        UINode::new("group").with_child(label("4,980")),
        label("12,800"),
    ]);
    assert_eq!(locators.find_price(&root), Some(4_980));
}

#[test]
fn test_unparseable_price_text_does_not_hide_later_price() {
    let locators = locators();
    for decoy in ["１２,８００", "٣,٥٠٠", "9,999,999,999,999,999,999"] {
        let root = UINode::new("root").with_children([label(decoy), label("12,800")]);
        assert_eq!(locators.find_price(&root), Some(12_800), "decoy {decoy:?}");

        let alone = UINode::new("root").with_child(label(decoy));
        assert_eq!(locators.find_price(&alone), None, "decoy {decoy:?}");
    }
}

#[test]
fn test_custom_pattern_still_requires_parseable_amount() {
    let config = AutomationConfig {
        price_pattern: r"^\d+(,\d{3})*$".to_string(),
        ..Default::default()
    };
    let locators = ElementLocators::from_config(&config).unwrap();
    let root = UINode::new("root").with_children([label("４,５００"), label("4,500")]);
    assert_eq!(locators.find_price(&root), Some(4_500));
}

#[test]
fn test_price_input_skips_disabled_and_hidden_fields() {
    let locators = locators();
    let root = UINode::new("root").with_children([
        UINode::new("android.widget.EditText")
            .with_id("disabled")
            .with_text("12,800")
            .disabled(),
        UINode::new("android.widget.EditText")
            .with_id("hidden")
            .with_text("12,800")
            .hidden(),
        UINode::new("android.widget.EditText")
            .with_id("hinted")
            .with_hint("販売価格を入力"),
    ]);

    let field = locators.find_price_input(&root).unwrap();
    assert_eq!(field.id.as_deref(), Some("hinted"));
    for handle in locators.price_input.all(&root) {
        assert!(handle.attributes.enabled && handle.attributes.visible);
    }
}

#[test]
fn test_price_input_needs_text_entry_class() {
    let locators = locators();
    let root = UINode::new("root").with_children([
        label("12,800"),
        UINode::new("android.widget.TextView").with_hint("Price"),
    ]);
    assert!(locators.find_price_input(&root).is_none());
}

#[test]
fn test_price_input_matches_numeric_or_hint() {
    let locators = locators();

    let numeric = UINode::new("root").with_child(
        UINode::new("android.widget.EditText").with_text("12800"),
    );
    assert!(locators.find_price_input(&numeric).is_some());

    let empty_with_hint = UINode::new("root")
        .with_child(UINode::new("android.widget.EditText").with_hint("Listing price"));
    assert!(locators.find_price_input(&empty_with_hint).is_some());

    let title_field = UINode::new("root").with_child(
        UINode::new("android.widget.EditText")
            .with_text("Vintage camera")
            .with_hint("Title"),
    );
    assert!(locators.find_price_input(&title_field).is_none());
}

#[test]
fn test_label_resolves_to_clickable_parent() {
    let locators = locators();
    let root = UINode::new("root").with_child(button_row("save_row", "  Save changes "));
    let save = locators.find_save_button(&root).unwrap();
    assert_eq!(save.id.as_deref(), Some("save_row"));
    assert_eq!(save.path, vec![0]);
}

#[test]
fn test_clickable_label_is_its_own_target() {
    let locators = locators();
    let root = UINode::new("root").with_child(
        UINode::new("android.widget.Button")
            .with_id("done")
            .with_text("完了")
            .clickable(),
    );
    let save = locators.find_save_button(&root).unwrap();
    assert_eq!(save.id.as_deref(), Some("done"));
    assert_eq!(save.path, vec![0]);
}

#[test]
fn test_unclickable_root_label_stays_matched() {
    let locators = locators();
    let root = label("編集する");
    let edit = locators.find_edit_button(&root).unwrap();
    assert!(edit.path.is_empty());
}

#[test]
fn test_labels_match_exactly_after_trim() {
    let locators = locators();
    let root = UINode::new("root").with_child(button_row("x", "Edit listing"));
    assert!(locators.find_edit_button(&root).is_none());
}

#[test]
fn test_resolve_price_input_revalidates_cache() {
    let locators = locators();
    let screen = edit_page(1, 1, 9);
    let cached = locators.find_price_input(&screen).unwrap();

    // Same tree: the cached handle is refreshed in place
    let resolved = locators.resolve_price_input(&screen, Some(&cached)).unwrap();
    assert_eq!(resolved, cached);

    // Field moved: the stale path no longer validates and a fresh search takes over
    let shifted = UINode::new("android.widget.FrameLayout").with_children([
        label("banner"),
        UINode::new("android.widget.ScrollView")
            .with_children([label("Section"), label("Details"), price_field("12,600")]),
    ]);
    assert!(locators.price_input.revalidate(&shifted, &cached).is_none());
    let resolved = locators.resolve_price_input(&shifted, Some(&cached)).unwrap();
    assert_eq!(resolved.path, vec![1, 2]);
    assert_eq!(resolved.attributes.text.as_deref(), Some("12,600"));

    // Field gone entirely
    assert!(locators
        .resolve_price_input(&edit_page(0, 1, 9), Some(&cached))
        .is_none());
}

#[test]
fn test_revalidate_rejects_disabled_field_at_same_path() {
    let locators = locators();
    let screen = UINode::new("root").with_child(price_field("12,800"));
    let cached = locators.find_price_input(&screen).unwrap();
    let disabled = UINode::new("root").with_child(price_field("12,800").disabled());
    assert!(locators.price_input.revalidate(&disabled, &cached).is_none());
}

#[test]
fn test_parse_amount() {
    assert_eq!(parse_amount("12,800"), Some(12_800));
    assert_eq!(parse_amount(" 1,2,3 "), Some(123));
    assert_eq!(parse_amount("-200"), Some(-200));
    assert_eq!(parse_amount(""), None);
    assert_eq!(parse_amount(" , "), None);
    assert_eq!(parse_amount("12.800"), None);
}

#[test]
fn test_selector_parsing() {
    let root = UINode::new("root").with_children([
        UINode::new("android.widget.EditText").with_hint("Price"),
        button_row("save", "Save"),
    ]);

    let locator = Locator::new("class:android.widget.EditText && hint:価格,Price");
    assert_eq!(locator.all(&root).len(), 1);

    let locator = Locator::new("label:Save,Done").clickable_target();
    assert_eq!(locator.first(&root).unwrap().id.as_deref(), Some("save"));

    let locator = Locator::new("clickable:true || scrollable:true");
    assert_eq!(locator.all(&root).len(), 1);

    let locator = Locator::new("!enabled:true");
    assert!(locator.first(&root).is_none());

    assert!(matches!(Selector::from("numeric"), Selector::NumericText));
    assert!(matches!(Selector::from("text: Save "), Selector::Text(t) if t == "Save"));
}

#[test]
fn test_invalid_selectors() {
    for raw in ["bogus", "colour:red", "enabled:maybe", "pattern:(unclosed"] {
        let selector = Selector::from(raw);
        assert!(
            matches!(selector.validate(), Err(AutomationError::InvalidSelector(_))),
            "{raw} should be invalid"
        );
        assert!(!selector.matches(&label("anything")));
    }

    let nested = Selector::from("text:Save && bogus");
    assert!(nested.validate().is_err());
}
