//! Labeled content items and the ordered groups that hold them

use super::value::FlexValue;
use serde::{Deserialize, Serialize};

/// Label of the item that names its group, by convention only
pub const CONTENT_GROUP_LABEL: &str = "content_group_label";

/// A labeled value
///
/// Labels compare exactly; values compare through [`FlexValue::is_equal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub label: String,
    pub value: FlexValue,
}

impl ContentItem {
    pub fn new(label: impl Into<String>, value: impl Into<FlexValue>) -> Self {
        ContentItem {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn is_equal(&self, other: &ContentItem) -> bool {
        self.label == other.label && self.value.is_equal(&other.value)
    }
}

/// Ordered list of content items forming one section of a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentGroup(Vec<ContentItem>);

impl ContentGroup {
    pub fn new() -> Self {
        ContentGroup(Vec::new())
    }

    /// Group whose first item is `content_group_label = label`
    pub fn labeled(label: impl Into<String>) -> Self {
        ContentGroup(vec![ContentItem::new(CONTENT_GROUP_LABEL, FlexValue::String(label.into()))])
    }

    pub fn with(mut self, label: impl Into<String>, value: impl Into<FlexValue>) -> Self {
        self.push(ContentItem::new(label, value));
        self
    }

    pub fn push(&mut self, item: ContentItem) {
        self.0.push(item);
    }

    /// First value with a matching label
    pub fn find(&self, label: &str) -> Option<&FlexValue> {
        self.0.iter().find(|item| item.label == label).map(|item| &item.value)
    }

    /// Value of the first `content_group_label` item, if any
    pub fn group_label(&self) -> Option<&FlexValue> {
        self.find(CONTENT_GROUP_LABEL)
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContentItem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<ContentItem>> for ContentGroup {
    fn from(items: Vec<ContentItem>) -> Self {
        ContentGroup(items)
    }
}

impl<'a> IntoIterator for &'a ContentGroup {
    type Item = &'a ContentItem;
    type IntoIter = std::slice::Iter<'a, ContentItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::Name;

    #[test]
    fn test_find_returns_first_match() {
        let group = ContentGroup::labeled("details")
            .with("title", "first")
            .with("title", "second");
        assert_eq!(group.find("title").unwrap().to_string(), "first");
        assert!(group.find("missing").is_none());
        assert_eq!(group.group_label().unwrap().to_string(), "details");
    }

    #[test]
    fn test_item_equality() {
        let a = ContentItem::new("type", Name::new("badge").unwrap());
        let b = ContentItem::new("type", Name::new("badge").unwrap());
        let c = ContentItem::new("Type", Name::new("badge").unwrap());
        let d = ContentItem::new("type", "badge");
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&c));
        assert!(!a.is_equal(&d));
    }

    #[test]
    fn test_json_layout() {
        let group = ContentGroup::labeled("system").with("type", Name::new("badge").unwrap());
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"label": "content_group_label", "value": ["string", "system"]},
                {"label": "type", "value": ["name", "badge"]}
            ])
        );
        let back: ContentGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }
}
