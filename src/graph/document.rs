//! Document: the content-addressed node of the graph
//!
//! A document is identified by its `hash`, assigned by the ledger. The `id` is
//! a table sequence number and carries no identity.

use super::content::{ContentGroup, CONTENT_GROUP_LABEL};
use super::types::{deserialize_u64, Checksum256, Name, TimePoint};
use super::value::FlexValue;
use crate::error::{DocGraphError, DocGraphResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Group and item holding the document type
pub const SYSTEM_GROUP: &str = "system";
pub const TYPE_LABEL: &str = "type";
pub const NODE_LABEL: &str = "node_label";

/// A certifier's signature on a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub certifier: Name,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub certification_date: TimePoint,
}

/// A node in the document graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Table sequence number
    #[serde(default, deserialize_with = "deserialize_u64")]
    pub id: u64,

    /// Content-derived identity; zero for templates not yet stored
    #[serde(default)]
    pub hash: Checksum256,

    #[serde(default)]
    pub creator: Name,

    pub content_groups: Vec<ContentGroup>,

    #[serde(default)]
    pub certificates: Vec<Certificate>,

    #[serde(default)]
    pub created_date: TimePoint,
}

impl Document {
    /// Template document holding only content
    pub fn new(content_groups: Vec<ContentGroup>) -> Self {
        Document {
            content_groups,
            ..Default::default()
        }
    }

    /// Value of the first item labeled `label`, scanning groups in order
    pub fn get_content(&self, label: &str) -> DocGraphResult<&FlexValue> {
        self.content_groups
            .iter()
            .find_map(|group| group.find(label))
            .ok_or_else(|| self.content_not_found(label))
    }

    /// Value of `item_label` inside the group named `group_label`
    ///
    /// A group is named by its first `content_group_label` item; groups whose
    /// label differs are skipped whole, so an item of an unrelated group never
    /// matches.
    pub fn get_content_from_group(&self, group_label: &str, item_label: &str) -> DocGraphResult<&FlexValue> {
        for group in &self.content_groups {
            match group.group_label() {
                Some(label) if label.to_string() == group_label => {
                    return group
                        .find(item_label)
                        .ok_or_else(|| self.content_not_found(item_label));
                }
                _ => continue,
            }
        }
        Err(self.content_not_found(group_label))
    }

    /// Document type from `system.type`; empty when the document has none
    pub fn get_type(&self) -> DocGraphResult<Name> {
        match self.get_content_from_group(SYSTEM_GROUP, TYPE_LABEL) {
            Ok(value) => value.as_name(),
            Err(DocGraphError::ContentNotFound { .. }) => Ok(Name::default()),
            Err(e) => Err(e),
        }
    }

    /// Human-facing label used in logs
    pub fn node_label(&self) -> String {
        match self.get_content(NODE_LABEL) {
            Ok(value) => value.to_string(),
            Err(_) => {
                let hash = self.hash.to_string();
                match self.content_groups.first().and_then(|g| g.find(CONTENT_GROUP_LABEL)) {
                    Some(label) => format!("{}:{}", label, &hash[..8]),
                    None => hash[..8].to_string(),
                }
            }
        }
    }

    /// Deep comparison of content groups only
    ///
    /// `id`, `hash`, `creator`, `certificates` and `created_date` are ignored,
    /// so a stored document compares equal to the template it was created from.
    pub fn is_equal(&self, other: &Document) -> bool {
        if self.content_groups.len() != other.content_groups.len() {
            debug!(
                "content group counts differ: {} vs {}",
                self.content_groups.len(),
                other.content_groups.len()
            );
            return false;
        }

        for (index, (left, right)) in self.content_groups.iter().zip(&other.content_groups).enumerate() {
            if left.len() != right.len() {
                debug!("item counts differ in group {}: {} vs {}", index, left.len(), right.len());
                return false;
            }
        }

        for (left, right) in self.content_groups.iter().zip(&other.content_groups) {
            for (a, b) in left.iter().zip(right.iter()) {
                if !a.is_equal(b) {
                    debug!("content items differ: {} = {} vs {} = {}", a.label, a.value, b.label, b.value);
                    return false;
                }
            }
        }
        true
    }

    fn content_not_found(&self, label: &str) -> DocGraphError {
        DocGraphError::ContentNotFound {
            label: label.to_string(),
            document_hash: self.hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::content::ContentItem;
    use serde_json::json;

    fn badge() -> Document {
        serde_json::from_value(json!({
            "content_groups": [[
                {"label": "content_group_label", "value": ["string", "system"]},
                {"label": "type", "value": ["name", "badge"]}
            ]]
        }))
        .unwrap()
    }

    #[test]
    fn test_get_type() {
        assert_eq!(badge().get_type().unwrap().as_str(), "badge");
    }

    #[test]
    fn test_get_type_missing_is_empty() {
        let doc = Document::new(vec![ContentGroup::labeled("details").with("title", "x")]);
        assert!(doc.get_type().unwrap().is_empty());
    }

    #[test]
    fn test_get_type_wrong_variant() {
        let doc = Document::new(vec![ContentGroup::labeled("system").with("type", 5i64)]);
        assert!(matches!(
            doc.get_type(),
            Err(DocGraphError::InvalidType { ref value, expected: "name", found: "int64" }) if value == "5"
        ));
    }

    #[test]
    fn test_get_content_missing() {
        let doc = badge();
        match doc.get_content("X") {
            Err(DocGraphError::ContentNotFound { label, document_hash }) => {
                assert_eq!(label, "X");
                assert_eq!(document_hash, doc.hash);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_get_content_scans_groups_in_order() {
        let doc = Document::new(vec![
            ContentGroup::labeled("details").with("title", "first"),
            ContentGroup::labeled("other").with("title", "second"),
        ]);
        assert_eq!(doc.get_content("title").unwrap().to_string(), "first");
    }

    #[test]
    fn test_get_content_from_group_does_not_cross_groups() {
        let doc = Document::new(vec![
            ContentGroup::labeled("details").with("title", "in details"),
            ContentGroup::labeled("system").with("type", Name::new("badge").unwrap()),
        ]);
        assert_eq!(
            doc.get_content_from_group("details", "title").unwrap().to_string(),
            "in details"
        );
        // "type" exists, but not in "details"
        assert!(matches!(
            doc.get_content_from_group("details", "type"),
            Err(DocGraphError::ContentNotFound { ref label, .. }) if label == "type"
        ));
        assert!(matches!(
            doc.get_content_from_group("missing", "title"),
            Err(DocGraphError::ContentNotFound { ref label, .. }) if label == "missing"
        ));
    }

    #[test]
    fn test_equality_ignores_identity_fields() {
        let a = badge();
        let mut b = badge();
        b.id = 99;
        b.hash = Checksum256::digest(b"other");
        b.creator = Name::new("alice").unwrap();
        b.created_date = TimePoint::now();
        b.certificates.push(Certificate {
            certifier: Name::new("bob").unwrap(),
            notes: "ok".into(),
            certification_date: TimePoint::now(),
        });
        assert!(a.is_equal(&a));
        assert!(a.is_equal(&b));
    }

    #[test]
    fn test_equality_detects_differences() {
        let a = badge();
        let mut extra_group = badge();
        extra_group.content_groups.push(ContentGroup::new());
        assert!(!a.is_equal(&extra_group));

        let mut extra_item = badge();
        extra_item.content_groups[0].push(ContentItem::new("x", 1i64));
        assert!(!a.is_equal(&extra_item));

        let other_type = Document::new(vec![ContentGroup::labeled("system").with("type", Name::new("role").unwrap())]);
        assert!(!a.is_equal(&other_type));
    }

    #[test]
    fn test_decode_ledger_row() {
        let hash = Checksum256::digest(b"row");
        let row = json!({
            "id": "17",
            "hash": hash.to_string(),
            "creator": "alice",
            "content_groups": [[{"label": "amount", "value": ["asset", "5.00 USD"]}]],
            "certificates": [{"certifier": "bob", "notes": "seen", "certification_date": "2021-01-01T00:00:00.000"}],
            "created_date": "2021-01-01T00:00:00.500"
        });
        let doc: Document = serde_json::from_value(row).unwrap();
        assert_eq!(doc.id, 17);
        assert_eq!(doc.hash, hash);
        assert_eq!(doc.certificates[0].certifier.as_str(), "bob");
        assert_eq!(doc.get_content("amount").unwrap().as_asset().unwrap().amount, 500);
    }
}
