//! Contract actions and their payload schemas
//!
//! Each payload struct is the single definition of its action's data, used
//! both to encode submissions and by [`MemoryLedger`](super::MemoryLedger) to
//! decode them.

use crate::error::{DocGraphError, DocGraphResult};
use crate::graph::codec::{Pack, Unpack};
use crate::graph::content::ContentGroup;
use crate::graph::types::{Checksum256, Name};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;

pub const CREATE: &str = "create";
pub const GET_OR_NEW: &str = "getornew";
pub const NEW_EDGE: &str = "newedge";
pub const ERASE: &str = "erase";
pub const REMOVE_EDGE: &str = "removeedge";
pub const CERTIFY: &str = "certify";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

/// Action payload: typed JSON or a pre-encoded binary blob
#[derive(Debug, Clone, PartialEq)]
pub enum ActionData {
    Json(JsonValue),
    Packed(Vec<u8>),
}

impl ActionData {
    pub fn json<T: Serialize>(payload: &T) -> DocGraphResult<Self> {
        Ok(ActionData::Json(serde_json::to_value(payload)?))
    }

    pub fn packed<T: Pack>(payload: &T) -> Self {
        ActionData::Packed(payload.to_packed())
    }

    /// Decode into a payload schema; packed data needs an [`Unpack`] impl
    pub fn decode<T>(&self) -> DocGraphResult<T>
    where
        T: for<'de> Deserialize<'de> + Unpack,
    {
        match self {
            ActionData::Json(value) => Ok(T::deserialize(value)?),
            ActionData::Packed(bytes) => T::from_packed(bytes),
        }
    }

    /// Decode a payload that only travels as JSON
    pub fn decode_json<T: for<'de> Deserialize<'de>>(&self) -> DocGraphResult<T> {
        match self {
            ActionData::Json(value) => Ok(T::deserialize(value)?),
            ActionData::Packed(_) => Err(DocGraphError::Codec(
                "binary payload not supported for this action".to_string(),
            )),
        }
    }
}

/// Packed data travels as a hex string, as in the chain's action JSON
impl Serialize for ActionData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionData::Json(value) => value.serialize(serializer),
            ActionData::Packed(bytes) => serializer.serialize_str(&hex::encode(bytes)),
        }
    }
}

/// A contract action awaiting submission
#[derive(Debug, Clone, Serialize)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: ActionData,
}

impl Action {
    pub fn new(account: Name, name: Name, actor: Name, permission: Name, data: ActionData) -> Self {
        Action {
            account,
            name,
            authorization: vec![PermissionLevel { actor, permission }],
            data,
        }
    }
}

/// Outcome of a committed action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub transaction_id: String,
    /// Value returned by the action, when the contract returns one
    #[serde(default)]
    pub return_value: Option<JsonValue>,
}

impl TransactionRef {
    /// Document hash carried in the action return value, if any
    pub fn returned_hash(&self) -> Option<Checksum256> {
        let value = self.return_value.as_ref()?;
        let text = value.get("hash").unwrap_or(value).as_str()?;
        text.parse().ok()
    }
}

/// `create` / `getornew` payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateDocument {
    pub creator: Name,
    pub content_groups: Vec<ContentGroup>,
}

impl Pack for CreateDocument {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        self.creator.pack(buf);
        self.content_groups.pack(buf);
    }
}

impl Unpack for CreateDocument {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        let creator = Name::unpack(buf)?;
        let content_groups = Vec::<ContentGroup>::unpack(buf)?;
        Ok(CreateDocument { creator, content_groups })
    }
}

/// `newedge` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub creator: Name,
    pub from_node: Checksum256,
    pub to_node: Checksum256,
    pub edge_name: Name,
}

/// `erase` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraseDocument {
    pub hash: Checksum256,
}

/// `removeedge` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveEdge {
    pub from_node: Checksum256,
    pub to_node: Checksum256,
    pub edge_name: Name,
}

/// `certify` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertifyDocument {
    pub certifier: Name,
    pub hash: Checksum256,
    #[serde(default)]
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_payload() -> CreateDocument {
        CreateDocument {
            creator: Name::new("alice").unwrap(),
            content_groups: vec![ContentGroup::labeled("system").with("type", Name::new("badge").unwrap())],
        }
    }

    #[test]
    fn test_create_payload_json_and_packed_agree() {
        let payload = create_payload();
        let from_json: CreateDocument = ActionData::json(&payload).unwrap().decode().unwrap();
        let from_packed: CreateDocument = ActionData::packed(&payload).decode().unwrap();
        assert_eq!(from_json, payload);
        assert_eq!(from_packed, payload);
    }

    #[test]
    fn test_action_json_shape() {
        let action = Action::new(
            Name::new("dao.hypha").unwrap(),
            Name::new(ERASE).unwrap(),
            Name::new("alice").unwrap(),
            Name::new("active").unwrap(),
            ActionData::Packed(vec![0xab, 0x01]),
        );
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "account": "dao.hypha",
                "name": "erase",
                "authorization": [{"actor": "alice", "permission": "active"}],
                "data": "ab01"
            })
        );
    }

    #[test]
    fn test_returned_hash() {
        let hash = Checksum256::digest(b"doc");
        let nested = TransactionRef {
            transaction_id: "t".into(),
            return_value: Some(json!({"hash": hash.to_string()})),
        };
        let bare = TransactionRef {
            transaction_id: "t".into(),
            return_value: Some(json!(hash.to_string())),
        };
        assert_eq!(nested.returned_hash(), Some(hash));
        assert_eq!(bare.returned_hash(), Some(hash));
        assert_eq!(TransactionRef::default().returned_hash(), None);
    }

    #[test]
    fn test_json_only_payload_rejects_binary() {
        let data = ActionData::Packed(vec![1, 2, 3]);
        assert!(matches!(data.decode_json::<EraseDocument>(), Err(DocGraphError::Codec(_))));
    }
}
