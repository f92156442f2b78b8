//! Requests and responses of the settings tree.
//!
//! Addresses travel as wire paths, see `Address::to_wire_path`.

use linked_hash_map::LinkedHashMap;

use simlink::codec::Variant;
use simlink::Attribute;

use crate::msg::{MessageType, Payload};

/// Asks for a metadata attribute of the node at `path`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetAttributeValueRequest {
    pub path: String,
    pub attribute: Attribute,
}
impl Payload for GetAttributeValueRequest {
    const TYPE: MessageType = MessageType::GetAttributeValueRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetAttributeValueResponse {
    pub result: Variant,
}
impl Payload for GetAttributeValueResponse {
    const TYPE: MessageType = MessageType::GetAttributeValueResponse;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetStateRequest {
    pub path: String,
}
impl Payload for GetStateRequest {
    const TYPE: MessageType = MessageType::GetStateRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GetStateResponse {
    pub state: Variant,
}
impl Payload for GetStateResponse {
    const TYPE: MessageType = MessageType::GetStateResponse;
}

/// Writes the state of the node at `path`. Missing state deletes the
/// container member found at the path.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SetStateRequest {
    pub path: String,
    pub state: Option<Variant>,
}
impl Payload for SetStateRequest {
    const TYPE: MessageType = MessageType::SetStateRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SetStateResponse {}
impl Payload for SetStateResponse {
    const TYPE: MessageType = MessageType::SetStateResponse;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExecuteCommandRequest {
    pub path: String,
    pub args: LinkedHashMap<String, Variant>,
}
impl Payload for ExecuteCommandRequest {
    const TYPE: MessageType = MessageType::ExecuteCommandRequest;
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExecuteCommandResponse {
    pub result: Variant,
}
impl Payload for ExecuteCommandResponse {
    const TYPE: MessageType = MessageType::ExecuteCommandResponse;
}
