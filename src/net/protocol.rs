//! Wire protocol
//!
//! Every frame is a JSON text message `{"type": ..., "payload": {...}}`.
//! Outbound frames are typed via [`ServerMessage`]. Inbound frames are checked
//! field by field so each failure maps to one client-facing [`ProtocolError`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use crate::game::snapshot::{CellMap, GameSnapshot};
use crate::game::state::{Color, PlayerId, Position, Rule, TurnDirection};

/// Message type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    GameStateSnapshot,
    PlayerJoin,
    PlayerLeave,
    PlaceAnt,
    RuleChange,
    TileFlip,
    Error,
}

impl MessageType {
    pub fn parse(tag: &str) -> Option<Self> {
        let ty = match tag {
            "GAME_STATE_SNAPSHOT" => MessageType::GameStateSnapshot,
            "PLAYER_JOIN" => MessageType::PlayerJoin,
            "PLAYER_LEAVE" => MessageType::PlayerLeave,
            "PLACE_ANT" => MessageType::PlaceAnt,
            "RULE_CHANGE" => MessageType::RuleChange,
            "TILE_FLIP" => MessageType::TileFlip,
            "ERROR" => MessageType::Error,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::GameStateSnapshot => "GAME_STATE_SNAPSHOT",
            MessageType::PlayerJoin => "PLAYER_JOIN",
            MessageType::PlayerLeave => "PLAYER_LEAVE",
            MessageType::PlaceAnt => "PLACE_ANT",
            MessageType::RuleChange => "RULE_CHANGE",
            MessageType::TileFlip => "TILE_FLIP",
            MessageType::Error => "ERROR",
        }
    }
}

/// Messages from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    GameStateSnapshot(GameSnapshot),
    #[serde(rename_all = "camelCase")]
    PlayerJoin { player_id: PlayerId, color: Color },
    #[serde(rename_all = "camelCase")]
    PlayerLeave { player_id: PlayerId },
    /// State after a successful placement
    PlaceAnt(GameSnapshot),
    #[serde(rename_all = "camelCase")]
    RuleChange { player_id: PlayerId, rules: Vec<Rule> },
    /// State after a tile flip attempt
    TileFlip(GameSnapshot),
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            ServerMessage::GameStateSnapshot(_) => MessageType::GameStateSnapshot,
            ServerMessage::PlayerJoin { .. } => MessageType::PlayerJoin,
            ServerMessage::PlayerLeave { .. } => MessageType::PlayerLeave,
            ServerMessage::PlaceAnt(_) => MessageType::PlaceAnt,
            ServerMessage::RuleChange { .. } => MessageType::RuleChange,
            ServerMessage::TileFlip(_) => MessageType::TileFlip,
            ServerMessage::Error { .. } => MessageType::Error,
        }
    }
}

/// Encode a server message as a JSON text frame
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

/// Validated inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    PlaceAnt { position: Position, rules: Vec<Rule> },
    RuleChange { rules: Vec<Rule> },
    TileFlip { position: Position },
    /// A recognized type that only the server sends
    ServerOnly(MessageType),
}

/// Validation failures. Display strings are sent to the client verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("missing type")]
    MissingType,
    #[error("invalid message type")]
    InvalidType,
    #[error("ant position x and y must be numbers")]
    NonNumericPosition,
    #[error("x and y must be positive")]
    NegativePosition,
    #[error("x and y must be integers")]
    FractionalPosition,
    #[error("rules must be a non-empty array")]
    EmptyRules,
    #[error("currentColor, newColor, and turnDirection are required")]
    IncompleteRule,
    #[error("turnDirection must be LEFT or RIGHT")]
    InvalidTurnDirection,
}

/// Parse and validate one inbound text frame
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::MissingType)?;
    let frame = value.as_object().ok_or(ProtocolError::MissingType)?;

    let tag = frame
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    let ty = MessageType::parse(tag).ok_or(ProtocolError::InvalidType)?;

    let empty = Map::new();
    let payload = frame
        .get("payload")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    match ty {
        MessageType::PlaceAnt => {
            let position = parse_position(payload)?;
            let rules = parse_rules(payload)?;
            Ok(ClientMessage::PlaceAnt { position, rules })
        }
        MessageType::RuleChange => Ok(ClientMessage::RuleChange {
            rules: parse_rules(payload)?,
        }),
        MessageType::TileFlip => Ok(ClientMessage::TileFlip {
            position: parse_position(payload)?,
        }),
        other => Ok(ClientMessage::ServerOnly(other)),
    }
}

fn parse_position(payload: &Map<String, Value>) -> Result<Position, ProtocolError> {
    let position = payload.get("position").and_then(Value::as_object);
    let coord = |axis: &str| position.and_then(|p| p.get(axis)).and_then(Value::as_f64);

    let (Some(x), Some(y)) = (coord("x"), coord("y")) else {
        return Err(ProtocolError::NonNumericPosition);
    };
    if x < 0.0 || y < 0.0 {
        return Err(ProtocolError::NegativePosition);
    }
    if x.fract() != 0.0 || y.fract() != 0.0 {
        return Err(ProtocolError::FractionalPosition);
    }

    // Saturating cast; oversized values land out of bounds in the engine
    Ok(Position::new(x as u32, y as u32))
}

fn parse_rules(payload: &Map<String, Value>) -> Result<Vec<Rule>, ProtocolError> {
    let rules = payload
        .get("rules")
        .and_then(Value::as_array)
        .filter(|rules| !rules.is_empty())
        .ok_or(ProtocolError::EmptyRules)?;

    rules.iter().map(parse_rule).collect()
}

fn parse_rule(value: &Value) -> Result<Rule, ProtocolError> {
    let field = |name: &str| value.get(name).and_then(Value::as_str);

    let (Some(current), Some(new), Some(turn)) =
        (field("currentColor"), field("newColor"), field("turnDirection"))
    else {
        return Err(ProtocolError::IncompleteRule);
    };
    let turn = TurnDirection::parse(turn).ok_or(ProtocolError::InvalidTurnDirection)?;

    Ok(Rule::new(current, new, turn))
}
