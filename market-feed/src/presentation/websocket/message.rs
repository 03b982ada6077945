use crate::domain::{Instrument, InstrumentId};
use crate::error::{ProtocolError, TransportError};
use serde::Serialize;
use serde_json::{Map, Value};

/// Inbound client command
///
/// ```text
/// {"type":"subscribe","product_ids":[1,2]}
/// {"type":"unsubscribe","product_ids":[1]}
/// {"type":"unsubscribe"}
/// ```
///
/// Non-integer entries in `product_ids` are skipped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Subscribe { product_ids: Vec<InstrumentId> },
    /// `None` clears every subscription
    Unsubscribe {
        product_ids: Option<Vec<InstrumentId>>,
    },
}

impl ClientCommand {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;

        let command_type = match object.get("type") {
            None => return Err(ProtocolError::MissingType),
            Some(Value::String(t)) => t.as_str(),
            Some(other) => {
                return Err(ProtocolError::InvalidField {
                    field: "type",
                    reason: format!("expected a string, got {}", other),
                });
            }
        };

        match command_type {
            "subscribe" => {
                let product_ids =
                    product_ids(object)?.ok_or_else(|| ProtocolError::InvalidField {
                        field: "product_ids",
                        reason: "required for subscribe".to_string(),
                    })?;
                Ok(ClientCommand::Subscribe { product_ids })
            }
            "unsubscribe" => Ok(ClientCommand::Unsubscribe {
                product_ids: product_ids(object)?,
            }),
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

fn product_ids(object: &Map<String, Value>) -> Result<Option<Vec<InstrumentId>>, ProtocolError> {
    match object.get("product_ids") {
        None => Ok(None),
        Some(Value::Array(values)) => Ok(Some(values.iter().filter_map(Value::as_i64).collect())),
        Some(other) => Err(ProtocolError::InvalidField {
            field: "product_ids",
            reason: format!("expected an array, got {}", other),
        }),
    }
}

/// Handshake record: instrument id and its `<name>-<description>` label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeEntry {
    pub id: InstrumentId,
    pub name: String,
}

impl From<&Instrument> for HandshakeEntry {
    fn from(instrument: &Instrument) -> Self {
        HandshakeEntry {
            id: instrument.id,
            name: instrument.label(),
        }
    }
}

/// Serialize an outbound payload
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String, TransportError> {
    Ok(serde_json::to_string(payload)?)
}
