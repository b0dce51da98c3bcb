//! Order payloads and their typed form.
//!
//! [`OrderPayload`] is the logical wire shape
//! `{ "type": "move" | "pass", "unit_id"?, "destination"? }`. It is what gets
//! stored on a turn. [`Order`] is the checked form the resolver acts on.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::hex::Hex;
use crate::ids::UnitId;

/// Order type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Move a unit toward a destination.
    Move,
    /// Do nothing this turn.
    Pass,
}

/// Unchecked order as submitted by a participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderPayload {
    /// Order type.
    #[serde(rename = "type")]
    pub kind: OrderKind,
    /// Unit to move. Required for moves.
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    /// Target cell. Required for moves.
    #[serde(default, alias = "to")]
    pub destination: Option<Hex>,
}

impl OrderPayload {
    /// A pass order.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            kind: OrderKind::Pass,
            unit_id: None,
            destination: None,
        }
    }

    /// A move order.
    #[must_use]
    pub const fn move_unit(unit_id: UnitId, destination: Hex) -> Self {
        Self {
            kind: OrderKind::Move,
            unit_id: Some(unit_id),
            destination: Some(destination),
        }
    }

    /// Parse a payload from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if the JSON does not have the payload shape.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GameError::validation(format!("malformed order payload: {e}")))
    }

    /// Check the payload shape and convert it into an [`Order`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Validation`] if a move lacks `unit_id` or `destination`.
    pub fn validate(&self) -> Result<Order> {
        match self.kind {
            OrderKind::Pass => Ok(Order::Pass),
            OrderKind::Move => match (self.unit_id, self.destination) {
                (Some(unit_id), Some(destination)) => Ok(Order::Move {
                    unit_id,
                    destination,
                }),
                (None, None) => Err(GameError::validation(
                    "move orders require unit_id and destination",
                )),
                (None, Some(_)) => Err(GameError::validation("move orders require unit_id")),
                (Some(_), None) => Err(GameError::validation("move orders require destination")),
            },
        }
    }
}

impl Default for OrderPayload {
    fn default() -> Self {
        Self::pass()
    }
}

/// A checked order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Order {
    /// Move a unit toward a destination.
    Move {
        /// Unit to move.
        unit_id: UnitId,
        /// Target cell.
        destination: Hex,
    },
    /// Do nothing this turn.
    Pass,
}

impl From<Order> for OrderPayload {
    fn from(order: Order) -> Self {
        match order {
            Order::Move {
                unit_id,
                destination,
            } => Self::move_unit(unit_id, destination),
            Order::Pass => Self::pass(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_with_destination() {
        let payload =
            OrderPayload::from_json(r#"{"type":"move","unit_id":4,"destination":{"q":8,"r":5}}"#)
                .unwrap();
        assert_eq!(
            payload.validate().unwrap(),
            Order::Move {
                unit_id: UnitId(4),
                destination: Hex::new(8, 5),
            }
        );
    }

    #[test]
    fn test_parse_accepts_to_alias() {
        let payload =
            OrderPayload::from_json(r#"{"type":"move","unit_id":4,"to":{"q":1,"r":2}}"#).unwrap();
        assert_eq!(payload.destination, Some(Hex::new(1, 2)));
    }

    #[test]
    fn test_parse_pass() {
        let payload = OrderPayload::from_json(r#"{"type":"pass"}"#).unwrap();
        assert_eq!(payload, OrderPayload::pass());
        assert_eq!(payload.validate().unwrap(), Order::Pass);
    }

    #[test]
    fn test_unknown_type_is_validation_error() {
        let err = OrderPayload::from_json(r#"{"type":"attack"}"#).unwrap_err();
        assert!(matches!(err, GameError::Validation(_)));
    }

    #[test]
    fn test_move_missing_fields() {
        let missing_unit = OrderPayload {
            kind: OrderKind::Move,
            unit_id: None,
            destination: Some(Hex::new(0, 0)),
        };
        assert!(matches!(
            missing_unit.validate(),
            Err(GameError::Validation(_))
        ));

        let missing_destination = OrderPayload {
            kind: OrderKind::Move,
            unit_id: Some(UnitId(1)),
            destination: None,
        };
        assert!(matches!(
            missing_destination.validate(),
            Err(GameError::Validation(_))
        ));
    }

    #[test]
    fn test_serialized_pass_writes_empty_fields() {
        let json = serde_json::to_string(&OrderPayload::pass()).unwrap();
        assert_eq!(json, r#"{"type":"pass","unit_id":null,"destination":null}"#);
        assert_eq!(OrderPayload::from_json(r#"{"type":"pass"}"#).unwrap(), OrderPayload::pass());
    }
}
