//! Undoable canvas mutations.

use crate::ids::ObjectId;
use crate::item::DrawnItem;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Tag of an [`Action`], with stable numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Add,
    Remove,
    Modify,
}

impl ActionKind {
    pub fn tag(self) -> u32 {
        match self {
            ActionKind::Add => 0,
            ActionKind::Remove => 1,
            ActionKind::Modify => 2,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ActionKind::Add),
            1 => Some(ActionKind::Remove),
            2 => Some(ActionKind::Modify),
            _ => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Add => "add",
            ActionKind::Remove => "remove",
            ActionKind::Modify => "modify",
        };
        f.write_str(name)
    }
}

/// Errors from building or applying an action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{0} action has no items")]
    EmptyItems(ActionKind),
    #[error("modify action changes identity from {old} to {new}")]
    IdentityMismatch { old: ObjectId, new: ObjectId },
    #[error("item {0} appears more than once in one action")]
    DuplicateItem(ObjectId),
    #[error("item {0} is not on the canvas")]
    MissingItem(ObjectId),
    #[error("item {0} is already on the canvas")]
    AlreadyPresent(ObjectId),
    #[error("canvas lock poisoned")]
    Poisoned,
}

impl ActionError {
    /// The action itself is malformed, whatever the canvas holds.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ActionError::EmptyItems(_) | ActionError::IdentityMismatch { .. } | ActionError::DuplicateItem(_)
        )
    }

    /// The action is well formed but doesn't fit the current canvas, e.g.
    /// it raced with a remote delete.
    pub fn is_reference(&self) -> bool {
        matches!(self, ActionError::MissingItem(_) | ActionError::AlreadyPresent(_))
    }
}

/// An atomic, undoable change to the canvas.
///
/// Removals carry whole items, not just ids, so undoing them can put the
/// items back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Add(Vec<DrawnItem>),
    Remove(Vec<DrawnItem>),
    Modify { old: DrawnItem, new: DrawnItem },
}

impl Action {
    /// Build a validated add action.
    pub fn add(items: Vec<DrawnItem>) -> Result<Self, ActionError> {
        let action = Action::Add(items);
        action.validate()?;
        Ok(action)
    }

    /// Build a validated remove action.
    pub fn remove(items: Vec<DrawnItem>) -> Result<Self, ActionError> {
        let action = Action::Remove(items);
        action.validate()?;
        Ok(action)
    }

    /// Build a validated modify action from the before and after states.
    pub fn modify(old: DrawnItem, new: DrawnItem) -> Result<Self, ActionError> {
        let action = Action::Modify { old, new };
        action.validate()?;
        Ok(action)
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Add(_) => ActionKind::Add,
            Action::Remove(_) => ActionKind::Remove,
            Action::Modify { .. } => ActionKind::Modify,
        }
    }

    /// Check the shape of the action. Values built through the constructors
    /// always pass; values decoded from the network may not.
    pub fn validate(&self) -> Result<(), ActionError> {
        match self {
            Action::Add(items) | Action::Remove(items) => {
                if items.is_empty() {
                    return Err(ActionError::EmptyItems(self.kind()));
                }
                let mut seen = HashSet::with_capacity(items.len());
                for item in items {
                    if !seen.insert(item.id()) {
                        return Err(ActionError::DuplicateItem(item.id()));
                    }
                }
                Ok(())
            }
            Action::Modify { old, new } => {
                if old.id() != new.id() {
                    return Err(ActionError::IdentityMismatch {
                        old: old.id(),
                        new: new.id(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Ids of every item the action touches.
    pub fn ids(&self) -> Vec<ObjectId> {
        match self {
            Action::Add(items) | Action::Remove(items) => items.iter().map(DrawnItem::id).collect(),
            Action::Modify { new, .. } => vec![new.id()],
        }
    }

    /// The action that undoes this one.
    pub fn inverse(&self) -> Action {
        match self {
            Action::Add(items) => Action::Remove(items.clone()),
            Action::Remove(items) => Action::Add(items.clone()),
            Action::Modify { old, new } => Action::Modify {
                old: new.clone(),
                new: old.clone(),
            },
        }
    }

    /// Serialize the action to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize an action from JSON. The result is not validated.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{SerializableColor, ShapeKind};
    use kurbo::Point;

    fn item(local_id: u64) -> DrawnItem {
        DrawnItem::new(ObjectId::new(1, local_id), ShapeKind::Line, SerializableColor::black(), 4.0)
            .with_points([Point::new(0.0, 0.0), Point::new(10.0, 10.0)])
    }

    #[test]
    fn test_empty_add_and_remove_rejected() {
        assert_eq!(Action::add(vec![]), Err(ActionError::EmptyItems(ActionKind::Add)));
        assert_eq!(Action::remove(vec![]), Err(ActionError::EmptyItems(ActionKind::Remove)));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = Action::add(vec![item(1), item(2), item(1)]).unwrap_err();
        assert_eq!(err, ActionError::DuplicateItem(ObjectId::new(1, 1)));
        assert!(err.is_validation());
        assert!(!err.is_reference());
    }

    #[test]
    fn test_modify_requires_same_identity() {
        let err = Action::modify(item(1), item(2)).unwrap_err();
        assert!(matches!(err, ActionError::IdentityMismatch { .. }));

        let mut moved = item(1);
        moved.translate(kurbo::Vec2::new(5.0, 0.0));
        let action = Action::modify(item(1), moved).unwrap();
        assert_eq!(action.kind(), ActionKind::Modify);
        assert_eq!(action.ids(), vec![ObjectId::new(1, 1)]);
    }

    #[test]
    fn test_inverse() {
        let add = Action::add(vec![item(1), item(2)]).unwrap();
        assert_eq!(add.inverse(), Action::Remove(vec![item(1), item(2)]));
        assert_eq!(add.inverse().inverse(), add);

        let mut recolored = item(3);
        recolored.color = SerializableColor::white();
        let modify = Action::modify(item(3), recolored.clone()).unwrap();
        assert_eq!(
            modify.inverse(),
            Action::Modify {
                old: recolored,
                new: item(3)
            }
        );
    }

    #[test]
    fn test_kind_tags() {
        for kind in [ActionKind::Add, ActionKind::Remove, ActionKind::Modify] {
            assert_eq!(ActionKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ActionKind::from_tag(3), None);
    }

    #[test]
    fn test_json_roundtrip_and_revalidation() {
        let mut moved = item(4);
        moved.translate(kurbo::Vec2::new(0.5, -2.25));
        let action = Action::modify(item(4), moved).unwrap();
        let json = action.to_json().unwrap();
        let back = Action::from_json(&json).unwrap();
        assert_eq!(back, action);
        assert!(back.validate().is_ok());

        // A hand-crafted modify with mismatched ids decodes but fails validation.
        let bad = Action::Modify { old: item(5), new: item(6) };
        let decoded = Action::from_json(&bad.to_json().unwrap()).unwrap();
        assert!(decoded.validate().is_err());
    }
}
