//! Canvas state and the action log that mutates it.

use crate::action::{Action, ActionError};
use crate::config::CanvasConfig;
use crate::hit::{hit_with, topmost_hit};
use crate::ids::{IdAllocator, ObjectId};
use crate::item::DrawnItem;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// An action as it took effect, plus the z positions its removed items had,
/// so that putting them back restores the original stacking.
#[derive(Debug, Clone)]
struct HistoryEntry {
    action: Action,
    placement: Vec<usize>,
}

/// Persisted form of a canvas: live items back to front, no history.
#[derive(Serialize, Deserialize)]
struct PersistedCanvas {
    id: Uuid,
    items: Vec<DrawnItem>,
}

/// The live drawn items and the undo/redo history over them.
///
/// Items are only ever changed by applying an [`Action`], which records it
/// for undo. Reads are free.
#[derive(Debug, Clone)]
pub struct CanvasDocument {
    id: Uuid,
    items: HashMap<ObjectId, DrawnItem>,
    /// Back to front; later entries paint over and hit before earlier ones.
    z_order: Vec<ObjectId>,
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    config: CanvasConfig,
}

impl Default for CanvasDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasDocument {
    /// Create an empty canvas with the default config.
    pub fn new() -> Self {
        Self::with_config(CanvasConfig::default())
    }

    /// Create an empty canvas with the given config.
    pub fn with_config(config: CanvasConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            items: HashMap::new(),
            z_order: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            config,
        }
    }

    /// Session document id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hit distances, stroke limit and history cap in effect.
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    // --- Action log ---

    /// Validate and apply a new action, then record it for undo.
    ///
    /// Fails without touching anything if the action is malformed or refers
    /// to items that aren't (or already are) on the canvas. A successful
    /// apply discards everything that could have been redone.
    ///
    /// History records the items the action actually displaced, not the
    /// payload it carried, so undo restores the canvas exactly even when a
    /// remote action's `old` or removed items were out of date.
    pub fn apply(&mut self, action: Action) -> Result<(), ActionError> {
        if let Err(e) = action.validate() {
            log::warn!("Rejected malformed {} action: {}", action.kind(), e);
            return Err(e);
        }
        let entry = match self.execute(&action, &[]) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Rejected {} action: {}", action.kind(), e);
                return Err(e);
            }
        };
        log::debug!("Applied {} action on {:?}", action.kind(), action.ids());

        self.undo_stack.push(entry);
        self.redo_stack.clear();
        if let Some(limit) = self.config.history_limit {
            if self.undo_stack.len() > limit {
                let excess = self.undo_stack.len() - limit;
                self.undo_stack.drain(..excess);
            }
        }
        Ok(())
    }

    /// Undo the most recent action.
    ///
    /// Returns `Ok(false)` if there is nothing to undo. If the inverse no
    /// longer fits the canvas (a remote edit removed or re-added its items in
    /// the meantime) the entry is dropped from history, the canvas is left
    /// alone and the error is returned.
    pub fn undo(&mut self) -> Result<bool, ActionError> {
        let Some(entry) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let inverse = entry.action.inverse();
        match self.execute(&inverse, &entry.placement) {
            Ok(undone) => {
                log::debug!("Undid {} action on {:?}", entry.action.kind(), entry.action.ids());
                self.redo_stack.push(HistoryEntry {
                    action: undone.action.inverse(),
                    placement: undone.placement,
                });
                Ok(true)
            }
            Err(e) => {
                log::warn!("Dropping {} action from history, undo failed: {}", entry.action.kind(), e);
                Err(e)
            }
        }
    }

    /// Redo the most recently undone action. Same failure rules as
    /// [`undo`](Self::undo).
    pub fn redo(&mut self) -> Result<bool, ActionError> {
        let Some(entry) = self.redo_stack.pop() else {
            return Ok(false);
        };
        match self.execute(&entry.action, &entry.placement) {
            Ok(redone) => {
                log::debug!("Redid {} action on {:?}", entry.action.kind(), entry.action.ids());
                self.undo_stack.push(redone);
                Ok(true)
            }
            Err(e) => {
                log::warn!("Dropping {} action from history, redo failed: {}", entry.action.kind(), e);
                Err(e)
            }
        }
    }

    /// Whether there is an action to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether there is an undone action to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of actions that can be undone.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of actions that can be redone.
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Forget all history, keeping the current items.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Check that `action` fits the current items, then perform it.
    ///
    /// `placement` gives z positions for an add that puts removed items back.
    /// The returned entry holds the action as it actually took effect: a
    /// remove carries the live items it took out (and their z positions), a
    /// modify carries the live item it replaced as `old`.
    fn execute(&mut self, action: &Action, placement: &[usize]) -> Result<HistoryEntry, ActionError> {
        self.check_references(action)?;

        match action {
            Action::Add(items) => {
                if placement.len() == items.len() {
                    let mut placed: Vec<(usize, &DrawnItem)> =
                        placement.iter().copied().zip(items.iter()).collect();
                    placed.sort_by_key(|(pos, _)| *pos);
                    for (pos, item) in placed {
                        let pos = pos.min(self.z_order.len());
                        self.z_order.insert(pos, item.id());
                        self.items.insert(item.id(), item.clone());
                    }
                } else {
                    for item in items {
                        self.z_order.push(item.id());
                        self.items.insert(item.id(), item.clone());
                    }
                }
                Ok(HistoryEntry {
                    action: action.clone(),
                    placement: Vec::new(),
                })
            }
            Action::Remove(items) => {
                let positions: Vec<usize> = items
                    .iter()
                    .filter_map(|item| self.z_order.iter().position(|&id| id == item.id()))
                    .collect();
                let removed: Vec<DrawnItem> = items
                    .iter()
                    .filter_map(|item| self.items.remove(&item.id()))
                    .collect();
                self.z_order.retain(|id| self.items.contains_key(id));
                Ok(HistoryEntry {
                    action: Action::Remove(removed),
                    placement: positions,
                })
            }
            Action::Modify { new, .. } => {
                let existing = self
                    .items
                    .get_mut(&new.id())
                    .ok_or(ActionError::MissingItem(new.id()))?;
                let previous = std::mem::replace(existing, new.clone());
                Ok(HistoryEntry {
                    action: Action::Modify {
                        old: previous,
                        new: new.clone(),
                    },
                    placement: Vec::new(),
                })
            }
        }
    }

    fn check_references(&self, action: &Action) -> Result<(), ActionError> {
        match action {
            Action::Add(items) => match items.iter().find(|item| self.items.contains_key(&item.id())) {
                Some(item) => Err(ActionError::AlreadyPresent(item.id())),
                None => Ok(()),
            },
            Action::Remove(items) => match items.iter().find(|item| !self.items.contains_key(&item.id())) {
                Some(item) => Err(ActionError::MissingItem(item.id())),
                None => Ok(()),
            },
            Action::Modify { new, .. } => {
                if self.items.contains_key(&new.id()) {
                    Ok(())
                } else {
                    Err(ActionError::MissingItem(new.id()))
                }
            }
        }
    }

    // --- Read access ---

    /// Look up a live item.
    pub fn get(&self, id: ObjectId) -> Option<&DrawnItem> {
        self.items.get(&id)
    }

    /// Whether an item with this id is on the canvas.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.items.contains_key(&id)
    }

    /// Items back to front.
    pub fn items_ordered(&self) -> impl DoubleEndedIterator<Item = &DrawnItem> {
        self.z_order.iter().filter_map(|id| self.items.get(id))
    }

    /// Ids back to front.
    pub fn ids(&self) -> &[ObjectId] {
        &self.z_order
    }

    /// Owned copy of the items, back to front, for handing to a renderer.
    pub fn snapshot(&self) -> Vec<DrawnItem> {
        self.items_ordered().cloned().collect()
    }

    /// Whether the canvas has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Bounding box of all items that have geometry.
    pub fn bounds(&self) -> Option<Rect> {
        self.items_ordered()
            .filter_map(DrawnItem::bounds)
            .reduce(|a, b| a.union(b))
    }

    /// Topmost item under `point`.
    pub fn item_at(&self, point: Point) -> Option<&DrawnItem> {
        topmost_hit(point, self.items_ordered(), &self.config.hit)
    }

    /// Every item under `point`, topmost first.
    pub fn items_at(&self, point: Point) -> Vec<ObjectId> {
        self.items_ordered()
            .rev()
            .filter(|item| hit_with(point, item, &self.config.hit))
            .map(DrawnItem::id)
            .collect()
    }

    // --- Persistence ---

    /// Serialize the live items to JSON. History is not saved.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let persisted = PersistedCanvas {
            id: self.id,
            items: self.snapshot(),
        };
        serde_json::to_string_pretty(&persisted)
    }

    /// Load a canvas from JSON, with empty history and the default config.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Self::from_json_with_config(json, CanvasConfig::default())
    }

    /// Load a canvas from JSON, with empty history and the given config.
    pub fn from_json_with_config(json: &str, config: CanvasConfig) -> Result<Self, serde_json::Error> {
        let persisted: PersistedCanvas = serde_json::from_str(json)?;
        let mut doc = Self::with_config(config);
        doc.id = persisted.id;
        for item in persisted.items {
            let id = item.id();
            if doc.items.insert(id, item).is_some() {
                return Err(serde::de::Error::custom(format!("duplicate item id {id}")));
            }
            doc.z_order.push(id);
        }
        Ok(doc)
    }
}

/// Thread-safe handle to a canvas and the id allocator its users share.
///
/// Mutations take the write lock, so the items and both history stacks
/// always change together. Hit tests and snapshots take the read lock.
#[derive(Debug, Clone)]
pub struct SharedCanvas {
    document: Arc<RwLock<CanvasDocument>>,
    allocator: Arc<IdAllocator>,
}

impl Default for SharedCanvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl SharedCanvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self::from_document(CanvasDocument::with_config(config))
    }

    /// Wrap an existing document. The allocator starts past every id the
    /// document already contains.
    pub fn from_document(document: CanvasDocument) -> Self {
        let allocator = IdAllocator::new();
        for id in document.ids() {
            allocator.observe(*id);
        }
        Self {
            document: Arc::new(RwLock::new(document)),
            allocator: Arc::new(allocator),
        }
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.allocator
    }

    pub fn allocate(&self, user_id: i64) -> ObjectId {
        self.allocator.allocate(user_id)
    }

    /// Apply a local or remote action.
    pub fn apply(&self, action: Action) -> Result<(), ActionError> {
        self.write()?.apply(action)
    }

    pub fn undo(&self) -> Result<bool, ActionError> {
        self.write()?.undo()
    }

    pub fn redo(&self) -> Result<bool, ActionError> {
        self.write()?.redo()
    }

    /// Copy of the topmost item under `point`.
    pub fn hit_test(&self, point: Point) -> Result<Option<DrawnItem>, ActionError> {
        Ok(self.read()?.item_at(point).cloned())
    }

    /// Remove the topmost item under `point` as one undoable action. The
    /// lookup and removal happen under one lock, so a concurrent edit can't
    /// slip in between them.
    pub fn erase_at(&self, point: Point) -> Result<Option<ObjectId>, ActionError> {
        let mut doc = self.write()?;
        let Some(target) = doc.item_at(point).cloned() else {
            return Ok(None);
        };
        let id = target.id();
        doc.apply(Action::remove(vec![target])?)?;
        Ok(Some(id))
    }

    pub fn snapshot(&self) -> Result<Vec<DrawnItem>, ActionError> {
        Ok(self.read()?.snapshot())
    }

    /// Run `f` against the document under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&CanvasDocument) -> R) -> Result<R, ActionError> {
        let doc = self.read()?;
        Ok(f(&doc))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CanvasDocument>, ActionError> {
        self.document.read().map_err(|_| ActionError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CanvasDocument>, ActionError> {
        self.document.write().map_err(|_| ActionError::Poisoned)
    }
}
