//! InkBoard Core Library
//!
//! Shared state engine for the multi-user InkBoard canvas: drawn items,
//! object id allocation, the undo/redo action log and hit testing.

pub mod action;
pub mod canvas;
pub mod config;
pub mod hit;
pub mod ids;
pub mod item;
pub mod tools;

pub use action::{Action, ActionError, ActionKind};
pub use canvas::{CanvasDocument, SharedCanvas};
pub use config::{CanvasConfig, ConfigError, HitConfig};
pub use hit::{hit, hit_with, topmost_hit};
pub use ids::{IdAllocator, ObjectId};
pub use item::{DrawnItem, SerializableColor, ShapeKind};
pub use tools::{DrawInfo, DrawMode, extend_stroke};
