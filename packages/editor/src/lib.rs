//! # Formsmith Editor
//!
//! Editing engine for the form builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ topology: child lists, slots, ancestry      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ store: FormTree + mutations + history       │
//! │  - create/move/remove/duplicate/update      │
//! │  - coalesced snapshot undo/redo             │
//! │  - selection, drop indicator, viewport      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ drag: pointer geometry → DropLocation       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ codec: FormTree ⇄ nested FieldDef schema    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The flat tree is the source of truth**: the nested schema is a
//!    derived view
//! 2. **Transactions**: every store operation leaves the tree consistent
//!    before it returns
//! 3. **Pure resolution**: drag targets are computed from the tree and
//!    geometry alone
//!
//! ## Usage
//!
//! ```rust,ignore
//! use formsmith_editor::FormStore;
//!
//! let mut store = FormStore::new();
//! let group = store.create_node("group", None, 0, None)?.unwrap();
//! store.create_node("email", Some(&group), 0, None)?;
//!
//! store.tick();
//! store.undo();
//!
//! let schema = store.to_fields();
//! ```

pub mod clock;
pub mod codec;
mod config;
pub mod drag;
mod errors;
mod merge;
mod mutations;
mod store;
pub mod topology;
mod tree;
mod undo_stack;

pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use codec::{all_field_names, from_fields, schema_field_names, to_fields};
pub use config::EditorConfig;
pub use drag::{
    can_drop, resolve_drop, DragController, DragGeometry, DragSource, DragState, DropOutcome,
    IndicatorUpdate, OverTarget, Position, Rect, ResolverConfig,
};
pub use errors::EditorError;
pub use merge::deep_merge;
pub use mutations::{is_noop_move, Mutation, MutationContext, MutationError, MutationResult};
pub use store::{DocumentMeta, EditorMode, FormStore, Viewport, DEFAULT_FORM_NAME};
pub use topology::{check_topology, TopologyIssue};
pub use tree::{DropLocation, FormTree, Node, NodeId, NodeMap, SlotMap};
pub use undo_stack::{Snapshot, UndoStack};

// Re-export schema types for convenience
pub use formsmith_schema::{Field, FieldDef, FieldKind, FieldRegistry, IDGenerator, LayoutKind, TabDef};
