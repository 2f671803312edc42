//! # Drag Target Resolution
//!
//! Turns one drag-move event into a [`DropLocation`] (or nothing), and
//! drives the store through a drag with a small state machine.
//!
//! ## Resolution steps
//!
//! 1. Normalize the overlapped id into root, a node, or a container's
//!    drop zone (`dropzone:<parent>[:<slot>]`)
//! 2. Classify before/after/inside from the dragged rect's vertical center
//! 3. Translate into a parent list and index
//! 4. Reject tabs parents without tabs
//! 5. Check the parent accepts the child kind ([`can_drop`])
//! 6. Reject dropping an existing node into itself or its descendants
//!
//! [`resolve_drop`] is pure and cheap, so it runs on every move event.

use crate::mutations::{is_noop_move, MutationError};
use crate::store::FormStore;
use crate::topology::{child_list, is_descendant, locate, resolve_slot};
use crate::tree::{DropLocation, FormTree, NodeId};
use formsmith_schema::{Field, FieldKind, FieldRegistry};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ROOT_TARGET: &str = "root";
pub const DROPZONE_PREFIX: &str = "dropzone:";
const NEW_FIELD_PREFIX: &str = "new:";

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum DragSource {
    /// A palette entry, by field type
    NewField(String),
    /// A node already in the tree
    Existing(NodeId),
}

impl DragSource {
    /// Active-drag marker shown by the renderer
    pub fn marker(&self) -> String {
        match self {
            DragSource::NewField(field_type) => format!("{}{}", NEW_FIELD_PREFIX, field_type),
            DragSource::Existing(id) => id.clone(),
        }
    }

    /// Inverse of [`DragSource::marker`]
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(NEW_FIELD_PREFIX) {
            Some(field_type) => DragSource::NewField(field_type.to_string()),
            None => DragSource::Existing(raw.to_string()),
        }
    }
}

/// What the pointer currently overlaps
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverTarget {
    Root,
    Node(NodeId),
    DropZone {
        parent_id: NodeId,
        slot: Option<String>,
    },
}

impl OverTarget {
    pub fn parse(raw: &str) -> Self {
        if raw == ROOT_TARGET {
            return OverTarget::Root;
        }

        match raw.strip_prefix(DROPZONE_PREFIX) {
            Some(rest) => {
                let (parent_id, slot) = match rest.split_once(':') {
                    Some((parent, slot)) if !slot.is_empty() => {
                        (parent.to_string(), Some(slot.to_string()))
                    }
                    Some((parent, _)) => (parent.to_string(), None),
                    None => (rest.to_string(), None),
                };
                OverTarget::DropZone { parent_id, slot }
            }
            None => OverTarget::Node(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// Live geometry: the translated dragged rect and the overlapped rect
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DragGeometry {
    pub active: Rect,
    pub over: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
    Inside,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    pub container_padding: f64,
}

impl ResolverConfig {
    pub const DEFAULT_PADDING: f64 = 16.0;
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            container_padding: Self::DEFAULT_PADDING,
        }
    }
}

/// Whether `parent` accepts a direct child of kind `child`. `None` is root.
pub fn can_drop(parent: Option<&Field>, child: FieldKind) -> bool {
    match parent {
        None => true,
        Some(field) => match field.kind().layout() {
            Some(layout) => layout.accepts(child),
            None => false,
        },
    }
}

/// Before/after/inside for a drop over a node
pub fn classify(target: &Field, geometry: &DragGeometry, config: &ResolverConfig) -> Position {
    let y = geometry.active.center_y();
    let over = &geometry.over;

    if target.is_layout()
        && y > over.top + config.container_padding
        && y < over.bottom() - config.container_padding
    {
        return Position::Inside;
    }

    if y < over.center_y() {
        Position::Before
    } else {
        Position::After
    }
}

/// Resolve one drag-move event to a drop location, `None` when the drop
/// would be invalid
pub fn resolve_drop(
    tree: &FormTree,
    registry: &FieldRegistry,
    source: &DragSource,
    over: Option<&OverTarget>,
    geometry: &DragGeometry,
    config: &ResolverConfig,
) -> Option<DropLocation> {
    let location = match over? {
        OverTarget::Root => DropLocation::root(tree.root_ids().len()),

        OverTarget::DropZone { parent_id, slot } => {
            inside(tree, parent_id, slot.as_deref())?
        }

        OverTarget::Node(id) => {
            let target = tree.get(id)?;
            match classify(&target.field, geometry, config) {
                Position::Inside => inside(tree, id, None)?,
                position => {
                    let (parent_id, parent_slot, index) = locate(tree, id)?;
                    let index = match position {
                        Position::After => index + 1,
                        _ => index,
                    };
                    DropLocation::new(parent_id, parent_slot, index)
                }
            }
        }
    };

    let child_kind = match source {
        DragSource::NewField(field_type) => registry.kind_of(field_type),
        DragSource::Existing(id) => tree.get(id)?.field.kind(),
    };

    let parent = match location.parent_id.as_deref() {
        Some(parent_id) => Some(tree.get(parent_id)?),
        None => None,
    };

    // A tabs parent needs at least one tab to hold anything
    if let Some(parent) = parent {
        resolve_slot(&parent.field, location.parent_slot.as_deref())?;
    }

    if !can_drop(parent.map(|p| &p.field), child_kind) {
        debug!(parent_id = ?location.parent_id, "Drop rejected by parent");
        return None;
    }

    if let (DragSource::Existing(id), Some(parent_id)) = (source, location.parent_id.as_deref()) {
        if parent_id == id || is_descendant(tree.nodes(), id, parent_id) {
            debug!(node_id = %id, parent_id = %parent_id, "Drop would nest node in itself");
            return None;
        }
    }

    Some(location)
}

/// End of a container's slot list
fn inside(tree: &FormTree, parent_id: &str, slot: Option<&str>) -> Option<DropLocation> {
    let parent = tree.get(parent_id)?;
    if !parent.field.is_layout() {
        return None;
    }

    let slot = resolve_slot(&parent.field, slot)?;
    let len = child_list(tree.nodes(), tree.root_ids(), Some(parent_id), slot.as_deref())?.len();
    Some(DropLocation::new(Some(parent_id.to_string()), slot, len))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: DragSource,
        location: Option<DropLocation>,
    },
}

/// Effect of a move event on the drop indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorUpdate {
    Unchanged,
    Set,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// No live location at drop time
    Aborted,
    Created(NodeId),
    Moved,
    /// The node would land where it already is
    Unchanged,
}

/// Drag state machine: `Idle → Dragging → Idle`
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
    config: ResolverConfig,
}

impl DragController {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            state: DragState::Idle,
            config,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn start(&mut self, store: &mut FormStore, source: DragSource) {
        debug!(source = %source.marker(), "Drag started");
        store.set_active_id(Some(source.marker()));
        store.set_drop_indicator(None);
        self.state = DragState::Dragging {
            source,
            location: None,
        };
    }

    /// Recompute the drop location; the store is only touched when it moved
    pub fn on_move(
        &mut self,
        store: &mut FormStore,
        over: Option<&OverTarget>,
        geometry: &DragGeometry,
    ) -> IndicatorUpdate {
        let DragState::Dragging { source, location } = &mut self.state else {
            return IndicatorUpdate::Unchanged;
        };

        let next = resolve_drop(
            store.tree(),
            store.registry(),
            source,
            over,
            geometry,
            &self.config,
        );

        if next == *location {
            return IndicatorUpdate::Unchanged;
        }

        *location = next.clone();
        let update = if next.is_some() {
            IndicatorUpdate::Set
        } else {
            IndicatorUpdate::Cleared
        };
        store.set_drop_indicator(next);
        update
    }

    /// Finish the drag. Indicator and active marker are cleared whatever
    /// the outcome.
    pub fn drop(&mut self, store: &mut FormStore) -> Result<DropOutcome, MutationError> {
        let state = std::mem::take(&mut self.state);
        let outcome = Self::commit(store, state);

        store.set_drop_indicator(None);
        store.set_active_id(None);

        debug!(outcome = ?outcome, "Drag dropped");
        outcome
    }

    fn commit(store: &mut FormStore, state: DragState) -> Result<DropOutcome, MutationError> {
        let DragState::Dragging {
            source,
            location: Some(location),
        } = state
        else {
            return Ok(DropOutcome::Aborted);
        };

        match source {
            DragSource::NewField(field_type) => {
                let created = store.create_node(
                    &field_type,
                    location.parent_id.as_deref(),
                    location.index,
                    location.parent_slot.as_deref(),
                )?;
                Ok(created.map_or(DropOutcome::Aborted, DropOutcome::Created))
            }

            DragSource::Existing(id) => {
                if is_noop_move(store.tree(), &id, &location) {
                    return Ok(DropOutcome::Unchanged);
                }

                let moved = store.move_node(
                    &id,
                    location.parent_id.as_deref(),
                    location.index,
                    location.parent_slot.as_deref(),
                )?;
                Ok(if moved {
                    DropOutcome::Moved
                } else {
                    DropOutcome::Unchanged
                })
            }
        }
    }

    /// Abort the drag with no side effects besides clearing the indicator
    pub fn cancel(&mut self, store: &mut FormStore) {
        self.state = DragState::Idle;
        store.set_drop_indicator(None);
        store.set_active_id(None);
        debug!("Drag cancelled");
    }
}
