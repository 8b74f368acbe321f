#![forbid(unsafe_code)]

//! Drag-and-drop reordering of navigator rows.
//!
//! The machine is a value: [`transition`] takes the current [`DragState`] and
//! one [`TransitionInput`] and returns the next state plus the
//! [`DragEffect`]s the host must carry out, in order. It never touches the
//! session; a [`DragEffect::Move`] describes the mutation instead.
//!
//! # States
//!
//! - `Idle`: no gesture.
//! - `Dragging`: mouse went down on a row and has not been released.
//! - `WaitingForNodesToClose`: dragged down onto a closed container. The machine
//!   asked the host to open it and waits for [`DragEvent::NodeOpened`] before
//!   it completes the drop.
//!
//! # Invariants
//!
//! 1. Every gesture that emits `DragStart` ends with exactly one `DragEnd`.
//! 2. At most one `Move` is emitted per gesture, always before its `DragEnd`.
//! 3. Dropping a row onto itself never emits `Move`.
//! 4. The machine is total: an event with no meaning in the current state
//!    leaves it unchanged and emits nothing.
//!
//! # Failure Modes
//!
//! - A release outside the list, or after the dragged row disappeared from
//!   the snapshot, ends the gesture without a `Move`.
//! - If the detour target is gone or still closed when `NodeOpened` arrives,
//!   the gesture ends without a `Move`.
//! - A detour that is never acknowledged is abandoned by the next
//!   `MouseDown`, or by a `Tick` once the configured timeout has elapsed.

use std::time::Duration;

use tracing::{debug, trace};
use web_time::Instant;
use weft_core::ComponentId;

use crate::flatten::{FlattenedNode, flatten_excluding, index_of, visible_descendants};
use crate::geometry::{HoverGeometry, PointerSample};
use crate::node::{NavigatorNode, NodeKind};

// ---------------------------------------------------------------------------
// Events and effects
// ---------------------------------------------------------------------------

/// Input events, in list coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    MouseDown(PointerSample),
    MouseMove(PointerSample),
    MouseUp(PointerSample),
    /// Plain click on a row's label.
    Click(PointerSample),
    /// Click on a row's expand/collapse caret.
    CaretClick(PointerSample),
    /// The host finished opening `id` and re-rendered.
    NodeOpened { id: ComponentId },
    /// Periodic clock tick.
    Tick,
}

/// Where a dragged node goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropInstruction {
    pub id: ComponentId,
    pub parent: ComponentId,
    /// Index in `parent`'s children once `id` has left its old parent.
    pub index: usize,
}

/// Work for the host, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEffect {
    DragStart(ComponentId),
    Hover(ComponentId),
    Select(ComponentId),
    ToggleOpen(ComponentId),
    Move(DropInstruction),
    DragEnd(ComponentId),
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// A container the drop is waiting on.
#[derive(Debug, Clone, PartialEq)]
pub struct Detour {
    pub target: ComponentId,
    /// Row of `target` in the post-removal list when the detour started.
    pub target_index: usize,
    pub since: Instant,
}

/// Everything known about the gesture in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct DragContext {
    pub dragged: FlattenedNode,
    /// Row of `dragged` when the gesture started.
    pub dragged_index: usize,
    pub hover_index: Option<usize>,
    pub detour: Option<Detour>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragContext),
    WaitingForNodesToClose(DragContext),
}

impl DragState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dragging(_) => "dragging",
            Self::WaitingForNodesToClose(_) => "waiting",
        }
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    #[must_use]
    pub fn context(&self) -> Option<&DragContext> {
        match self {
            Self::Idle => None,
            Self::Dragging(ctx) | Self::WaitingForNodesToClose(ctx) => Some(ctx),
        }
    }

    /// Id of the row being dragged, if any.
    #[must_use]
    pub fn dragged(&self) -> Option<&ComponentId> {
        self.context().map(|ctx| &ctx.dragged.id)
    }
}

/// One step's worth of input.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInput<'a> {
    pub event: &'a DragEvent,
    /// Navigator snapshot as currently rendered.
    pub root: &'a NavigatorNode,
    /// `flatten(root)`, computed once per snapshot by the caller.
    pub rows: &'a [FlattenedNode],
    pub geometry: HoverGeometry,
    pub detour_timeout: Option<Duration>,
    pub now: Instant,
}

// ---------------------------------------------------------------------------
// Drop resolution
// ---------------------------------------------------------------------------

/// Outcome of releasing a dragged row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropResolution {
    /// Nothing moves.
    Abort,
    Direct(DropInstruction),
    /// `target` must be opened first; it sits at `target_index` in the
    /// post-removal rows.
    Detour {
        target: ComponentId,
        target_index: usize,
    },
}

/// Decide where the row at `dragged_index` lands when released over
/// `hover_index`.
///
/// `rows` must be `flatten(root)`. The landing row is computed against the
/// rows as they would be with the dragged subtree removed; the row above it
/// (the anchor) picks the new parent.
///
/// Only a closed container that is itself the hovered row is entered, via a
/// detour. A closed anchor above some other hovered row takes the dropped
/// node as its next sibling.
#[must_use]
pub fn resolve_drop(
    root: &NavigatorNode,
    rows: &[FlattenedNode],
    dragged_index: usize,
    hover_index: usize,
) -> DropResolution {
    if dragged_index >= rows.len() || hover_index >= rows.len() || hover_index == dragged_index {
        return DropResolution::Abort;
    }
    let dragged = &rows[dragged_index];
    let descendants = visible_descendants(rows, dragged_index);

    if hover_index > dragged_index && hover_index <= dragged_index + descendants {
        // Onto its own subtree; the session rejects this as a cycle.
        let anchor = &rows[hover_index];
        return DropResolution::Direct(below(dragged, anchor));
    }

    // Rows below the dragged subtree move up by its size once it is removed.
    let landing = if hover_index > dragged_index {
        hover_index - descendants
    } else {
        hover_index
    };
    let post = flatten_excluding(root, &dragged.id);
    let landing = landing.min(post.len());
    if landing == 0 {
        return DropResolution::Direct(DropInstruction {
            id: dragged.id.clone(),
            parent: root.id().clone(),
            index: 0,
        });
    }
    let anchor = &post[landing - 1];
    if anchor.is_closed_container() && anchor.id == rows[hover_index].id {
        return DropResolution::Detour {
            target: anchor.id.clone(),
            target_index: landing - 1,
        };
    }
    DropResolution::Direct(below(dragged, anchor))
}

/// Drop `dragged` just below `anchor`: first child of an open container,
/// otherwise the next sibling (closed containers included).
fn below(dragged: &FlattenedNode, anchor: &FlattenedNode) -> DropInstruction {
    if anchor.is_open_container() {
        DropInstruction {
            id: dragged.id.clone(),
            parent: anchor.id.clone(),
            index: 0,
        }
    } else {
        DropInstruction {
            id: dragged.id.clone(),
            parent: anchor.parent.clone(),
            index: anchor.position + 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// Advance the machine by one event.
#[must_use]
pub fn transition(state: DragState, input: &TransitionInput<'_>) -> (DragState, Vec<DragEffect>) {
    let rows = input.rows;
    let hit = |sample: &PointerSample| {
        let index = input.geometry.resolve(*sample, rows.len())?;
        Some((index, &rows[index]))
    };
    let from = state.name();
    let mut effects = Vec::new();

    let next = match (state, input.event) {
        (state, DragEvent::Click(sample)) => {
            if let Some((_, row)) = hit(sample) {
                effects.push(DragEffect::Select(row.id.clone()));
            }
            state
        }

        // --- Idle ---
        (DragState::Idle, DragEvent::MouseDown(sample)) => match hit(sample) {
            Some((index, row)) => start(index, row, &mut effects),
            None => DragState::Idle,
        },
        (DragState::Idle, DragEvent::CaretClick(sample)) => {
            if let Some((_, row)) = hit(sample)
                && row.kind == NodeKind::AcceptsChild
            {
                effects.push(DragEffect::ToggleOpen(row.id.clone()));
            }
            DragState::Idle
        }
        (DragState::Idle, DragEvent::MouseMove(sample)) => {
            if let Some((_, row)) = hit(sample) {
                effects.push(DragEffect::Hover(row.id.clone()));
            }
            DragState::Idle
        }

        // --- Dragging ---
        (DragState::Dragging(mut ctx), DragEvent::MouseMove(sample)) => {
            let over = hit(sample);
            ctx.hover_index = over.map(|(index, _)| index);
            if let Some((index, row)) = over {
                trace!(dragged = %ctx.dragged.id, hover = index, "drag.hover");
                effects.push(DragEffect::Hover(row.id.clone()));
            }
            DragState::Dragging(ctx)
        }
        (DragState::Dragging(mut ctx), DragEvent::MouseUp(sample)) => {
            ctx.hover_index = hit(sample).map(|(index, _)| index);
            release(ctx, input, rows, &mut effects)
        }

        // --- Waiting ---
        (DragState::WaitingForNodesToClose(ctx), DragEvent::NodeOpened { id }) => {
            match ctx.detour.as_ref() {
                Some(detour) if detour.target == *id => confirm(ctx, input, &mut effects),
                _ => DragState::WaitingForNodesToClose(ctx),
            }
        }
        (DragState::WaitingForNodesToClose(ctx), DragEvent::MouseDown(sample)) => {
            debug!(dragged = %ctx.dragged.id, "drag.detour cancelled by new gesture");
            effects.push(DragEffect::DragEnd(ctx.dragged.id));
            match hit(sample) {
                Some((index, row)) => start(index, row, &mut effects),
                None => DragState::Idle,
            }
        }
        (DragState::WaitingForNodesToClose(ctx), DragEvent::Tick) => {
            let expired = match (input.detour_timeout, ctx.detour.as_ref()) {
                (Some(timeout), Some(detour)) => {
                    input.now.saturating_duration_since(detour.since) >= timeout
                }
                _ => false,
            };
            if expired {
                debug!(dragged = %ctx.dragged.id, "drag.detour timed out");
                effects.push(DragEffect::DragEnd(ctx.dragged.id));
                DragState::Idle
            } else {
                DragState::WaitingForNodesToClose(ctx)
            }
        }
        (DragState::WaitingForNodesToClose(ctx), DragEvent::MouseMove(sample)) => {
            if let Some((_, row)) = hit(sample) {
                effects.push(DragEffect::Hover(row.id.clone()));
            }
            DragState::WaitingForNodesToClose(ctx)
        }

        (state, _) => state,
    };

    if from != next.name() || !effects.is_empty() {
        debug!(
            from,
            to = next.name(),
            event = ?input.event,
            effects = effects.len(),
            "drag.transition"
        );
    }
    (next, effects)
}

fn start(index: usize, row: &FlattenedNode, effects: &mut Vec<DragEffect>) -> DragState {
    effects.push(DragEffect::DragStart(row.id.clone()));
    DragState::Dragging(DragContext {
        dragged: row.clone(),
        dragged_index: index,
        hover_index: Some(index),
        detour: None,
    })
}

fn release(
    mut ctx: DragContext,
    input: &TransitionInput<'_>,
    rows: &[FlattenedNode],
    effects: &mut Vec<DragEffect>,
) -> DragState {
    let resolution = match (ctx.hover_index, index_of(rows, &ctx.dragged.id)) {
        (Some(hover), Some(dragged)) => resolve_drop(input.root, rows, dragged, hover),
        _ => DropResolution::Abort,
    };
    debug!(dragged = %ctx.dragged.id, hover = ?ctx.hover_index, ?resolution, "drag.release");

    match resolution {
        DropResolution::Abort => {
            effects.push(DragEffect::DragEnd(ctx.dragged.id));
            DragState::Idle
        }
        DropResolution::Direct(drop) => {
            effects.push(DragEffect::Move(drop));
            effects.push(DragEffect::DragEnd(ctx.dragged.id));
            DragState::Idle
        }
        DropResolution::Detour {
            target,
            target_index,
        } => {
            effects.push(DragEffect::ToggleOpen(target.clone()));
            ctx.detour = Some(Detour {
                target,
                target_index,
                since: input.now,
            });
            DragState::WaitingForNodesToClose(ctx)
        }
    }
}

fn confirm(
    ctx: DragContext,
    input: &TransitionInput<'_>,
    effects: &mut Vec<DragEffect>,
) -> DragState {
    let post = flatten_excluding(input.root, &ctx.dragged.id);
    let target = ctx.detour.as_ref().and_then(|detour| {
        post.get(detour.target_index)
            .filter(|row| row.id == detour.target)
            .or_else(|| post.iter().find(|row| row.id == detour.target))
    });

    match target {
        Some(row) if row.is_open_container() => {
            effects.push(DragEffect::Move(DropInstruction {
                id: ctx.dragged.id.clone(),
                parent: row.id.clone(),
                index: 0,
            }));
        }
        _ => debug!(dragged = %ctx.dragged.id, "drag.detour target unavailable"),
    }
    effects.push(DragEffect::DragEnd(ctx.dragged.id));
    DragState::Idle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;

    // root -> [A -> [B, C], D, E(closed) -> [F]]
    fn page(a_open: bool, e_open: bool) -> NavigatorNode {
        NavigatorNode::container("root", "Body")
            .with_open(true)
            .child(
                NavigatorNode::container("A", "Flex")
                    .with_open(a_open)
                    .child(NavigatorNode::leaf("B", "Text"))
                    .child(NavigatorNode::leaf("C", "Text")),
            )
            .child(NavigatorNode::leaf("D", "Image"))
            .child(
                NavigatorNode::container("E", "Flex")
                    .with_open(e_open)
                    .child(NavigatorNode::leaf("F", "Text")),
            )
    }

    // root -> [E(closed) -> [F], D, B]
    fn shelf() -> NavigatorNode {
        NavigatorNode::container("root", "Body")
            .with_open(true)
            .child(NavigatorNode::container("E", "Flex").child(NavigatorNode::leaf("F", "Text")))
            .child(NavigatorNode::leaf("D", "Image"))
            .child(NavigatorNode::leaf("B", "Text"))
    }

    fn direct(id: &str, parent: &str, index: usize) -> DropResolution {
        DropResolution::Direct(DropInstruction {
            id: id.into(),
            parent: parent.into(),
            index,
        })
    }

    fn step(
        state: DragState,
        root: &NavigatorNode,
        event: DragEvent,
        now: Instant,
    ) -> (DragState, Vec<DragEffect>) {
        let rows = flatten(root);
        let input = TransitionInput {
            event: &event,
            root,
            rows: &rows,
            geometry: HoverGeometry::default(),
            detour_timeout: Some(Duration::from_millis(500)),
            now,
        };
        transition(state, &input)
    }

    fn row(index: usize) -> PointerSample {
        HoverGeometry::default().row_center(index)
    }

    #[test]
    fn resolve_after_leaf_lands_as_next_sibling() {
        let root = page(true, false);
        let rows = flatten(&root); // A B C D E
        assert_eq!(resolve_drop(&root, &rows, 1, 3), direct("B", "root", 2));
    }

    #[test]
    fn resolve_onto_self_aborts() {
        let root = page(true, false);
        let rows = flatten(&root);
        assert_eq!(resolve_drop(&root, &rows, 1, 1), DropResolution::Abort);
        assert_eq!(resolve_drop(&root, &rows, 1, 99), DropResolution::Abort);
    }

    #[test]
    fn resolve_to_top_goes_first_under_root() {
        let root = page(true, false);
        let rows = flatten(&root);
        assert_eq!(resolve_drop(&root, &rows, 3, 0), direct("D", "root", 0));
    }

    #[test]
    fn resolve_below_open_container_becomes_first_child() {
        let root = page(true, false);
        let rows = flatten(&root);
        assert_eq!(resolve_drop(&root, &rows, 3, 1), direct("D", "A", 0));
    }

    #[test]
    fn resolve_below_closed_container_detours() {
        let root = page(true, false);
        let rows = flatten(&root); // A B C D E ; drag B to row 4
        assert_eq!(
            resolve_drop(&root, &rows, 1, 4),
            DropResolution::Detour {
                target: "E".into(),
                target_index: 3,
            }
        );
    }

    #[test]
    fn resolve_upward_onto_leaf_below_closed_container_stays_sibling() {
        let root = shelf();
        let rows = flatten(&root); // E D B ; drag B over D
        assert_eq!(resolve_drop(&root, &rows, 2, 1), direct("B", "root", 1));
    }

    #[test]
    fn resolve_upward_onto_closed_container_lands_before_it() {
        let root = shelf();
        let rows = flatten(&root);
        assert_eq!(resolve_drop(&root, &rows, 2, 0), direct("B", "root", 0));
    }

    #[test]
    fn resolve_downward_past_closed_container_stays_sibling() {
        // root -> [D, E(closed) -> [F], B]; drag D over B.
        let root = NavigatorNode::container("root", "Body")
            .with_open(true)
            .child(NavigatorNode::leaf("D", "Image"))
            .child(NavigatorNode::container("E", "Flex").child(NavigatorNode::leaf("F", "Text")))
            .child(NavigatorNode::leaf("B", "Text"));
        let rows = flatten(&root);
        assert_eq!(resolve_drop(&root, &rows, 0, 2), direct("D", "root", 2));
        assert_eq!(
            resolve_drop(&root, &rows, 0, 1),
            DropResolution::Detour {
                target: "E".into(),
                target_index: 0,
            }
        );
    }

    #[test]
    fn resolve_subtree_below_sibling_accounts_for_its_rows() {
        let root = page(true, false);
        let rows = flatten(&root); // A B C D E ; drag A (with B, C) onto D
        assert_eq!(resolve_drop(&root, &rows, 0, 3), direct("A", "root", 1));
    }

    #[test]
    fn resolve_into_own_subtree_targets_descendant() {
        let root = page(true, false);
        let rows = flatten(&root);
        // A over C: C is a leaf under A, so A would become C's sibling inside A.
        assert_eq!(resolve_drop(&root, &rows, 0, 2), direct("A", "A", 2));
    }

    #[test]
    fn mouse_down_outside_list_stays_idle() {
        let root = page(true, false);
        let (state, effects) = step(DragState::Idle, &root, DragEvent::MouseDown(row(9)), Instant::now());
        assert!(state.is_idle());
        assert!(effects.is_empty());
    }

    #[test]
    fn full_direct_gesture() {
        let root = page(true, false);
        let now = Instant::now();
        let (state, effects) = step(DragState::Idle, &root, DragEvent::MouseDown(row(1)), now);
        assert_eq!(effects, vec![DragEffect::DragStart("B".into())]);
        let (state, effects) = step(state, &root, DragEvent::MouseMove(row(3)), now);
        assert_eq!(effects, vec![DragEffect::Hover("D".into())]);
        assert_eq!(state.context().and_then(|c| c.hover_index), Some(3));
        let (state, effects) = step(state, &root, DragEvent::MouseUp(row(3)), now);
        assert!(state.is_idle());
        assert_eq!(
            effects,
            vec![
                DragEffect::Move(DropInstruction {
                    id: "B".into(),
                    parent: "root".into(),
                    index: 2,
                }),
                DragEffect::DragEnd("B".into()),
            ]
        );
    }

    #[test]
    fn release_outside_list_ends_without_move() {
        let root = page(true, false);
        let now = Instant::now();
        let (state, _) = step(DragState::Idle, &root, DragEvent::MouseDown(row(1)), now);
        let (state, effects) = step(state, &root, DragEvent::MouseUp(row(40)), now);
        assert!(state.is_idle());
        assert_eq!(effects, vec![DragEffect::DragEnd("B".into())]);
    }

    #[test]
    fn detour_then_confirm() {
        let now = Instant::now();
        let closed = page(true, false);
        let (state, _) = step(DragState::Idle, &closed, DragEvent::MouseDown(row(1)), now);
        let (state, effects) = step(state, &closed, DragEvent::MouseUp(row(4)), now);
        assert_eq!(effects, vec![DragEffect::ToggleOpen("E".into())]);
        assert_eq!(state.name(), "waiting");

        // Unrelated acknowledgment is ignored.
        let (state, effects) = step(state, &closed, DragEvent::NodeOpened { id: "A".into() }, now);
        assert!(effects.is_empty());
        assert_eq!(state.name(), "waiting");

        let opened = page(true, true);
        let (state, effects) = step(state, &opened, DragEvent::NodeOpened { id: "E".into() }, now);
        assert!(state.is_idle());
        assert_eq!(
            effects,
            vec![
                DragEffect::Move(DropInstruction {
                    id: "B".into(),
                    parent: "E".into(),
                    index: 0,
                }),
                DragEffect::DragEnd("B".into()),
            ]
        );
    }

    #[test]
    fn upward_release_next_to_closed_container_moves_directly() {
        let root = shelf();
        let now = Instant::now();
        let (state, _) = step(DragState::Idle, &root, DragEvent::MouseDown(row(2)), now);
        let (state, effects) = step(state, &root, DragEvent::MouseUp(row(1)), now);
        assert!(state.is_idle());
        assert_eq!(
            effects,
            vec![
                DragEffect::Move(DropInstruction {
                    id: "B".into(),
                    parent: "root".into(),
                    index: 1,
                }),
                DragEffect::DragEnd("B".into()),
            ]
        );
    }

    #[test]
    fn detour_target_still_closed_aborts() {
        let now = Instant::now();
        let root = page(true, false);
        let (state, _) = step(DragState::Idle, &root, DragEvent::MouseDown(row(1)), now);
        let (state, _) = step(state, &root, DragEvent::MouseUp(row(4)), now);
        let (state, effects) = step(state, &root, DragEvent::NodeOpened { id: "E".into() }, now);
        assert!(state.is_idle());
        assert_eq!(effects, vec![DragEffect::DragEnd("B".into())]);
    }

    #[test]
    fn detour_times_out_on_tick() {
        let t0 = Instant::now();
        let root = page(true, false);
        let (state, _) = step(DragState::Idle, &root, DragEvent::MouseDown(row(1)), t0);
        let (state, _) = step(state, &root, DragEvent::MouseUp(row(4)), t0);

        let (state, effects) = step(state, &root, DragEvent::Tick, t0 + Duration::from_millis(100));
        assert!(effects.is_empty());
        let (state, effects) = step(state, &root, DragEvent::Tick, t0 + Duration::from_millis(600));
        assert!(state.is_idle());
        assert_eq!(effects, vec![DragEffect::DragEnd("B".into())]);
    }

    #[test]
    fn caret_click_toggles_containers_only() {
        let root = page(true, false);
        let now = Instant::now();
        let (_, effects) = step(DragState::Idle, &root, DragEvent::CaretClick(row(0)), now);
        assert_eq!(effects, vec![DragEffect::ToggleOpen("A".into())]);
        let (_, effects) = step(DragState::Idle, &root, DragEvent::CaretClick(row(1)), now);
        assert!(effects.is_empty());
    }

    #[test]
    fn click_selects_in_any_state() {
        let root = page(true, false);
        let now = Instant::now();
        let (state, _) = step(DragState::Idle, &root, DragEvent::MouseDown(row(1)), now);
        let (state, effects) = step(state, &root, DragEvent::Click(row(3)), now);
        assert_eq!(effects, vec![DragEffect::Select("D".into())]);
        assert_eq!(state.name(), "dragging");
    }

    #[test]
    fn ignored_combinations_are_no_ops() {
        let root = page(true, false);
        let now = Instant::now();
        let (state, effects) = step(DragState::Idle, &root, DragEvent::MouseUp(row(1)), now);
        assert!(state.is_idle() && effects.is_empty());
        let (state, effects) = step(state, &root, DragEvent::Tick, now);
        assert!(state.is_idle() && effects.is_empty());
        let (state, effects) =
            step(state, &root, DragEvent::NodeOpened { id: "A".into() }, now);
        assert!(state.is_idle() && effects.is_empty());
    }
}
