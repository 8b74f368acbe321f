#![forbid(unsafe_code)]

//! Navigator controller: event queue, drag machine, and session mutation.
//!
//! The host pushes pointer events and calls [`Navigator::run`] with the
//! snapshot it is currently showing. Each event goes through
//! [`transition`](crate::drag_drop::transition); `Move` effects are applied to
//! the [`EditorSession`], and everything else is forwarded to the
//! [`NavigatorHandler`].
//!
//! # Snapshot freshness
//!
//! A successful move or an open/close request makes the snapshot stale. `run`
//! then stops early and leaves the remaining events queued; the host rebuilds
//! its snapshot and calls `run` again.
//!
//! # Detours
//!
//! When a drop needs a closed container opened, the handler receives
//! `on_toggle_open`. After opening it and re-rendering, the host pushes
//! [`DragEvent::NodeOpened`] for that id. Pushing it after every open is
//! fine: outside a detour it is ignored.

use std::collections::VecDeque;

use tracing::{debug, debug_span, error, warn};
use web_time::Instant;
use weft_core::{ComponentId, EditorSession, TreeError};

use crate::config::NavigatorConfig;
use crate::drag_drop::{DragEffect, DragEvent, DragState, DropInstruction, TransitionInput, transition};
use crate::flatten::flatten;
use crate::node::NavigatorNode;

/// Reported once per completed drop, after the session was updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorChange {
    pub id: ComponentId,
    pub parent_id: ComponentId,
    /// Position of `id` in `parent_id`'s new child list.
    pub index: usize,
}

/// Host callbacks. Every method defaults to doing nothing.
pub trait NavigatorHandler {
    fn on_change(&mut self, _change: &NavigatorChange) {}
    fn on_hover(&mut self, _id: &ComponentId) {}
    fn on_select(&mut self, _id: &ComponentId) {}
    fn on_drag_start(&mut self, _id: &ComponentId) {}
    fn on_drag_end(&mut self, _id: &ComponentId) {}
    /// Open or close `id`'s row.
    fn on_toggle_open(&mut self, _id: &ComponentId) {}
}

impl NavigatorHandler for () {}

/// Drag-and-drop controller for one navigator panel.
#[derive(Debug, Default)]
pub struct Navigator {
    config: NavigatorConfig,
    state: DragState,
    queue: VecDeque<DragEvent>,
}

impl Navigator {
    /// Build a navigator around `config`.
    ///
    /// An invalid config (see [`NavigatorConfig::validate`]) is a programming
    /// error: it is logged, and panics in debug builds. Configs loaded from
    /// files are validated on load.
    #[must_use]
    pub fn new(config: NavigatorConfig) -> Self {
        let errors = config.validate();
        if !errors.is_empty() {
            error!(?errors, "navigator.config invalid");
        }
        debug_assert!(
            errors.is_empty(),
            "invalid navigator config: {}",
            errors.join("; ")
        );
        Self {
            config,
            state: DragState::Idle,
            queue: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Events queued but not yet processed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn push(&mut self, event: DragEvent) {
        self.queue.push_back(event);
    }

    /// Queue `event` and run.
    pub fn dispatch<P: 'static, H: NavigatorHandler + ?Sized>(
        &mut self,
        event: DragEvent,
        root: &NavigatorNode,
        session: &EditorSession<P>,
        handler: &mut H,
        now: Instant,
    ) -> usize {
        self.push(event);
        self.run(root, session, handler, now)
    }

    /// Drain queued events against `root`, the snapshot currently shown.
    ///
    /// Returns the number of events processed. Stops early when the
    /// snapshot went stale; see the module docs.
    pub fn run<P: 'static, H: NavigatorHandler + ?Sized>(
        &mut self,
        root: &NavigatorNode,
        session: &EditorSession<P>,
        handler: &mut H,
        now: Instant,
    ) -> usize {
        let _span = debug_span!("navigator.run", pending = self.queue.len()).entered();
        // The snapshot is fixed for the whole call: rows are flattened once.
        let rows = flatten(root);
        let mut processed = 0;

        while let Some(event) = self.queue.pop_front() {
            processed += 1;
            let input = TransitionInput {
                event: &event,
                root,
                rows: &rows,
                geometry: self.config.geometry(),
                detour_timeout: self.config.detour_timeout,
                now,
            };
            let (next, effects) = transition(std::mem::take(&mut self.state), &input);
            self.state = next;

            let mut stale = false;
            for effect in effects {
                stale |= apply(effect, session, handler);
            }
            if stale && !self.queue.is_empty() {
                debug!(remaining = self.queue.len(), "navigator.run paused: snapshot stale");
                break;
            }
        }
        processed
    }

    /// Abandon the gesture in progress and drop queued events.
    ///
    /// Emits nothing; returns the id that was being dragged.
    pub fn reset(&mut self) -> Option<ComponentId> {
        self.queue.clear();
        let dragged = self.state.dragged().cloned();
        self.state = DragState::Idle;
        dragged
    }
}

/// Carry out one effect. Returns true if the shown snapshot is now stale.
fn apply<P: 'static, H: NavigatorHandler + ?Sized>(
    effect: DragEffect,
    session: &EditorSession<P>,
    handler: &mut H,
) -> bool {
    match effect {
        DragEffect::DragStart(id) => handler.on_drag_start(&id),
        DragEffect::Hover(id) => handler.on_hover(&id),
        DragEffect::Select(id) => handler.on_select(&id),
        DragEffect::DragEnd(id) => handler.on_drag_end(&id),
        DragEffect::ToggleOpen(id) => {
            handler.on_toggle_open(&id);
            return true;
        }
        DragEffect::Move(drop) => {
            if let Some(change) = apply_move(session, &drop) {
                handler.on_change(&change);
                return true;
            }
        }
    }
    false
}

fn apply_move<P: 'static>(session: &EditorSession<P>, drop: &DropInstruction) -> Option<NavigatorChange> {
    let mut children = session.children_of(&drop.parent);
    children.retain(|child| *child != drop.id);
    let index = drop.index.min(children.len());
    children.insert(index, drop.id.clone());

    match session.set_children(&drop.parent, children) {
        Ok(()) => {
            debug!(id = %drop.id, parent = %drop.parent, index, "navigator.move");
            Some(NavigatorChange {
                id: drop.id.clone(),
                parent_id: drop.parent.clone(),
                index,
            })
        }
        Err(TreeError::CycleDetected { parent, child }) => {
            debug!(%parent, %child, "navigator.move aborted: would create a cycle");
            None
        }
        Err(err @ TreeError::NotFound { .. }) => {
            warn!(id = %drop.id, parent = %drop.parent, error = %err, "navigator.move skipped");
            None
        }
        Err(err) => {
            error!(id = %drop.id, parent = %drop.parent, error = %err, "navigator.move rejected");
            debug_assert!(err.is_expected(), "navigator produced an invalid move: {err}");
            None
        }
    }
}
