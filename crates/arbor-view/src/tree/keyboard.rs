//! Keyboard action mapping.
//!
//! Translates raw key codes into tree actions through a configurable
//! binding table, then dispatches the action against the focused node.

use std::collections::HashMap;

use arbor_view_core::logging::targets;

use crate::model::meta::InputState;
use crate::model::node::NodeRecord;
use crate::tree::TreeState;
use crate::tree::traverse::{find_path, meta_at};

/// Well-known key codes for the default bindings.
pub mod keys {
    /// Enter.
    pub const ENTER: u32 = 13;
    /// Space.
    pub const SPACE: u32 = 32;
    /// End.
    pub const END: u32 = 35;
    /// Home.
    pub const HOME: u32 = 36;
    /// Arrow left.
    pub const ARROW_LEFT: u32 = 37;
    /// Arrow up.
    pub const ARROW_UP: u32 = 38;
    /// Arrow right.
    pub const ARROW_RIGHT: u32 = 39;
    /// Arrow down.
    pub const ARROW_DOWN: u32 = 40;
    /// Insert.
    pub const INSERT: u32 = 45;
    /// Delete.
    pub const DELETE: u32 = 46;
}

/// Actions a key press can trigger on the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeAction {
    /// Activate the focused node (toggle its input, emit `activated`).
    Activate,
    /// Toggle selection of the focused node.
    Select,
    /// Focus the first visible node.
    FocusFirst,
    /// Focus the last visible node.
    FocusLast,
    /// Collapse the focused node, or move focus to its parent.
    Collapse,
    /// Expand the focused node, or move focus to its first child.
    Expand,
    /// Focus the previous visible node.
    FocusPrevious,
    /// Focus the next visible node.
    FocusNext,
    /// Request a new child under the focused node.
    InsertChild,
    /// Request deletion of the focused node.
    Delete,
}

/// Key-code bindings per action.
///
/// Each action maps to one or more key codes. The defaults follow the
/// conventional tree-widget layout: arrows navigate, Enter activates,
/// Space selects, Home/End jump, Insert/Delete edit.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<TreeAction, Vec<u32>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let map = HashMap::from([
            (TreeAction::Activate, vec![keys::ENTER]),
            (TreeAction::Select, vec![keys::SPACE]),
            (TreeAction::FocusFirst, vec![keys::HOME]),
            (TreeAction::FocusLast, vec![keys::END]),
            (TreeAction::Collapse, vec![keys::ARROW_LEFT]),
            (TreeAction::Expand, vec![keys::ARROW_RIGHT]),
            (TreeAction::FocusPrevious, vec![keys::ARROW_UP]),
            (TreeAction::FocusNext, vec![keys::ARROW_DOWN]),
            (TreeAction::InsertChild, vec![keys::INSERT]),
            (TreeAction::Delete, vec![keys::DELETE]),
        ]);
        Self { map }
    }
}

impl KeyBindings {
    /// Builds bindings from the defaults with per-action overrides.
    ///
    /// An override with an empty code list is rejected with a diagnostic
    /// and the default binding for that action is kept.
    pub fn with_overrides(overrides: impl IntoIterator<Item = (TreeAction, Vec<u32>)>) -> Self {
        let mut bindings = Self::default();
        for (action, codes) in overrides {
            if codes.is_empty() {
                tracing::warn!(
                    target: targets::KEYBOARD,
                    ?action,
                    "ignoring empty key binding override, keeping default"
                );
                continue;
            }
            bindings.map.insert(action, codes);
        }
        bindings
    }

    /// Returns the action bound to a key code, if any.
    pub fn action_for(&self, code: u32) -> Option<TreeAction> {
        self.map
            .iter()
            .find(|(_, codes)| codes.contains(&code))
            .map(|(action, _)| *action)
    }

    /// Returns the codes bound to an action.
    pub fn codes_for(&self, action: TreeAction) -> &[u32] {
        self.map.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<T: NodeRecord> TreeState<T> {
    /// Dispatches a key press against the focused node.
    ///
    /// Returns `true` when the code was bound and consumed, so the host
    /// can suppress the browser default for handled keys only.
    pub fn handle_key(&mut self, code: u32) -> bool {
        let Some(action) = self.bindings.action_for(code) else {
            return false;
        };

        let Some(focused) = self.focused.clone() else {
            // Home/End establish focus even when nothing holds it yet.
            return match action {
                TreeAction::FocusFirst => {
                    self.focus_first();
                    true
                }
                TreeAction::FocusLast => {
                    self.focus_last();
                    true
                }
                _ => false,
            };
        };

        tracing::debug!(target: targets::KEYBOARD, code, ?action, node = %focused, "key action");

        match action {
            TreeAction::Activate => self.activate(&focused),
            TreeAction::Select => {
                self.toggle_selection(&focused);
            }
            TreeAction::FocusFirst => self.focus_first(),
            TreeAction::FocusLast => self.focus_last(),
            TreeAction::FocusPrevious => self.focus_previous(&focused),
            TreeAction::FocusNext => self.focus_next(&focused),
            TreeAction::Collapse => {
                let expanded = find_path(&self.roots, &self.meta, &focused)
                    .and_then(|path| meta_at(&self.meta, &path))
                    .is_some_and(|m| m.state.expanded);
                if expanded {
                    self.collapse(&focused);
                } else {
                    self.focus_parent(&focused);
                }
            }
            TreeAction::Expand => {
                let expanded = find_path(&self.roots, &self.meta, &focused)
                    .and_then(|path| meta_at(&self.meta, &path))
                    .is_some_and(|m| m.state.expanded);
                if expanded {
                    self.focus_first_child(&focused);
                } else {
                    self.expand(&focused);
                }
            }
            TreeAction::InsertChild => self.request_add_child(&focused),
            TreeAction::Delete => self.request_delete(&focused),
        }
        true
    }

    /// Activates a node: toggles its inline input (if any) and emits
    /// `activated`.
    pub fn activate(&mut self, id: &str) {
        let input = find_path(&self.roots, &self.meta, id)
            .and_then(|path| meta_at(&self.meta, &path))
            .and_then(|m| m.input.clone());

        match input {
            Some(InputState::Checkbox { checked, disabled }) if !disabled => {
                self.set_checkbox(id, !checked);
            }
            Some(InputState::Radio { disabled, .. }) if !disabled => {
                self.select_radio(id);
            }
            _ => {}
        }
        self.activated.emit(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bindings() {
        let bindings = KeyBindings::default();
        assert_eq!(bindings.action_for(keys::ENTER), Some(TreeAction::Activate));
        assert_eq!(
            bindings.action_for(keys::ARROW_DOWN),
            Some(TreeAction::FocusNext)
        );
        assert_eq!(bindings.action_for(keys::DELETE), Some(TreeAction::Delete));
        assert_eq!(bindings.action_for(999), None);
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let bindings = KeyBindings::with_overrides([(TreeAction::Activate, vec![65, 66])]);
        assert_eq!(bindings.action_for(65), Some(TreeAction::Activate));
        assert_eq!(bindings.action_for(66), Some(TreeAction::Activate));
        assert_eq!(bindings.action_for(keys::ENTER), None);
    }

    #[test]
    fn test_empty_override_keeps_default() {
        let bindings = KeyBindings::with_overrides([(TreeAction::Select, vec![])]);
        assert_eq!(bindings.action_for(keys::SPACE), Some(TreeAction::Select));
        assert_eq!(bindings.codes_for(TreeAction::Select), &[keys::SPACE]);
    }
}
