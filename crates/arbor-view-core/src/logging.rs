//! Logging and debugging facilities for Arbor View.
//!
//! This module provides:
//! - Integration with the `tracing` crate for structured logging
//! - Debug visualization for node hierarchies
//! - Performance tracing hooks for profiling
//!
//! # Tracing Integration
//!
//! Arbor View uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     // Your application code...
//! }
//! ```
//!
//! # Debug Visualization
//!
//! [`format_tree`] renders any hierarchy in a human-readable layout; the
//! tree layer builds on it to dump its meta tree:
//!
//! ```
//! use arbor_view_core::logging::{format_tree, TreeFormatOptions};
//!
//! struct N(&'static str, Vec<N>);
//!
//! let root = N("root", vec![N("a", vec![]), N("b", vec![])]);
//! let out = format_tree(
//!     std::slice::from_ref(&root),
//!     &TreeFormatOptions::default(),
//!     |n| n.0.to_string(),
//!     |n| &n.1,
//! );
//! assert!(out.contains("root"));
//! ```

use std::fmt::Write as FmtWrite;

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "arbor_view_core::signal";
    /// Performance span target.
    pub const PERF: &str = "arbor_view::perf";
    /// Data model and normalization target.
    pub const MODEL: &str = "arbor_view::model";
    /// Filter engine target.
    pub const FILTER: &str = "arbor_view::filter";
    /// Focus coordinator target.
    pub const FOCUS: &str = "arbor_view::focus";
    /// Selection engine target.
    pub const SELECTION: &str = "arbor_view::selection";
    /// Expansion and child loading target.
    pub const EXPAND: &str = "arbor_view::expand";
    /// Drag-and-drop reconciliation target.
    pub const DRAG_DROP: &str = "arbor_view::drag_drop";
    /// Keyboard mapping target.
    pub const KEYBOARD: &str = "arbor_view::keyboard";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    Unicode,
    /// Compact single-line representation.
    Compact,
}

impl Default for TreeStyle {
    fn default() -> Self {
        Self::Unicode
    }
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// The style of tree visualization.
    pub style: TreeStyle,
    /// Maximum depth to traverse (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            max_depth: None,
            indent_size: 2,
        }
    }
}

/// Formats a hierarchy of nodes into a human-readable tree.
///
/// `label` produces the display line for a node; `children` yields its
/// ordered child slice. The output uses the branch style from `options`.
pub fn format_tree<N>(
    roots: &[N],
    options: &TreeFormatOptions,
    label: impl Fn(&N) -> String + Copy,
    children: impl Fn(&N) -> &[N] + Copy,
) -> String {
    let mut output = String::new();
    let count = roots.len();
    for (i, root) in roots.iter().enumerate() {
        format_subtree_into(root, options, label, children, 0, i == count - 1, &mut output);
    }
    output
}

fn format_subtree_into<N>(
    node: &N,
    options: &TreeFormatOptions,
    label: impl Fn(&N) -> String + Copy,
    children: impl Fn(&N) -> &[N] + Copy,
    depth: usize,
    is_last: bool,
    output: &mut String,
) {
    if let Some(max) = options.max_depth {
        if depth > max {
            return;
        }
    }

    let prefix = build_prefix(options, depth, is_last);
    output.push_str(&prefix);
    write!(output, "{}", label(node)).expect("write to String");
    output.push('\n');

    let child_nodes = children(node);
    let child_count = child_nodes.len();
    for (i, child) in child_nodes.iter().enumerate() {
        format_subtree_into(child, options, label, children, depth + 1, i == child_count - 1, output);
    }
}

/// Build the prefix string for a tree node.
fn build_prefix(options: &TreeFormatOptions, depth: usize, is_last: bool) -> String {
    if depth == 0 {
        return String::new();
    }

    let (branch, corner, space) = match options.style {
        TreeStyle::Ascii => ("|", "+--", "   "),
        TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500}", "\u{2514}\u{2500}\u{2500}"),
        TreeStyle::Compact => ("", "- ", "- "),
    };

    let mut prefix = String::new();

    for _ in 0..(depth - 1) {
        prefix.push_str(branch);
        for _ in 0..options.indent_size {
            prefix.push(' ');
        }
    }

    if is_last {
        prefix.push_str(if options.style == TreeStyle::Unicode {
            "\u{2514}\u{2500}\u{2500} "
        } else {
            space
        });
    } else {
        prefix.push_str(corner);
        prefix.push(' ');
    }

    prefix
}

/// A guard that tracks the duration of an operation via a tracing span.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        name: &'static str,
        children: Vec<TestNode>,
    }

    fn sample() -> Vec<TestNode> {
        vec![TestNode {
            name: "window",
            children: vec![
                TestNode {
                    name: "button1",
                    children: vec![],
                },
                TestNode {
                    name: "button2",
                    children: vec![],
                },
            ],
        }]
    }

    #[test]
    fn test_tree_format_hierarchy() {
        let roots = sample();
        let output = format_tree(
            &roots,
            &TreeFormatOptions::default(),
            |n| n.name.to_string(),
            |n| &n.children,
        );

        assert!(output.contains("window"));
        assert!(output.contains("button1"));
        assert!(output.contains("button2"));
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_tree_format_max_depth() {
        let roots = sample();
        let options = TreeFormatOptions {
            max_depth: Some(0),
            ..Default::default()
        };
        let output = format_tree(&roots, &options, |n| n.name.to_string(), |n| &n.children);

        assert!(output.contains("window"));
        assert!(!output.contains("button1"));
    }

    #[test]
    fn test_tree_format_ascii() {
        let roots = sample();
        let options = TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..Default::default()
        };
        let output = format_tree(&roots, &options, |n| n.name.to_string(), |n| &n.children);

        assert!(output.contains("+--"));
    }

    #[test]
    fn test_perf_span() {
        // Just ensure it compiles and doesn't panic.
        let _span = PerfSpan::new("test_operation");
    }
}
