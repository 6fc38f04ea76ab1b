//! Folder tree panel state
//!
//! Expansion set, keyboard cursor, marked destination, and drag-hover
//! auto-expand. The root node is always expanded; every other node
//! shows its children only while its path is in the expansion set.
//!
//! Time enters through explicit `Instant` arguments so dwell behavior
//! is testable without sleeping.

use parking_lot::RwLock;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use viewer_fs::{ancestor_paths_of, normalize_dir, parent_dir, TreeNode};

#[derive(Debug, Clone)]
struct DragHover {
    path: String,
    since: Instant,
}

#[derive(Debug, Default)]
struct TreeState {
    tree: Option<TreeNode>,
    expanded: HashSet<String>,
    cursor: Option<String>,
    current_dir: String,
    marked_dir: Option<String>,
    /// Node currently highlighted as a drop target.
    drag_over: Option<String>,
    hover: Option<DragHover>,
}

pub struct DirectoryTreeController {
    dwell: Duration,
    state: RwLock<TreeState>,
    changed: watch::Sender<u64>,
}

fn find_node<'a>(node: &'a TreeNode, path: &str) -> Option<&'a TreeNode> {
    if node.path == path {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_node(c, path))
}

fn flatten(node: &TreeNode, expanded: &HashSet<String>, root: bool, out: &mut Vec<String>) {
    out.push(node.path.clone());
    if root || expanded.contains(&node.path) {
        for child in &node.children {
            flatten(child, expanded, false, out);
        }
    }
}

impl DirectoryTreeController {
    pub fn new(dwell: Duration) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            dwell,
            state: RwLock::new(TreeState {
                current_dir: ".".to_string(),
                ..TreeState::default()
            }),
            changed,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    fn touch(&self) {
        self.changed.send_modify(|v| *v += 1);
    }

    /// Install a freshly listed tree. The cursor survives when its path
    /// still exists, otherwise it falls back to the current directory,
    /// then to the root.
    pub fn set_tree(&self, tree: TreeNode) {
        {
            let mut st = self.state.write();
            let cursor = st
                .cursor
                .as_deref()
                .filter(|p| find_node(&tree, p).is_some())
                .map(String::from)
                .or_else(|| {
                    find_node(&tree, &st.current_dir).map(|n| n.path.clone())
                })
                .unwrap_or_else(|| tree.path.clone());
            st.expanded.retain(|p| find_node(&tree, p).is_some());
            st.cursor = Some(cursor);
            st.tree = Some(tree);
        }
        self.touch();
    }

    pub fn tree(&self) -> Option<TreeNode> {
        self.state.read().tree.clone()
    }

    pub fn cursor(&self) -> Option<String> {
        self.state.read().cursor.clone()
    }

    pub fn is_expanded(&self, path: &str) -> bool {
        let st = self.state.read();
        st.tree.as_ref().map(|t| t.path == path).unwrap_or(false) || st.expanded.contains(path)
    }

    /// Paths currently visible in the panel, top to bottom.
    pub fn visible_paths(&self) -> Vec<String> {
        let st = self.state.read();
        let mut out = Vec::new();
        if let Some(tree) = &st.tree {
            flatten(tree, &st.expanded, true, &mut out);
        }
        out
    }

    pub fn toggle_expand(&self, path: &str) {
        {
            let mut st = self.state.write();
            if !st.expanded.remove(path) {
                st.expanded.insert(path.to_string());
            }
        }
        self.touch();
    }

    // ----- keyboard cursor -----

    fn move_cursor(&self, delta: isize) {
        let visible = self.visible_paths();
        if visible.is_empty() {
            return;
        }
        {
            let mut st = self.state.write();
            let at = st
                .cursor
                .as_ref()
                .and_then(|c| visible.iter().position(|p| p == c))
                .unwrap_or(0);
            let next = (at as isize + delta).clamp(0, visible.len() as isize - 1);
            st.cursor = Some(visible[next as usize].clone());
        }
        self.touch();
    }

    pub fn cursor_down(&self) {
        self.move_cursor(1);
    }

    pub fn cursor_up(&self) {
        self.move_cursor(-1);
    }

    /// Left arrow: collapse the cursor node when it is open, otherwise
    /// climb to its parent.
    pub fn collapse_or_parent(&self) {
        let Some(cursor) = self.cursor() else { return };
        let mut climbed = None;
        {
            let mut st = self.state.write();
            let is_root = st.tree.as_ref().map(|t| t.path == cursor).unwrap_or(false);
            if !is_root && st.expanded.remove(&cursor) {
                // collapsed in place
            } else if !is_root {
                climbed = Some(parent_dir(&cursor));
            } else {
                return;
            }
            if let Some(parent) = &climbed {
                if st
                    .tree
                    .as_ref()
                    .and_then(|t| find_node(t, parent))
                    .is_some()
                {
                    st.cursor = Some(parent.clone());
                }
            }
        }
        self.touch();
    }

    /// Right arrow: expand a closed node with children, or step into
    /// the first child of an open one.
    pub fn expand_or_first_child(&self) {
        let Some(cursor) = self.cursor() else { return };
        {
            let mut st = self.state.write();
            let Some(tree) = st.tree.clone() else { return };
            let Some(node) = find_node(&tree, &cursor) else {
                return;
            };
            if !node.has_children() {
                return;
            }
            let open = tree.path == cursor || st.expanded.contains(&cursor);
            if open {
                st.cursor = Some(node.children[0].path.clone());
            } else {
                st.expanded.insert(cursor);
            }
        }
        self.touch();
    }

    /// Enter: the path the caller should navigate to.
    pub fn activate(&self) -> Option<String> {
        self.cursor()
    }

    // ----- current directory / mark -----

    /// Reflect a navigation: expand every ancestor so the directory is
    /// visible, and put the cursor on it.
    pub fn set_current_dir(&self, path: &str) {
        let dir = normalize_dir(path);
        {
            let mut st = self.state.write();
            for ancestor in ancestor_paths_of(&dir) {
                st.expanded.insert(ancestor);
            }
            if st
                .tree
                .as_ref()
                .and_then(|t| find_node(t, &dir))
                .is_some()
            {
                st.cursor = Some(dir.clone());
            }
            st.current_dir = dir;
        }
        self.touch();
    }

    pub fn current_dir(&self) -> String {
        self.state.read().current_dir.clone()
    }

    /// Pin or unpin the default move destination. Returns the new mark.
    pub fn toggle_mark(&self, path: &str) -> Option<String> {
        let mark = {
            let mut st = self.state.write();
            if st.marked_dir.as_deref() == Some(path) {
                st.marked_dir = None;
            } else {
                st.marked_dir = Some(path.to_string());
            }
            st.marked_dir.clone()
        };
        self.touch();
        mark
    }

    pub fn set_marked_dir(&self, mark: Option<String>) {
        self.state.write().marked_dir = mark;
        self.touch();
    }

    pub fn marked_dir(&self) -> Option<String> {
        self.state.read().marked_dir.clone()
    }

    // ----- drag hover -----

    /// A tagged drag is hovering over `path`. Starts the dwell clock on
    /// a collapsed expandable node; re-entering a different node resets
    /// the clock.
    pub fn drag_over_node(&self, path: &str, now: Instant) {
        {
            let mut st = self.state.write();
            st.drag_over = Some(path.to_string());

            let expandable = st
                .tree
                .as_ref()
                .and_then(|t| find_node(t, path))
                .map(|n| n.has_children())
                .unwrap_or(false);
            let is_root = st.tree.as_ref().map(|t| t.path == path).unwrap_or(false);
            let open = is_root || st.expanded.contains(path);

            match (&st.hover, expandable && !open) {
                (Some(h), true) if h.path == path => {}
                (_, true) => {
                    st.hover = Some(DragHover {
                        path: path.to_string(),
                        since: now,
                    });
                }
                (_, false) => st.hover = None,
            }
        }
        self.touch();
    }

    /// Fire the auto-expand when the dwell has elapsed. Returns the
    /// expanded path; each hover fires at most once.
    pub fn poll_auto_expand(&self, now: Instant) -> Option<String> {
        let expanded = {
            let mut st = self.state.write();
            let due = st
                .hover
                .as_ref()
                .is_some_and(|h| now.duration_since(h.since) >= self.dwell);
            if !due {
                return None;
            }
            let hover = st.hover.take().expect("hover checked above");
            st.expanded.insert(hover.path.clone());
            hover.path
        };
        self.touch();
        Some(expanded)
    }

    pub fn drag_leave(&self) {
        {
            let mut st = self.state.write();
            st.drag_over = None;
            st.hover = None;
        }
        self.touch();
    }

    pub fn drop_target(&self) -> Option<String> {
        self.state.read().drag_over.clone()
    }

    /// A drop ends the drag; returns the target path.
    pub fn take_drop_target(&self) -> Option<String> {
        let target = {
            let mut st = self.state.write();
            st.hover = None;
            st.drag_over.take()
        };
        self.touch();
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, path: &str, children: Vec<TreeNode>) -> TreeNode {
        TreeNode {
            name: name.to_string(),
            path: path.to_string(),
            children,
        }
    }

    fn sample_tree() -> TreeNode {
        node(
            "ROOT",
            ".",
            vec![
                node(
                    "2023",
                    "2023",
                    vec![node("jan", "2023/jan", vec![]), node("feb", "2023/feb", vec![])],
                ),
                node("2024", "2024", vec![node("trips", "2024/trips", vec![])]),
                node("inbox", "inbox", vec![]),
            ],
        )
    }

    fn controller() -> DirectoryTreeController {
        let c = DirectoryTreeController::new(Duration::from_millis(600));
        c.set_tree(sample_tree());
        c
    }

    #[test]
    fn test_root_children_visible_without_expansion() {
        let c = controller();
        assert_eq!(c.visible_paths(), vec![".", "2023", "2024", "inbox"]);
    }

    #[test]
    fn test_expansion_reveals_and_hides_children() {
        let c = controller();
        c.toggle_expand("2023");
        assert_eq!(
            c.visible_paths(),
            vec![".", "2023", "2023/jan", "2023/feb", "2024", "inbox"]
        );
        c.toggle_expand("2023");
        assert_eq!(c.visible_paths(), vec![".", "2023", "2024", "inbox"]);
    }

    #[test]
    fn test_cursor_moves_over_visible_rows_without_wrapping() {
        let c = controller();
        assert_eq!(c.cursor().as_deref(), Some("."));
        c.cursor_up();
        assert_eq!(c.cursor().as_deref(), Some("."));
        for _ in 0..10 {
            c.cursor_down();
        }
        assert_eq!(c.cursor().as_deref(), Some("inbox"));
    }

    #[test]
    fn test_right_expands_then_steps_into_first_child() {
        let c = controller();
        c.cursor_down(); // 2023
        c.expand_or_first_child();
        assert!(c.is_expanded("2023"));
        assert_eq!(c.cursor().as_deref(), Some("2023"));
        c.expand_or_first_child();
        assert_eq!(c.cursor().as_deref(), Some("2023/jan"));
    }

    #[test]
    fn test_left_collapses_then_climbs() {
        let c = controller();
        c.cursor_down();
        c.expand_or_first_child();
        c.expand_or_first_child(); // at 2023/jan
        c.collapse_or_parent();
        assert_eq!(c.cursor().as_deref(), Some("2023"));
        c.collapse_or_parent(); // collapses 2023
        assert!(!c.is_expanded("2023"));
        assert_eq!(c.cursor().as_deref(), Some("2023"));
        c.collapse_or_parent(); // climbs to root
        assert_eq!(c.cursor().as_deref(), Some("."));
    }

    #[test]
    fn test_leaf_right_arrow_is_inert() {
        let c = controller();
        for _ in 0..3 {
            c.cursor_down();
        }
        assert_eq!(c.cursor().as_deref(), Some("inbox"));
        c.expand_or_first_child();
        assert_eq!(c.cursor().as_deref(), Some("inbox"));
        assert!(!c.is_expanded("inbox"));
    }

    #[test]
    fn test_set_current_dir_expands_ancestors() {
        let c = controller();
        c.set_current_dir("2023/jan");
        assert!(c.is_expanded("2023"));
        assert_eq!(c.cursor().as_deref(), Some("2023/jan"));
        assert!(c.visible_paths().contains(&"2023/jan".to_string()));
    }

    #[test]
    fn test_set_tree_keeps_cursor_when_possible() {
        let c = controller();
        c.cursor_down(); // 2023
        c.set_tree(sample_tree());
        assert_eq!(c.cursor().as_deref(), Some("2023"));

        // Cursor path gone: falls back to current dir, then root.
        c.set_current_dir("2024");
        c.set_tree(node("ROOT", ".", vec![node("2024", "2024", vec![])]));
        assert_eq!(c.cursor().as_deref(), Some("2024"));
        c.set_tree(node("ROOT", ".", vec![]));
        assert_eq!(c.cursor().as_deref(), Some("."));
    }

    #[test]
    fn test_toggle_mark() {
        let c = controller();
        assert_eq!(c.toggle_mark("inbox").as_deref(), Some("inbox"));
        assert_eq!(c.marked_dir().as_deref(), Some("inbox"));
        assert_eq!(c.toggle_mark("inbox"), None);
        assert!(c.marked_dir().is_none());
    }

    #[test]
    fn test_dwell_expands_once() {
        let c = controller();
        let t0 = Instant::now();
        c.drag_over_node("2023", t0);
        assert!(c.poll_auto_expand(t0 + Duration::from_millis(599)).is_none());
        assert_eq!(
            c.poll_auto_expand(t0 + Duration::from_millis(600)).as_deref(),
            Some("2023")
        );
        assert!(c.is_expanded("2023"));
        // Hover consumed; no second fire while the drag sits still.
        assert!(c.poll_auto_expand(t0 + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn test_moving_to_another_node_resets_the_clock() {
        let c = controller();
        let t0 = Instant::now();
        c.drag_over_node("2023", t0);
        let t1 = t0 + Duration::from_millis(400);
        c.drag_over_node("2024", t1);
        // 600ms after the first hover but only 200ms after the second.
        assert!(c.poll_auto_expand(t0 + Duration::from_millis(600)).is_none());
        assert_eq!(
            c.poll_auto_expand(t1 + Duration::from_millis(600)).as_deref(),
            Some("2024")
        );
    }

    #[test]
    fn test_leaf_and_open_nodes_get_no_dwell_clock() {
        let c = controller();
        let t0 = Instant::now();
        c.drag_over_node("inbox", t0);
        assert!(c.poll_auto_expand(t0 + Duration::from_secs(1)).is_none());

        c.toggle_expand("2023");
        c.drag_over_node("2023", t0);
        assert!(c.poll_auto_expand(t0 + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_drag_leave_cancels_pending_expand() {
        let c = controller();
        let t0 = Instant::now();
        c.drag_over_node("2023", t0);
        c.drag_leave();
        assert!(c.poll_auto_expand(t0 + Duration::from_secs(1)).is_none());
        assert!(c.drop_target().is_none());
    }

    #[test]
    fn test_drop_takes_the_target() {
        let c = controller();
        c.drag_over_node("2024", Instant::now());
        assert_eq!(c.take_drop_target().as_deref(), Some("2024"));
        assert!(c.drop_target().is_none());
    }
}
