//! Node records for the four requirement levels.
//!
//! Every level shares the same shape: an API identifier, the fetched
//! [`Detail`] fields, a derived requirement identifier, an ordered list of
//! child keys and a write-once set of output files. The parent key is fixed
//! when the node is created and cannot be changed afterwards.

use std::{cell::OnceCell, fmt, path::PathBuf};

/// The requirement levels, from the root down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// System feature (the root).
    Sf,
    /// Initial requirement.
    Ir,
    /// System requirement.
    Sr,
    /// Allocated requirement (the leaves).
    Ar,
}

impl Level {
    /// The issue type understood by the issue API.
    #[must_use]
    pub const fn issue_type(self) -> &'static str {
        match self {
            Self::Sf => "SF",
            Self::Ir => "IR",
            Self::Sr => "SR",
            Self::Ar => "AR",
        }
    }

    /// The number of numeric groups in this level's requirement identifier.
    #[must_use]
    pub const fn depth(self) -> usize {
        match self {
            Self::Sf => 0,
            Self::Ir => 1,
            Self::Sr => 2,
            Self::Ar => 3,
        }
    }

    /// The level directly below, if any.
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Sf => Some(Self::Ir),
            Self::Ir => Some(Self::Sr),
            Self::Sr => Some(Self::Ar),
            Self::Ar => None,
        }
    }

    /// Human readable label used on rendered pages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sf => "SF(系统级)",
            Self::Ir => "IR(初始需求)",
            Self::Sr => "SR(系统需求)",
            Self::Ar => "AR(分配需求)",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.issue_type())
    }
}

/// Fields filled in by a detail fetch.
///
/// Text fields default to empty and workloads to `0.0` when the source
/// record omits them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detail {
    /// Issue number as displayed by the tracker.
    pub number: String,
    /// Issue title.
    pub title: String,
    /// Issue category.
    pub category: String,
    /// Status name.
    pub status: String,
    /// Status code.
    pub status_value: String,
    /// Planned workload in man-days.
    pub workload: f64,
    /// Accumulated actual workload in man-days.
    pub actual_workload: f64,
    /// Display name of the creator.
    pub creator: String,
    /// Display name of the assignee.
    pub assignee: String,
    /// Business domain.
    pub domain: String,
    /// Planned start date.
    pub plan_start_date: String,
    /// Planned end date.
    pub plan_end_date: String,
    /// Planned end of development.
    pub plan_dev_end_date: String,
    /// Planned end of testing.
    pub plan_test_end_date: String,
    /// Rich-text description, kept as the raw HTML fragment.
    pub description: String,
}

/// Output files assigned to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFiles {
    /// The node's own page.
    pub page: PathBuf,
    /// Description page.
    pub description: PathBuf,
    /// Review record page.
    pub review: PathBuf,
    /// Change history page.
    pub history: PathBuf,
    /// Cross-reference table against the node's children (SF, IR, SR only).
    pub table: Option<PathBuf>,
    /// Full-tree navigation page (SF only).
    pub navigation: Option<PathBuf>,
}

macro_rules! arena_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            pub(crate) const fn new(index: usize) -> Self {
                Self(index)
            }

            pub(crate) const fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_key!(
    /// Handle to an IR in a [`Hierarchy`](super::Hierarchy).
    IrKey
);
arena_key!(
    /// Handle to an SR in a [`Hierarchy`](super::Hierarchy).
    SrKey
);
arena_key!(
    /// Handle to an AR in a [`Hierarchy`](super::Hierarchy).
    ArKey
);
arena_key!(
    /// Handle to a test case in a [`TestSuite`](super::TestSuite).
    TestCaseKey
);

/// Parent marker for the IRs: the single SF of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Root;

/// A node of the requirement tree with parent key `P` and child key `C`.
#[derive(Debug, Clone)]
pub struct Node<P, C> {
    id: String,
    parent: P,
    children: Vec<C>,
    files: OnceCell<NodeFiles>,

    /// Derived requirement identifier; empty until derived.
    pub req_id: String,

    /// Fields filled in by the detail fetch.
    pub detail: Detail,
}

/// The root system feature.
pub type Sf = Node<(), IrKey>;
/// An initial requirement.
pub type Ir = Node<Root, SrKey>;
/// A system requirement.
pub type Sr = Node<IrKey, ArKey>;
/// An allocated requirement. Its children are the linked test cases.
pub type Ar = Node<SrKey, TestCaseKey>;

impl<P: Copy, C: Copy> Node<P, C> {
    pub(crate) fn new(id: impl Into<String>, parent: P) -> Self {
        Self {
            id: id.into(),
            parent,
            children: Vec::new(),
            files: OnceCell::new(),
            req_id: String::new(),
            detail: Detail::default(),
        }
    }

    /// The API identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parent key, fixed at creation.
    #[must_use]
    pub const fn parent(&self) -> P {
        self.parent
    }

    /// Child keys in their current order.
    #[must_use]
    pub fn children(&self) -> &[C] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, child: C) {
        self.children.push(child);
    }

    pub(crate) const fn children_mut(&mut self) -> &mut Vec<C> {
        &mut self.children
    }

    /// The title, or `None` if it has not been loaded yet.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        Some(self.detail.title.as_str()).filter(|t| !t.is_empty())
    }

    /// Output files, once assigned.
    #[must_use]
    pub fn files(&self) -> Option<&NodeFiles> {
        self.files.get()
    }

    /// Assigns the output files.
    ///
    /// Files can be assigned once. Later calls leave the first assignment in
    /// place and return `false`.
    pub fn assign_files(&self, files: NodeFiles) -> bool {
        if self.files.set(files).is_err() {
            tracing::warn!("output files for node {} already assigned", self.id);
            return false;
        }
        true
    }
}

/// A reference to a node at any level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// The root.
    Sf,
    /// An IR.
    Ir(IrKey),
    /// An SR.
    Sr(SrKey),
    /// An AR.
    Ar(ArKey),
}

impl NodeRef {
    /// The level of the referenced node.
    #[must_use]
    pub const fn level(self) -> Level {
        match self {
            Self::Sf => Level::Sf,
            Self::Ir(_) => Level::Ir,
            Self::Sr(_) => Level::Sr,
            Self::Ar(_) => Level::Ar,
        }
    }
}

impl From<IrKey> for NodeRef {
    fn from(key: IrKey) -> Self {
        Self::Ir(key)
    }
}

impl From<SrKey> for NodeRef {
    fn from(key: SrKey) -> Self {
        Self::Sr(key)
    }
}

impl From<ArKey> for NodeRef {
    fn from(key: ArKey) -> Self {
        Self::Ar(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_are_write_once() {
        let node: Sr = Node::new("42", IrKey::new(0));
        let first = NodeFiles {
            page: PathBuf::from("a.html"),
            ..NodeFiles::default()
        };
        let second = NodeFiles {
            page: PathBuf::from("b.html"),
            ..NodeFiles::default()
        };

        assert!(node.assign_files(first.clone()));
        assert!(!node.assign_files(second));
        assert_eq!(node.files(), Some(&first));
    }

    #[test]
    fn empty_title_reads_as_none() {
        let mut node: Ar = Node::new("7", SrKey::new(0));
        assert_eq!(node.title(), None);

        node.detail.title = "LLR_OS_01_01_01".to_string();
        assert_eq!(node.title(), Some("LLR_OS_01_01_01"));
    }

    #[test]
    fn parent_is_fixed_at_creation() {
        let node: Ar = Node::new("7", SrKey::new(3));
        assert_eq!(node.parent(), SrKey::new(3));
        assert_eq!(node.id(), "7");
        assert!(node.children().is_empty());
    }
}
