//! Assignment of output files to nodes.
//!
//! The requirement pages mirror the tree:
//!
//! ```text
//! <root>/SF.html, SF描述.html, ..., <SF title>_table.html, 需求导航.html
//! <root>/<IR>/<IR>.html, <IR>描述.html, <IR>评审记录.html, <IR>修改记录.html, <IR>_table.html
//! <root>/<IR>/<SR>/...
//! <root>/<IR>/<SR>/<AR>/<AR>.html, ..., <test case number>.html
//! ```

use std::{
    fs, io,
    path::{Component, Path, PathBuf},
};

use crate::domain::{Config, Hierarchy, Level, NodeFiles, NodeRef, TestCaseKey, TestSuite};

/// Errors raised while assigning output files.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The node, or one of its ancestors, has no title to name its directory.
    #[error("{level} {id} has no title")]
    MissingTitle {
        /// Level of the untitled node.
        level: Level,
        /// API id of the untitled node.
        id: String,
    },

    /// The title of the node is not a plain file name.
    #[error("{level} {id} has a title that is not a plain file name")]
    UnsafeTitle {
        /// Level of the node.
        level: Level,
        /// API id of the node.
        id: String,
    },

    /// The directory for the node could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// The directory.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The test case is not linked to an AR, or the AR has no files yet.
    #[error("test case {0} has no AR directory")]
    Unplaced(String),

    /// The test case number is not a plain file name.
    #[error("test case number {0} is not a plain file name")]
    UnsafeNumber(String),
}

/// Places output files under a requirements root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// A layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A layout rooted at the configured requirements directory.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.requirements_root())
    }

    /// The requirements root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory holding a node's pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or any non-root ancestor is untitled, or
    /// has a title that would leave the directory it is placed in.
    pub fn node_dir(&self, tree: &Hierarchy, node: NodeRef) -> Result<PathBuf, LayoutError> {
        let mut chain = Vec::new();
        match node {
            NodeRef::Sf => {}
            NodeRef::Ir(ir) => chain.push(NodeRef::Ir(ir)),
            NodeRef::Sr(sr) => {
                chain.push(NodeRef::Ir(tree.sr(sr).parent()));
                chain.push(NodeRef::Sr(sr));
            }
            NodeRef::Ar(ar) => {
                let (sr, ir) = tree.ancestry(ar);
                chain.extend([NodeRef::Ir(ir), NodeRef::Sr(sr), NodeRef::Ar(ar)]);
            }
        }

        let mut dir = self.root.clone();
        for link in chain {
            dir.push(title_of(tree, link)?);
        }
        Ok(dir)
    }

    /// Assigns a node's output files and creates them empty.
    ///
    /// The directory chain is created first. A file that cannot be created
    /// is logged and left out; the assignment still stands. A node whose
    /// files were already assigned keeps the first assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the node cannot be placed or its directory cannot
    /// be created.
    pub fn create_html_files(&self, tree: &Hierarchy, node: NodeRef) -> Result<(), LayoutError> {
        let dir = self.node_dir(tree, node)?;
        fs::create_dir_all(&dir).map_err(|source| LayoutError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let files = match node {
            NodeRef::Sf => {
                let title = tree.sf().detail.title.as_str();
                if !title.is_empty() && !is_file_name(title) {
                    return Err(unsafe_title(tree, node));
                }
                NodeFiles {
                    page: dir.join("SF.html"),
                    description: dir.join("SF描述.html"),
                    review: dir.join("SF评审记录.html"),
                    history: dir.join("SF修改记录.html"),
                    table: Some(dir.join(format!("{title}_table.html"))),
                    navigation: Some(dir.join("需求导航.html")),
                }
            }
            NodeRef::Ir(_) | NodeRef::Sr(_) | NodeRef::Ar(_) => {
                let title = title_of(tree, node)?;
                NodeFiles {
                    page: dir.join(format!("{title}.html")),
                    description: dir.join(format!("{title}描述.html")),
                    review: dir.join(format!("{title}评审记录.html")),
                    history: dir.join(format!("{title}修改记录.html")),
                    table: (node.level() != Level::Ar)
                        .then(|| dir.join(format!("{title}_table.html"))),
                    navigation: None,
                }
            }
        };

        for path in files_of(&files) {
            touch(path);
        }

        let assigned = match node {
            NodeRef::Sf => tree.sf().assign_files(files),
            NodeRef::Ir(key) => tree.ir(key).assign_files(files),
            NodeRef::Sr(key) => tree.sr(key).assign_files(files),
            NodeRef::Ar(key) => tree.ar(key).assign_files(files),
        };
        if assigned {
            tracing::debug!("assigned files for {} in {}", node.level(), dir.display());
        }
        Ok(())
    }

    /// Assigns the page of a linked test case, next to its AR's page.
    ///
    /// # Errors
    ///
    /// Returns an error if the case is unlinked, its AR has no files, or its
    /// number is not a plain file name.
    pub fn assign_test_case_page(
        &self,
        tree: &Hierarchy,
        suite: &TestSuite,
        key: TestCaseKey,
    ) -> Result<(), LayoutError> {
        let case = suite.get(key);
        let dir = case
            .link
            .as_ref()
            .and_then(|link| tree.ar(link.ar).files())
            .and_then(|files| files.page.parent())
            .ok_or_else(|| LayoutError::Unplaced(case.number.clone()))?;
        if !is_file_name(&case.number) {
            return Err(LayoutError::UnsafeNumber(case.number.clone()));
        }

        let path = dir.join(format!("{}.html", case.number));
        touch(&path);
        case.assign_page(path);
        Ok(())
    }
}

fn title_of(tree: &Hierarchy, node: NodeRef) -> Result<&str, LayoutError> {
    let title = tree.title(node).ok_or_else(|| LayoutError::MissingTitle {
        level: node.level(),
        id: id_of(tree, node).to_string(),
    })?;
    if is_file_name(title) {
        Ok(title)
    } else {
        Err(unsafe_title(tree, node))
    }
}

fn unsafe_title(tree: &Hierarchy, node: NodeRef) -> LayoutError {
    LayoutError::UnsafeTitle {
        level: node.level(),
        id: id_of(tree, node).to_string(),
    }
}

fn id_of(tree: &Hierarchy, node: NodeRef) -> &str {
    match node {
        NodeRef::Sf => tree.sf().id(),
        NodeRef::Ir(key) => tree.ir(key).id(),
        NodeRef::Sr(key) => tree.sr(key).id(),
        NodeRef::Ar(key) => tree.ar(key).id(),
    }
}

/// Whether `name` is exactly one normal path component.
fn is_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(component)), None) => component == name,
        _ => false,
    }
}

/// Every path in `files`.
pub fn files_of(files: &NodeFiles) -> impl Iterator<Item = &PathBuf> {
    [&files.page, &files.description, &files.review, &files.history]
        .into_iter()
        .chain(files.table.as_ref())
        .chain(files.navigation.as_ref())
}

fn touch(path: &Path) {
    if let Err(e) = fs::File::create(path) {
        tracing::warn!("failed to create {}: {e}", path.display());
    }
}
