//! The SF → IR → SR → AR requirement tree.
//!
//! Nodes live in per-level arenas and refer to each other through typed
//! keys. Children are ordered key lists and each node holds a non-owning key
//! to its parent, assigned when the node is attached.

use tracing::instrument;

use crate::domain::{
    node::{
        Ar, ArKey, Detail, Ir, IrKey, Level, Node, NodeFiles, NodeRef, Root, Sf, Sr, SrKey,
        TestCaseKey,
    },
    registry::Registry,
    req_id::{self, LlrToken, SortKey},
};

/// An in-memory requirement tree rooted at a single SF.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    sf: Sf,
    irs: Vec<Ir>,
    srs: Vec<Sr>,
    ars: Vec<Ar>,
}

/// What a derivation wrote, for callers that want to report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Derived {
    /// Whether the owning SR received its identifier.
    pub sr: bool,
    /// Whether the owning IR received its identifier.
    pub ir: bool,
}

impl Hierarchy {
    /// Creates a tree containing only the root SF.
    #[must_use]
    pub fn new(sf_id: impl Into<String>) -> Self {
        Self {
            sf: Node::new(sf_id, ()),
            irs: Vec::new(),
            srs: Vec::new(),
            ars: Vec::new(),
        }
    }

    /// The root.
    #[must_use]
    pub const fn sf(&self) -> &Sf {
        &self.sf
    }

    /// The root, mutably.
    pub const fn sf_mut(&mut self) -> &mut Sf {
        &mut self.sf
    }

    /// Returns the IR for `key`.
    #[must_use]
    pub fn ir(&self, key: IrKey) -> &Ir {
        &self.irs[key.index()]
    }

    /// Returns the IR for `key`, mutably.
    pub fn ir_mut(&mut self, key: IrKey) -> &mut Ir {
        &mut self.irs[key.index()]
    }

    /// Returns the SR for `key`.
    #[must_use]
    pub fn sr(&self, key: SrKey) -> &Sr {
        &self.srs[key.index()]
    }

    /// Returns the SR for `key`, mutably.
    pub fn sr_mut(&mut self, key: SrKey) -> &mut Sr {
        &mut self.srs[key.index()]
    }

    /// Returns the AR for `key`.
    #[must_use]
    pub fn ar(&self, key: ArKey) -> &Ar {
        &self.ars[key.index()]
    }

    /// Returns the AR for `key`, mutably.
    pub fn ar_mut(&mut self, key: ArKey) -> &mut Ar {
        &mut self.ars[key.index()]
    }

    /// Creates an IR stub with the given API id and appends it to the root.
    pub fn attach_ir(&mut self, id: impl Into<String>) -> IrKey {
        let key = IrKey::new(self.irs.len());
        self.irs.push(Node::new(id, Root));
        self.sf.push_child(key);
        key
    }

    /// Creates an SR stub with the given API id and appends it to `ir`.
    pub fn attach_sr(&mut self, ir: IrKey, id: impl Into<String>) -> SrKey {
        let key = SrKey::new(self.srs.len());
        self.srs.push(Node::new(id, ir));
        self.irs[ir.index()].push_child(key);
        key
    }

    /// Creates an AR stub with the given API id and appends it to `sr`.
    pub fn attach_ar(&mut self, sr: SrKey, id: impl Into<String>) -> ArKey {
        let key = ArKey::new(self.ars.len());
        self.ars.push(Node::new(id, sr));
        self.srs[sr.index()].push_child(key);
        key
    }

    /// Links a test case to an AR.
    pub fn link_test_case(&mut self, ar: ArKey, test_case: TestCaseKey) {
        self.ars[ar.index()].push_child(test_case);
    }

    /// The SR and IR that own an AR.
    #[must_use]
    pub fn ancestry(&self, ar: ArKey) -> (SrKey, IrKey) {
        let sr = self.ars[ar.index()].parent();
        (sr, self.srs[sr.index()].parent())
    }

    /// IRs in tree order.
    #[must_use]
    pub fn ir_keys(&self) -> Vec<IrKey> {
        self.sf.children().to_vec()
    }

    /// SRs in tree order.
    #[must_use]
    pub fn sr_keys(&self) -> Vec<SrKey> {
        self.sf
            .children()
            .iter()
            .flat_map(|ir| self.irs[ir.index()].children().iter().copied())
            .collect()
    }

    /// ARs in tree order.
    #[must_use]
    pub fn ar_keys(&self) -> Vec<ArKey> {
        self.sr_keys()
            .into_iter()
            .flat_map(|sr| self.srs[sr.index()].children().iter().copied())
            .collect()
    }

    /// Every node, root first, in tree order.
    #[must_use]
    pub fn node_refs(&self) -> Vec<NodeRef> {
        let mut refs = vec![NodeRef::Sf];
        for ir in self.sf.children() {
            refs.push(NodeRef::Ir(*ir));
            for sr in self.irs[ir.index()].children() {
                refs.push(NodeRef::Sr(*sr));
                refs.extend(
                    self.srs[sr.index()]
                        .children()
                        .iter()
                        .map(|ar| NodeRef::Ar(*ar)),
                );
            }
        }
        refs
    }

    /// The number of IRs.
    #[must_use]
    pub fn ir_count(&self) -> usize {
        self.irs.len()
    }

    /// The number of SRs.
    #[must_use]
    pub fn sr_count(&self) -> usize {
        self.srs.len()
    }

    /// The number of ARs.
    #[must_use]
    pub fn ar_count(&self) -> usize {
        self.ars.len()
    }

    /// The title of any node, or `None` if it has not been loaded.
    #[must_use]
    pub fn title(&self, node: NodeRef) -> Option<&str> {
        match node {
            NodeRef::Sf => self.sf.title(),
            NodeRef::Ir(key) => self.ir(key).title(),
            NodeRef::Sr(key) => self.sr(key).title(),
            NodeRef::Ar(key) => self.ar(key).title(),
        }
    }

    /// The fetched fields of any node.
    #[must_use]
    pub fn detail(&self, node: NodeRef) -> &Detail {
        match node {
            NodeRef::Sf => &self.sf.detail,
            NodeRef::Ir(key) => &self.ir(key).detail,
            NodeRef::Sr(key) => &self.sr(key).detail,
            NodeRef::Ar(key) => &self.ar(key).detail,
        }
    }

    /// The requirement identifier of any node. Empty until derived; always
    /// empty for the root.
    #[must_use]
    pub fn req_id(&self, node: NodeRef) -> &str {
        match node {
            NodeRef::Sf => &self.sf.req_id,
            NodeRef::Ir(key) => &self.ir(key).req_id,
            NodeRef::Sr(key) => &self.sr(key).req_id,
            NodeRef::Ar(key) => &self.ar(key).req_id,
        }
    }

    /// The output files of any node, once assigned.
    #[must_use]
    pub fn files(&self, node: NodeRef) -> Option<&NodeFiles> {
        match node {
            NodeRef::Sf => self.sf.files(),
            NodeRef::Ir(key) => self.ir(key).files(),
            NodeRef::Sr(key) => self.sr(key).files(),
            NodeRef::Ar(key) => self.ar(key).files(),
        }
    }

    /// The parent of any node; `None` for the root.
    #[must_use]
    pub fn parent_of(&self, node: NodeRef) -> Option<NodeRef> {
        match node {
            NodeRef::Sf => None,
            NodeRef::Ir(_) => Some(NodeRef::Sf),
            NodeRef::Sr(key) => Some(NodeRef::Ir(self.sr(key).parent())),
            NodeRef::Ar(key) => Some(NodeRef::Sr(self.ar(key).parent())),
        }
    }

    /// The requirement children of any node, in order. ARs have none; their
    /// test cases are listed through [`Node::children`].
    #[must_use]
    pub fn children_of(&self, node: NodeRef) -> Vec<NodeRef> {
        match node {
            NodeRef::Sf => refs(self.sf.children()),
            NodeRef::Ir(key) => refs(self.ir(key).children()),
            NodeRef::Sr(key) => refs(self.sr(key).children()),
            NodeRef::Ar(_) => Vec::new(),
        }
    }

    /// Derives requirement identifiers from an AR's title.
    ///
    /// The AR always takes the token from its title. The owning SR takes its
    /// identifier only if it has none yet, and the owning IR only if the SR
    /// was written by this same call and the IR has none yet. Every node
    /// written is registered; the AR under both its API id and its
    /// requirement identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the title holds no well-formed token. Nothing is
    /// written or registered in that case.
    pub fn derive_req_ids(
        &mut self,
        ar: ArKey,
        registry: &mut Registry,
    ) -> Result<Derived, req_id::Error> {
        let token = LlrToken::from_title(&self.ars[ar.index()].detail.title)?;
        let (sr, ir) = self.ancestry(ar);
        let mut derived = Derived::default();

        let ar_node = &mut self.ars[ar.index()];
        ar_node.req_id = token.ar_id().to_string();
        registry.register_ar(ar_node.id(), &ar_node.req_id, ar);

        let sr_node = &mut self.srs[sr.index()];
        let sr_id = token.sr_id();
        if !sr_node.req_id.is_empty() {
            if sr_node.req_id != sr_id {
                tracing::debug!(
                    "{token} implies {sr_id} but SR {} keeps {}",
                    sr_node.id(),
                    sr_node.req_id
                );
            }
            return Ok(derived);
        }
        sr_node.req_id = sr_id;
        registry.register_sr(&sr_node.req_id, sr);
        derived.sr = true;

        let ir_node = &mut self.irs[ir.index()];
        let ir_id = token.ir_id();
        if ir_node.req_id.is_empty() {
            ir_node.req_id = ir_id;
            registry.register_ir(&ir_node.req_id, ir);
            derived.ir = true;
        } else if ir_node.req_id != ir_id {
            tracing::debug!(
                "{token} implies {ir_id} but IR {} keeps {}",
                ir_node.id(),
                ir_node.req_id
            );
        }

        Ok(derived)
    }

    /// Sorts the children of every node by requirement identifier, top-down.
    ///
    /// The sort is stable, so nodes with equal keys keep their load order,
    /// and nodes without an identifier end up last.
    #[instrument(level = "debug", skip(self))]
    pub fn sort_all(&mut self) {
        let Self { sf, irs, srs, ars } = self;

        sort_children(sf.children_mut(), |k| {
            SortKey::new(&irs[k.index()].req_id, Level::Ir.depth())
        });
        for ir in irs.iter_mut() {
            sort_children(ir.children_mut(), |k| {
                SortKey::new(&srs[k.index()].req_id, Level::Sr.depth())
            });
        }
        for sr in srs.iter_mut() {
            sort_children(sr.children_mut(), |k| {
                SortKey::new(&ars[k.index()].req_id, Level::Ar.depth())
            });
        }
    }
}

fn refs<K: Copy + Into<NodeRef>>(keys: &[K]) -> Vec<NodeRef> {
    keys.iter().map(|k| (*k).into()).collect()
}

fn sort_children<K: Copy>(children: &mut [K], req_id: impl Fn(K) -> SortKey) {
    children.sort_by_cached_key(|k| req_id(*k));
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn tree_with_ars(titles: &[&str]) -> (Hierarchy, Vec<ArKey>) {
        let mut tree = Hierarchy::new("sf");
        let ir = tree.attach_ir("ir");
        let sr = tree.attach_sr(ir, "sr");
        let ars = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let ar = tree.attach_ar(sr, format!("ar{i}"));
                tree.ar_mut(ar).detail.title = (*title).to_string();
                ar
            })
            .collect();
        (tree, ars)
    }

    #[test]
    fn derivation_fills_the_chain() {
        let (mut tree, ars) = tree_with_ars(&["LLR_OS_01_02_03 调度"]);
        let mut registry = Registry::new();

        let derived = tree.derive_req_ids(ars[0], &mut registry).unwrap();

        assert_eq!(derived, Derived { sr: true, ir: true });
        let (sr, ir) = tree.ancestry(ars[0]);
        assert_eq!(tree.ar(ars[0]).req_id, "LLR_OS_01_02_03");
        assert_eq!(tree.sr(sr).req_id, "HLR_OS_01_02");
        assert_eq!(tree.ir(ir).req_id, "HLR_OS_01");
        assert_eq!(registry.ar_by_id("ar0"), Some(ars[0]));
        assert_eq!(registry.ar("LLR_OS_01_02_03"), Some(ars[0]));
        assert_eq!(registry.sr("HLR_OS_01_02"), Some(sr));
        assert_eq!(registry.ir("HLR_OS_01"), Some(ir));
    }

    #[test]
    fn first_writer_wins() {
        let (mut tree, ars) = tree_with_ars(&["LLR_OS_01_02_01", "LLR_OS_05_06_07"]);
        let mut registry = Registry::new();

        tree.derive_req_ids(ars[0], &mut registry).unwrap();
        let derived = tree.derive_req_ids(ars[1], &mut registry).unwrap();

        assert_eq!(derived, Derived::default());
        let (sr, ir) = tree.ancestry(ars[1]);
        assert_eq!(tree.ar(ars[1]).req_id, "LLR_OS_05_06_07");
        assert_eq!(tree.sr(sr).req_id, "HLR_OS_01_02");
        assert_eq!(tree.ir(ir).req_id, "HLR_OS_01");
        assert_eq!(registry.sr("HLR_OS_05_06"), None);
    }

    #[test]
    fn ir_is_only_written_alongside_its_sr() {
        let mut tree = Hierarchy::new("sf");
        let ir = tree.attach_ir("ir");
        let first_sr = tree.attach_sr(ir, "sr1");
        let second_sr = tree.attach_sr(ir, "sr2");
        tree.sr_mut(first_sr).req_id = "HLR_OS_09_09".to_string();
        let blocked = tree.attach_ar(first_sr, "ar1");
        tree.ar_mut(blocked).detail.title = "LLR_OS_01_01_01".to_string();
        let open = tree.attach_ar(second_sr, "ar2");
        tree.ar_mut(open).detail.title = "LLR_OS_01_02_01".to_string();
        let mut registry = Registry::new();

        tree.derive_req_ids(blocked, &mut registry).unwrap();
        assert!(tree.ir(ir).req_id.is_empty());

        tree.derive_req_ids(open, &mut registry).unwrap();
        assert_eq!(tree.ir(ir).req_id, "HLR_OS_01");
    }

    #[test_case("OSTaskCreate"; "no token")]
    #[test_case("LLR_OS_01_02"; "short token")]
    #[test_case(""; "empty title")]
    fn failed_derivation_writes_nothing(title: &str) {
        let (mut tree, ars) = tree_with_ars(&[title]);
        let mut registry = Registry::new();

        assert!(tree.derive_req_ids(ars[0], &mut registry).is_err());

        let (sr, ir) = tree.ancestry(ars[0]);
        assert!(tree.ar(ars[0]).req_id.is_empty());
        assert!(tree.sr(sr).req_id.is_empty());
        assert!(tree.ir(ir).req_id.is_empty());
        assert_eq!(registry.ar_by_id("ar0"), None);
    }

    #[test]
    fn sorting_orders_each_level_and_puts_empty_last() {
        let mut tree = Hierarchy::new("sf");
        let ir_b = tree.attach_ir("b");
        let ir_empty = tree.attach_ir("empty");
        let ir_a = tree.attach_ir("a");
        tree.ir_mut(ir_b).req_id = "HLR_OS_10".to_string();
        tree.ir_mut(ir_a).req_id = "HLR_OS_2".to_string();

        let sr = tree.attach_sr(ir_a, "sr");
        let ar_late = tree.attach_ar(sr, "late");
        let ar_early = tree.attach_ar(sr, "early");
        tree.ar_mut(ar_late).req_id = "LLR_OS_02_01_10".to_string();
        tree.ar_mut(ar_early).req_id = "LLR_OS_02_01_09".to_string();

        tree.sort_all();

        assert_eq!(tree.ir_keys(), vec![ir_a, ir_b, ir_empty]);
        assert_eq!(tree.sr(sr).children(), &[ar_early, ar_late]);
    }

    #[test]
    fn sorting_is_stable_and_idempotent() {
        let mut tree = Hierarchy::new("sf");
        let ir = tree.attach_ir("ir");
        let sr = tree.attach_sr(ir, "sr");
        let first_empty = tree.attach_ar(sr, "x");
        let valid = tree.attach_ar(sr, "y");
        let second_empty = tree.attach_ar(sr, "z");
        tree.ar_mut(valid).req_id = "LLR_OS_01_01_01".to_string();

        tree.sort_all();
        let once = tree.sr(sr).children().to_vec();
        tree.sort_all();

        assert_eq!(once, vec![valid, first_empty, second_empty]);
        assert_eq!(tree.sr(sr).children(), once.as_slice());
    }

    #[test]
    fn key_listings_follow_tree_order() {
        let mut tree = Hierarchy::new("sf");
        let ir1 = tree.attach_ir("ir1");
        let ir2 = tree.attach_ir("ir2");
        let sr2 = tree.attach_sr(ir2, "sr2");
        let sr1 = tree.attach_sr(ir1, "sr1");
        let ar2 = tree.attach_ar(sr2, "ar2");
        let ar1 = tree.attach_ar(sr1, "ar1");

        assert_eq!(tree.sr_keys(), vec![sr1, sr2]);
        assert_eq!(tree.ar_keys(), vec![ar1, ar2]);
        assert_eq!(tree.node_refs().len(), 7);
        assert_eq!(tree.ancestry(ar2), (sr2, ir2));
    }

    #[test]
    fn node_refs_navigate_both_ways() {
        let mut tree = Hierarchy::new("sf");
        let ir = tree.attach_ir("ir");
        let sr = tree.attach_sr(ir, "sr");
        let ar = tree.attach_ar(sr, "ar");
        tree.link_test_case(ar, TestCaseKey::new(0));

        assert_eq!(tree.children_of(NodeRef::Sf), vec![NodeRef::Ir(ir)]);
        assert_eq!(tree.children_of(sr.into()), vec![NodeRef::Ar(ar)]);
        assert!(tree.children_of(ar.into()).is_empty());
        assert_eq!(tree.parent_of(ar.into()), Some(NodeRef::Sr(sr)));
        assert_eq!(tree.parent_of(ir.into()), Some(NodeRef::Sf));
        assert_eq!(tree.parent_of(NodeRef::Sf), None);
    }
}
