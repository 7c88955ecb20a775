//! Weighted graph with gradient tracking

use crate::error::{Error, Result};
use ndarray::Array1;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Label meaning "no symbol consumed".
pub const EPSILON: i32 = -1;

static NEXT_GRAPH_ID: AtomicUsize = AtomicUsize::new(0);

/// A node record. Node identity is its index in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub is_start: bool,
    pub is_accept: bool,
    pub(crate) in_arcs: Vec<usize>,
    pub(crate) out_arcs: Vec<usize>,
}

/// Structural part of an arc. The weight lives in a separate buffer indexed
/// by the same arc index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcInfo {
    pub src: usize,
    pub dst: usize,
    pub ilabel: i32,
    pub olabel: i32,
}

/// Storage behind a [`Graph`] handle.
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphData {
    pub(crate) nodes: Vec<Node>,
    pub(crate) arcs: Vec<ArcInfo>,
    pub(crate) weights: Vec<f32>,
    pub(crate) start: Vec<usize>,
    pub(crate) accept: Vec<usize>,
    pub(crate) ilabel_sorted: bool,
    pub(crate) olabel_sorted: bool,
    pub(crate) calc_grad: bool,
}

impl GraphData {
    pub(crate) fn new(calc_grad: bool) -> Self {
        Self {
            calc_grad,
            ..Self::default()
        }
    }

    pub(crate) fn add_node(&mut self, is_start: bool, is_accept: bool) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            is_start,
            is_accept,
            ..Node::default()
        });
        if is_start {
            self.start.push(id);
        }
        if is_accept {
            self.accept.push(id);
        }
        id
    }

    pub(crate) fn add_arc(
        &mut self,
        src: usize,
        dst: usize,
        ilabel: i32,
        olabel: i32,
        weight: f32,
    ) -> Result<usize> {
        let n = self.nodes.len();
        if src >= n || dst >= n {
            return Err(Error::Shape(format!(
                "arc {src} -> {dst} references a node outside 0..{n}"
            )));
        }
        let id = self.arcs.len();
        self.arcs.push(ArcInfo {
            src,
            dst,
            ilabel,
            olabel,
        });
        self.weights.push(weight);
        self.nodes[src].out_arcs.push(id);
        self.nodes[dst].in_arcs.push(id);
        self.ilabel_sorted = false;
        self.olabel_sorted = false;
        Ok(id)
    }

    pub(crate) fn make_accept(&mut self, node: usize) {
        if !self.nodes[node].is_accept {
            self.nodes[node].is_accept = true;
            self.accept.push(node);
            self.accept.sort_unstable();
        }
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    pub(crate) fn check_node(&self, node: usize) -> Result<()> {
        if node >= self.nodes.len() {
            return Err(Error::Shape(format!(
                "node {node} out of range (graph has {} nodes)",
                self.nodes.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn check_arc(&self, arc: usize) -> Result<()> {
        if arc >= self.arcs.len() {
            return Err(Error::Shape(format!(
                "arc {arc} out of range (graph has {} arcs)",
                self.arcs.len()
            )));
        }
        Ok(())
    }

    /// Fails for a non-empty graph that lacks a start or an accept node.
    pub(crate) fn check_terminals(&self, operation: &str) -> Result<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }
        if self.start.is_empty() {
            return Err(Error::Structural(format!(
                "{operation}: graph has no start node"
            )));
        }
        if self.accept.is_empty() {
            return Err(Error::Structural(format!(
                "{operation}: graph has no accept node"
            )));
        }
        Ok(())
    }

    pub(crate) fn arc_sort(&mut self, olabel: bool) {
        let arcs = &self.arcs;
        let key = |a: &usize| {
            if olabel {
                arcs[*a].olabel
            } else {
                arcs[*a].ilabel
            }
        };
        for node in &mut self.nodes {
            node.in_arcs.sort_by_key(key);
            node.out_arcs.sort_by_key(key);
        }
        self.ilabel_sorted = !olabel;
        self.olabel_sorted = olabel;
    }
}

/// Weighted automaton / transducer with automatic differentiation support.
///
/// Cloning a `Graph` yields another handle to the same nodes, arcs, weights
/// and gradient buffer, which is how a graph is shared between the caller
/// and every tape entry that consumes it. Use
/// [`clone_graph`](crate::ops::clone_graph) for an independent copy.
///
/// Mutating a graph after an operation recorded on a tape has consumed it
/// leaves that tape's gradient rules out of date. This is a usage contract,
/// it is not checked.
#[derive(Clone)]
pub struct Graph {
    id: usize,
    data: Rc<RefCell<GraphData>>,
    grad: Rc<RefCell<Option<Array1<f32>>>>,
}

impl Graph {
    /// Create an empty graph
    pub fn new(calc_grad: bool) -> Self {
        Self::from_data(GraphData::new(calc_grad))
    }

    pub(crate) fn from_data(data: GraphData) -> Self {
        Self {
            id: NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed),
            data: Rc::new(RefCell::new(data)),
            grad: Rc::new(RefCell::new(None)),
        }
    }

    pub(crate) fn data(&self) -> Ref<'_, GraphData> {
        self.data.borrow()
    }

    /// Process-unique identity shared by all handles of this graph.
    pub fn id(&self) -> usize {
        self.id
    }

    /// True when both handles refer to the same graph.
    pub fn same_as(&self, other: &Graph) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Add a node and return its index
    pub fn add_node(&mut self, is_start: bool, is_accept: bool) -> usize {
        self.data.borrow_mut().add_node(is_start, is_accept)
    }

    /// Add an acceptor arc (input label == output label) with weight 0.
    pub fn add_arc(&mut self, src: usize, dst: usize, label: i32) -> Result<usize> {
        self.data.borrow_mut().add_arc(src, dst, label, label, 0.0)
    }

    /// Add a transducer arc with explicit labels and weight.
    pub fn add_weighted_arc(
        &mut self,
        src: usize,
        dst: usize,
        ilabel: i32,
        olabel: i32,
        weight: f32,
    ) -> Result<usize> {
        self.data
            .borrow_mut()
            .add_arc(src, dst, ilabel, olabel, weight)
    }

    /// Mark an existing node as accepting
    pub fn make_accept(&mut self, node: usize) -> Result<()> {
        let mut data = self.data.borrow_mut();
        data.check_node(node)?;
        data.make_accept(node);
        Ok(())
    }

    pub fn num_nodes(&self) -> usize {
        self.data().num_nodes()
    }

    pub fn num_arcs(&self) -> usize {
        self.data().num_arcs()
    }

    pub fn num_start(&self) -> usize {
        self.data().start.len()
    }

    pub fn num_accept(&self) -> usize {
        self.data().accept.len()
    }

    /// True for a graph without nodes
    pub fn is_empty(&self) -> bool {
        self.data().nodes.is_empty()
    }

    pub fn start_nodes(&self) -> Vec<usize> {
        self.data().start.clone()
    }

    pub fn accept_nodes(&self) -> Vec<usize> {
        self.data().accept.clone()
    }

    pub fn is_start(&self, node: usize) -> Result<bool> {
        let data = self.data();
        data.check_node(node)?;
        Ok(data.nodes[node].is_start)
    }

    pub fn is_accept(&self, node: usize) -> Result<bool> {
        let data = self.data();
        data.check_node(node)?;
        Ok(data.nodes[node].is_accept)
    }

    /// Indices of arcs entering `node`
    pub fn in_arcs(&self, node: usize) -> Result<Vec<usize>> {
        let data = self.data();
        data.check_node(node)?;
        Ok(data.nodes[node].in_arcs.clone())
    }

    /// Indices of arcs leaving `node`
    pub fn out_arcs(&self, node: usize) -> Result<Vec<usize>> {
        let data = self.data();
        data.check_node(node)?;
        Ok(data.nodes[node].out_arcs.clone())
    }

    /// Structural record of an arc
    pub fn arc(&self, arc: usize) -> Result<ArcInfo> {
        let data = self.data();
        data.check_arc(arc)?;
        Ok(data.arcs[arc])
    }

    pub fn ilabel(&self, arc: usize) -> Result<i32> {
        Ok(self.arc(arc)?.ilabel)
    }

    pub fn olabel(&self, arc: usize) -> Result<i32> {
        Ok(self.arc(arc)?.olabel)
    }

    pub fn weight(&self, arc: usize) -> Result<f32> {
        let data = self.data();
        data.check_arc(arc)?;
        Ok(data.weights[arc])
    }

    /// True when every arc has identical input and output labels
    pub fn is_acceptor(&self) -> bool {
        self.data().arcs.iter().all(|a| a.ilabel == a.olabel)
    }

    /// Overwrite all arc weights in arc-insertion order
    pub fn set_weights(&mut self, values: &[f32]) -> Result<()> {
        let mut data = self.data.borrow_mut();
        if values.len() != data.num_arcs() {
            return Err(Error::Shape(format!(
                "expected {} weights, got {}",
                data.num_arcs(),
                values.len()
            )));
        }
        data.weights.copy_from_slice(values);
        Ok(())
    }

    /// Arc weights in arc-insertion order
    pub fn weights_to_list(&self) -> Vec<f32> {
        self.data().weights.clone()
    }

    /// Input (`ilabel == true`) or output labels in arc-insertion order
    pub fn labels_to_list(&self, ilabel: bool) -> Vec<i32> {
        self.data()
            .arcs
            .iter()
            .map(|a| if ilabel { a.ilabel } else { a.olabel })
            .collect()
    }

    /// Weight of a single-arc scalar graph
    pub fn item(&self) -> Result<f32> {
        let data = self.data();
        if data.num_arcs() != 1 {
            return Err(Error::Shape(format!(
                "item() requires exactly one arc, graph has {}",
                data.num_arcs()
            )));
        }
        Ok(data.weights[0])
    }

    /// Sort every node's adjacency lists by output (`olabel == true`) or input
    /// label. Arc indices are left untouched.
    pub fn arc_sort(&mut self, olabel: bool) {
        self.data.borrow_mut().arc_sort(olabel);
    }

    pub fn ilabel_sorted(&self) -> bool {
        self.data().ilabel_sorted
    }

    pub fn olabel_sorted(&self) -> bool {
        self.data().olabel_sorted
    }

    /// Check if gradients are tracked for this graph
    pub fn calc_grad(&self) -> bool {
        self.data().calc_grad
    }

    pub fn set_calc_grad(&mut self, calc_grad: bool) {
        self.data.borrow_mut().calc_grad = calc_grad;
    }

    /// Get gradient (if computed), indexed like the arcs.
    ///
    /// Gradients are only written by a backward pass; callers cannot add to
    /// the buffer directly:
    ///
    /// ```compile_fail
    /// let g = entrelazar::graph::scalar_graph(1.0, true);
    /// g.accumulate_grad(ndarray::arr1(&[1.0])).unwrap();
    /// ```
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    /// Accumulate gradient (for when the graph feeds several operations)
    pub(crate) fn accumulate_grad(&self, grad: Array1<f32>) -> Result<()> {
        let expected = self.num_arcs();
        if grad.len() != expected {
            return Err(Error::Shape(format!(
                "gradient has {} entries, graph has {expected} arcs",
                grad.len()
            )));
        }
        let mut grad_ref = self.grad.borrow_mut();
        if let Some(existing) = grad_ref.as_mut() {
            *existing += &grad;
        } else {
            *grad_ref = Some(grad);
        }
        Ok(())
    }

    /// Zero out gradient
    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data();
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("nodes", &data.nodes.len())
            .field("arcs", &data.arcs)
            .field("weights", &data.weights)
            .field("start", &data.start)
            .field("accept", &data.accept)
            .field("calc_grad", &data.calc_grad)
            .field("grad", &self.grad.borrow())
            .finish()
    }
}
