//! Structural combinators: copies, projections, union, concatenation and
//! Kleene closure. Each output arc copies at most one input arc, and its
//! gradient flows back to that arc.

use crate::autograd::GradOp;
use crate::graph::{Graph, GraphData, EPSILON};

/// Append the nodes and arcs of `src` to `dst`, returning the node offset.
///
/// Start/accept flags are copied only when `keep_start`/`keep_accept` are set.
fn append(dst: &mut GraphData, src: &GraphData, keep_start: bool, keep_accept: bool) -> usize {
    let offset = dst.num_nodes();
    for node in &src.nodes {
        dst.add_node(keep_start && node.is_start, keep_accept && node.is_accept);
    }
    for (k, arc) in src.arcs.iter().enumerate() {
        // Endpoints were appended above.
        let _ = dst.add_arc(
            arc.src + offset,
            arc.dst + offset,
            arc.ilabel,
            arc.olabel,
            src.weights[k],
        );
    }
    offset
}

fn relabel(graph: &Graph, map: impl Fn(i32, i32) -> (i32, i32)) -> Graph {
    let data = graph.data();
    let mut out = GraphData::new(data.calc_grad);
    append(&mut out, &data, true, true);
    for arc in &mut out.arcs {
        let (ilabel, olabel) = map(arc.ilabel, arc.olabel);
        arc.ilabel = ilabel;
        arc.olabel = olabel;
    }
    Graph::from_data(out)
}

pub(crate) fn clone_op(graph: &Graph) -> (Graph, GradOp) {
    (relabel(graph, |i, o| (i, o)), GradOp::Clone)
}

pub(crate) fn project_input_op(graph: &Graph) -> (Graph, GradOp) {
    (relabel(graph, |i, _| (i, i)), GradOp::ProjectInput)
}

pub(crate) fn project_output_op(graph: &Graph) -> (Graph, GradOp) {
    (relabel(graph, |_, o| (o, o)), GradOp::ProjectOutput)
}

pub(crate) fn union_op(graphs: &[Graph]) -> (Graph, GradOp) {
    let calc_grad = graphs.iter().any(Graph::calc_grad);
    let mut out = GraphData::new(calc_grad);
    let mut arc_offsets = vec![0];
    for graph in graphs {
        append(&mut out, &graph.data(), true, true);
        arc_offsets.push(out.num_arcs());
    }
    (Graph::from_data(out), GradOp::Union { arc_offsets })
}

pub(crate) fn concat_op(graphs: &[Graph]) -> (Graph, GradOp) {
    let calc_grad = graphs.iter().any(Graph::calc_grad);
    let mut out = GraphData::new(calc_grad);
    let mut arc_sources = Vec::new();
    if graphs.is_empty() {
        out.add_node(true, true);
        return (Graph::from_data(out), GradOp::Concat { arc_sources });
    }

    let last = graphs.len() - 1;
    let mut previous_accept: Vec<usize> = Vec::new();
    for (i, graph) in graphs.iter().enumerate() {
        let data = graph.data();
        // Bridge arcs come first so each graph's arcs stay contiguous.
        let offset = out.num_nodes();
        for node in &data.nodes {
            out.add_node(i == 0 && node.is_start, i == last && node.is_accept);
        }
        for &accept in &previous_accept {
            for &start in &data.start {
                let _ = out.add_arc(accept, start + offset, EPSILON, EPSILON, 0.0);
                arc_sources.push(None);
            }
        }
        for (k, arc) in data.arcs.iter().enumerate() {
            let _ = out.add_arc(
                arc.src + offset,
                arc.dst + offset,
                arc.ilabel,
                arc.olabel,
                data.weights[k],
            );
            arc_sources.push(Some((i, k)));
        }
        previous_accept = data.accept.iter().map(|&a| a + offset).collect();
    }
    (Graph::from_data(out), GradOp::Concat { arc_sources })
}

pub(crate) fn closure_op(graph: &Graph) -> (Graph, GradOp) {
    let data = graph.data();
    let mut out = GraphData::new(data.calc_grad);
    let mut arc_sources = Vec::new();
    out.add_node(true, true);
    for node in &data.nodes {
        out.add_node(false, node.is_accept);
    }
    for &start in &data.start {
        let _ = out.add_arc(0, start + 1, EPSILON, EPSILON, 0.0);
        arc_sources.push(None);
    }
    for (k, arc) in data.arcs.iter().enumerate() {
        let _ = out.add_arc(arc.src + 1, arc.dst + 1, arc.ilabel, arc.olabel, data.weights[k]);
        arc_sources.push(Some(k));
    }
    for &accept in &data.accept {
        for &start in &data.start {
            let _ = out.add_arc(accept + 1, start + 1, EPSILON, EPSILON, 0.0);
            arc_sources.push(None);
        }
    }
    (Graph::from_data(out), GradOp::Closure { arc_sources })
}

fn detached((mut graph, _): (Graph, GradOp)) -> Graph {
    graph.set_calc_grad(false);
    graph
}

/// Independent deep copy of `graph`
pub fn clone_graph(graph: &Graph) -> Graph {
    detached(clone_op(graph))
}

/// Acceptor keeping the input label of every arc
pub fn project_input(graph: &Graph) -> Graph {
    detached(project_input_op(graph))
}

/// Acceptor keeping the output label of every arc
pub fn project_output(graph: &Graph) -> Graph {
    detached(project_output_op(graph))
}

/// Graph accepting any path accepted by one of `graphs`
pub fn union(graphs: &[Graph]) -> Graph {
    detached(union_op(graphs))
}

/// Graph accepting the concatenation of paths of `graphs`, in order,
/// joined by ε arcs from each graph's accept nodes to the next graph's start
/// nodes. An empty list gives the single-node graph accepting the empty path.
pub fn concat(graphs: &[Graph]) -> Graph {
    detached(concat_op(graphs))
}

/// Kleene closure: zero or more repetitions of `graph`
pub fn closure(graph: &Graph) -> Graph {
    detached(closure_op(graph))
}
