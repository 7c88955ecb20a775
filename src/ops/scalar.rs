//! Arithmetic on scalar graphs

use crate::autograd::GradOp;
use crate::error::{Error, Result};
use crate::graph::{scalar_graph, Graph};

fn scalar_value(graph: &Graph, operation: &str) -> Result<f32> {
    graph
        .item()
        .map_err(|e| Error::Shape(format!("{operation}: operand is not a scalar graph ({e})")))
}

pub(crate) fn add_op(a: &Graph, b: &Graph) -> Result<(Graph, GradOp)> {
    let value = scalar_value(a, "add")? + scalar_value(b, "add")?;
    Ok((
        scalar_graph(value, a.calc_grad() || b.calc_grad()),
        GradOp::Add,
    ))
}

pub(crate) fn subtract_op(a: &Graph, b: &Graph) -> Result<(Graph, GradOp)> {
    let value = scalar_value(a, "subtract")? - scalar_value(b, "subtract")?;
    Ok((
        scalar_graph(value, a.calc_grad() || b.calc_grad()),
        GradOp::Subtract,
    ))
}

pub(crate) fn negate_op(a: &Graph) -> Result<(Graph, GradOp)> {
    let value = -scalar_value(a, "negate")?;
    Ok((scalar_graph(value, a.calc_grad()), GradOp::Negate))
}

/// `a + b` for scalar graphs
pub fn add(a: &Graph, b: &Graph) -> Result<Graph> {
    Ok(scalar_graph(add_op(a, b)?.0.item()?, false))
}

/// `a - b` for scalar graphs
pub fn subtract(a: &Graph, b: &Graph) -> Result<Graph> {
    Ok(scalar_graph(subtract_op(a, b)?.0.item()?, false))
}

/// `-a` for a scalar graph
pub fn negate(a: &Graph) -> Result<Graph> {
    Ok(scalar_graph(negate_op(a)?.0.item()?, false))
}
