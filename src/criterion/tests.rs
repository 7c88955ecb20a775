//! Tests for criterion graphs and losses

use super::*;
use crate::autograd::Context;
use crate::error::Error;
use crate::graph::linear_graph;
use approx::assert_abs_diff_eq;

#[test]
fn test_ctc_graph_structure() {
    let g = ctc_graph(&[1, 2, 2], 0);
    assert_eq!(g.num_nodes(), 7);
    assert_eq!(g.start_nodes(), vec![0]);
    assert_eq!(g.accept_nodes(), vec![5, 6]);
    // 7 self-loops, 6 forward arcs, one skip between the different labels 1 and 2
    assert_eq!(g.num_arcs(), 14);
    assert!(g.olabel_sorted());
    assert!(g.is_acceptor());
}

#[test]
fn test_ctc_graph_empty_target() {
    let g = ctc_graph(&[], 3);
    assert_eq!(g.num_nodes(), 1);
    assert!(g.is_start(0).unwrap());
    assert!(g.is_accept(0).unwrap());
    assert_eq!(g.labels_to_list(true), vec![3]);
}

#[test]
fn test_forced_alignment_graph() {
    let g = forced_alignment_graph(&[2, 1]);
    assert_eq!(g.num_nodes(), 3);
    assert_eq!(g.accept_nodes(), vec![2]);
    assert_eq!(g.labels_to_list(true), vec![2, 2, 1, 1]);
    assert_eq!(g.arc(1).unwrap().src, 1);
    assert_eq!(g.arc(1).unwrap().dst, 1);

    let empty = forced_alignment_graph(&[]);
    assert_eq!(empty.num_nodes(), 1);
    assert!(empty.is_accept(0).unwrap());
}

#[test]
fn test_asg_transitions_layout() {
    let n = 3;
    let g = asg_transitions(n, true);
    assert_eq!(g.num_nodes(), n + 1);
    assert_eq!(g.num_arcs(), n + n * n);
    assert_eq!(g.start_nodes(), vec![0]);
    assert_eq!(g.accept_nodes(), vec![1, 2, 3]);
    for i in 0..n {
        let entry = g.arc(i).unwrap();
        assert_eq!((entry.src, entry.dst, entry.ilabel), (0, i + 1, i as i32));
        for j in 0..n {
            let arc = g.arc(n + i * n + j).unwrap();
            assert_eq!((arc.src, arc.dst, arc.ilabel), (j + 1, i + 1, i as i32));
        }
    }
}

#[test]
fn test_ctc_loss_uniform() {
    let (frames, labels) = (3, 4);
    let mut emissions = linear_graph(frames, labels, true);
    emissions.set_weights(&vec![0.25f32.ln(); frames * labels]).unwrap();

    let mut ctx = Context::new();
    let loss = ctc_loss(&mut ctx, &emissions, &[1, 2], 0).unwrap();
    // Five alignments of "1 2" in three frames.
    let expected = -(5.0f32 * 0.25f32.powi(3)).ln();
    assert_abs_diff_eq!(loss.item().unwrap(), expected, epsilon = 1e-5);

    ctx.backward(&loss).unwrap();
    let grad = emissions.grad().unwrap();
    for frame in grad.as_slice().unwrap().chunks(labels) {
        assert_abs_diff_eq!(frame.iter().sum::<f32>(), 0.0, epsilon = 1e-5);
        // Label 3 never appears in an alignment.
        assert_abs_diff_eq!(frame[3], 0.25, epsilon = 1e-5);
    }
}

#[test]
fn test_ctc_loss_counts_only_valid_alignments() {
    // Two frames leave "1 2" as the only alignment of the target; a path
    // that skips the first label ("2 2", "0 2") must not be counted.
    let mut emissions = linear_graph(2, 3, true);
    emissions.set_weights(&vec![(1.0f32 / 3.0).ln(); 6]).unwrap();
    let mut ctx = Context::new();
    let loss = ctc_loss(&mut ctx, &emissions, &[1, 2], 0).unwrap();
    assert_abs_diff_eq!(loss.item().unwrap(), 9f32.ln(), epsilon = 1e-5);

    ctx.backward(&loss).unwrap();
    let grad = emissions.grad().unwrap();
    assert_abs_diff_eq!(grad[1], 1.0 / 3.0 - 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(grad[5], 1.0 / 3.0 - 1.0, epsilon = 1e-5);
}

#[test]
fn test_ctc_loss_impossible_target_is_infinite() {
    let mut emissions = linear_graph(2, 3, true);
    emissions.set_weights(&vec![(1.0f32 / 3.0).ln(); 6]).unwrap();
    let mut ctx = Context::new();
    // Repeats need a blank in between: at least three frames.
    let loss = ctc_loss(&mut ctx, &emissions, &[1, 1], 0).unwrap();
    assert_eq!(loss.item().unwrap(), f32::INFINITY);
}

#[test]
fn test_ctc_loss_rejects_bad_labels() {
    let emissions = linear_graph(2, 3, true);
    let mut ctx = Context::new();
    assert!(matches!(
        ctc_loss(&mut ctx, &emissions, &[1], -1),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        ctc_loss(&mut ctx, &emissions, &[0, 1], 0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        ctc_loss(&mut ctx, &emissions, &[-2], 0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(ctx.tape().is_empty());
}

#[test]
fn test_asg_loss_rejects_out_of_range_target() {
    let emissions = linear_graph(2, 2, true);
    let transitions = asg_transitions(2, true);
    let mut ctx = Context::new();
    assert!(matches!(
        asg_loss(&mut ctx, &emissions, &transitions, &[2]),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_asg_loss_single_label() {
    // With one label every frame must emit it: the loss is 0.
    let mut emissions = linear_graph(3, 1, true);
    emissions.set_weights(&[0.5, -1.0, 2.0]).unwrap();
    let transitions = asg_transitions(1, true);
    let mut ctx = Context::new();
    let loss = asg_loss(&mut ctx, &emissions, &transitions, &[0]).unwrap();
    assert_abs_diff_eq!(loss.item().unwrap(), 0.0, epsilon = 1e-5);

    ctx.backward(&loss).unwrap();
    for g in emissions.grad().unwrap().iter() {
        assert_abs_diff_eq!(*g, 0.0, epsilon = 1e-5);
    }
    for g in transitions.grad().unwrap().iter() {
        assert_abs_diff_eq!(*g, 0.0, epsilon = 1e-5);
    }
}

#[test]
fn test_asg_decode_follows_emissions() {
    let mut emissions = linear_graph(3, 2, false);
    emissions.set_weights(&[2.0, 0.0, 0.0, 2.0, 0.0, 2.0]).unwrap();
    let transitions = asg_transitions(2, false);
    assert_eq!(asg_decode(&emissions, &transitions).unwrap(), vec![0, 1, 1]);
}

#[test]
fn test_asg_decode_transition_penalty() {
    let mut emissions = linear_graph(3, 2, false);
    emissions.set_weights(&[2.0, 0.0, 0.0, 1.0, 2.0, 0.0]).unwrap();
    let mut transitions = asg_transitions(2, false);
    // Penalize every change of label.
    let mut weights = vec![0.0; 6];
    weights[2 + 1] = -5.0; // 1 -> 0
    weights[2 + 2] = -5.0; // 0 -> 1
    transitions.set_weights(&weights).unwrap();
    assert_eq!(asg_decode(&emissions, &transitions).unwrap(), vec![0, 0, 0]);
}
