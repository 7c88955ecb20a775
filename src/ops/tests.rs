//! Tests for composition, scoring and combinators

use super::*;
use crate::autograd::Context;
use crate::criterion::ctc_graph;
use crate::error::Error;
use crate::graph::{linear_graph, scalar_graph, Graph, EPSILON};
use approx::assert_abs_diff_eq;
use proptest::prelude::*;

fn acceptor(arcs: &[(usize, usize, i32, f32)], nodes: usize, accept: &[usize]) -> Graph {
    let mut g = Graph::new(true);
    for n in 0..nodes {
        g.add_node(n == 0, accept.contains(&n));
    }
    for &(src, dst, label, weight) in arcs {
        g.add_weighted_arc(src, dst, label, label, weight).unwrap();
    }
    g
}

fn score_of(graph: &Graph) -> f32 {
    forward_score(graph).unwrap().item().unwrap()
}

mod compose_tests {
    use super::*;

    #[test]
    fn test_acceptor_intersection() {
        // Accepts "0 1" and "0 2".
        let first = acceptor(&[(0, 1, 0, 1.0), (1, 2, 1, 2.0), (1, 2, 2, 3.0)], 3, &[2]);
        // Accepts "0 1" only.
        let second = acceptor(&[(0, 1, 0, 0.5), (1, 2, 1, 0.25)], 3, &[2]);
        let out = compose(&first, &second).unwrap();

        assert_eq!(out.num_nodes(), 3);
        assert_eq!(out.num_arcs(), 2);
        assert_eq!(out.labels_to_list(true), vec![0, 1]);
        assert_eq!(out.weights_to_list(), vec![1.5, 2.25]);
        assert!(!out.calc_grad());
        assert_abs_diff_eq!(score_of(&out), 3.75);
    }

    #[test]
    fn test_transducer_labels_chain() {
        let mut first = Graph::new(false);
        first.add_node(true, false);
        first.add_node(false, true);
        first.add_weighted_arc(0, 1, 3, 7, 0.0).unwrap();

        let mut second = Graph::new(false);
        second.add_node(true, false);
        second.add_node(false, true);
        second.add_weighted_arc(0, 1, 7, 9, 0.0).unwrap();
        second.add_weighted_arc(0, 1, 3, 4, 0.0).unwrap();

        let out = compose(&first, &second).unwrap();
        assert_eq!(out.num_arcs(), 1);
        assert_eq!(out.arc(0).unwrap().ilabel, 3);
        assert_eq!(out.arc(0).unwrap().olabel, 9);
    }

    #[test]
    fn test_epsilon_filter_single_alignment() {
        let mut first = Graph::new(false);
        first.add_node(true, false);
        first.add_node(false, true);
        first.add_weighted_arc(0, 1, 0, EPSILON, 0.5).unwrap();

        let mut second = Graph::new(false);
        second.add_node(true, false);
        second.add_node(false, true);
        second.add_weighted_arc(0, 1, EPSILON, 1, 0.25).unwrap();

        let out = compose(&first, &second).unwrap();
        // Without the filter both interleavings would survive.
        assert_eq!(out.num_nodes(), 3);
        assert_eq!(out.num_arcs(), 2);
        assert_eq!(out.labels_to_list(true), vec![0, EPSILON]);
        assert_eq!(out.labels_to_list(false), vec![EPSILON, 1]);
        assert_abs_diff_eq!(score_of(&out), 0.75);
    }

    #[test]
    fn test_epsilon_arcs_do_not_match_each_other() {
        let mut first = Graph::new(false);
        first.add_node(true, false);
        first.add_node(false, true);
        first.add_weighted_arc(0, 1, EPSILON, EPSILON, 0.0).unwrap();
        let second = scalar_graph(1.0, false);

        let out = compose(&first, &second).unwrap();
        // first alone then second alone; never both at once
        assert_eq!(out.num_arcs(), 2);
        assert_abs_diff_eq!(score_of(&out), 1.0);
    }

    #[test]
    fn test_dead_states_are_pruned() {
        let first = acceptor(&[(0, 1, 0, 0.0), (0, 2, 1, 0.0), (1, 3, 2, 0.0)], 4, &[3]);
        let second = acceptor(&[(0, 1, 0, 0.0), (0, 1, 1, 0.0), (1, 2, 2, 0.0)], 3, &[2]);
        let out = compose(&first, &second).unwrap();
        // The label-1 branch reaches a state with no way to accept.
        assert_eq!(out.num_nodes(), 3);
        assert_eq!(out.num_arcs(), 2);
        assert_eq!(out.labels_to_list(true), vec![0, 2]);
    }

    #[test]
    fn test_no_common_path_gives_empty_graph() {
        let first = acceptor(&[(0, 1, 0, 0.0)], 2, &[1]);
        let second = acceptor(&[(0, 1, 1, 0.0)], 2, &[1]);
        let out = compose(&first, &second).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.num_arcs(), 0);
        assert_eq!(score_of(&out), f32::NEG_INFINITY);

        let mut ctx = Context::new();
        let aligned = ctx.compose(&first, &second).unwrap();
        let score = ctx.forward_score(&aligned).unwrap();
        ctx.backward(&score).unwrap();
        assert_eq!(first.grad().unwrap().to_vec(), vec![0.0]);
        assert_eq!(second.grad().unwrap().to_vec(), vec![0.0]);
    }

    #[test]
    fn test_missing_start_is_structural_error() {
        let mut first = Graph::new(false);
        first.add_node(false, true);
        let second = acceptor(&[], 1, &[0]);
        assert!(matches!(
            compose(&first, &second),
            Err(Error::Structural(_))
        ));
        assert!(matches!(
            compose(&second, &first),
            Err(Error::Structural(_))
        ));
    }

    #[test]
    fn test_sorted_and_unsorted_agree() {
        let criterion = ctc_graph(&[1, 2, 2], 0);
        let mut emissions = linear_graph(6, 3, false);
        let weights: Vec<f32> = (0..18).map(|k| ((k * 7) % 5) as f32 * -0.3).collect();
        emissions.set_weights(&weights).unwrap();

        assert!(criterion.olabel_sorted());
        assert!(emissions.ilabel_sorted());
        let sorted = compose(&criterion, &emissions).unwrap();

        let unsorted_criterion = clone_graph(&criterion);
        let unsorted_emissions = clone_graph(&emissions);
        assert!(!unsorted_criterion.olabel_sorted());
        assert!(!unsorted_emissions.ilabel_sorted());
        let unsorted = compose(&unsorted_criterion, &unsorted_emissions).unwrap();

        assert_eq!(sorted.num_nodes(), unsorted.num_nodes());
        assert_eq!(sorted.num_arcs(), unsorted.num_arcs());
        assert_abs_diff_eq!(score_of(&sorted), score_of(&unsorted), epsilon = 1e-5);
    }

    #[test]
    fn test_compose_gradient_routes_to_sources() {
        let first = acceptor(&[(0, 1, 0, 0.0), (0, 1, 1, 0.0)], 2, &[1]);
        let second = acceptor(&[(0, 1, 1, 0.0), (0, 1, 0, 0.0), (0, 1, 2, 0.0)], 2, &[1]);
        let mut ctx = Context::new();
        let out = ctx.compose(&first, &second).unwrap();
        let score = ctx.forward_score(&out).unwrap();
        ctx.backward(&score).unwrap();

        assert_eq!(first.grad().unwrap().to_vec(), vec![0.5, 0.5]);
        assert_eq!(second.grad().unwrap().to_vec(), vec![0.5, 0.5, 0.0]);
    }
}

mod score_tests {
    use super::*;

    #[test]
    fn test_forward_score_log_sum_exp() {
        let g = acceptor(&[(0, 1, 0, 1.0), (0, 1, 1, 2.0), (1, 2, 0, 3.0)], 3, &[2]);
        let expected = 3.0 + (1f32.exp() + 2f32.exp()).ln();
        assert_abs_diff_eq!(score_of(&g), expected, epsilon = 1e-5);
    }

    #[test]
    fn test_forward_score_large_weights_stable() {
        let g = acceptor(&[(0, 1, 0, 1000.0), (0, 1, 1, 1000.0)], 2, &[1]);
        assert_abs_diff_eq!(score_of(&g), 1000.0 + 2f32.ln(), epsilon = 1e-3);
    }

    #[test]
    fn test_multiple_accept_nodes_combined() {
        // Node 0 is start and accept, so the empty path counts too.
        let g = acceptor(&[(0, 1, 0, 0.0)], 2, &[0, 1]);
        assert_abs_diff_eq!(score_of(&g), 2f32.ln(), epsilon = 1e-6);
        assert_abs_diff_eq!(viterbi_score(&g).unwrap().item().unwrap(), 0.0);
    }

    #[test]
    fn test_unreachable_accept_scores_neg_infinity() {
        let g = acceptor(&[(1, 2, 0, 0.0)], 3, &[2]);
        assert_eq!(score_of(&g), f32::NEG_INFINITY);
        let path = best_path(&g).unwrap();
        assert!(path.arcs.is_empty());
        assert_eq!(path.score, f32::NEG_INFINITY);
        assert!(viterbi_path(&g).unwrap().is_empty());
    }

    #[test]
    fn test_neg_infinity_arcs_have_zero_gradient() {
        let g = acceptor(
            &[(0, 1, 0, 0.0), (0, 1, 1, f32::NEG_INFINITY), (1, 2, 0, 0.0)],
            3,
            &[2],
        );
        let mut ctx = Context::new();
        let score = ctx.forward_score(&g).unwrap();
        assert_abs_diff_eq!(score.item().unwrap(), 0.0);
        ctx.backward(&score).unwrap();
        assert_eq!(g.grad().unwrap().to_vec(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_cycle_is_structural_error() {
        let g = acceptor(&[(0, 1, 0, 0.0), (1, 0, 1, 0.0)], 2, &[1]);
        assert!(matches!(forward_score(&g), Err(Error::Structural(_))));
        assert!(matches!(viterbi_score(&g), Err(Error::Structural(_))));
    }

    #[test]
    fn test_self_loop_is_structural_error() {
        let g = acceptor(&[(0, 0, 0, 0.0)], 1, &[0]);
        assert!(matches!(forward_score(&g), Err(Error::Structural(_))));
    }

    #[test]
    fn test_empty_graph_scores_neg_infinity() {
        assert_eq!(score_of(&Graph::new(false)), f32::NEG_INFINITY);
    }

    #[test]
    fn test_viterbi_best_path() {
        let g = acceptor(
            &[(0, 1, 0, 1.0), (0, 1, 1, 2.0), (1, 2, 0, -1.0), (1, 2, 2, 0.5)],
            3,
            &[2],
        );
        let path = best_path(&g).unwrap();
        assert_eq!(path.arcs, vec![1, 3]);
        assert_abs_diff_eq!(path.score, 2.5);

        let linear = viterbi_path(&g).unwrap();
        assert_eq!(linear.num_nodes(), 3);
        assert_eq!(linear.labels_to_list(true), vec![1, 2]);
        assert_eq!(linear.weights_to_list(), vec![2.0, 0.5]);
        assert_eq!(linear.start_nodes(), vec![0]);
        assert_eq!(linear.accept_nodes(), vec![2]);
    }

    #[test]
    fn test_viterbi_ties_keep_first_arc() {
        let g = acceptor(&[(0, 1, 3, 1.0), (0, 1, 4, 1.0), (0, 1, 5, 1.0)], 2, &[1]);
        assert_eq!(best_path(&g).unwrap().arcs, vec![0]);
    }

    #[test]
    fn test_viterbi_gradient_is_path_indicator() {
        let g = acceptor(
            &[(0, 1, 0, 1.0), (0, 1, 1, 2.0), (1, 2, 0, -1.0), (1, 2, 2, 0.5)],
            3,
            &[2],
        );
        let mut ctx = Context::new();
        let score = ctx.viterbi_score(&g).unwrap();
        let scaled = ctx.add(&score, &score).unwrap();
        ctx.backward(&scaled).unwrap();
        assert_eq!(g.grad().unwrap().to_vec(), vec![0.0, 2.0, 0.0, 2.0]);
    }

    #[test]
    fn test_viterbi_path_gradient() {
        let g = acceptor(&[(0, 1, 0, 1.0), (0, 1, 1, 2.0), (1, 2, 0, 0.0)], 3, &[2]);
        let mut ctx = Context::new();
        let path = ctx.viterbi_path(&g).unwrap();
        let score = ctx.forward_score(&path).unwrap();
        ctx.backward(&score).unwrap();
        assert_eq!(g.grad().unwrap().to_vec(), vec![0.0, 1.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_forward_score_ignores_arc_insertion_order(
            weights in proptest::collection::vec(-4.0f32..4.0, 6),
            rotate in 0usize..6,
        ) {
            let arcs: Vec<(usize, usize, i32, f32)> = vec![
                (0, 1, 0, weights[0]),
                (0, 1, 1, weights[1]),
                (0, 2, 2, weights[2]),
                (1, 2, 0, weights[3]),
                (1, 3, 1, weights[4]),
                (2, 3, 2, weights[5]),
            ];
            let mut shuffled = arcs.clone();
            shuffled.rotate_left(rotate);
            let a = score_of(&acceptor(&arcs, 4, &[3]));
            let b = score_of(&acceptor(&shuffled, 4, &[3]));
            prop_assert!((a - b).abs() < 1e-4);
        }

        #[test]
        fn prop_viterbi_never_exceeds_forward(
            weights in proptest::collection::vec(-4.0f32..4.0, 6),
        ) {
            let mut g = linear_graph(2, 3, false);
            g.set_weights(&weights).unwrap();
            let forward = score_of(&g);
            let viterbi = viterbi_score(&g).unwrap().item().unwrap();
            prop_assert!(viterbi <= forward + 1e-5);
        }
    }
}

mod combinator_tests {
    use super::*;

    #[test]
    fn test_scalar_arithmetic() {
        let a = scalar_graph(2.0, false);
        let b = scalar_graph(0.5, false);
        assert_abs_diff_eq!(add(&a, &b).unwrap().item().unwrap(), 2.5);
        assert_abs_diff_eq!(subtract(&a, &b).unwrap().item().unwrap(), 1.5);
        assert_abs_diff_eq!(negate(&a).unwrap().item().unwrap(), -2.0);
    }

    #[test]
    fn test_scalar_ops_reject_non_scalars() {
        let a = scalar_graph(2.0, false);
        let g = linear_graph(2, 2, false);
        assert!(matches!(add(&a, &g), Err(Error::Shape(_))));
        assert!(matches!(subtract(&g, &a), Err(Error::Shape(_))));
        assert!(matches!(negate(&g), Err(Error::Shape(_))));
    }

    #[test]
    fn test_clone_is_independent() {
        let g = linear_graph(1, 2, true);
        let mut copy = clone_graph(&g);
        copy.set_weights(&[1.0, 1.0]).unwrap();
        assert_eq!(g.weights_to_list(), vec![0.0, 0.0]);
        assert!(!copy.same_as(&g));
        assert!(!copy.calc_grad());
    }

    #[test]
    fn test_union_scores() {
        let mut a = linear_graph(1, 1, false);
        a.set_weights(&[1.0]).unwrap();
        let mut b = linear_graph(2, 1, false);
        b.set_weights(&[0.5, 0.5]).unwrap();
        let u = union(&[a, b]);
        assert_eq!(u.num_nodes(), 5);
        assert_eq!(u.start_nodes(), vec![0, 2]);
        assert_eq!(u.accept_nodes(), vec![1, 4]);
        assert_abs_diff_eq!(score_of(&u), (2.0f32 * 1f32.exp()).ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_concat_scores_add() {
        let mut a = linear_graph(1, 2, false);
        a.set_weights(&[0.0, 0.0]).unwrap();
        let mut b = linear_graph(1, 3, false);
        b.set_weights(&[0.0, 0.0, 0.0]).unwrap();
        let c = concat(&[a, b]);
        assert_eq!(c.start_nodes(), vec![0]);
        assert_eq!(c.accept_nodes(), vec![3]);
        assert_abs_diff_eq!(score_of(&c), 6f32.ln(), epsilon = 1e-6);
    }

    #[test]
    fn test_concat_of_nothing_accepts_empty_path() {
        let c = concat(&[]);
        assert_eq!(c.num_nodes(), 1);
        assert!(c.is_start(0).unwrap());
        assert!(c.is_accept(0).unwrap());
        assert_abs_diff_eq!(score_of(&c), 0.0);
    }

    #[test]
    fn test_closure_accepts_repetitions() {
        let g = acceptor(&[(0, 1, 5, 0.0)], 2, &[1]);
        let star = closure(&g);
        let three = linear_graph(3, 6, false);
        let aligned = compose(&star, &three).unwrap();
        // Only "5 5 5" survives.
        assert_abs_diff_eq!(score_of(&aligned), 0.0);
        let path = best_path(&aligned).unwrap();
        let labels: Vec<i32> = path
            .arcs
            .iter()
            .map(|&a| aligned.ilabel(a).unwrap())
            .filter(|&l| l != EPSILON)
            .collect();
        assert_eq!(labels, vec![5, 5, 5]);
    }

    #[test]
    fn test_projections() {
        let mut g = Graph::new(false);
        g.add_node(true, false);
        g.add_node(false, true);
        g.add_weighted_arc(0, 1, 1, 2, 0.3).unwrap();
        let input = project_input(&g);
        let output = project_output(&g);
        assert!(input.is_acceptor());
        assert!(output.is_acceptor());
        assert_eq!(input.labels_to_list(true), vec![1]);
        assert_eq!(output.labels_to_list(true), vec![2]);
        assert_eq!(output.weights_to_list(), vec![0.3]);
    }
}
