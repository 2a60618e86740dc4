//! Slicing an ε-laden automaton into ε-free segments.
//!
//! The input here is an automaton whose only ε-edges were introduced by
//! [`concatenate_over_epsilon`](crate::concatenate_over_epsilon) (possibly
//! composed with a product that preserved them). Such ε-edges always point
//! "forward": they never form cycles, and every path from an initial state
//! to a given state crosses the same number of them. That number is the
//! state's *depth*, and it is what lets us cut the automaton into an
//! ordered sequence of ε-free segments, with the ε-edges of each depth
//! recorded between consecutive segments.

use crate::graph::{EpsilonGraph, Graph};
use crate::nfa::{Nfa, StateIdx, Symbol, Trans};
use std::collections::VecDeque;

/// The decomposition of an automaton along its ε-transitions.
pub struct Segmentation {
    epsilon: Symbol,
    epsilon_depths: Vec<Vec<Trans>>,
    segments: Vec<Nfa>,
}

impl Segmentation {
    /// Segments `aut` along its transitions labelled `epsilon`.
    ///
    /// The ε-edges of `aut` must be acyclic; automata built by
    /// `concatenate_over_epsilon` always satisfy this.
    pub fn new(aut: &Nfa, epsilon: Symbol) -> Segmentation {
        debug_assert!(
            !EpsilonGraph::new(aut, epsilon).has_cycles(),
            "ε-transitions must be acyclic"
        );

        let epsilon_depths = Segmentation::compute_epsilon_depths(aut, epsilon);
        let segments = Segmentation::split_into_segments(aut, epsilon, &epsilon_depths);
        Segmentation {
            epsilon,
            epsilon_depths,
            segments,
        }
    }

    /// The ε-transitions, grouped by depth in ascending order. Within one
    /// depth, transitions appear in breadth-first discovery order; the
    /// noodle enumeration depends on this order being reproducible.
    pub fn epsilon_depths(&self) -> &[Vec<Trans>] {
        &self.epsilon_depths
    }

    /// The segments, in order. There is always exactly one more segment
    /// than there are distinct ε-depths.
    ///
    /// Segments are *untrimmed*: each has the full state space of the input
    /// (with all ε-edges deleted), so that callers can re-pick initial and
    /// final subsets before trimming. The first segment keeps the input's
    /// initial states and the last keeps its final states; interior
    /// boundaries are the ε-edge targets (initial side) and sources (final
    /// side) of the adjacent depth.
    pub fn segments(&self) -> &[Nfa] {
        &self.segments
    }

    pub fn epsilon(&self) -> Symbol {
        self.epsilon
    }

    // A breadth-first scan from the initial states. Crossing an ε-edge
    // increases the depth by one; every state is visited at most once, and
    // each ε-edge is recorded at the depth of its source when the source is
    // processed.
    fn compute_epsilon_depths(aut: &Nfa, epsilon: Symbol) -> Vec<Vec<Trans>> {
        let mut depth: Vec<Option<usize>> = vec![None; aut.num_states()];
        let mut queue: VecDeque<StateIdx> = VecDeque::new();
        for &i in aut.initial_states() {
            if depth[i].is_none() {
                depth[i] = Some(0);
                queue.push_back(i);
            }
        }

        let mut depths: Vec<Vec<Trans>> = Vec::new();
        while let Some(s) = queue.pop_front() {
            // The unwrap is ok: states are queued only after their depth is set.
            let d = depth[s].unwrap();
            for (&symbol, tgts) in aut.post_map(s) {
                for &t in tgts {
                    if symbol == epsilon {
                        while depths.len() <= d {
                            depths.push(Vec::new());
                        }
                        depths[d].push(Trans {
                            src: s,
                            symbol,
                            tgt: t,
                        });
                        if depth[t].is_none() {
                            depth[t] = Some(d + 1);
                            queue.push_back(t);
                        }
                    } else if depth[t].is_none() {
                        depth[t] = Some(d);
                        queue.push_back(t);
                    }
                }
            }
        }
        depths
    }

    fn split_into_segments(aut: &Nfa, epsilon: Symbol, depths: &[Vec<Trans>]) -> Vec<Nfa> {
        let k = depths.len();
        let mut segments = Vec::with_capacity(k + 1);
        for i in 0..=k {
            let mut segment = aut.without_symbol(epsilon);
            if i > 0 {
                segment.set_initial_states(depths[i - 1].iter().map(|t| t.tgt).collect());
            }
            if i < k {
                segment.set_final_states(depths[i].iter().map(|t| t.src).collect());
            }
            segments.push(segment);
        }
        segments
    }
}
