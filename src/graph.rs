// Copyright 2016 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::nfa::{Nfa, StateIdx, Symbol};
use bit_set::BitSet;

/// A view of something as a directed graph over a dense state space.
///
/// Both the trimming of an [`Nfa`] and the segmentation of an ε-laden one
/// boil down to reachability questions, so they share this trait. The
/// ε-restricted view ([`EpsilonGraph`]) exists mainly so that segmentation
/// can assert that ε-edges are acyclic.
pub trait Graph {
    fn num_states(&self) -> usize;

    fn neighbors<'a>(&'a self, i: StateIdx) -> Box<dyn Iterator<Item = StateIdx> + 'a>;

    /// Returns the set of all states that can be reached from some state in
    /// `init`, including the states of `init` themselves.
    fn reachable_from<I>(&self, init: I) -> BitSet
    where
        I: Iterator<Item = StateIdx>,
    {
        let mut reached = BitSet::with_capacity(self.num_states());
        let mut active: Vec<StateIdx> = init.collect();
        for &s in &active {
            reached.insert(s);
        }

        while let Some(s) = active.pop() {
            for t in self.neighbors(s) {
                if reached.insert(t) {
                    active.push(t);
                }
            }
        }
        reached
    }

    /// Checks whether this graph has any cycles.
    fn has_cycles(&self) -> bool {
        let n = self.num_states();
        let mut visiting = vec![false; n];
        let mut done = vec![false; n];

        for root in 0..n {
            if done[root] {
                continue;
            }
            visiting[root] = true;
            let mut stack: Vec<(StateIdx, Box<dyn Iterator<Item = StateIdx> + '_>)> =
                vec![(root, self.neighbors(root))];

            loop {
                let next = match stack.last_mut() {
                    Some(&mut (_, ref mut iter)) => iter.next(),
                    None => break,
                };
                match next {
                    Some(child) => {
                        if visiting[child] {
                            return true;
                        }
                        if !done[child] {
                            visiting[child] = true;
                            stack.push((child, self.neighbors(child)));
                        }
                    }
                    None => {
                        // The unwrap is ok because `next` came from the same
                        // (non-empty) stack.
                        let (cur, _) = stack.pop().unwrap();
                        visiting[cur] = false;
                        done[cur] = true;
                    }
                }
            }
        }
        false
    }
}

impl Graph for Nfa {
    fn num_states(&self) -> usize {
        Nfa::num_states(self)
    }

    fn neighbors<'a>(&'a self, i: StateIdx) -> Box<dyn Iterator<Item = StateIdx> + 'a> {
        Box::new(self.post_map(i).values().flatten().copied())
    }
}

/// The subgraph of an [`Nfa`] containing only the transitions labelled with
/// one particular symbol.
pub struct EpsilonGraph<'a> {
    aut: &'a Nfa,
    epsilon: Symbol,
}

impl<'a> EpsilonGraph<'a> {
    pub fn new(aut: &'a Nfa, epsilon: Symbol) -> EpsilonGraph<'a> {
        EpsilonGraph { aut, epsilon }
    }
}

impl<'a> Graph for EpsilonGraph<'a> {
    fn num_states(&self) -> usize {
        self.aut.num_states()
    }

    fn neighbors<'b>(&'b self, i: StateIdx) -> Box<dyn Iterator<Item = StateIdx> + 'b> {
        match self.aut.post(i, self.epsilon) {
            Some(tgts) => Box::new(tgts.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::{EpsilonGraph, Graph};
    use crate::nfa::tests::trans_nfa;

    #[test]
    fn cycles() {
        macro_rules! cyc {
            ($trans:expr, $res:expr) => {{
                let nfa = trans_nfa(4, $trans);
                assert_eq!(nfa.has_cycles(), $res);
            }};
        }

        cyc!(&[(0, 0, 1), (1, 0, 2), (2, 0, 3)], false);
        cyc!(&[(0, 0, 1), (1, 0, 2), (2, 0, 0)], true);
        cyc!(&[(0, 0, 0)], true);
        cyc!(&[(0, 0, 1), (0, 1, 2), (1, 0, 3), (2, 0, 3)], false);
        cyc!(&[(0, 0, 1), (1, 1, 1)], true);
    }

    #[test]
    fn epsilon_subgraph_cycles() {
        // A cycle on symbol 1 is invisible to the ε-restricted view for ε = 0.
        let nfa = trans_nfa(3, &[(0, 0, 1), (1, 1, 2), (2, 1, 1)]);
        assert!(nfa.has_cycles());
        assert!(!EpsilonGraph::new(&nfa, 0).has_cycles());
        assert!(EpsilonGraph::new(&nfa, 1).has_cycles());
    }

    #[test]
    fn reachability() {
        let nfa = trans_nfa(5, &[(0, 0, 1), (1, 0, 2), (3, 0, 4)]);
        let reached = nfa.reachable_from([0].iter().copied());
        assert!(reached.contains(0) && reached.contains(1) && reached.contains(2));
        assert!(!reached.contains(3) && !reached.contains(4));
    }
}
