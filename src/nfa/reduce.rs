//! Best-effort, language-preserving size reduction.
//!
//! The reduction is a forward-bisimulation quotient: starting from the
//! partition {final, non-final}, blocks are split until every pair of states
//! in a block has the same multiset of `(symbol, successor block)`
//! signatures, and then each block collapses to one state. Bisimilar states
//! accept the same residual language, so the quotient's language equals the
//! input's. This is not minimization (simulation-inequivalent states with
//! equal languages stay apart), but it never grows the automaton and running
//! it twice changes nothing.

use crate::nfa::{Nfa, Symbol};
use std::collections::HashMap;
use tracing::trace;

impl Nfa {
    /// Returns a language-equivalent automaton with at most as many states,
    /// obtained by merging bisimilar states.
    pub fn reduce(&self) -> Nfa {
        let n = self.num_states();
        if n == 0 {
            return self.clone();
        }

        // block[s] is the id of s's block; ids are normalized each round to
        // first-occurrence order, so the loop (and the output) is
        // deterministic.
        let mut block: Vec<usize> = vec![0; n];
        let mut num_blocks = 1;

        loop {
            let mut ids: HashMap<(usize, bool, Vec<(Symbol, usize)>), usize> = HashMap::new();
            let mut new_block = vec![0; n];
            for s in 0..n {
                let mut sig: Vec<(Symbol, usize)> = Vec::new();
                for (&symbol, tgts) in self.post_map(s) {
                    for &t in tgts {
                        sig.push((symbol, block[t]));
                    }
                }
                sig.sort_unstable();
                sig.dedup();

                let key = (block[s], self.is_final(s), sig);
                let next_id = ids.len();
                new_block[s] = *ids.entry(key).or_insert(next_id);
            }

            let new_num_blocks = ids.len();
            block = new_block;
            if new_num_blocks == num_blocks {
                break;
            }
            num_blocks = new_num_blocks;
        }

        let mut ret = Nfa::with_capacity(num_blocks);
        for _ in 0..num_blocks {
            ret.add_state();
        }
        for s in 0..n {
            for (&symbol, tgts) in self.post_map(s) {
                for &t in tgts {
                    ret.insert_trans(block[s], symbol, block[t]);
                }
            }
        }
        for &i in self.initial_states() {
            ret.insert_initial(block[i]);
        }
        for &f in self.final_states() {
            ret.insert_final(block[f]);
        }

        trace!("reduced {} states to {}", n, num_blocks);
        ret
    }
}
