//! Compositions that introduce or preserve a caller-chosen ε symbol.
//!
//! Both operations take ε as a parameter and treat it specially; they never
//! invent one. The caller is expected to have drawn ε from an
//! [`alphabet`](crate::alphabet), so that ε-labelled edges in the result can
//! only be the structural ones added here.

use crate::nfa::{Nfa, StateIdx, Symbol};
use itertools::iproduct;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Concatenates `lhs` and `rhs` by gluing them with ε-transitions.
///
/// The result's states are the disjoint union of the operands' states, with
/// `rhs`'s states shifted up by `lhs.num_states()`. Its initial states are
/// `lhs`'s, its final states are (the shifted copies of) `rhs`'s, and every
/// pair of a final state of `lhs` and an initial state of `rhs` is joined by
/// an ε-edge. Treating ε as the empty word, the result's language is
/// exactly `L(lhs)·L(rhs)`.
///
/// Segmentation later recovers the operands by cutting the ε-edges added
/// here, so ε must not occur in either operand.
pub fn concatenate_over_epsilon(lhs: &Nfa, rhs: &Nfa, epsilon: Symbol) -> Nfa {
    let offset = lhs.num_states();
    let mut ret = Nfa::with_capacity(offset + rhs.num_states());
    for _ in 0..offset + rhs.num_states() {
        ret.add_state();
    }

    for t in lhs.transitions() {
        ret.insert_trans(t.src, t.symbol, t.tgt);
    }
    for t in rhs.transitions() {
        ret.insert_trans(t.src + offset, t.symbol, t.tgt + offset);
    }
    for (&f, &i) in iproduct!(lhs.final_states(), rhs.initial_states()) {
        ret.insert_trans(f, epsilon, i + offset);
    }

    for &i in lhs.initial_states() {
        ret.insert_initial(i);
    }
    for &f in rhs.final_states() {
        ret.insert_final(f + offset);
    }
    ret
}

/// The product of `lhs` and `rhs`, with ε acting as a stutter step.
///
/// States are pairs `(p, q)`; a pair is initial (final) when both components
/// are. Non-ε transitions synchronize; an ε-edge on either side moves that
/// side alone and is kept as an ε-edge in the result. Only pairs reachable
/// from the initial pairs are materialized, and they are numbered in
/// breadth-first discovery order, which makes the construction
/// deterministic.
pub fn intersection_over_epsilon(lhs: &Nfa, rhs: &Nfa, epsilon: Symbol) -> Nfa {
    let mut ret = Nfa::new();
    let mut pair_index: HashMap<(StateIdx, StateIdx), StateIdx> = HashMap::new();
    let mut worklist: VecDeque<(StateIdx, StateIdx)> = VecDeque::new();

    fn intern(
        ret: &mut Nfa,
        pair_index: &mut HashMap<(StateIdx, StateIdx), StateIdx>,
        worklist: &mut VecDeque<(StateIdx, StateIdx)>,
        pair: (StateIdx, StateIdx),
    ) -> StateIdx {
        if let Some(&idx) = pair_index.get(&pair) {
            return idx;
        }
        let idx = ret.add_state();
        pair_index.insert(pair, idx);
        worklist.push_back(pair);
        idx
    }

    for (&p, &q) in iproduct!(lhs.initial_states(), rhs.initial_states()) {
        let idx = intern(&mut ret, &mut pair_index, &mut worklist, (p, q));
        ret.insert_initial(idx);
    }

    while let Some((p, q)) = worklist.pop_front() {
        // The unwrap is ok: everything on the worklist has been interned.
        let idx = *pair_index.get(&(p, q)).unwrap();

        if lhs.is_final(p) && rhs.is_final(q) {
            ret.insert_final(idx);
        }

        for (&symbol, p_tgts) in lhs.post_map(p) {
            if symbol == epsilon {
                for &pp in p_tgts {
                    let tgt = intern(&mut ret, &mut pair_index, &mut worklist, (pp, q));
                    ret.insert_trans(idx, epsilon, tgt);
                }
            } else if let Some(q_tgts) = rhs.post(q, symbol) {
                for (&pp, &qq) in iproduct!(p_tgts, q_tgts) {
                    let tgt = intern(&mut ret, &mut pair_index, &mut worklist, (pp, qq));
                    ret.insert_trans(idx, symbol, tgt);
                }
            }
        }
        if let Some(q_tgts) = rhs.post(q, epsilon) {
            for &qq in q_tgts {
                let tgt = intern(&mut ret, &mut pair_index, &mut worklist, (p, qq));
                ret.insert_trans(idx, epsilon, tgt);
            }
        }
    }
    ret
}
