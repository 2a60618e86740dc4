// Copyright 2015-2016 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Turning a regex [`Program`] into an [`Nfa`].
//!
//! The easy direction keeps ε: every program counter becomes one state,
//! `Nop`/`Capture` instructions and clear `last` flags become ε-edges, and
//! consuming instructions become one transition per symbol in their range.
//!
//! The interesting direction avoids ε entirely. For that we compute, per
//! program counter, its *ε-closure mapping*: the set of terminal states
//! (consuming or accepting, i.e. everything except `Nop`/`Capture`)
//! reachable through ε-edges alone. A consuming instruction then draws its
//! transitions from every state in its own mapping to every state in its
//! target's mapping. Two wrinkles make this more than a textbook ε-removal:
//!
//! - Transitions are only materialized out of states that have already
//!   received an incoming edge; everything else is recorded in a side table
//!   of outgoing edges. This keeps states that exist only as ε-stepping
//!   stones out of the result.
//! - A consuming instruction whose `last` flag is clear has an ε-edge to an
//!   *alternative*, not to a continuation. Those deferred chains are queued
//!   as (source, destination) pairs and resolved by a back-propagation pass
//!   that walks the queue in reverse, copying outgoing edges (and finality)
//!   along each chain. Walking in reverse resolves chains of ε-edges
//!   innermost-first, so each copy already sees the edges its source
//!   accumulated.
//!
//! Afterwards the used states are renumbered to a dense `[0, n')` in first
//! visit order.
//!
//! Zero-width assertions are preserved as transitions over the reserved
//! symbols [`BEGIN_LINE`] & co.; nothing downstream gives them match-time
//! semantics.

use crate::nfa::{Nfa, StateIdx, Symbol};
use crate::program::{Inst, Op, Program};
use crate::program::{
    EMPTY_BEGIN_LINE, EMPTY_BEGIN_TEXT, EMPTY_END_LINE, EMPTY_END_TEXT, EMPTY_NON_WORD_BOUNDARY,
    EMPTY_WORD_BOUNDARY,
};
use crate::Result;

/// Reserved symbol emitted for `^`.
pub const BEGIN_LINE: Symbol = 300;
/// Reserved symbol emitted for `$`; doubles as `'\n'`.
pub const END_LINE: Symbol = 10;
/// Reserved symbol emitted for `\A`.
pub const BEGIN_TEXT: Symbol = 301;
/// Reserved symbol emitted for `\z`.
pub const END_TEXT: Symbol = 302;
/// Reserved symbol emitted for `\b`.
pub const WORD_BOUNDARY: Symbol = 303;
/// Reserved symbol emitted for `\B`.
pub const NON_WORD_BOUNDARY: Symbol = 304;

// Per-program-counter caches used throughout the conversion.
//
// state_mapping[pc] holds the states that stand in for pc: just [pc] for
// terminal states, the ε-closure's terminal states for Nop/Capture ones.
// has_incoming_edge starts true only for states that genuinely receive a
// non-ε edge (plus the start state) and grows as edges are materialized.
struct StateCache {
    state_mapping: Vec<Vec<StateIdx>>,
    is_final_state: Vec<bool>,
    is_state_nop_or_cap: Vec<bool>,
    is_last: Vec<bool>,
    has_incoming_edge: Vec<bool>,
}

impl Nfa {
    /// Compiles `pattern` to an NFA accepting exactly the pattern's
    /// full-match language (modulo unhandled zero-width assertions, which
    /// surface as reserved symbols).
    ///
    /// With `use_epsilon`, the result contains ε-transitions labelled
    /// `epsilon_value`; otherwise ε-edges are eliminated during the
    /// construction and `epsilon_value` is unused.
    pub fn from_regex(pattern: &str, use_epsilon: bool, epsilon_value: Symbol) -> Result<Nfa> {
        let program = Program::from_pattern(pattern)?;
        Ok(program_to_nfa(&program, use_epsilon, epsilon_value))
    }
}

pub fn program_to_nfa(program: &Program, use_epsilon: bool, epsilon_value: Symbol) -> Nfa {
    let size = program.len();
    if size == 0 {
        return Nfa::new();
    }
    let mut cache = build_state_cache(program, use_epsilon);

    let mut explicit = Nfa::with_capacity(size);
    for _ in 0..size {
        explicit.add_state();
    }

    let start_repr = cache.state_mapping[program.start][0];
    explicit.insert_initial(start_repr);
    cache.has_incoming_edge[start_repr] = true;

    // Deferred ε-chains, as (source, destination) pairs: destination must
    // end up simulating source.
    let mut copy_edges: Vec<(StateIdx, StateIdx)> = Vec::new();
    // Every edge a state would emit, whether or not it was materialized.
    // Only consulted by the back-propagation pass.
    let mut outgoing: Vec<Vec<(Symbol, StateIdx)>> = vec![Vec::new(); size];

    // A start state that is itself an ε-chain maps to several alternatives;
    // the first one becomes the initial state and must take over the edges
    // of the others.
    if !use_epsilon && cache.is_state_nop_or_cap[program.start] {
        for i in 1..cache.state_mapping[program.start].len() {
            let alternative = cache.state_mapping[program.start][i];
            copy_edges.push((alternative, start_repr));
        }
    }

    for pc in program.start..size {
        let inst = program.insts[pc];
        // Any kind of state can be final, via an ε-edge to a Match.
        if cache.is_final_state[pc] {
            mark_final(&cache, &mut explicit, pc);
        }
        match inst.op {
            Op::Match => {}
            Op::Nop | Op::Capture => {
                if use_epsilon {
                    add_transitions(
                        &mut cache,
                        &mut explicit,
                        &mut outgoing,
                        pc,
                        &inst,
                        &[epsilon_value],
                        use_epsilon,
                        epsilon_value,
                    );
                }
            }
            Op::EmptyWidth { mask } => {
                let symbols = empty_width_symbols(mask);
                add_transitions(
                    &mut cache,
                    &mut explicit,
                    &mut outgoing,
                    pc,
                    &inst,
                    &symbols,
                    use_epsilon,
                    epsilon_value,
                );
                if !use_epsilon && !cache.is_last[pc] {
                    for &st in &cache.state_mapping[pc + 1] {
                        copy_edges.push((st, pc));
                    }
                }
            }
            Op::ByteRange { lo, hi } => {
                let symbols: Vec<Symbol> = (lo..=hi).collect();
                add_transitions(
                    &mut cache,
                    &mut explicit,
                    &mut outgoing,
                    pc,
                    &inst,
                    &symbols,
                    use_epsilon,
                    epsilon_value,
                );
                if !use_epsilon && !cache.is_last[pc] {
                    // The implicit ε-edge goes to an alternative; defer it.
                    for &st in &cache.state_mapping[pc + 1] {
                        copy_edges.push((st, pc));
                    }
                }
            }
        }
    }

    if !use_epsilon {
        // Reverse order resolves chains like 2 -ε-> 3 -ε-> 4 -a-> 5: state 4
        // is copied into 3 before 3 is copied into 2.
        for i in (0..copy_edges.len()).rev() {
            let (from, to) = copy_edges[i];
            if program.insts[from].op == Op::Match {
                // Match states have no outgoing edges; the destination just
                // becomes final.
                mark_final(&cache, &mut explicit, to);
                cache.is_final_state[to] = true;
                continue;
            }
            if cache.is_final_state[from] {
                mark_final(&cache, &mut explicit, to);
                cache.is_final_state[to] = true;
            }
            let edges = outgoing[from].clone();
            for (symbol, tgt) in edges {
                if cache.has_incoming_edge[to] {
                    explicit.insert_trans(to, symbol, tgt);
                }
                // Keep the record even when unmaterialized: a later copy
                // further up the chain may land in a state that does have an
                // incoming edge.
                outgoing[to].push((symbol, tgt));
            }
        }
    }

    renumber_states(&explicit, size)
}

#[allow(clippy::too_many_arguments)]
fn add_transitions(
    cache: &mut StateCache,
    nfa: &mut Nfa,
    outgoing: &mut [Vec<(Symbol, StateIdx)>],
    pc: usize,
    inst: &Inst,
    symbols: &[Symbol],
    use_epsilon: bool,
    epsilon_value: Symbol,
) {
    for &src in &cache.state_mapping[pc] {
        for &tgt in &cache.state_mapping[inst.out] {
            for &symbol in symbols {
                if !use_epsilon {
                    outgoing[src].push((symbol, tgt));
                }
                if cache.has_incoming_edge[src] {
                    cache.has_incoming_edge[tgt] = true;
                    nfa.insert_trans(src, symbol, tgt);
                }
            }
        }
    }
    if use_epsilon && !inst.last {
        nfa.insert_trans(pc, epsilon_value, pc + 1);
    }
}

// Makes every state standing in for `pc` final, skipping states that are
// not part of the automaton (no incoming edge).
fn mark_final(cache: &StateCache, nfa: &mut Nfa, pc: usize) {
    for &st in &cache.state_mapping[pc] {
        if cache.has_incoming_edge[st] {
            nfa.insert_final(st);
        }
    }
}

fn empty_width_symbols(mask: u8) -> Vec<Symbol> {
    let mut symbols = Vec::new();
    if mask & EMPTY_BEGIN_LINE != 0 {
        symbols.push(BEGIN_LINE);
    }
    if mask & EMPTY_END_LINE != 0 {
        symbols.push(END_LINE);
    }
    if mask & EMPTY_BEGIN_TEXT != 0 {
        symbols.push(BEGIN_TEXT);
    }
    if mask & EMPTY_END_TEXT != 0 {
        symbols.push(END_TEXT);
    }
    if mask & EMPTY_WORD_BOUNDARY != 0 {
        symbols.push(WORD_BOUNDARY);
    }
    if mask & EMPTY_NON_WORD_BOUNDARY != 0 {
        symbols.push(NON_WORD_BOUNDARY);
    }
    symbols
}

fn build_state_cache(program: &Program, use_epsilon: bool) -> StateCache {
    let size = program.len();
    let mut cache = StateCache {
        state_mapping: Vec::with_capacity(size),
        is_final_state: vec![false; size],
        is_state_nop_or_cap: vec![false; size],
        is_last: vec![false; size],
        // With ε available every state is materialized as itself, so the
        // incoming-edge bookkeeping is moot.
        has_incoming_edge: vec![use_epsilon; size],
    };

    for (pc, inst) in program.insts.iter().enumerate() {
        cache.is_last[pc] = inst.last;
        if inst.op == Op::Match {
            cache.is_final_state[pc] = true;
        }
        if matches!(inst.op, Op::Nop | Op::Capture) {
            cache.is_state_nop_or_cap[pc] = true;
        }
    }

    if use_epsilon {
        for pc in 0..size {
            cache.state_mapping.push(vec![pc]);
        }
    } else {
        for pc in 0..size {
            if cache.is_state_nop_or_cap[pc] {
                cache.state_mapping.push(terminal_closure(program, pc));
            } else {
                cache.state_mapping.push(vec![pc]);
            }
        }
        // States that are the direct target of a consuming instruction are
        // known to receive an edge before any of it is materialized; this is
        // what lets loop entries (whose incoming edges appear later in
        // program order) keep their outgoing transitions.
        for inst in &program.insts {
            if !matches!(inst.op, Op::Nop | Op::Capture | Op::Match) {
                cache.has_incoming_edge[inst.out] = true;
            }
        }
    }
    cache
}

// The terminal states reachable from `pc` through ε-edges alone, in
// depth-first discovery order. ε-edges are the `out` edges of Nop/Capture
// instructions plus the implicit edge past any instruction whose `last`
// flag is clear; terminal states (everything else, including Match) stop
// the walk.
fn terminal_closure(program: &Program, pc: usize) -> Vec<StateIdx> {
    let mut mapped = Vec::new();
    let mut to_check = vec![pc];
    let mut checked = vec![false; program.len()];

    while let Some(s) = to_check.pop() {
        if checked[s] {
            continue;
        }
        checked[s] = true;
        let inst = program.insts[s];
        if !inst.last && !checked[s + 1] {
            to_check.push(s + 1);
        }
        match inst.op {
            Op::Nop | Op::Capture => {
                if !checked[inst.out] {
                    to_check.push(inst.out);
                }
            }
            _ => mapped.push(s),
        }
    }
    mapped
}

// Compacts `explicit` (which has one state per program counter, most of
// them untouched) to a dense state space, numbering used states in first
// visit order: states with outgoing transitions first, then any remaining
// final states, then targets as they are encountered.
fn renumber_states(explicit: &Nfa, size: usize) -> Nfa {
    let mut renumbered: Vec<Option<StateIdx>> = vec![None; size];
    let mut ret = Nfa::new();

    for state in 0..size {
        if !explicit.transitions_from(state).map_or(true, |t| t.is_empty()) {
            renumbered[state] = Some(ret.add_state());
        }
    }

    for &f in explicit.final_states() {
        let idx = match renumbered[f] {
            Some(idx) => idx,
            None => {
                let idx = ret.add_state();
                renumbered[f] = Some(idx);
                idx
            }
        };
        ret.insert_final(idx);
    }

    for state in 0..size {
        let Some(src) = renumbered[state] else { continue };
        for (&symbol, tgts) in explicit.transitions_from(state).into_iter().flatten() {
            for &tgt in tgts {
                let tgt_idx = match renumbered[tgt] {
                    Some(idx) => idx,
                    None => {
                        let idx = ret.add_state();
                        renumbered[tgt] = Some(idx);
                        idx
                    }
                };
                ret.insert_trans(src, symbol, tgt_idx);
            }
        }
    }

    for &i in explicit.initial_states() {
        // An initial state with no transitions and no finality contributes
        // nothing; skip it rather than resurrect it.
        if let Some(idx) = renumbered[i] {
            ret.insert_initial(idx);
        }
    }
    ret
}
