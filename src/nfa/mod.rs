// Copyright 2015-2016 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::error::Error;
use crate::graph::Graph;
use crate::Result;
use bit_set::BitSet;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::mem;

pub mod compose;
mod reduce;

// TODO: it would be nice to make StateIdx a new type instead of a type alias. The problem is that
// we need to be able to index Vecs with it, and we can't impl<T> Index<StateIdx> for Vec<T>
// because of coherence rules.
pub type StateIdx = usize;

/// The type of symbols that automata consume.
///
/// There is no distinguished ε value: ε-aware operations take the symbol
/// playing the role of ε as a parameter, and the caller obtains it from an
/// [`alphabet`](crate::alphabet) so that it is distinct from every symbol
/// already in use.
pub type Symbol = u32;

/// How we represent a set of states. The two important criteria are:
///
/// - it should be cheap to iterate in a deterministic order, and
/// - it should be hashable (this knocks out HashSet).
///
/// Note that efficient insertion and O(1) queries are not important. Therefore, we use a sorted
/// Vec. (But be careful to keep it sorted!)
pub type StateSet = Vec<StateIdx>;

/// Inserts `s` into a sorted `StateSet`, keeping it sorted and duplicate-free.
///
/// Returns `true` if `s` was not already present.
pub(crate) fn set_insert(set: &mut StateSet, s: StateIdx) -> bool {
    match set.binary_search(&s) {
        Ok(_) => false,
        Err(pos) => {
            set.insert(pos, s);
            true
        }
    }
}

/// A single transition, as a value.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Trans {
    pub src: StateIdx,
    pub symbol: Symbol,
    pub tgt: StateIdx,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct State {
    // Outgoing transitions, grouped by symbol. The BTreeMap is what makes
    // iteration order (and therefore everything built on top of it)
    // deterministic.
    transitions: BTreeMap<Symbol, StateSet>,
}

/// A non-deterministic finite automaton.
///
/// States are integers, dense over `[0, num_states)`. Initial and final
/// states are explicit sets; transitions are symbol-labelled edges between
/// states. There is no implicit ε: an ε-transition is a transition on
/// whatever symbol the current pipeline has designated as ε.
///
/// An `Nfa` starts out empty and is grown with [`add_state`](Nfa::add_state)
/// and [`add_trans`](Nfa::add_trans). Once it is handed to one of the
/// composition or noodlification operations it should be treated as frozen;
/// those operations never mutate their inputs.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Nfa {
    states: Vec<State>,
    init: StateSet,
    finals: StateSet,
}

impl Nfa {
    pub fn new() -> Nfa {
        Nfa::with_capacity(0)
    }

    /// Creates a new `Nfa` that can `add_state()` `n` times without re-allocating.
    pub fn with_capacity(n: usize) -> Nfa {
        Nfa {
            states: Vec::with_capacity(n),
            init: Vec::new(),
            finals: Vec::new(),
        }
    }

    /// Adds a new state and returns its index.
    pub fn add_state(&mut self) -> StateIdx {
        let state_idx = self.states.len();
        self.states.push(State::default());
        state_idx
    }

    /// Returns the number of states.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Returns true if this `Nfa` has no states (and so matches nothing).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn check_state(&self, s: StateIdx) -> Result<()> {
        if s < self.states.len() {
            Ok(())
        } else {
            Err(Error::InvalidState(s))
        }
    }

    /// Inserts the transition `(src, symbol, tgt)`. Inserting a transition
    /// that is already present is a no-op.
    pub fn add_trans(&mut self, src: StateIdx, symbol: Symbol, tgt: StateIdx) -> Result<()> {
        self.check_state(src)?;
        self.check_state(tgt)?;
        self.insert_trans(src, symbol, tgt);
        Ok(())
    }

    /// Marks `s` as an initial state. Idempotent.
    pub fn make_initial(&mut self, s: StateIdx) -> Result<()> {
        self.check_state(s)?;
        self.insert_initial(s);
        Ok(())
    }

    /// Marks `s` as a final state. Idempotent.
    pub fn make_final(&mut self, s: StateIdx) -> Result<()> {
        self.check_state(s)?;
        self.insert_final(s);
        Ok(())
    }

    // The unchecked variants below are for internal construction, where the
    // state ids come out of this automaton and are valid by construction.

    pub(crate) fn insert_trans(&mut self, src: StateIdx, symbol: Symbol, tgt: StateIdx) {
        set_insert(self.states[src].transitions.entry(symbol).or_default(), tgt);
    }

    pub(crate) fn insert_initial(&mut self, s: StateIdx) {
        set_insert(&mut self.init, s);
    }

    pub(crate) fn insert_final(&mut self, s: StateIdx) {
        set_insert(&mut self.finals, s);
    }

    pub fn initial_states(&self) -> &StateSet {
        &self.init
    }

    pub fn final_states(&self) -> &StateSet {
        &self.finals
    }

    pub fn is_initial(&self, s: StateIdx) -> bool {
        self.init.binary_search(&s).is_ok()
    }

    pub fn is_final(&self, s: StateIdx) -> bool {
        self.finals.binary_search(&s).is_ok()
    }

    /// Returns the outgoing transitions of `s`, grouped by symbol in
    /// ascending symbol order.
    pub fn transitions_from(&self, s: StateIdx) -> Result<&BTreeMap<Symbol, StateSet>> {
        self.check_state(s)?;
        Ok(&self.states[s].transitions)
    }

    pub(crate) fn post_map(&self, s: StateIdx) -> &BTreeMap<Symbol, StateSet> {
        &self.states[s].transitions
    }

    pub(crate) fn post(&self, s: StateIdx, symbol: Symbol) -> Option<&StateSet> {
        self.states[s].transitions.get(&symbol)
    }

    /// Iterates over every transition, in deterministic order: by source
    /// state, then by symbol, then by target.
    pub fn transitions(&self) -> impl Iterator<Item = Trans> + '_ {
        self.states.iter().enumerate().flat_map(|(src, st)| {
            st.transitions.iter().flat_map(move |(&symbol, tgts)| {
                tgts.iter().map(move |&tgt| Trans { src, symbol, tgt })
            })
        })
    }

    pub(crate) fn set_initial_states(&mut self, mut init: StateSet) {
        init.sort_unstable();
        init.dedup();
        self.init = init;
    }

    pub(crate) fn set_final_states(&mut self, mut finals: StateSet) {
        finals.sort_unstable();
        finals.dedup();
        self.finals = finals;
    }

    /// Returns a copy of this automaton with every transition labelled
    /// `symbol` deleted. Initial and final states are unchanged.
    pub(crate) fn without_symbol(&self, symbol: Symbol) -> Nfa {
        let mut ret = self.clone();
        for st in &mut ret.states {
            st.transitions.remove(&symbol);
        }
        ret
    }

    // You've just done some operation that has changed state indices (probably by deleting
    // un-needed states). Now re-label the existing transitions according to the new state indices.
    fn map_states<F>(&mut self, map: F)
    where
        F: Fn(StateIdx) -> Option<StateIdx>,
    {
        for st in &mut self.states {
            let old = mem::take(&mut st.transitions);
            for (symbol, tgts) in old {
                let mut new_tgts: StateSet = tgts.into_iter().filter_map(&map).collect();
                new_tgts.sort_unstable();
                new_tgts.dedup();
                if !new_tgts.is_empty() {
                    st.transitions.insert(symbol, new_tgts);
                }
            }
        }

        let remap = |set: &StateSet| -> StateSet {
            let mut ret: StateSet = set.iter().copied().filter_map(&map).collect();
            ret.sort_unstable();
            ret.dedup();
            ret
        };
        let new_init = remap(&self.init);
        let new_finals = remap(&self.finals);
        self.init = new_init;
        self.finals = new_finals;
    }

    /// Removes every state that does not lie on some path from an initial
    /// state to a final state, and renumbers the survivors to `[0, n')`
    /// (in the order of their old indices). The language is unchanged.
    pub fn trim(&mut self) {
        let forward = self.reachable_from(self.init.iter().copied());
        let reverted = self.revert();
        let backward = reverted.reachable_from(reverted.init.iter().copied());

        let mut old_to_new = vec![None; self.states.len()];
        let mut next = 0;
        for s in 0..self.states.len() {
            if forward.contains(s) && backward.contains(s) {
                old_to_new[s] = Some(next);
                next += 1;
            }
        }

        let old_states = mem::take(&mut self.states);
        self.states = old_states
            .into_iter()
            .enumerate()
            .filter(|&(i, _)| old_to_new[i].is_some())
            .map(|(_, st)| st)
            .collect();
        self.map_states(|s| old_to_new[s]);
    }

    /// Returns the reversal of this `Nfa`: initial and final states swap
    /// roles, and every transition is turned around. The result accepts
    /// exactly the reversed words.
    pub fn revert(&self) -> Nfa {
        let mut ret = Nfa::with_capacity(self.states.len());
        for _ in 0..self.states.len() {
            ret.add_state();
        }
        for t in self.transitions() {
            ret.insert_trans(t.tgt, t.symbol, t.src);
        }
        ret.init = self.finals.clone();
        ret.finals = self.init.clone();
        ret
    }

    /// Returns true iff no final state is reachable from any initial state.
    ///
    /// This is pure reachability: if the automaton carries ε-transitions,
    /// they count as ordinary symbols here.
    pub fn is_lang_empty(&self) -> bool {
        let reached = self.reachable_from(self.init.iter().copied());
        !self.finals.iter().any(|&f| reached.contains(f))
    }

    /// Checks whether `word` is accepted, reading every symbol literally
    /// (no ε semantics).
    pub fn accepts(&self, word: &[Symbol]) -> bool {
        let mut cur = BitSet::with_capacity(self.states.len());
        for &i in &self.init {
            cur.insert(i);
        }

        for &symbol in word {
            let mut next = BitSet::with_capacity(self.states.len());
            for s in cur.iter() {
                if let Some(tgts) = self.post(s, symbol) {
                    for &t in tgts {
                        next.insert(t);
                    }
                }
            }
            if next.is_empty() {
                return false;
            }
            cur = next;
        }
        cur.iter().any(|s| self.is_final(s))
    }

    /// Replaces the set of initial states with a single fresh state that
    /// carries a copy of every initial state's outgoing transitions (and is
    /// final if some initial state was). The language is unchanged.
    ///
    /// After this, a concatenation joining onto this automaton pinches the
    /// word at exactly one state, which is what segmentation relies on.
    pub fn unify_initial(&mut self) {
        if self.init.len() <= 1 {
            return;
        }
        let fresh = self.add_state();
        let old_init = mem::take(&mut self.init);

        let mut fresh_transitions: BTreeMap<Symbol, StateSet> = BTreeMap::new();
        let mut fresh_final = false;
        for &i in &old_init {
            for (&symbol, tgts) in &self.states[i].transitions {
                let entry = fresh_transitions.entry(symbol).or_default();
                for &t in tgts {
                    set_insert(entry, t);
                }
            }
            if self.is_final(i) {
                fresh_final = true;
            }
        }

        self.states[fresh].transitions = fresh_transitions;
        if fresh_final {
            self.insert_final(fresh);
        }
        self.init = vec![fresh];
    }

    /// Dual of [`unify_initial`](Nfa::unify_initial): a single fresh final
    /// state that receives a copy of every transition into an old final
    /// state (and is initial if some final state was).
    pub fn unify_final(&mut self) {
        if self.finals.len() <= 1 {
            return;
        }
        let fresh = self.add_state();
        let old_finals = mem::take(&mut self.finals);

        for st in &mut self.states {
            for tgts in st.transitions.values_mut() {
                if tgts.iter().any(|t| old_finals.binary_search(t).is_ok()) {
                    // `fresh` is the largest state id, so pushing keeps the
                    // set sorted.
                    tgts.push(fresh);
                }
            }
        }

        if old_finals.iter().any(|&f| self.is_initial(f)) {
            self.insert_initial(fresh);
        }
        self.finals = vec![fresh];
    }
}

impl Debug for Nfa {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_fmt(format_args!("Nfa ({} states):\n", self.states.len()))?;
        f.write_fmt(format_args!("Init: {:?}\n", self.init))?;
        f.write_fmt(format_args!("Final: {:?}\n", self.finals))?;

        for (st_idx, st) in self.states.iter().enumerate().take(40) {
            if st.transitions.is_empty() {
                continue;
            }
            f.write_fmt(format_args!("\tState {}:\n", st_idx))?;
            for (symbol, tgts) in &st.transitions {
                f.write_fmt(format_args!("\t\t{} => {:?}\n", symbol, tgts))?;
            }
        }
        if self.states.len() > 40 {
            f.write_fmt(format_args!(
                "\t... ({} more states)\n",
                self.states.len() - 40
            ))?;
        }
        Ok(())
    }
}
