//! Symbol bookkeeping for pipelines that need a fresh ε.
//!
//! The noodlification pipeline needs a symbol that is guaranteed not to
//! occur in any of its input automata. An alphabet tracks the symbols in
//! use and hands out fresh ones: every value returned by
//! [`get_next_value`](Alphabet::get_next_value) is strictly greater than
//! every symbol absorbed or previously returned.

use crate::error::Error;
use crate::nfa::{Nfa, Symbol};
use crate::Result;
use std::collections::BTreeSet;

pub trait Alphabet {
    /// Returns a symbol distinct from (in fact, greater than) every symbol
    /// this alphabet has seen or handed out, and records it as used.
    fn get_next_value(&mut self) -> Result<Symbol>;
}

fn next_value(symbols: &mut BTreeSet<Symbol>) -> Result<Symbol> {
    let next = match symbols.iter().next_back() {
        Some(&max) if max == Symbol::MAX => return Err(Error::AlphabetExhausted),
        Some(&max) => max + 1,
        None => 0,
    };
    symbols.insert(next);
    Ok(next)
}

/// An alphabet enumerated up front from a batch of automata.
#[derive(Clone, Debug, Default)]
pub struct EnumAlphabet {
    symbols: BTreeSet<Symbol>,
}

impl EnumAlphabet {
    pub fn from_nfas<'a, I>(nfas: I) -> EnumAlphabet
    where
        I: IntoIterator<Item = &'a Nfa>,
    {
        let mut ret = EnumAlphabet::default();
        for nfa in nfas {
            for t in nfa.transitions() {
                ret.symbols.insert(t.symbol);
            }
        }
        ret
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }

    /// Iterates over the symbols in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols.iter().copied()
    }
}

impl Alphabet for EnumAlphabet {
    fn get_next_value(&mut self) -> Result<Symbol> {
        next_value(&mut self.symbols)
    }
}

/// A mutable alphabet that absorbs symbols as automata come in.
#[derive(Clone, Debug, Default)]
pub struct OnTheFlyAlphabet {
    symbols: BTreeSet<Symbol>,
}

impl OnTheFlyAlphabet {
    pub fn new() -> OnTheFlyAlphabet {
        OnTheFlyAlphabet::default()
    }

    /// Records every symbol occurring on a transition of `nfa`.
    pub fn add_symbols_from(&mut self, nfa: &Nfa) {
        for t in nfa.transitions() {
            self.symbols.insert(t.symbol);
        }
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols.iter().copied()
    }
}

impl Alphabet for OnTheFlyAlphabet {
    fn get_next_value(&mut self) -> Result<Symbol> {
        next_value(&mut self.symbols)
    }
}
