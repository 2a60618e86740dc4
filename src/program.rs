// Copyright 2015 Joe Neeman.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The flat bytecode form of a regex, and the compiler that produces it.
//!
//! A [`Program`] is a list of instructions addressed by program counter.
//! Each instruction has an explicit `out` edge and, when its `last` flag is
//! clear, an implicit ε-edge to the next instruction. That second edge is
//! how choice is encoded: the alternatives of an alternation (or the
//! branches of a character class) sit in consecutive slots, each pointing
//! at its own continuation, with only the final alternative marked `last`.
//!
//! The compiler lowers `regex-syntax`'s HIR into this form with the usual
//! fragment-and-patch scheme: compiling a subexpression yields its entry pc
//! plus the list of instructions whose `out` still needs to point at
//! whatever comes next. The program's language is the pattern's full-match
//! language; assertions (`^`, `\b`, …) become [`Op::EmptyWidth`]
//! instructions whose interpretation is left to the consumer.

use crate::nfa::Symbol;
use crate::Result;
use regex_syntax::hir::{self, Hir, HirKind};
use std::fmt::{self, Debug, Formatter};
use std::mem;

pub const EMPTY_BEGIN_LINE: u8 = 1 << 0;
pub const EMPTY_END_LINE: u8 = 1 << 1;
pub const EMPTY_BEGIN_TEXT: u8 = 1 << 2;
pub const EMPTY_END_TEXT: u8 = 1 << 3;
pub const EMPTY_WORD_BOUNDARY: u8 = 1 << 4;
pub const EMPTY_NON_WORD_BOUNDARY: u8 = 1 << 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    /// Consume one symbol in `lo..=hi` and continue at `out`.
    ByteRange { lo: Symbol, hi: Symbol },
    /// Accept. `out` is unused.
    Match,
    /// Continue at `out` without consuming anything.
    Nop,
    /// Capture-group bookkeeping; behaves exactly like `Nop` here, since
    /// capture information is discarded.
    Capture,
    /// A zero-width assertion; `mask` is a combination of the `EMPTY_*`
    /// bits.
    EmptyWidth { mask: u8 },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Inst {
    pub op: Op,
    pub out: usize,
    /// If false, there is an implicit ε-edge from this instruction to the
    /// next one: this instruction and its successors form a block of
    /// alternatives.
    pub last: bool,
}

#[derive(Clone, Eq, PartialEq)]
pub struct Program {
    pub insts: Vec<Inst>,
    pub start: usize,
}

impl Program {
    /// Compiles `pattern` into a program whose language is the pattern's
    /// full-match language.
    pub fn from_pattern(pattern: &str) -> Result<Program> {
        let hir = regex_syntax::parse(pattern)?;
        let mut compiler = Compiler { insts: Vec::new() };
        let frag = compiler.compile(&hir);

        let match_pc = compiler.insts.len();
        compiler.insts.push(Inst {
            op: Op::Match,
            out: match_pc,
            last: true,
        });
        compiler.patch(frag.holes, match_pc);

        Ok(Program {
            insts: compiler.insts,
            start: frag.entry,
        })
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }
}

impl Debug for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_fmt(format_args!(
            "Program ({} instructions, start {}):\n",
            self.insts.len(),
            self.start
        ))?;
        for (pc, inst) in self.insts.iter().enumerate() {
            f.write_fmt(format_args!(
                "\t{}: {:?} out={}{}\n",
                pc,
                inst.op,
                inst.out,
                if inst.last { "" } else { " (+eps to next)" }
            ))?;
        }
        Ok(())
    }
}

// A compiled subexpression: where it starts, and which instructions still
// need their `out` patched to point at the continuation.
struct Frag {
    entry: usize,
    holes: Vec<usize>,
}

struct Compiler {
    insts: Vec<Inst>,
}

impl Compiler {
    fn emit(&mut self, op: Op, last: bool) -> usize {
        // `out` is a placeholder until patched (or assigned directly).
        self.insts.push(Inst { op, out: 0, last });
        self.insts.len() - 1
    }

    fn patch(&mut self, holes: Vec<usize>, target: usize) {
        for pc in holes {
            self.insts[pc].out = target;
        }
    }

    fn compile(&mut self, hir: &Hir) -> Frag {
        match hir.kind() {
            HirKind::Empty => self.compile_empty(),
            HirKind::Literal(lit) => self.compile_literal(lit),
            HirKind::Class(class) => self.compile_class(class),
            HirKind::Look(look) => {
                let pc = self.emit(
                    Op::EmptyWidth {
                        mask: look_mask(*look),
                    },
                    true,
                );
                Frag {
                    entry: pc,
                    holes: vec![pc],
                }
            }
            HirKind::Repetition(rep) => self.compile_repetition(rep),
            HirKind::Capture(cap) => {
                let open = self.emit(Op::Capture, true);
                let inner = self.compile(&cap.sub);
                self.insts[open].out = inner.entry;
                let close = self.emit(Op::Capture, true);
                self.patch(inner.holes, close);
                Frag {
                    entry: open,
                    holes: vec![close],
                }
            }
            HirKind::Concat(subs) => {
                let mut frag: Option<Frag> = None;
                for sub in subs {
                    let next = self.compile(sub);
                    frag = Some(self.chain(frag, next));
                }
                frag.unwrap_or_else(|| self.compile_empty())
            }
            HirKind::Alternation(subs) => {
                // The choice block: one Nop per branch, in consecutive
                // slots, chained by clear `last` flags.
                let first = self.insts.len();
                for i in 0..subs.len() {
                    self.emit(Op::Nop, i + 1 == subs.len());
                }
                let mut holes = Vec::new();
                for (i, sub) in subs.iter().enumerate() {
                    let branch = self.compile(sub);
                    self.insts[first + i].out = branch.entry;
                    holes.extend(branch.holes);
                }
                Frag {
                    entry: first,
                    holes,
                }
            }
        }
    }

    fn compile_empty(&mut self) -> Frag {
        let pc = self.emit(Op::Nop, true);
        Frag {
            entry: pc,
            holes: vec![pc],
        }
    }

    fn compile_literal(&mut self, lit: &hir::Literal) -> Frag {
        let symbols: Vec<Symbol> = match std::str::from_utf8(&lit.0) {
            Ok(s) => s.chars().map(|c| c as Symbol).collect(),
            // Byte-oriented literals fall back to one symbol per byte.
            Err(_) => lit.0.iter().map(|&b| b as Symbol).collect(),
        };

        let mut frag: Option<Frag> = None;
        for symbol in symbols {
            let pc = self.emit(
                Op::ByteRange {
                    lo: symbol,
                    hi: symbol,
                },
                true,
            );
            let next = Frag {
                entry: pc,
                holes: vec![pc],
            };
            frag = Some(self.chain(frag, next));
        }
        frag.unwrap_or_else(|| self.compile_empty())
    }

    fn compile_class(&mut self, class: &hir::Class) -> Frag {
        let ranges: Vec<(Symbol, Symbol)> = match class {
            hir::Class::Unicode(c) => c
                .ranges()
                .iter()
                .map(|r| (r.start() as Symbol, r.end() as Symbol))
                .collect(),
            hir::Class::Bytes(c) => c
                .ranges()
                .iter()
                .map(|r| (r.start() as Symbol, r.end() as Symbol))
                .collect(),
        };

        if ranges.is_empty() {
            // A class that matches nothing; lo > hi consumes no symbol.
            let pc = self.emit(Op::ByteRange { lo: 1, hi: 0 }, true);
            return Frag {
                entry: pc,
                holes: vec![pc],
            };
        }

        let first = self.insts.len();
        for (i, &(lo, hi)) in ranges.iter().enumerate() {
            self.emit(Op::ByteRange { lo, hi }, i + 1 == ranges.len());
        }
        Frag {
            entry: first,
            holes: (first..first + ranges.len()).collect(),
        }
    }

    fn compile_repetition(&mut self, rep: &hir::Repetition) -> Frag {
        // Match priority is irrelevant here, so greedy and lazy compile the
        // same way.
        let min = rep.min as usize;
        match rep.max {
            None if min == 0 => {
                // e*: a two-way choice block, looping through the body.
                let block = self.emit(Op::Nop, false);
                let skip = self.emit(Op::Nop, true);
                let body = self.compile(&rep.sub);
                self.insts[block].out = body.entry;
                self.patch(body.holes, block);
                Frag {
                    entry: block,
                    holes: vec![skip],
                }
            }
            None => {
                // e{min,}: min copies, then loop back through the last one.
                let (mut frag, last_entry) = self.compile_times(&rep.sub, min);
                let block = self.emit(Op::Nop, false);
                let skip = self.emit(Op::Nop, true);
                self.insts[block].out = last_entry;
                self.patch(mem::take(&mut frag.holes), block);
                frag.holes = vec![skip];
                frag
            }
            Some(max) => {
                let max = max as usize;
                if max == 0 {
                    return self.compile_empty();
                }
                // e{min,max}: min copies followed by max - min optional ones.
                let mut frag: Option<Frag> = None;
                if min > 0 {
                    frag = Some(self.compile_times(&rep.sub, min).0);
                }
                for _ in min..max {
                    let opt = self.compile_optional(&rep.sub);
                    frag = Some(self.chain(frag, opt));
                }
                frag.unwrap_or_else(|| self.compile_empty())
            }
        }
    }

    // Compiles `n >= 1` consecutive copies of `hir`; returns the combined
    // fragment and the entry pc of the last copy.
    fn compile_times(&mut self, hir: &Hir, n: usize) -> (Frag, usize) {
        let mut frag = self.compile(hir);
        let mut last_entry = frag.entry;
        for _ in 1..n {
            let next = self.compile(hir);
            last_entry = next.entry;
            frag = self.chain(Some(frag), next);
        }
        (frag, last_entry)
    }

    fn compile_optional(&mut self, hir: &Hir) -> Frag {
        let block = self.emit(Op::Nop, false);
        let skip = self.emit(Op::Nop, true);
        let body = self.compile(hir);
        self.insts[block].out = body.entry;
        let mut holes = body.holes;
        holes.push(skip);
        Frag {
            entry: block,
            holes,
        }
    }

    fn chain(&mut self, first: Option<Frag>, second: Frag) -> Frag {
        match first {
            None => second,
            Some(first) => {
                self.patch(first.holes, second.entry);
                Frag {
                    entry: first.entry,
                    holes: second.holes,
                }
            }
        }
    }
}

fn look_mask(look: hir::Look) -> u8 {
    use regex_syntax::hir::Look::*;
    match look {
        Start => EMPTY_BEGIN_TEXT,
        End => EMPTY_END_TEXT,
        StartLF | StartCRLF => EMPTY_BEGIN_LINE,
        EndLF | EndCRLF => EMPTY_END_LINE,
        WordAscii | WordUnicode => EMPTY_WORD_BOUNDARY,
        WordAsciiNegate | WordUnicodeNegate => EMPTY_NON_WORD_BOUNDARY,
        // The remaining look-arounds are one-sided word boundary refinements.
        _ => EMPTY_WORD_BOUNDARY,
    }
}
