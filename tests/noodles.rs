//! End-to-end tests of the noodlification pipeline, from hand-built and
//! regex-built automata down to the languages of the resulting noodles.

use noodler::{
    concatenate_over_epsilon, noodlify, noodlify_for_equation, Nfa, StringDict, Symbol,
};
use std::collections::BTreeSet;

const A: Symbol = 'a' as u32;
const B: Symbol = 'b' as u32;

fn nfa_word(word: &[Symbol]) -> Nfa {
    let mut nfa = Nfa::new();
    let mut prev = nfa.add_state();
    nfa.make_initial(prev).unwrap();
    for &symbol in word {
        let next = nfa.add_state();
        nfa.add_trans(prev, symbol, next).unwrap();
        prev = next;
    }
    nfa.make_final(prev).unwrap();
    nfa
}

fn nfa_words(words: &[&[Symbol]]) -> Nfa {
    let mut nfa = Nfa::new();
    let init = nfa.add_state();
    nfa.make_initial(init).unwrap();
    for &word in words {
        let mut prev = init;
        for &symbol in word {
            let next = nfa.add_state();
            nfa.add_trans(prev, symbol, next).unwrap();
            prev = next;
        }
        nfa.make_final(prev).unwrap();
    }
    nfa
}

fn nfa_star(symbol: Symbol) -> Nfa {
    let mut nfa = Nfa::new();
    let s = nfa.add_state();
    nfa.make_initial(s).unwrap();
    nfa.make_final(s).unwrap();
    nfa.add_trans(s, symbol, s).unwrap();
    nfa
}

fn nfa_either(x: Symbol, y: Symbol) -> Nfa {
    let mut nfa = Nfa::new();
    let s = nfa.add_state();
    let t = nfa.add_state();
    nfa.make_initial(s).unwrap();
    nfa.make_final(t).unwrap();
    nfa.add_trans(s, x, t).unwrap();
    nfa.add_trans(s, y, t).unwrap();
    nfa
}

fn words_up_to(alphabet: &[Symbol], len: usize) -> Vec<Vec<Symbol>> {
    let mut ret: Vec<Vec<Symbol>> = vec![Vec::new()];
    let mut last: Vec<Vec<Symbol>> = vec![Vec::new()];
    for _ in 0..len {
        let mut next = Vec::new();
        for w in &last {
            for &symbol in alphabet {
                let mut w2 = w.clone();
                w2.push(symbol);
                next.push(w2);
            }
        }
        ret.extend(next.iter().cloned());
        last = next;
    }
    ret
}

fn lang(aut: &Nfa, alphabet: &[Symbol], len: usize) -> BTreeSet<Vec<Symbol>> {
    words_up_to(alphabet, len)
        .into_iter()
        .filter(|w| aut.accepts(w))
        .collect()
}

// Checks noodle soundness and completeness (on a bounded enumeration) for a
// two-piece equation lhs[0]·lhs[1] = rhs.
fn check_two_part_equation(lhs: &[Nfa], rhs: &Nfa, alphabet: &[Symbol], len: usize) {
    check_two_part_equation_with(lhs, rhs, alphabet, len, &StringDict::new());
}

fn check_two_part_equation_with(
    lhs: &[Nfa],
    rhs: &Nfa,
    alphabet: &[Symbol],
    len: usize,
    params: &StringDict,
) {
    let noodles = noodlify_for_equation(lhs, rhs, false, params).unwrap();
    let words = words_up_to(alphabet, len);

    for noodle in &noodles {
        assert_eq!(noodle.len(), lhs.len());
        for w1 in &words {
            for w2 in &words {
                if noodle[0].accepts(w1) && noodle[1].accepts(w2) {
                    let mut w = w1.clone();
                    w.extend_from_slice(w2);
                    assert!(rhs.accepts(&w), "noodle outside RHS: {:?}·{:?}", w1, w2);
                    assert!(
                        lhs[0].accepts(w1) && lhs[1].accepts(w2),
                        "noodle outside LHS: {:?}·{:?}",
                        w1,
                        w2
                    );
                }
            }
        }
    }

    for w1 in &words {
        for w2 in &words {
            if lhs[0].accepts(w1) && lhs[1].accepts(w2) {
                let mut w = w1.clone();
                w.extend_from_slice(w2);
                if rhs.accepts(&w) {
                    assert!(
                        noodles
                            .iter()
                            .any(|n| n[0].accepts(w1) && n[1].accepts(w2)),
                        "no noodle covers the split {:?}·{:?}",
                        w1,
                        w2
                    );
                }
            }
        }
    }
}

#[test]
fn e1_word_concatenation() {
    let lhs = vec![nfa_word(&[A]), nfa_word(&[B])];
    let rhs = nfa_word(&[A, B]);
    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();

    assert_eq!(noodles.len(), 1);
    assert_eq!(noodles[0].len(), 2);
    assert_eq!(lang(&noodles[0][0], &[A, B], 2), BTreeSet::from([vec![A]]));
    assert_eq!(lang(&noodles[0][1], &[A, B], 2), BTreeSet::from([vec![B]]));

    check_two_part_equation(&lhs, &rhs, &[A, B], 3);
}

#[test]
fn e2_star_splits() {
    let lhs = vec![nfa_star(A), nfa_star(A)];
    let rhs = nfa_word(&[A, A, A]);
    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();

    assert_eq!(noodles.len(), 4);
    let splits: BTreeSet<(BTreeSet<Vec<Symbol>>, BTreeSet<Vec<Symbol>>)> = noodles
        .iter()
        .map(|n| (lang(&n[0], &[A], 3), lang(&n[1], &[A], 3)))
        .collect();
    let expected: BTreeSet<_> = (0..4)
        .map(|k| {
            (
                BTreeSet::from([vec![A; k]]),
                BTreeSet::from([vec![A; 3 - k]]),
            )
        })
        .collect();
    assert_eq!(splits, expected);

    check_two_part_equation(&lhs, &rhs, &[A], 4);
}

#[test]
fn e2_star_splits_via_regex() {
    let eps = 1000;
    let lhs = vec![
        Nfa::from_regex("a*", false, eps).unwrap(),
        Nfa::from_regex("a*", false, eps).unwrap(),
    ];
    let rhs = Nfa::from_regex("aaa", false, eps).unwrap();
    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();

    // The regex-built automata have more states than the minimal ones, so
    // several noodles may realize the same split; what matters is that the
    // four splits are covered exactly.
    let splits: BTreeSet<(BTreeSet<Vec<Symbol>>, BTreeSet<Vec<Symbol>>)> = noodles
        .iter()
        .map(|n| (lang(&n[0], &[A], 3), lang(&n[1], &[A], 3)))
        .collect();
    let expected: BTreeSet<_> = (0..4)
        .map(|k| {
            (
                BTreeSet::from([vec![A; k]]),
                BTreeSet::from([vec![A; 3 - k]]),
            )
        })
        .collect();
    assert_eq!(splits, expected);

    check_two_part_equation(&lhs, &rhs, &[A], 4);
}

#[test]
fn e3_no_cross_pairs() {
    let lhs = vec![nfa_either(A, B), nfa_either(A, B)];
    let rhs = nfa_words(&[&[A, A], &[B, B]]);
    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();

    assert_eq!(noodles.len(), 2);
    let splits: BTreeSet<(BTreeSet<Vec<Symbol>>, BTreeSet<Vec<Symbol>>)> = noodles
        .iter()
        .map(|n| (lang(&n[0], &[A, B], 2), lang(&n[1], &[A, B], 2)))
        .collect();
    let expected = BTreeSet::from([
        (BTreeSet::from([vec![A]]), BTreeSet::from([vec![A]])),
        (BTreeSet::from([vec![B]]), BTreeSet::from([vec![B]])),
    ]);
    assert_eq!(splits, expected);

    check_two_part_equation(&lhs, &rhs, &[A, B], 3);
}

#[test]
fn e4_unsatisfiable_equation() {
    let lhs = vec![nfa_word(&[A]), nfa_word(&[B])];
    let rhs = nfa_word(&[B, A]);
    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();
    assert!(noodles.is_empty());
}

#[test]
fn e6_noodlify_recovers_concatenation() {
    let a = Nfa::from_regex("ab|a", false, 1000).unwrap();
    let b = Nfa::from_regex("b*", false, 1000).unwrap();
    let epsilon = 1000;
    let cat = concatenate_over_epsilon(&a, &b, epsilon);
    let noodles = noodlify(&cat, epsilon, false);

    assert_eq!(noodles.len(), 1);
    assert_eq!(noodles[0].len(), 2);
    assert_eq!(
        lang(&noodles[0][0], &[A, B], 3),
        lang(&a, &[A, B], 3),
        "first piece must accept exactly L(a) after trim"
    );
    assert_eq!(lang(&noodles[0][1], &[A, B], 3), lang(&b, &[A, B], 3));
}

#[test]
fn single_automaton_lhs() {
    let lhs = vec![nfa_either(A, B)];
    let rhs = nfa_word(&[A]);
    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();

    assert_eq!(noodles.len(), 1);
    assert_eq!(noodles[0].len(), 1);
    // The single noodle is the (trimmed) intersection of L₁ and RHS.
    assert_eq!(lang(&noodles[0][0], &[A, B], 2), BTreeSet::from([vec![A]]));
}

#[test]
fn three_part_equation_skips_empty_middles() {
    let lhs = vec![nfa_either(A, B), nfa_either(A, B), nfa_either(A, B)];
    let rhs = nfa_words(&[&[A, A, A], &[B, B, B]]);

    let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();
    // Only the all-a and all-b assignments are realizable.
    assert_eq!(noodles.len(), 2);
    for noodle in &noodles {
        assert_eq!(noodle.len(), 3);
    }

    // With include_empty, the two mixed assignments survive as noodles with
    // an empty-language middle piece.
    let with_empty = noodlify_for_equation(&lhs, &rhs, true, &StringDict::new()).unwrap();
    assert_eq!(with_empty.len(), 4);
    assert!(with_empty
        .iter()
        .any(|n| n.iter().any(|piece| piece.num_states() == 0)));
}

#[test]
fn regex_equation_end_to_end() {
    let eps = 1000;
    let lhs = vec![
        Nfa::from_regex("ab|a", false, eps).unwrap(),
        Nfa::from_regex("b*", false, eps).unwrap(),
    ];
    let rhs = Nfa::from_regex("ab*", false, eps).unwrap();
    check_two_part_equation(&lhs, &rhs, &[A, B], 3);
}

#[test]
fn pipeline_is_deterministic() {
    let lhs = vec![nfa_either(A, B), nfa_star(B)];
    let rhs = nfa_words(&[&[A, B], &[B, B], &[A]]);

    for reduce in [None, Some("forward"), Some("backward"), Some("bidirectional")] {
        let mut params = StringDict::new();
        if let Some(value) = reduce {
            params.insert("reduce".to_owned(), value.to_owned());
        }
        let first = noodlify_for_equation(&lhs, &rhs, false, &params).unwrap();
        let second = noodlify_for_equation(&lhs, &rhs, false, &params).unwrap();
        assert_eq!(first, second, "reduce = {:?}", reduce);
    }
}

#[test]
fn reduced_pipeline_is_sound_and_complete() {
    // Reduction may merge cut states (collapsing several noodles into one),
    // so the noodle count can shrink; what must survive is that the noodles
    // still cover exactly the realizable splits.
    let lhs = vec![nfa_either(A, B), nfa_star(B)];
    let rhs = nfa_words(&[&[A, B], &[B, B], &[A]]);

    for reduce in ["forward", "backward", "bidirectional"] {
        let mut params = StringDict::new();
        params.insert("reduce".to_owned(), reduce.to_owned());
        check_two_part_equation_with(&lhs, &rhs, &[A, B], 3, &params);
    }
}
