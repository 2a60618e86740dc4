//! Noodlification: enumerating the ways a word equation can be cut.
//!
//! Given an automaton whose ε-edges mark the joins of a concatenation, each
//! ε-edge is a concrete cut point: its target is the state where the next
//! piece must begin, its source the state where the current piece must end.
//! [`noodlify`] enumerates every way to pick one ε-edge per depth and
//! assembles, for each choice, the sequence of segment instances between
//! the chosen cut points — a *noodle*. [`noodlify_for_equation`] wraps the
//! whole pipeline: unify, concatenate, intersect, trim, optionally reduce,
//! then noodlify.

use crate::alphabet::{Alphabet, OnTheFlyAlphabet};
use crate::nfa::compose::{concatenate_over_epsilon, intersection_over_epsilon};
use crate::nfa::{Nfa, StateIdx, Symbol, Trans};
use crate::segmentation::Segmentation;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One solution shape: an ordered sequence of automata whose concatenated
/// languages witness a cut of the equation. Segment instances are shared
/// between noodles, hence the `Arc`.
pub type Noodle = Vec<Arc<Nfa>>;

pub type NoodleSequence = Vec<Noodle>;

/// Free-form parameters for the equation pipeline. The only recognized key
/// is `"reduce"`, with values `"forward"`, `"backward"` or
/// `"bidirectional"`; anything else is ignored.
pub type StringDict = HashMap<String, String>;

/// Enumerates the noodles of `aut`, an automaton whose ε-edges come from
/// [`concatenate_over_epsilon`].
///
/// Noodles whose segments all have non-empty language are always included;
/// set `include_empty` to also keep noodles with empty-language segments.
/// The enumeration order is deterministic: assignment `i` of the
/// cross-product `E₀ × E₁ × …` is decoded mixed-radix, least-significant
/// depth first.
pub fn noodlify(aut: &Nfa, epsilon: Symbol, include_empty: bool) -> NoodleSequence {
    let segmentation = Segmentation::new(aut, epsilon);
    let segments = segmentation.segments();

    if segments.len() == 1 {
        let mut segment = segments[0].clone();
        segment.trim();
        if segment.num_states() > 0 || include_empty {
            return vec![vec![Arc::new(segment)]];
        } else {
            return Vec::new();
        }
    }

    // Some state id not used in `aut`, standing in for "all initial states"
    // (in the first slot) or "all final states" (in the last).
    let unused_state: StateIdx = aut.num_states();

    // segment_instances[(init, final)] is the segment restricted to that one
    // initial and that one final state, trimmed. Instances with an empty
    // state space are discarded (unless `include_empty`), and assignments
    // that need a discarded instance are skipped below.
    let mut segment_instances: HashMap<(StateIdx, StateIdx), Arc<Nfa>> = HashMap::new();

    let add_instance =
        |instances: &mut HashMap<(StateIdx, StateIdx), Arc<Nfa>>,
         segment: &Nfa,
         key: (StateIdx, StateIdx),
         init_state: Option<StateIdx>,
         final_state: Option<StateIdx>| {
            let mut instance = segment.clone();
            if let Some(i) = init_state {
                instance.set_initial_states(vec![i]);
            }
            if let Some(f) = final_state {
                instance.set_final_states(vec![f]);
            }
            instance.trim();
            if instance.num_states() > 0 || include_empty {
                instances.insert(key, Arc::new(instance));
            }
        };

    for (i, segment) in segments.iter().enumerate() {
        if i == 0 {
            // The first segment always keeps all the original initial states.
            for &f in segment.final_states() {
                add_instance(
                    &mut segment_instances,
                    segment,
                    (unused_state, f),
                    None,
                    Some(f),
                );
            }
        } else if i + 1 == segments.len() {
            // The last segment always keeps all the original final states.
            for &s in segment.initial_states() {
                add_instance(
                    &mut segment_instances,
                    segment,
                    (s, unused_state),
                    Some(s),
                    None,
                );
            }
        } else {
            for &s in segment.initial_states() {
                for &f in segment.final_states() {
                    add_instance(&mut segment_instances, segment, (s, f), Some(s), Some(f));
                }
            }
        }
    }

    let epsilon_depths = segmentation.epsilon_depths();
    let num_of_assignments: usize = epsilon_depths.iter().map(Vec::len).product();

    let mut noodles: NoodleSequence = Vec::new();
    // One ε-transition per depth, re-decoded for every assignment index.
    let mut epsilon_noodle: Vec<Trans> = Vec::with_capacity(epsilon_depths.len());
    for index in 0..num_of_assignments {
        epsilon_noodle.clear();
        let mut temp = index;
        for depth_group in epsilon_depths {
            epsilon_noodle.push(depth_group[temp % depth_group.len()]);
            temp /= depth_group.len();
        }

        // Assemble the noodle; a missing instance means some piece of this
        // assignment has an empty language, so the assignment is dropped.
        let noodle = (|| -> Option<Noodle> {
            let mut noodle: Noodle = Vec::with_capacity(epsilon_noodle.len() + 1);
            noodle.push(
                segment_instances
                    .get(&(unused_state, epsilon_noodle[0].src))?
                    .clone(),
            );
            for pair in epsilon_noodle.windows(2) {
                noodle.push(segment_instances.get(&(pair[0].tgt, pair[1].src))?.clone());
            }
            // The unwrap is ok: the multi-segment case means there is at
            // least one depth, so epsilon_noodle is non-empty.
            let last = epsilon_noodle.last().unwrap();
            noodle.push(segment_instances.get(&(last.tgt, unused_state))?.clone());
            Some(noodle)
        })();

        if let Some(noodle) = noodle {
            noodles.push(noodle);
        }
    }
    debug!(
        "noodlified {} of {} assignments across {} depths",
        noodles.len(),
        num_of_assignments,
        epsilon_depths.len()
    );
    noodles
}

/// Solves the word equation `L₁·L₂·…·Lₘ = R` by noodlification.
///
/// Every `Lᵢ` and `R` is an NFA over a common alphabet; the inputs are
/// never mutated. An empty `lhs` or an empty-language `rhs` is not an
/// error: the result is simply an empty sequence.
///
/// `params["reduce"]` selects an optional size reduction of the
/// intermediate product: `"forward"`, `"backward"` (reduce the reversal) or
/// `"bidirectional"` (both, in that order). Every returned noodle has
/// exactly `lhs.len()` entries.
pub fn noodlify_for_equation(
    lhs: &[Nfa],
    rhs: &Nfa,
    include_empty: bool,
    params: &StringDict,
) -> Result<NoodleSequence> {
    if lhs.is_empty() || rhs.is_lang_empty() {
        return Ok(Vec::new());
    }

    // Unifying initial and final states makes every join of the
    // concatenation below a single ε-edge per cut position.
    let mut left: Vec<Nfa> = lhs.to_vec();
    for aut in &mut left {
        aut.unify_initial();
        aut.unify_final();
    }

    let mut alphabet = OnTheFlyAlphabet::new();
    for aut in &left {
        alphabet.add_symbols_from(aut);
    }
    alphabet.add_symbols_from(rhs);
    let epsilon = alphabet.get_next_value()?;

    // The left-hand side, concatenated over ε.
    let mut concatenated = left[0].clone();
    for next in &left[1..] {
        concatenated = concatenate_over_epsilon(&concatenated, next, epsilon);
    }

    let mut product = intersection_over_epsilon(&concatenated, rhs, epsilon);
    product.trim();
    debug!(
        "ε-preserving product has {} states after trim",
        product.num_states()
    );
    if product.is_lang_empty() {
        return Ok(Vec::new());
    }

    match params.get("reduce").map(String::as_str) {
        Some("forward") => {
            product = product.reduce();
        }
        Some("backward") => {
            product = product.revert().reduce().revert();
        }
        Some("bidirectional") => {
            product = product.reduce();
            product = product.revert().reduce().revert();
        }
        _ => {}
    }

    Ok(noodlify(&product, epsilon, include_empty))
}

#[cfg(test)]
mod tests {
    use crate::nfa::compose::concatenate_over_epsilon;
    use crate::nfa::tests::trans_nfa;
    use crate::nfa::Nfa;
    use crate::noodle::{noodlify, noodlify_for_equation, StringDict};

    const EPS: u32 = 50;

    fn single_symbol(symbol: u32) -> Nfa {
        let mut nfa = trans_nfa(2, &[(0, symbol, 1)]);
        nfa.make_initial(0).unwrap();
        nfa.make_final(1).unwrap();
        nfa
    }

    #[test]
    fn noodlify_concatenation_recovers_operands() {
        let cat = concatenate_over_epsilon(&single_symbol(1), &single_symbol(2), EPS);
        let noodles = noodlify(&cat, EPS, false);

        assert_eq!(noodles.len(), 1);
        assert_eq!(noodles[0].len(), 2);
        assert!(noodles[0][0].accepts(&[1]));
        assert!(!noodles[0][0].accepts(&[2]));
        assert!(noodles[0][1].accepts(&[2]));
    }

    #[test]
    fn noodlify_without_epsilon_gives_one_trimmed_noodle() {
        let mut nfa = trans_nfa(3, &[(0, 1, 1)]);
        nfa.make_initial(0).unwrap();
        nfa.make_final(1).unwrap();
        let noodles = noodlify(&nfa, EPS, false);

        assert_eq!(noodles.len(), 1);
        assert_eq!(noodles[0].len(), 1);
        // The lone dead state must have been trimmed away.
        assert_eq!(noodles[0][0].num_states(), 2);
    }

    #[test]
    fn noodlify_empty_language_respects_include_empty() {
        let mut nfa = trans_nfa(2, &[(0, 1, 1)]);
        nfa.make_initial(0).unwrap();
        // No final states: empty language.
        assert!(noodlify(&nfa, EPS, false).is_empty());

        let with_empty = noodlify(&nfa, EPS, true);
        assert_eq!(with_empty.len(), 1);
        assert_eq!(with_empty[0].len(), 1);
        assert_eq!(with_empty[0][0].num_states(), 0);
    }

    #[test]
    fn equation_empty_lhs_is_not_an_error() {
        let rhs = single_symbol(1);
        let noodles = noodlify_for_equation(&[], &rhs, false, &StringDict::new()).unwrap();
        assert!(noodles.is_empty());
    }

    #[test]
    fn equation_empty_rhs_language() {
        let lhs = vec![single_symbol(1)];
        let rhs = trans_nfa(1, &[]);
        let noodles = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();
        assert!(noodles.is_empty());
    }

    #[test]
    fn equation_does_not_mutate_inputs() {
        let lhs = vec![single_symbol(1), single_symbol(2)];
        let rhs = {
            let mut nfa = trans_nfa(3, &[(0, 1, 1), (1, 2, 2)]);
            nfa.make_initial(0).unwrap();
            nfa.make_final(2).unwrap();
            nfa
        };
        let lhs_before = lhs.clone();
        let rhs_before = rhs.clone();
        noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();
        assert_eq!(lhs, lhs_before);
        assert_eq!(rhs, rhs_before);
    }

    #[test]
    fn reduce_params_do_not_change_noodle_count() {
        let lhs = vec![single_symbol(1), single_symbol(2)];
        let rhs = {
            let mut nfa = trans_nfa(3, &[(0, 1, 1), (1, 2, 2)]);
            nfa.make_initial(0).unwrap();
            nfa.make_final(2).unwrap();
            nfa
        };

        let plain = noodlify_for_equation(&lhs, &rhs, false, &StringDict::new()).unwrap();
        for value in ["forward", "backward", "bidirectional", "nonsense"] {
            let mut params = StringDict::new();
            params.insert("reduce".to_owned(), value.to_owned());
            let reduced = noodlify_for_equation(&lhs, &rhs, false, &params).unwrap();
            assert_eq!(reduced.len(), plain.len(), "reduce = {}", value);
        }
    }
}
