//! Pure functions over alt-subsets/config sets deciding conflict and
//! ambiguity, per SPEC_FULL.md sec 4.6. No mutable state; callers thread
//! the resulting verdicts back into the simulator's loop.

use crate::atn::{ATN, INVALID_ALT};
use crate::atn_config_set::ATNConfigSet;
use fixedbitset::FixedBitSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionMode {
    Sll,
    #[default]
    Ll,
    LlExactAmbigDetection,
}

pub fn all_configs_in_rule_stop_states(set: &ATNConfigSet, atn: &ATN) -> bool {
    set.iter().all(|c| atn.state(c.state).is_rule_stop())
}

pub fn has_config_in_rule_stop_state(set: &ATNConfigSet, atn: &ATN) -> bool {
    set.iter().any(|c| atn.state(c.state).is_rule_stop())
}

pub fn get_alts(alt_subsets: &[FixedBitSet]) -> FixedBitSet {
    let cap = alt_subsets.iter().map(|b| b.len()).max().unwrap_or(0);
    let mut all = FixedBitSet::with_capacity(cap);
    for subset in alt_subsets {
        all.union_with(subset);
    }
    all
}

/// `INVALID_ALT` unless every subset agrees on exactly the same single alt.
pub fn get_single_viable_alt(alt_subsets: &[FixedBitSet]) -> usize {
    let all = get_alts(alt_subsets);
    if all.count_ones(..) == 1 {
        all.ones().next().unwrap_or(INVALID_ALT)
    } else {
        INVALID_ALT
    }
}

pub fn all_subsets_conflict(alt_subsets: &[FixedBitSet]) -> bool {
    !all_subsets_equal(alt_subsets)
}

pub fn all_subsets_equal(alt_subsets: &[FixedBitSet]) -> bool {
    match alt_subsets.split_first() {
        None => true,
        Some((first, rest)) => rest.iter().all(|s| s == first),
    }
}

/// `INVALID_ALT` unless every config in the set agrees on the same alt.
pub fn get_unique_alt(set: &ATNConfigSet) -> usize {
    set.get_unique_alt()
}

/// Terminates SLL prediction when further lookahead cannot disambiguate.
/// Short-circuits first on the case no amount of lookahead can ever resolve:
/// every surviving config has already run off the end of its rule, so there
/// is nothing left to match against. Otherwise, a real conflict requires
/// every (state, context) group to already be ambiguous on its own (size
/// >= 2) -- if even one group is pinned to a single alt, that group is still
/// a clean escape route further lookahead can reach, so prediction should
/// keep consuming input rather than give up here.
pub fn has_sll_conflict_terminating_prediction(mode: PredictionMode, set: &ATNConfigSet, atn: &ATN) -> bool {
    if all_configs_in_rule_stop_states(set, atn) {
        return true;
    }
    if mode == PredictionMode::LlExactAmbigDetection {
        return false;
    }
    let subsets = set.get_conflicting_alt_subsets();
    has_conflicting_alt_set(&subsets) && !has_non_conflicting_alt_set(&subsets)
}

fn has_conflicting_alt_set(subsets: &[FixedBitSet]) -> bool {
    subsets.iter().any(|s| s.count_ones(..) > 1)
}

fn has_non_conflicting_alt_set(subsets: &[FixedBitSet]) -> bool {
    subsets.iter().any(|s| s.count_ones(..) == 1)
}

/// Used in full-LL to pick the minimum viable alt when conflict detection
/// declines to report ambiguity outright; see DESIGN.md for the resolved
/// open question on tie-breaking.
pub fn resolves_to_just_one_viable_alt(alt_subsets: &[FixedBitSet]) -> usize {
    let alts = get_alts(alt_subsets);
    alts.ones().next().unwrap_or(INVALID_ALT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(alts: &[usize], cap: usize) -> FixedBitSet {
        let mut b = FixedBitSet::with_capacity(cap);
        for &a in alts {
            b.insert(a);
        }
        b
    }

    #[test]
    fn single_viable_alt_requires_full_agreement() {
        let subsets = vec![bits(&[1], 3), bits(&[1], 3)];
        assert_eq!(get_single_viable_alt(&subsets), 1);
        let subsets2 = vec![bits(&[1], 3), bits(&[2], 3)];
        assert_eq!(get_single_viable_alt(&subsets2), INVALID_ALT);
    }

    #[test]
    fn all_subsets_equal_detects_identical_sequences() {
        let subsets = vec![bits(&[1, 2], 3), bits(&[1, 2], 3)];
        assert!(all_subsets_equal(&subsets));
        let subsets2 = vec![bits(&[1, 2], 3), bits(&[1], 3)];
        assert!(!all_subsets_equal(&subsets2));
    }

    #[test]
    fn resolves_to_just_one_viable_alt_picks_minimum() {
        let subsets = vec![bits(&[2, 3], 4), bits(&[1, 3], 4)];
        assert_eq!(resolves_to_just_one_viable_alt(&subsets), 1);
    }

    /// Ten `Basic` (non-rule-stop) states, numbered 0..=9, just enough for
    /// the fixtures below to index into.
    fn basic_states_atn() -> ATN {
        use crate::atn::{ATNKind, ATNState, ATNStateType};
        let mut atn = ATN::new(ATNKind::Parser, 3);
        for i in 0..10 {
            atn.add_state(ATNState::new(i, 0, ATNStateType::Basic));
        }
        atn
    }

    #[test]
    fn distinct_single_alt_groups_are_not_a_terminating_conflict() {
        use crate::atn_config::ATNConfig;
        use crate::atn_config_set::ATNConfigSet;
        use crate::prediction_context::{MergeCache, PredictionContext};

        // Two configs at different states, each the sole occupant of its
        // alt: nothing here is actually ambiguous, just not yet narrowed by
        // input, so SLL should keep looking rather than give up.
        let mut set = ATNConfigSet::new(false);
        let mut cache = MergeCache::new();
        set.add(ATNConfig::new(5, 1, PredictionContext::empty()), &mut cache).unwrap();
        set.add(ATNConfig::new(9, 2, PredictionContext::empty()), &mut cache).unwrap();
        let atn = basic_states_atn();
        assert!(!has_sll_conflict_terminating_prediction(PredictionMode::Ll, &set, &atn));
    }

    #[test]
    fn genuinely_ambiguous_group_terminates_sll_prediction() {
        use crate::atn_config::ATNConfig;
        use crate::atn_config_set::ATNConfigSet;
        use crate::prediction_context::{MergeCache, PredictionContext};

        // Both alts land on the *same* (state, context): a real ambiguity no
        // amount of further lookahead will split apart.
        let mut set = ATNConfigSet::new(false);
        let mut cache = MergeCache::new();
        set.add(ATNConfig::new(9, 1, PredictionContext::empty()), &mut cache).unwrap();
        set.add(ATNConfig::new(9, 2, PredictionContext::empty()), &mut cache).unwrap();
        let atn = basic_states_atn();
        assert!(has_sll_conflict_terminating_prediction(PredictionMode::Ll, &set, &atn));
    }

    #[test]
    fn all_configs_already_at_rule_stop_terminates_sll_prediction() {
        use crate::atn::{ATNKind, ATNState, ATNStateType};
        use crate::atn_config::ATNConfig;
        use crate::atn_config_set::ATNConfigSet;
        use crate::prediction_context::{MergeCache, PredictionContext};

        // Two single-config groups, neither individually conflicting by the
        // alt-subset heuristic -- but every config has already run off the
        // end of its rule, so no further lookahead can possibly disambiguate.
        let mut atn = ATN::new(ATNKind::Parser, 3);
        atn.add_state(ATNState::new(0, 0, ATNStateType::RuleStop));
        atn.add_state(ATNState::new(1, 0, ATNStateType::RuleStop));
        let mut set = ATNConfigSet::new(false);
        let mut cache = MergeCache::new();
        set.add(ATNConfig::new(0, 1, PredictionContext::empty()), &mut cache).unwrap();
        set.add(ATNConfig::new(1, 2, PredictionContext::empty()), &mut cache).unwrap();
        assert!(has_sll_conflict_terminating_prediction(PredictionMode::Ll, &set, &atn));
    }
}
