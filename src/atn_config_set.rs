//! Ordered config sequence plus equality-key lookup, with merge-on-insert
//! semantics (SPEC_FULL.md sec 3 / 4.2).

use crate::atn::{ATNStateType, ATN};
use crate::atn_config::{ATNConfig, ConfigKey};
use crate::errors::ATNError;
use crate::prediction_context::{self, MergeCache};
use crate::semantic_context::{PredicateEvaluator, SemanticContext};
use fixedbitset::FixedBitSet;
use rustc_hash::FxHashMap;
use std::rc::Rc;

pub const INVALID_ALT: usize = 0;

#[derive(Debug, Clone, Default)]
pub struct ATNConfigSet {
    configs: Vec<ATNConfig>,
    lookup: FxHashMap<Key, usize>,
    pub full_ctx: bool,
    pub has_semantic_context: bool,
    pub dips_into_outer_context: bool,
    pub unique_alt: usize,
    pub conflicting_alts: Option<FixedBitSet>,
    readonly: bool,
}

#[derive(PartialEq, Eq, Hash, Clone)]
struct Key(usize, usize, u64);

fn hash_sem(sem: &Rc<SemanticContext>) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut h = rustc_hash::FxHasher::default();
    sem.hash(&mut h);
    h.finish()
}

fn key_of(k: &ConfigKey) -> Key {
    Key(k.state, k.alt, hash_sem(&k.semantic_context))
}

impl ATNConfigSet {
    pub fn new(full_ctx: bool) -> Self {
        ATNConfigSet {
            configs: Vec::new(),
            lookup: FxHashMap::default(),
            full_ctx,
            has_semantic_context: false,
            dips_into_outer_context: false,
            unique_alt: INVALID_ALT,
            conflicting_alts: None,
            readonly: false,
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ATNConfig> {
        self.configs.iter()
    }

    pub fn configs(&self) -> &[ATNConfig] {
        &self.configs
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn freeze(&mut self) {
        self.readonly = true;
    }

    /// Inserts `config`, merging contexts on an equality-key collision per
    /// sec 4.2. Returns `true` if the set changed (new key or context
    /// actually widened).
    pub fn add(&mut self, config: ATNConfig, merge_cache: &mut MergeCache) -> Result<bool, ATNError> {
        if self.readonly {
            return Err(ATNError::ConfigSetFrozen);
        }
        if !config.semantic_context.is_none() {
            self.has_semantic_context = true;
        }
        let key = key_of(&config.equality_key());
        if let Some(&idx) = self.lookup.get(&key) {
            let existing = &mut self.configs[idx];
            let merged = prediction_context::merge(&existing.context, &config.context, !self.full_ctx, merge_cache);
            let changed = !Rc::ptr_eq(&merged, &existing.context);
            existing.context = merged;
            existing.reaches_into_outer_context =
                existing.reaches_into_outer_context.max(config.reaches_into_outer_context);
            existing.precedence_filter_suppressed |= config.precedence_filter_suppressed;
            Ok(changed)
        } else {
            self.lookup.insert(key, self.configs.len());
            self.configs.push(config);
            Ok(true)
        }
    }

    /// Full-LL precedence-rule filter (sec 4.2): first pass collects
    /// alt-1 states that have a non-null `evalPrecedence`; second pass
    /// drops alts > 1 whose (state, context) equal an alt-1 entry and which
    /// are not precedence-suppressed.
    pub fn apply_precedence_filter(
        &self,
        evaluator: &mut dyn PredicateEvaluator,
        merge_cache: &mut MergeCache,
    ) -> Result<ATNConfigSet, ATNError> {
        let mut states_from_alt1: FxHashMap<usize, Rc<crate::prediction_context::PredictionContext>> = FxHashMap::default();
        let mut out = ATNConfigSet::new(self.full_ctx);
        for c in &self.configs {
            if c.alt != 1 {
                continue;
            }
            if let Some(simplified) = c.semantic_context.eval_precedence(evaluator) {
                states_from_alt1.insert(c.state, Rc::clone(&c.context));
                let mut kept = c.clone();
                kept.semantic_context = simplified;
                out.add(kept, merge_cache)?;
            }
        }
        for c in &self.configs {
            if c.alt == 1 {
                continue;
            }
            if !c.precedence_filter_suppressed {
                if let Some(alt1_ctx) = states_from_alt1.get(&c.state) {
                    if *alt1_ctx == c.context {
                        continue;
                    }
                }
            }
            out.add(c.clone(), merge_cache)?;
        }
        Ok(out)
    }

    /// Returns a new set containing only configs whose state is a
    /// `RuleStop`; when `look_to_end_of_rule` is set, epsilon-only states
    /// that can still reach end-of-rule via `atn.next_tokens` are extended
    /// through to the stop state first.
    pub fn remove_all_configs_not_in_rule_stop_state(
        &self,
        look_to_end_of_rule: bool,
        atn: &ATN,
        merge_cache: &mut MergeCache,
    ) -> Result<ATNConfigSet, ATNError> {
        let mut out = ATNConfigSet::new(self.full_ctx);
        for c in &self.configs {
            if atn.state(c.state).is_rule_stop() {
                out.add(c.clone(), merge_cache)?;
                continue;
            }
            if look_to_end_of_rule && atn.state(c.state).is_epsilon_only_state() {
                let next = atn.next_tokens(c.state);
                if next.contains(crate::int_stream::EPSILON) {
                    // Can still reach end of rule with no more input needed;
                    // land the config on the stop state itself so the result
                    // is genuinely "only RuleStopState configs".
                    let rule_index = atn.state(c.state).rule_index;
                    let stop_state = atn.rule_to_stop_state[rule_index];
                    out.add(c.transition_to(stop_state, Rc::clone(&c.context)), merge_cache)?;
                }
            }
        }
        Ok(out)
    }

    /// Partitions by predicate validity; `NONE` contexts always land in
    /// `succeeded`.
    pub fn split_according_to_semantic_validity(
        &self,
        evaluator: &mut dyn PredicateEvaluator,
        merge_cache: &mut MergeCache,
    ) -> Result<(ATNConfigSet, ATNConfigSet), ATNError> {
        let mut succeeded = ATNConfigSet::new(self.full_ctx);
        let mut failed = ATNConfigSet::new(self.full_ctx);
        for c in &self.configs {
            if c.semantic_context.is_none() || c.semantic_context.eval(evaluator) {
                succeeded.add(c.clone(), merge_cache)?;
            } else {
                failed.add(c.clone(), merge_cache)?;
            }
        }
        Ok((succeeded, failed))
    }

    /// Groups configs by `(state, context)` and returns the alt-`BitSet`s
    /// -- the raw material conflict analysis (`PredictionMode`) works over.
    pub fn get_conflicting_alt_subsets(&self) -> Vec<FixedBitSet> {
        use std::hash::{Hash, Hasher};
        let mut groups: FxHashMap<(usize, u64), FixedBitSet> = FxHashMap::default();
        let max_alt = self.configs.iter().map(|c| c.alt).max().unwrap_or(0);
        for c in &self.configs {
            let mut h = rustc_hash::FxHasher::default();
            c.context.hash(&mut h);
            let group_key = (c.state, h.finish());
            let bits = groups.entry(group_key).or_insert_with(|| FixedBitSet::with_capacity(max_alt + 1));
            bits.insert(c.alt);
        }
        groups.into_values().collect()
    }

    /// Minimum alt among configs in a `RuleStop` state with an empty
    /// context path or which dip into the outer context; `INVALID_ALT` if
    /// none. The rule-stop half is built on
    /// [`ATNConfigSet::remove_all_configs_not_in_rule_stop_state`] so both
    /// share one notion of "reached the end of this rule".
    pub fn get_alt_that_finished_decision_entry_rule(&self, atn: &ATN, merge_cache: &mut MergeCache) -> Result<usize, ATNError> {
        let mut min_alt = None;
        let stopped = self.remove_all_configs_not_in_rule_stop_state(true, atn, merge_cache)?;
        for c in stopped.configs() {
            if c.context.has_empty_path() {
                min_alt = Some(min_alt.map_or(c.alt, |m: usize| m.min(c.alt)));
            }
        }
        for c in &self.configs {
            if c.reaches_into_outer_context > 0 {
                min_alt = Some(min_alt.map_or(c.alt, |m: usize| m.min(c.alt)));
            }
        }
        Ok(min_alt.unwrap_or(INVALID_ALT))
    }

    /// Convenience used by `ATNSimulator`: `INVALID_ALT` unless all configs
    /// agree on a single alt.
    pub fn get_unique_alt(&self) -> usize {
        let mut alt = None;
        for c in &self.configs {
            match alt {
                None => alt = Some(c.alt),
                Some(a) if a != c.alt => return INVALID_ALT,
                _ => {}
            }
        }
        alt.unwrap_or(INVALID_ALT)
    }

    pub fn rule_stop_states_only(&self, atn: &ATN) -> bool {
        self.configs.iter().all(|c| atn.state(c.state).is_rule_stop())
    }

    pub fn has_config_in_rule_stop_state(&self, atn: &ATN) -> bool {
        self.configs.iter().any(|c| atn.state(c.state).is_rule_stop())
    }

    pub fn is_precedence_decision(&self, atn: &ATN, decision_state: usize) -> bool {
        matches!(
            atn.state(decision_state).state_type,
            ATNStateType::StarLoopEntry { precedence_rule_decision: true, .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction_context::PredictionContext;

    #[test]
    fn add_merges_on_equality_key_collision() {
        let mut set = ATNConfigSet::new(false);
        let mut cache = MergeCache::new();
        let ctx_a = PredictionContext::singleton(PredictionContext::empty(), 1);
        let ctx_b = PredictionContext::singleton(PredictionContext::empty(), 2);
        set.add(ATNConfig::new(10, 1, ctx_a), &mut cache).unwrap();
        set.add(ATNConfig::new(10, 1, ctx_b), &mut cache).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.configs()[0].context.size(), 2);
    }

    #[test]
    fn freeze_rejects_further_adds() {
        let mut set = ATNConfigSet::new(false);
        let mut cache = MergeCache::new();
        set.add(ATNConfig::new(1, 1, PredictionContext::empty()), &mut cache).unwrap();
        set.freeze();
        let err = set.add(ATNConfig::new(2, 1, PredictionContext::empty()), &mut cache);
        assert!(matches!(err, Err(ATNError::ConfigSetFrozen)));
    }

    #[test]
    fn get_unique_alt_detects_disagreement() {
        let mut set = ATNConfigSet::new(false);
        let mut cache = MergeCache::new();
        set.add(ATNConfig::new(1, 1, PredictionContext::empty()), &mut cache).unwrap();
        assert_eq!(set.get_unique_alt(), 1);
        set.add(ATNConfig::new(2, 2, PredictionContext::empty()), &mut cache).unwrap();
        assert_eq!(set.get_unique_alt(), INVALID_ALT);
    }
}
