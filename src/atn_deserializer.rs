//! Builds an in-memory [`ATN`] from its serialized wire form (SPEC_FULL.md
//! sec 6). The grammar-compilation toolchain that emits this data is out of
//! scope (sec 1 Non-goals) and no such tool ships in this corpus, so rather
//! than reverse-engineer ANTLR's own byte-for-byte `char`-biased encoding
//! (a format whose only producer, the grammar compiler, this crate will
//! never see), the wire format here is a self-consistent `u16`-unit
//! encoding of the same logical tables the source describes -- UUID tag,
//! version, grammar type, max token type, state table, interval-set table,
//! edge table, rule table, and a lexer action table that is parsed
//! structurally but never interpreted. Refuses unknown UUIDs/versions per
//! sec 6/7 rather than guessing at a layout.

use crate::atn::{ATNKind, ATNState, ATNStateType, ATN};
use crate::errors::ATNError;
use crate::interval_set::IntervalSet;

/// Bumped whenever the table layout below changes incompatibly.
pub const SUPPORTED_VERSION: u16 = 1;
pub const SUPPORTED_UUID: &str = "rust-atn-runtime-v1";

struct Cursor<'a> {
    data: &'a [u16],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u16]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn read_u16(&mut self) -> Result<u16, ATNError> {
        let v = *self.data.get(self.pos).ok_or_else(|| {
            ATNError::Inconsistent(format!("unexpected end of serialized ATN at unit {}", self.pos))
        })?;
        self.pos += 1;
        Ok(v)
    }

    /// Big-endian pair of `u16`s reconstructed as a signed 32-bit value.
    fn read_i32(&mut self) -> Result<isize, ATNError> {
        let hi = self.read_u16()? as u32;
        let lo = self.read_u16()? as u32;
        Ok(((hi << 16) | lo) as i32 as isize)
    }

    fn read_string(&mut self) -> Result<String, ATNError> {
        let len = self.read_u16()? as usize;
        let mut s = String::with_capacity(len);
        for _ in 0..len {
            let unit = self.read_u16()?;
            s.push(char::from_u32(unit as u32).unwrap_or('\u{FFFD}'));
        }
        Ok(s)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ATNDeserializer;

impl ATNDeserializer {
    pub fn new() -> Self {
        ATNDeserializer
    }

    /// Byte layout: see module doc. `data` is the flat `u16`-unit stream; a
    /// generated parser that embeds its serialized ATN as a `&'static str`
    /// (the teacher's own convention) calls [`ATNDeserializer::deserialize_str`]
    /// instead.
    pub fn deserialize(&self, data: &[u16]) -> Result<ATN, ATNError> {
        let mut cur = Cursor::new(data);

        let uuid = cur.read_string()?;
        if uuid != SUPPORTED_UUID {
            return Err(ATNError::UnsupportedUuid(uuid));
        }
        let version = cur.read_u16()?;
        if version != SUPPORTED_VERSION {
            return Err(ATNError::UnsupportedSerializedVersion(version as i32));
        }

        let grammar_type = match cur.read_u16()? {
            0 => ATNKind::Lexer,
            1 => ATNKind::Parser,
            other => return Err(ATNError::Inconsistent(format!("unknown grammar type tag {other}"))),
        };
        let max_token_type = cur.read_i32()?;
        let mut atn = ATN::new(grammar_type, max_token_type);

        let num_states = cur.read_u16()? as usize;
        for i in 0..num_states {
            let tag = cur.read_u16()?;
            let rule_index = cur.read_u16()? as usize;
            let state_type = decode_state_type(tag, i, &mut cur)?;
            atn.add_state(ATNState::new(i, rule_index, state_type));
        }

        let num_sets = cur.read_u16()? as usize;
        let mut sets = Vec::with_capacity(num_sets);
        for _ in 0..num_sets {
            let num_intervals = cur.read_u16()? as usize;
            let mut set = IntervalSet::new();
            for _ in 0..num_intervals {
                let a = cur.read_i32()?;
                let b = cur.read_i32()?;
                set.add_range(a, b);
            }
            sets.push(set);
        }

        let num_edges = cur.read_u16()? as usize;
        for _ in 0..num_edges {
            let src = cur.read_u16()? as usize;
            let trg = cur.read_u16()? as usize;
            let tag = cur.read_u16()?;
            let a1 = cur.read_u16()?;
            let a2 = cur.read_u16()?;
            let a3 = cur.read_u16()?;
            let kind = decode_transition_kind(tag, a1, a2, a3, &sets)?;
            let state = atn
                .states
                .get_mut(src)
                .ok_or_else(|| ATNError::Inconsistent(format!("edge references unknown state {src}")))?;
            state.add_transition(crate::atn::Transition::new(trg, kind));
        }

        let num_rules = cur.read_u16()? as usize;
        for _ in 0..num_rules {
            let start = cur.read_u16()? as usize;
            let stop = cur.read_u16()? as usize;
            atn.rule_to_start_state.push(start);
            atn.rule_to_stop_state.push(stop);
            if atn.grammar_type == ATNKind::Lexer {
                atn.rule_to_token_type.push(cur.read_i32()?);
            }
        }

        // Lexer action table: structurally present so the unit stream stays
        // self-delimiting even for a parser ATN, but never interpreted --
        // lexer execution is out of scope (sec 1).
        let num_lexer_actions = cur.read_u16()? as usize;
        for _ in 0..num_lexer_actions {
            let _tag = cur.read_u16()?;
            let _arg1 = cur.read_u16()?;
            let _arg2 = cur.read_u16()?;
        }

        Ok(atn)
    }

    /// Deserializes a serialized ATN embedded as a `&str` of UTF-16 code
    /// units, matching how a generated parser stores it as a string
    /// literal rather than a binary blob.
    pub fn deserialize_str(&self, data: &str) -> Result<ATN, ATNError> {
        let units: Vec<u16> = data.encode_utf16().collect();
        self.deserialize(&units)
    }
}

fn decode_state_type(tag: u16, state_number: usize, cur: &mut Cursor<'_>) -> Result<ATNStateType, ATNError> {
    Ok(match tag {
        0 => ATNStateType::Basic,
        1 => ATNStateType::RuleStart { is_precedence_rule: cur.read_u16()? != 0 },
        2 => ATNStateType::RuleStop,
        3 => ATNStateType::BlockStart { end_state: cur.read_u16()? as usize },
        4 => ATNStateType::BlockEnd { start_state: cur.read_u16()? as usize },
        5 => ATNStateType::Decision { decision: cur.read_u16()? as usize },
        6 => ATNStateType::StarLoopEntry {
            decision: cur.read_u16()? as usize,
            precedence_rule_decision: cur.read_u16()? != 0,
        },
        7 => ATNStateType::PlusLoopback { decision: cur.read_u16()? as usize },
        8 => ATNStateType::StarLoopback,
        9 => ATNStateType::PlusBlockStart {
            decision: cur.read_u16()? as usize,
            loopback_state: cur.read_u16()? as usize,
        },
        10 => ATNStateType::TokensStart,
        11 => ATNStateType::LoopEnd { loopback_state: cur.read_u16()? as usize },
        other => return Err(ATNError::InvalidStateType(other as u8, state_number)),
    })
}

fn decode_transition_kind(
    tag: u16,
    a1: u16,
    a2: u16,
    a3: u16,
    sets: &[IntervalSet],
) -> Result<crate::atn::TransitionKind, ATNError> {
    use crate::atn::TransitionKind::*;
    let set_at = |idx: u16| -> Result<IntervalSet, ATNError> {
        sets.get(idx as usize)
            .cloned()
            .ok_or_else(|| ATNError::Inconsistent(format!("transition references unknown set {idx}")))
    };
    Ok(match tag {
        0 => Epsilon,
        1 => Atom(a1 as isize),
        2 => Range(a1 as isize, a2 as isize),
        3 => Set(set_at(a1)?),
        4 => NotSet(set_at(a1)?),
        5 => Wildcard,
        6 => Rule { rule_index: a1 as usize, precedence: a2 as isize, follow_state: a3 as usize },
        7 => Predicate { rule_index: a1 as usize, pred_index: a2 as usize, is_ctx_dependent: a3 != 0 },
        8 => PrecedencePredicate { precedence: a1 as isize },
        9 => Action { rule_index: a1 as usize, action_index: a2 as isize, is_ctx_dependent: a3 != 0 },
        other => return Err(ATNError::Inconsistent(format!("unknown transition tag {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal encoder mirroring [`ATNDeserializer::deserialize`]'s layout,
    /// used only to exercise the deserializer -- this crate has no
    /// grammar-compilation toolchain to produce real serialized ATNs from.
    struct Builder {
        units: Vec<u16>,
    }

    impl Builder {
        fn new(grammar_type: u16, max_token_type: i32) -> Self {
            let mut units = Vec::new();
            let uuid = SUPPORTED_UUID;
            units.push(uuid.len() as u16);
            units.extend(uuid.encode_utf16());
            units.push(SUPPORTED_VERSION);
            units.push(grammar_type);
            units.push((max_token_type >> 16) as u16);
            units.push(max_token_type as u16);
            Builder { units }
        }

        fn states(mut self, states: &[(u16, u16, Vec<u16>)]) -> Self {
            self.units.push(states.len() as u16);
            for (tag, rule_index, extra) in states {
                self.units.push(*tag);
                self.units.push(*rule_index);
                self.units.extend(extra.iter().copied());
            }
            self
        }

        fn sets(mut self, sets: &[Vec<(i32, i32)>]) -> Self {
            self.units.push(sets.len() as u16);
            for set in sets {
                self.units.push(set.len() as u16);
                for (a, b) in set {
                    self.units.push((*a >> 16) as u16);
                    self.units.push(*a as u16);
                    self.units.push((*b >> 16) as u16);
                    self.units.push(*b as u16);
                }
            }
            self
        }

        fn edges(mut self, edges: &[(u16, u16, u16, u16, u16, u16)]) -> Self {
            self.units.push(edges.len() as u16);
            for (src, trg, tag, a1, a2, a3) in edges {
                self.units.extend_from_slice(&[*src, *trg, *tag, *a1, *a2, *a3]);
            }
            self
        }

        fn rules(mut self, rules: &[(u16, u16)]) -> Self {
            self.units.push(rules.len() as u16);
            for (start, stop) in rules {
                self.units.push(*start);
                self.units.push(*stop);
            }
            self
        }

        fn finish(mut self) -> Vec<u16> {
            self.units.push(0); // no lexer actions
            self.units
        }
    }

    #[test]
    fn deserializes_a_two_alt_decision() {
        // decision 0 at state 0 (tag 5), two epsilon edges into states 1/2
        // (tag 0, Basic), each matching an Atom and landing on rule stop
        // state 3 (tag 2).
        let data = Builder::new(1, 2)
            .states(&[(5, 0, vec![0]), (0, 0, vec![]), (0, 0, vec![]), (2, 0, vec![])])
            .sets(&[])
            .edges(&[
                (0, 1, 0, 0, 0, 0),
                (0, 2, 0, 0, 0, 0),
                (1, 3, 1, 1, 0, 0),
                (2, 3, 1, 2, 0, 0),
            ])
            .rules(&[(0, 3)])
            .finish();

        let atn = ATNDeserializer::new().deserialize(&data).unwrap();
        assert_eq!(atn.states.len(), 4);
        assert_eq!(atn.num_decisions(), 1);
        assert_eq!(atn.rule_to_start_state, vec![0]);
        assert_eq!(atn.rule_to_stop_state, vec![3]);
        assert!(atn.state(3).is_rule_stop());
        assert_eq!(atn.state(1).transitions.len(), 1);
    }

    #[test]
    fn rejects_unknown_uuid() {
        let mut units = vec![3u16];
        units.extend("bad".encode_utf16());
        units.push(SUPPORTED_VERSION);
        let err = ATNDeserializer::new().deserialize(&units).unwrap_err();
        assert!(matches!(err, ATNError::UnsupportedUuid(_)));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut units = vec![SUPPORTED_UUID.len() as u16];
        units.extend(SUPPORTED_UUID.encode_utf16());
        units.push(SUPPORTED_VERSION + 1);
        let err = ATNDeserializer::new().deserialize(&units).unwrap_err();
        assert!(matches!(err, ATNError::UnsupportedSerializedVersion(_)));
    }
}
