//! Spell descriptors consumed by the area-effect tracker.
//!
//! Only the fields the engine needs to decide targeting are modelled here;
//! spell scripting and damage formulas live with the callers.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Identifier of a spell template.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spell#{}", self.0)
    }
}

/// Highest effect slot a spell carries.
pub const MAX_EFFECT_INDEX: u8 = 2;

/// Whether a spell helps or harms its targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Beneficial: targets must be assistable by the caster.
    Positive,
    /// Harmful: targets must be attackable by the caster.
    Negative,
    /// Scripted area: no friend-or-foe filtering at all.
    Neutral,
}

bitflags! {
    /// Spell attributes that relax or tighten targeting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SpellAttributes: u32 {
        /// Only player-controlled observers can be affected.
        const ONLY_ON_PLAYERS = 1 << 0;
        /// Immunities are ignored.
        const NO_IMMUNITIES = 1 << 1;
        /// Line of sight is not required.
        const IGNORE_LINE_OF_SIGHT = 1 << 2;
    }
}

/// The spell an area object keeps applying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaSpell {
    /// Spell template
    pub id: SpellId,
    /// Which effect slot (`0..=MAX_EFFECT_INDEX`) of the spell the area
    /// object drives
    pub effect_index: u8,
    /// Friend-or-foe targeting mode
    pub polarity: Polarity,
    /// When non-empty, only mobiles with one of these entries qualify and
    /// polarity is not consulted
    pub target_entries: Vec<u32>,
    /// Targeting attributes
    pub attributes: SpellAttributes,
}

impl AreaSpell {
    /// A harmful area spell driving effect slot 0.
    #[must_use]
    pub fn harmful(id: u32) -> Self {
        Self {
            id: SpellId(id),
            effect_index: 0,
            polarity: Polarity::Negative,
            target_entries: Vec::new(),
            attributes: SpellAttributes::empty(),
        }
    }

    /// A beneficial area spell driving effect slot 0.
    #[must_use]
    pub fn beneficial(id: u32) -> Self {
        Self {
            polarity: Polarity::Positive,
            ..Self::harmful(id)
        }
    }

    /// Restrict targets to mobiles with the given entries.
    #[must_use]
    pub fn with_target_entries(mut self, entries: Vec<u32>) -> Self {
        self.target_entries = entries;
        self
    }

    /// Add targeting attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: SpellAttributes) -> Self {
        self.attributes |= attributes;
        self
    }

    /// Drive a different effect slot, clamped to [`MAX_EFFECT_INDEX`].
    #[must_use]
    pub fn with_effect_index(mut self, effect_index: u8) -> Self {
        self.effect_index = effect_index.min(MAX_EFFECT_INDEX);
        self
    }

    /// Returns `true` if the attribute is set.
    #[must_use]
    pub fn has(&self, attribute: SpellAttributes) -> bool {
        self.attributes.contains(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let spell = AreaSpell::beneficial(10)
            .with_effect_index(2)
            .with_attributes(SpellAttributes::NO_IMMUNITIES)
            .with_attributes(SpellAttributes::IGNORE_LINE_OF_SIGHT);

        assert_eq!(spell.polarity, Polarity::Positive);
        assert_eq!(spell.effect_index, 2);
        assert!(spell.has(SpellAttributes::NO_IMMUNITIES));
        assert!(spell.has(SpellAttributes::IGNORE_LINE_OF_SIGHT));
        assert!(!spell.has(SpellAttributes::ONLY_ON_PLAYERS));
    }

    #[test]
    fn effect_index_is_clamped() {
        assert_eq!(AreaSpell::harmful(1).with_effect_index(8).effect_index, MAX_EFFECT_INDEX);
        assert_eq!(AreaSpell::harmful(1).with_effect_index(u8::MAX).effect_index, MAX_EFFECT_INDEX);
    }

    #[test]
    fn display_spell_id() {
        assert_eq!(SpellId(133).to_string(), "spell#133");
    }
}
