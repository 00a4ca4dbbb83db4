//! Access-control masks for topic subscriptions.
//!
//! Permissions travel on the wire as short symbolic strings ("JRWP", "N",
//! "+W-S"). [`AccessMask`] is the parsed bitset form; [`AccessControl`]
//! groups the per-subscription masks (given, want, mode, default) and
//! implements the merge semantics used when the server sends partial
//! updates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::str::FromStr;

use crate::error::MaskError;

/// A set of topic permissions, encoded compactly as a bitset.
///
/// The string form uses one letter per permission in the canonical order
/// `JRWPASDO`; an empty mask is written `"N"`. Parsing and display
/// round-trip exactly for any valid mask.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessMask(u8);

impl AccessMask {
    /// No permissions.
    pub const NONE: Self = Self(0);
    /// Permission to subscribe to the topic.
    pub const JOIN: Self = Self(0x01);
    /// Permission to receive messages.
    pub const READ: Self = Self(0x02);
    /// Permission to publish messages.
    pub const WRITE: Self = Self(0x04);
    /// Permission to receive presence updates.
    pub const PRESENCE: Self = Self(0x08);
    /// Permission to approve new subscribers.
    pub const APPROVE: Self = Self(0x10);
    /// Permission to invite others.
    pub const SHARE: Self = Self(0x20);
    /// Permission to hard-delete messages.
    pub const DELETE: Self = Self(0x40);
    /// Topic ownership.
    pub const OWNER: Self = Self(0x80);

    /// Canonical letter order for the string encoding.
    const LETTERS: [(char, u8); 8] = [
        ('J', 0x01),
        ('R', 0x02),
        ('W', 0x04),
        ('P', 0x08),
        ('A', 0x10),
        ('S', 0x20),
        ('D', 0x40),
        ('O', 0x80),
    ];

    /// Check whether any permission is set.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check whether all permissions in `other` are present in `self`.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Permissions present in `self` but not in `other`.
    pub fn without(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Apply an incremental or absolute update string.
    ///
    /// Updates starting with `+` or `-` are deltas: `"+RW-P"` grants read
    /// and write and revokes presence. Anything else is an absolute
    /// assignment parsed like [`AccessMask::from_str`]. Returns whether
    /// the mask actually changed.
    pub fn update(&mut self, update: &str) -> Result<bool, MaskError> {
        if update.is_empty() {
            return Ok(false);
        }
        let before = *self;
        if !update.starts_with(['+', '-']) {
            *self = update.parse()?;
            return Ok(*self != before);
        }

        let mut grant = true;
        for ch in update.chars() {
            match ch {
                '+' => grant = true,
                '-' => grant = false,
                _ => {
                    let bit = Self::bit_for(ch)?;
                    if grant {
                        self.0 |= bit;
                    } else {
                        self.0 &= !bit;
                    }
                }
            }
        }
        Ok(*self != before)
    }

    fn bit_for(ch: char) -> Result<u8, MaskError> {
        Self::LETTERS
            .iter()
            .find(|(letter, _)| *letter == ch)
            .map(|(_, bit)| *bit)
            .ok_or(MaskError::InvalidLetter(ch))
    }
}

impl FromStr for AccessMask {
    type Err = MaskError;

    /// Parse the symbolic string form. `"N"` and the empty string parse
    /// to the empty mask; any letter outside `JRWPASDO` is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "N" {
            return Ok(Self::NONE);
        }
        let mut bits = 0u8;
        for ch in s.chars() {
            bits |= Self::bit_for(ch)?;
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "N");
        }
        for (letter, bit) in Self::LETTERS {
            if self.0 & bit != 0 {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessMask({self})")
    }
}

impl BitAnd for AccessMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for AccessMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl TryFrom<String> for AccessMask {
    type Error = MaskError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AccessMask> for String {
    fn from(mask: AccessMask) -> Self {
        mask.to_string()
    }
}

/// An incremental access-control change sent by the server.
///
/// Each field carries an update string in the format accepted by
/// [`AccessMask::update`]; absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDelta {
    /// Change to the mask granted by the peer or server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
    /// Change to the mask requested by this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub want: Option<String>,
}

impl AccessDelta {
    /// A delta touching only the granted mask.
    pub fn given(update: impl Into<String>) -> Self {
        Self {
            given: Some(update.into()),
            want: None,
        }
    }

    /// A delta touching only the requested mask.
    pub fn want(update: impl Into<String>) -> Self {
        Self {
            given: None,
            want: Some(update.into()),
        }
    }

    /// A delta touching both masks.
    pub fn both(given: impl Into<String>, want: impl Into<String>) -> Self {
        Self {
            given: Some(given.into()),
            want: Some(want.into()),
        }
    }
}

/// The access-control state of one subscription.
///
/// `mode` is the effective mask, recomputed as `given ∩ want` whenever
/// either side changes. `default_mode` is the fallback applied to new
/// subscriptions. A control object is considered defined only when
/// `mode` is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    /// Mask granted by the peer or server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<AccessMask>,
    /// Mask requested by this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub want: Option<AccessMask>,
    /// Effective mask, normally `given ∩ want`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AccessMask>,
    /// Fallback mask for new subscriptions.
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<AccessMask>,
}

impl AccessControl {
    /// Check whether the effective mode is known.
    pub fn is_mode_defined(&self) -> bool {
        self.mode.is_some()
    }

    /// Merge an incoming control object into this one.
    ///
    /// Each field is replaced if the incoming side carries it and the
    /// value differs; a field present only locally is never dropped.
    /// When `given` or `want` changes, `mode` is recomputed from the
    /// merged masks. Returns whether anything changed.
    pub fn merge(&mut self, incoming: &Self) -> bool {
        let mut changed = false;
        let mut masks_changed = false;

        if let Some(given) = incoming.given {
            if self.given != Some(given) {
                self.given = Some(given);
                changed = true;
                masks_changed = true;
            }
        }
        if let Some(want) = incoming.want {
            if self.want != Some(want) {
                self.want = Some(want);
                changed = true;
                masks_changed = true;
            }
        }
        if let Some(default_mode) = incoming.default_mode {
            if self.default_mode != Some(default_mode) {
                self.default_mode = Some(default_mode);
                changed = true;
            }
        }

        if masks_changed {
            changed |= self.recompute_mode();
        } else if let Some(mode) = incoming.mode {
            if self.mode != Some(mode) {
                self.mode = Some(mode);
                changed = true;
            }
        }
        changed
    }

    /// Apply an incremental delta to the `given`/`want` masks and
    /// recompute `mode`. Returns whether anything changed.
    pub fn apply_delta(&mut self, delta: &AccessDelta) -> Result<bool, MaskError> {
        let mut changed = false;

        if let Some(update) = &delta.given {
            let mut mask = self.given.unwrap_or(AccessMask::NONE);
            let was_set = self.given.is_some();
            changed |= mask.update(update)? || !was_set;
            self.given = Some(mask);
        }
        if let Some(update) = &delta.want {
            let mut mask = self.want.unwrap_or(AccessMask::NONE);
            let was_set = self.want.is_some();
            changed |= mask.update(update)? || !was_set;
            self.want = Some(mask);
        }

        changed |= self.recompute_mode();
        Ok(changed)
    }

    /// Recompute `mode = given ∩ want` when both sides are known.
    ///
    /// With only one side known the stored mode is left alone: a merge
    /// must not invent or destroy an effective mask it cannot derive.
    fn recompute_mode(&mut self) -> bool {
        if let (Some(given), Some(want)) = (self.given, self.want) {
            let mode = given & want;
            if self.mode != Some(mode) {
                self.mode = Some(mode);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(s: &str) -> AccessMask {
        s.parse().unwrap()
    }

    #[test]
    fn parse_roundtrips_exactly() {
        for s in ["N", "J", "RW", "JRWPASDO", "JRW", "O"] {
            assert_eq!(mask(s).to_string(), s);
        }
    }

    #[test]
    fn parse_normalizes_letter_order() {
        assert_eq!(mask("WRJ").to_string(), "JRW");
    }

    #[test]
    fn parse_rejects_unknown_letters() {
        assert_eq!("RXW".parse::<AccessMask>(), Err(MaskError::InvalidLetter('X')));
        assert_eq!("z".parse::<AccessMask>(), Err(MaskError::InvalidLetter('z')));
    }

    #[test]
    fn empty_string_parses_to_none() {
        assert_eq!(mask(""), AccessMask::NONE);
        assert_eq!(mask("N"), AccessMask::NONE);
        assert_eq!(AccessMask::NONE.to_string(), "N");
    }

    #[test]
    fn update_applies_delta() {
        let mut m = mask("JR");
        assert!(m.update("+W-R").unwrap());
        assert_eq!(m, mask("JW"));
    }

    #[test]
    fn update_reports_no_change() {
        let mut m = mask("JRW");
        assert!(!m.update("+R").unwrap());
        assert_eq!(m, mask("JRW"));
    }

    #[test]
    fn update_absolute_assignment() {
        let mut m = mask("JRW");
        assert!(m.update("PA").unwrap());
        assert_eq!(m, mask("PA"));

        assert!(m.update("N").unwrap());
        assert_eq!(m, AccessMask::NONE);
    }

    #[test]
    fn update_rejects_unknown_letter_in_delta() {
        let mut m = mask("JR");
        assert!(m.update("+X").is_err());
    }

    #[test]
    fn set_operations() {
        assert_eq!(mask("JRW") & mask("RWP"), mask("RW"));
        assert_eq!(mask("JR") | mask("W"), mask("JRW"));
        assert_eq!(mask("JRW").without(mask("R")), mask("JW"));
        assert!(mask("JRW").contains(mask("JR")));
        assert!(!mask("JR").contains(mask("W")));
    }

    #[test]
    fn mask_serde_uses_string_form() {
        let json = serde_json::to_string(&mask("JRW")).unwrap();
        assert_eq!(json, "\"JRW\"");
        let back: AccessMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask("JRW"));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = AccessControl {
            given: Some(mask("JRWP")),
            want: Some(mask("JRW")),
            mode: Some(mask("JRW")),
            default_mode: None,
        };
        let same = a.clone();
        assert!(!a.merge(&same));
        assert_eq!(a, same);
    }

    #[test]
    fn merge_replaces_differing_fields() {
        let mut a = AccessControl {
            given: Some(mask("JR")),
            want: Some(mask("JRW")),
            mode: Some(mask("JR")),
            default_mode: None,
        };
        let incoming = AccessControl {
            given: Some(mask("JRW")),
            ..Default::default()
        };
        assert!(a.merge(&incoming));
        assert_eq!(a.given, Some(mask("JRW")));
        // Mode recomputed from the merged masks.
        assert_eq!(a.mode, Some(mask("JRW")));
    }

    #[test]
    fn merge_never_drops_local_fields() {
        let mut a = AccessControl {
            given: Some(mask("JRW")),
            want: None,
            mode: Some(mask("JRW")),
            default_mode: Some(mask("JR")),
        };
        let incoming = AccessControl {
            want: Some(mask("JR")),
            ..Default::default()
        };
        assert!(a.merge(&incoming));
        assert_eq!(a.given, Some(mask("JRW")));
        assert_eq!(a.default_mode, Some(mask("JR")));
        assert_eq!(a.mode, Some(mask("JR")));
    }

    #[test]
    fn merge_commutes_on_disjoint_fields() {
        let base = AccessControl {
            given: Some(mask("JRWP")),
            want: Some(mask("JRWP")),
            mode: Some(mask("JRWP")),
            default_mode: None,
        };
        let touch_given = AccessControl {
            given: Some(mask("JRW")),
            ..Default::default()
        };
        let touch_want = AccessControl {
            want: Some(mask("JR")),
            ..Default::default()
        };

        let mut ab = base.clone();
        ab.merge(&touch_given);
        ab.merge(&touch_want);

        let mut ba = base.clone();
        ba.merge(&touch_want);
        ba.merge(&touch_given);

        assert_eq!(ab, ba);
        assert_eq!(ab.mode, Some(mask("JR")));
    }

    #[test]
    fn delta_with_both_sides_defines_mode() {
        let mut acs = AccessControl::default();
        let changed = acs.apply_delta(&AccessDelta::both("RW", "RW")).unwrap();
        assert!(changed);
        assert!(acs.is_mode_defined());
        assert_eq!(acs.mode, Some(mask("RW")));
    }

    #[test]
    fn one_sided_delta_leaves_mode_undefined() {
        let mut acs = AccessControl::default();
        acs.apply_delta(&AccessDelta::want("+RW")).unwrap();
        assert!(!acs.is_mode_defined());
    }

    #[test]
    fn apply_delta_reports_no_change() {
        let mut acs = AccessControl {
            given: Some(mask("JRW")),
            want: Some(mask("JRW")),
            mode: Some(mask("JRW")),
            default_mode: None,
        };
        let changed = acs.apply_delta(&AccessDelta::given("+R")).unwrap();
        assert!(!changed);
    }

    #[test]
    fn apply_delta_recomputes_mode() {
        let mut acs = AccessControl {
            given: Some(mask("JRWP")),
            want: Some(mask("JRWP")),
            mode: Some(mask("JRWP")),
            default_mode: None,
        };
        let changed = acs.apply_delta(&AccessDelta::want("-P")).unwrap();
        assert!(changed);
        assert_eq!(acs.mode, Some(mask("JRW")));
    }
}
