//! Virtual and real modifier masks.
//!
//! A *virtual* modifier names what the user pressed (NumLock, Super, Alt...).
//! A *real* modifier is one of the eight core X11 modifier bits (Shift, Lock,
//! Control, Mod1..Mod5). Which real bit carries which virtual modifier depends
//! on the active keyboard mapping, see [`crate::ModifierMap`].

use bitflags::bitflags;

bitflags! {
    /// Modifiers as written in an accelerator string.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VirtualModifiers: u32 {
        const SHIFT = 1 << 0;
        /// Caps Lock.
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        /// Alt, always carried by Mod1.
        const ALT = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const META = 1 << 24;
        const SUPER = 1 << 25;
        const HYPER = 1 << 26;
        const MODE_SWITCH = 1 << 27;
        const NUM_LOCK = 1 << 28;
        const SCROLL_LOCK = 1 << 29;
        /// Fire on key release instead of press.
        const RELEASE = 1 << 30;
    }
}

bitflags! {
    /// The eight core X11 modifier bits, laid out like `xproto::ModMask`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RealModifiers: u16 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
    }
}

impl RealModifiers {
    /// Real modifier for the slot at `index` (0 = Shift ... 7 = Mod5).
    pub fn from_slot(index: usize) -> Self {
        debug_assert!(index < MODIFIER_SLOTS);
        Self::from_bits_truncate(1 << index)
    }

    /// Keep only the core modifier bits of a raw event state (drops button bits).
    pub fn from_event_state(state: u16) -> Self {
        Self::from_bits_truncate(state)
    }
}

/// Number of real modifier slots in the X11 modifier mapping.
pub const MODIFIER_SLOTS: usize = 8;

/// Real masks of the lock modifiers that must not influence hotkey matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IgnorableModifiers {
    pub num_lock: RealModifiers,
    pub caps_lock: RealModifiers,
    pub scroll_lock: RealModifiers,
}

impl IgnorableModifiers {
    /// Union of all ignorable lock masks.
    pub fn all(&self) -> RealModifiers {
        self.num_lock | self.caps_lock | self.scroll_lock
    }

    /// Every subset of {NumLock, CapsLock, ScrollLock}, starting with none.
    ///
    /// Grabbing a key once per entry keeps the binding alive whatever locks are on.
    pub fn combinations(&self) -> [RealModifiers; 8] {
        let (num, caps, scroll) = (self.num_lock, self.caps_lock, self.scroll_lock);
        [
            RealModifiers::empty(),
            num,
            caps,
            scroll,
            num | caps,
            num | scroll,
            caps | scroll,
            num | caps | scroll,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_bits_match_core_protocol_masks() {
        assert_eq!(RealModifiers::SHIFT.bits(), 0x01);
        assert_eq!(RealModifiers::LOCK.bits(), 0x02);
        assert_eq!(RealModifiers::CONTROL.bits(), 0x04);
        assert_eq!(RealModifiers::MOD1.bits(), 0x08);
        assert_eq!(RealModifiers::MOD5.bits(), 0x80);
    }

    #[test]
    fn event_state_drops_pointer_buttons() {
        // Button1 is 0x100 in the core protocol.
        let state = 0x100 | RealModifiers::CONTROL.bits();
        assert_eq!(
            RealModifiers::from_event_state(state),
            RealModifiers::CONTROL
        );
    }

    #[test]
    fn combinations_cover_every_lock_subset() {
        let ignorable = IgnorableModifiers {
            num_lock: RealModifiers::MOD2,
            caps_lock: RealModifiers::LOCK,
            scroll_lock: RealModifiers::MOD5,
        };
        let combos = ignorable.combinations();
        let mut bits: Vec<u16> = combos.iter().map(|m| m.bits()).collect();
        bits.sort_unstable();
        bits.dedup();
        assert_eq!(bits.len(), 8);
        assert!(combos.iter().all(|m| ignorable.all().contains(*m)));
    }
}
