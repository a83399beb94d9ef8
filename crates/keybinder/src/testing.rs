//! In-memory keyboard used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use crate::backend::{BackendError, KeyboardBackend, Keycode, ModifierKeycodes};
use crate::keysyms::{self, Keysym};
use crate::modifiers::RealModifiers;

pub struct FakeKeyboard {
    keymap: BTreeMap<Keycode, Vec<Keysym>>,
    modifiers: ModifierKeycodes,
    serial: u64,
    grabs: RefCell<BTreeSet<(Keycode, u16)>>,
    failing: RefCell<BTreeSet<Keycode>>,
    modifier_queries: Cell<usize>,
}

impl FakeKeyboard {
    /// A pc105 US layout, reduced to the keys the tests need.
    pub fn us_layout() -> Self {
        let mut keymap = BTreeMap::new();
        let letters = [
            (24, "qwertyuiop"),
            (38, "asdfghjkl"),
            (52, "zxcvbnm"),
        ];
        for (first, row) in letters {
            for (offset, c) in row.chars().enumerate() {
                let lower = keysyms::from_char(c);
                keymap.insert(first + offset as Keycode, vec![lower, lower - 0x20]);
            }
        }
        for (offset, c) in "1234567890".chars().enumerate() {
            keymap.insert(10 + offset as Keycode, vec![keysyms::from_char(c)]);
        }
        for n in 0..10 {
            keymap.insert(67 + n as Keycode, vec![keysyms::F1 + n]);
        }
        let named: [(Keycode, &str); 19] = [
            (9, "Escape"),
            (36, "Return"),
            (37, "Control_L"),
            (50, "Shift_L"),
            (62, "Shift_R"),
            (64, "Alt_L"),
            (65, "space"),
            (66, "Caps_Lock"),
            (77, "Num_Lock"),
            (78, "Scroll_Lock"),
            (95, "F11"),
            (96, "F12"),
            (105, "Control_R"),
            (108, "Alt_R"),
            (112, "Page_Up"),
            (133, "Super_L"),
            (134, "Super_R"),
            (203, "Mode_switch"),
            (207, "Hyper_L"),
        ];
        for (keycode, name) in named {
            if let Some(keysym) = keysyms::from_name(name) {
                keymap.insert(keycode, vec![keysym]);
            }
        }
        // Alt_L doubles as Meta_L on the shifted level.
        if let Some(alt) = keymap.get_mut(&64) {
            alt.push(keysyms::META_L);
        }

        let modifiers: ModifierKeycodes = [
            vec![50, 62],
            vec![66],
            vec![37, 105],
            vec![64, 108],
            vec![77],
            vec![],
            vec![133, 134, 207],
            vec![78, 203],
        ];

        Self {
            keymap,
            modifiers,
            serial: 1,
            grabs: RefCell::default(),
            failing: RefCell::default(),
            modifier_queries: Cell::new(0),
        }
    }

    pub fn keycode_of(&self, keysym: Keysym) -> Keycode {
        self.keysym_to_keycode(keysym).unwrap_or(0)
    }

    /// Rebind the key producing `keysym` to the modifier slot `slot`.
    /// Takes effect for resolution only after `refresh_keymap`.
    pub fn move_modifier(&mut self, keysym: Keysym, slot: usize) {
        let keycode = self.keycode_of(keysym);
        for codes in self.modifiers.iter_mut() {
            codes.retain(|&code| code != keycode);
        }
        self.modifiers[slot].push(keycode);
    }

    /// Make every grab of `keycode` fail like a key grabbed by another client.
    pub fn fail_grabs_for(&self, keycode: Keycode) {
        self.failing.borrow_mut().insert(keycode);
    }

    pub fn grabs(&self) -> BTreeSet<(Keycode, u16)> {
        self.grabs.borrow().clone()
    }

    pub fn grab_count(&self) -> usize {
        self.grabs.borrow().len()
    }

    pub fn is_grabbed(&self, keycode: Keycode, mask: RealModifiers) -> bool {
        self.grabs.borrow().contains(&(keycode, mask.bits()))
    }

    pub fn modifier_queries(&self) -> usize {
        self.modifier_queries.get()
    }
}

impl KeyboardBackend for FakeKeyboard {
    fn keymap_serial(&self) -> u64 {
        self.serial
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes, BackendError> {
        self.modifier_queries.set(self.modifier_queries.get() + 1);
        Ok(self.modifiers.clone())
    }

    fn keysyms_for_keycode(&self, keycode: Keycode) -> Vec<Keysym> {
        self.keymap.get(&keycode).cloned().unwrap_or_default()
    }

    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode> {
        self.keymap
            .iter()
            .find(|(_, syms)| syms.contains(&keysym))
            .map(|(keycode, _)| *keycode)
    }

    fn grab_keys(&self, keycode: Keycode, masks: &[RealModifiers]) -> Result<(), BackendError> {
        if self.failing.borrow().contains(&keycode) {
            return Err(BackendError::Protocol(
                "BadAccess (attempt to access private resource denied)".into(),
            ));
        }
        let mut grabs = self.grabs.borrow_mut();
        for mask in masks {
            grabs.insert((keycode, mask.bits()));
        }
        Ok(())
    }

    fn ungrab_keys(&self, keycode: Keycode, masks: &[RealModifiers]) -> Result<(), BackendError> {
        let mut grabs = self.grabs.borrow_mut();
        for mask in masks {
            grabs.remove(&(keycode, mask.bits()));
        }
        Ok(())
    }

    fn refresh_keymap(&mut self) -> Result<(), BackendError> {
        self.serial += 1;
        Ok(())
    }
}
