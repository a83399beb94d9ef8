//! Which real modifier slot carries which virtual modifier.

use crate::backend::{BackendError, KeyboardBackend, Keycode, ModifierKeycodes};
use crate::keysyms::{self, Keysym};
use crate::modifiers::{IgnorableModifiers, RealModifiers, VirtualModifiers, MODIFIER_SLOTS};

/// Virtual modifiers carried by each real modifier slot (Shift, Lock, Control, Mod1..Mod5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierMap {
    slots: [VirtualModifiers; MODIFIER_SLOTS],
}

/// Slots that always carry the same virtual modifier, whatever keys are bound to them.
const FIXED_SLOTS: [VirtualModifiers; MODIFIER_SLOTS] = [
    VirtualModifiers::SHIFT,
    VirtualModifiers::LOCK,
    VirtualModifiers::CONTROL,
    VirtualModifiers::ALT,
    VirtualModifiers::MOD2,
    VirtualModifiers::MOD3,
    VirtualModifiers::MOD4,
    VirtualModifiers::MOD5,
];

impl ModifierMap {
    /// Tag every slot with the virtual modifiers its keys produce.
    pub fn build(
        keycodes: &ModifierKeycodes,
        keysyms_for: impl Fn(Keycode) -> Vec<Keysym>,
    ) -> Self {
        let mut slots = FIXED_SLOTS;
        for (slot, codes) in slots.iter_mut().zip(keycodes.iter()) {
            for &keycode in codes {
                for keysym in keysyms_for(keycode) {
                    *slot |= virtual_for_keysym(keysym);
                }
            }
        }
        Self { slots }
    }

    pub fn from_backend<B: KeyboardBackend + ?Sized>(backend: &B) -> Result<Self, BackendError> {
        let keycodes = backend.modifier_keycodes()?;
        Ok(Self::build(&keycodes, |keycode| {
            backend.keysyms_for_keycode(keycode)
        }))
    }

    /// Real modifiers of every slot that carries at least one of `virtual_mods`.
    pub fn resolve(&self, virtual_mods: VirtualModifiers) -> RealModifiers {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, carried)| carried.intersects(virtual_mods))
            .fold(RealModifiers::empty(), |real, (index, _)| {
                real | RealModifiers::from_slot(index)
            })
    }

    /// Real masks of the lock modifiers. Caps Lock always lives in the Lock slot.
    pub fn ignorable(&self) -> IgnorableModifiers {
        IgnorableModifiers {
            num_lock: self.resolve(VirtualModifiers::NUM_LOCK),
            caps_lock: RealModifiers::LOCK,
            scroll_lock: self.resolve(VirtualModifiers::SCROLL_LOCK),
        }
    }
}

fn virtual_for_keysym(keysym: Keysym) -> VirtualModifiers {
    match keysym {
        keysyms::NUM_LOCK => VirtualModifiers::NUM_LOCK,
        keysyms::SCROLL_LOCK => VirtualModifiers::SCROLL_LOCK,
        keysyms::META_L | keysyms::META_R => VirtualModifiers::META,
        keysyms::HYPER_L | keysyms::HYPER_R => VirtualModifiers::HYPER,
        keysyms::SUPER_L | keysyms::SUPER_R => VirtualModifiers::SUPER,
        keysyms::MODE_SWITCH => VirtualModifiers::MODE_SWITCH,
        _ => VirtualModifiers::empty(),
    }
}

struct CachedModifierMap {
    serial: u64,
    map: ModifierMap,
}

/// Turns virtual modifiers into real ones for the current keyboard mapping.
///
/// The map is built on first use and cached against the backend's keymap
/// serial. [`invalidate`](Self::invalidate) drops it when the mapping changes.
#[derive(Default)]
pub struct VirtualModifierResolver {
    cache: Option<CachedModifierMap>,
}

impl VirtualModifierResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_modmap<B: KeyboardBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<&ModifierMap, BackendError> {
        let serial = backend.keymap_serial();
        let cached = match self.cache.take() {
            Some(cached) if cached.serial == serial => cached,
            _ => {
                let map = ModifierMap::from_backend(backend)?;
                tracing::debug!("Built modifier map for keymap {}: {:?}", serial, map);
                CachedModifierMap { serial, map }
            }
        };
        Ok(&self.cache.insert(cached).map)
    }

    pub fn resolve<B: KeyboardBackend + ?Sized>(
        &mut self,
        backend: &B,
        virtual_mods: VirtualModifiers,
    ) -> Result<RealModifiers, BackendError> {
        Ok(self.lookup_modmap(backend)?.resolve(virtual_mods))
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}
