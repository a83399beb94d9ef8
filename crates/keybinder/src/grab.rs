//! Global hotkey grabs.

use std::cell::Cell;
use std::rc::Rc;

use crate::accelerator::Accelerator;
use crate::backend::{BackendError, KeyboardBackend, KeyboardEvent, Keycode, Timestamp};
use crate::keysyms::Keysym;
use crate::modifiers::{IgnorableModifiers, RealModifiers};
use crate::modmap::VirtualModifierResolver;

/// Invoked with the bound accelerator string when its hotkey is pressed.
pub type Handler = Rc<dyn Fn(&str)>;

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("empty keybinding")]
    Empty,
    #[error("cannot parse keybinding '{0}'")]
    Unparseable(String),
    #[error("no keycode produces '{keystring}' (keysym 0x{keysym:x})")]
    NoKeycode { keystring: String, keysym: Keysym },
    #[error("grabbing '{keystring}' failed: {detail}")]
    Protocol { keystring: String, detail: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Timestamp of the key press currently being dispatched.
///
/// Clones share state with the manager that handed them out, so a handler
/// can read the time without borrowing the manager.
#[derive(Debug, Clone, Default)]
pub struct EventClock(Rc<Cell<Option<Timestamp>>>);

impl EventClock {
    /// `None` outside of dispatch, meaning "current server time".
    pub fn current_event_time(&self) -> Option<Timestamp> {
        self.0.get()
    }
}

struct Binding {
    keystring: String,
    handler: Handler,
    keycode: Keycode,
    modifiers: RealModifiers,
}

/// Owns the active hotkey bindings and the grabs that back them.
///
/// Each binding is grabbed once per combination of the lock modifiers
/// (Num Lock, Caps Lock, Scroll Lock), and those modifiers are stripped from
/// incoming events before matching, so lock state never changes whether a
/// hotkey fires. Dispatch is a linear scan; the binding count is small.
pub struct KeyGrabManager<B: KeyboardBackend> {
    backend: B,
    resolver: VirtualModifierResolver,
    ignorable: IgnorableModifiers,
    bindings: Vec<Binding>,
    clock: EventClock,
}

impl<B: KeyboardBackend> KeyGrabManager<B> {
    pub fn new(backend: B) -> Result<Self, BackendError> {
        let mut resolver = VirtualModifierResolver::new();
        let ignorable = resolver.lookup_modmap(&backend)?.ignorable();
        tracing::debug!("Ignorable lock modifiers: {:?}", ignorable);
        Ok(Self {
            backend,
            resolver,
            ignorable,
            bindings: Vec::new(),
            clock: EventClock::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn event_clock(&self) -> EventClock {
        self.clock.clone()
    }

    pub fn current_event_time(&self) -> Option<Timestamp> {
        self.clock.current_event_time()
    }

    /// Accelerator strings of the active bindings, oldest first.
    pub fn bound_keystrings(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.keystring.as_str())
    }

    /// Parse `keystring`, resolve it for the current keymap and grab it.
    ///
    /// On failure nothing is recorded. Grabs that succeeded before a protocol
    /// error are left in place.
    pub fn bind(&mut self, keystring: &str, handler: Handler) -> Result<(), BindError> {
        let (keycode, modifiers) = self.resolve(keystring)?;

        if self
            .bindings
            .iter()
            .any(|b| b.keycode == keycode && b.modifiers == modifiers)
        {
            tracing::warn!(
                "'{}' uses the same key combination as an existing binding; only the older one fires",
                keystring
            );
        }

        self.grab(keystring, keycode, modifiers)?;
        tracing::info!(
            "Bound '{}' (keycode {}, modifiers {:?})",
            keystring,
            keycode,
            modifiers
        );
        self.bindings.push(Binding {
            keystring: keystring.to_string(),
            handler,
            keycode,
            modifiers,
        });
        Ok(())
    }

    /// Remove the binding made with exactly this `keystring` and `handler`.
    /// Returns false if there was none.
    pub fn unbind(&mut self, keystring: &str, handler: &Handler) -> bool {
        let Some(index) = self
            .bindings
            .iter()
            .position(|b| b.keystring == keystring && Rc::ptr_eq(&b.handler, handler))
        else {
            tracing::trace!("No binding for '{}' to remove", keystring);
            return false;
        };
        let binding = self.bindings.remove(index);
        self.ungrab(&binding);
        tracing::info!("Unbound '{}'", keystring);
        true
    }

    pub fn unbind_all(&mut self) {
        for binding in std::mem::take(&mut self.bindings) {
            self.ungrab(&binding);
        }
    }

    /// Run the handler of the first binding matching a key press.
    /// Returns whether one fired.
    pub fn dispatch(&self, keycode: Keycode, state: u16, time: Timestamp) -> bool {
        let event_mods = RealModifiers::from_event_state(state) - self.ignorable.all();
        let Some(binding) = self
            .bindings
            .iter()
            .find(|b| b.keycode == keycode && b.modifiers == event_mods)
        else {
            tracing::trace!("Key press {} {:?} matches no binding", keycode, event_mods);
            return false;
        };

        tracing::debug!("Hotkey '{}' pressed at {}", binding.keystring, time);
        self.clock.0.set(Some(time));
        (binding.handler)(&binding.keystring);
        self.clock.0.set(None);
        true
    }

    /// Feed one keyboard event. Returns whether a handler ran.
    pub fn handle_event(&mut self, event: &KeyboardEvent) -> bool {
        match *event {
            KeyboardEvent::KeyPress {
                keycode,
                state,
                time,
            } => self.dispatch(keycode, state, time),
            KeyboardEvent::KeyRelease { keycode, state, .. } => {
                tracing::trace!("Key release {} (state {:#x})", keycode, state);
                false
            }
            KeyboardEvent::MappingChanged => {
                self.on_keymap_changed();
                false
            }
        }
    }

    /// Move every grab over to the new keyboard mapping.
    pub fn on_keymap_changed(&mut self) {
        tracing::info!("Keymap changed, regrabbing {} binding(s)", self.bindings.len());
        for binding in &self.bindings {
            self.ungrab(binding);
        }

        if let Err(err) = self.backend.refresh_keymap() {
            tracing::warn!("Reloading the keyboard mapping failed: {}", err);
        }
        self.resolver.invalidate();
        match self.resolver.lookup_modmap(&self.backend) {
            Ok(modmap) => self.ignorable = modmap.ignorable(),
            Err(err) => tracing::warn!("Keeping previous lock modifiers: {}", err),
        }

        for mut binding in std::mem::take(&mut self.bindings) {
            match self.resolve(&binding.keystring) {
                Ok((keycode, modifiers)) => {
                    binding.keycode = keycode;
                    binding.modifiers = modifiers;
                }
                Err(err) => tracing::warn!(
                    "'{}' no longer resolves, keeping its old key: {}",
                    binding.keystring,
                    err
                ),
            }
            // Failures are logged inside; the binding stays so a later mapping can revive it.
            let _ = self.grab(&binding.keystring, binding.keycode, binding.modifiers);
            self.bindings.push(binding);
        }
    }

    /// Whether `keycode` is bound to any modifier slot.
    pub fn is_modifier(&self, keycode: Keycode) -> bool {
        match self.backend.modifier_keycodes() {
            Ok(slots) => slots.iter().any(|codes| codes.contains(&keycode)),
            Err(err) => {
                tracing::warn!("Cannot read modifier mapping: {}", err);
                false
            }
        }
    }

    fn resolve(&mut self, keystring: &str) -> Result<(Keycode, RealModifiers), BindError> {
        let trimmed = keystring.trim();
        if trimmed.is_empty() {
            return Err(BindError::Empty);
        }

        let accel: Accelerator = trimmed
            .parse()
            .map_err(|_| BindError::Unparseable(keystring.to_string()))?;

        let keycode = self
            .backend
            .keysym_to_keycode(accel.keysym)
            .filter(|keycode| *keycode != 0)
            .ok_or_else(|| BindError::NoKeycode {
                keystring: keystring.to_string(),
                keysym: accel.keysym,
            })?;

        let real = self.resolver.resolve(&self.backend, accel.modifiers)?;
        Ok((keycode, real - self.ignorable.all()))
    }

    fn grab(
        &self,
        keystring: &str,
        keycode: Keycode,
        modifiers: RealModifiers,
    ) -> Result<(), BindError> {
        let masks = self.ignorable.combinations().map(|combo| modifiers | combo);
        tracing::debug!("Grabbing '{}': keycode {} masks {:?}", keystring, keycode, masks);
        self.backend.grab_keys(keycode, &masks).map_err(|err| {
            tracing::warn!("Binding '{}' failed: {}", keystring, err);
            match err {
                BackendError::Protocol(detail) => BindError::Protocol {
                    keystring: keystring.to_string(),
                    detail,
                },
                other => BindError::Backend(other),
            }
        })
    }

    fn ungrab(&self, binding: &Binding) {
        let masks = self
            .ignorable
            .combinations()
            .map(|combo| binding.modifiers | combo);
        tracing::debug!(
            "Ungrabbing '{}': keycode {} masks {:?}",
            binding.keystring,
            binding.keycode,
            masks
        );
        if let Err(err) = self.backend.ungrab_keys(binding.keycode, &masks) {
            tracing::warn!("Ungrabbing '{}' failed: {}", binding.keystring, err);
        }
    }
}

impl<B: KeyboardBackend> Drop for KeyGrabManager<B> {
    fn drop(&mut self) {
        self.unbind_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keysyms;
    use crate::testing::FakeKeyboard;
    use std::cell::RefCell;

    fn recorder() -> (Handler, Rc<RefCell<Vec<String>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let handler: Handler = Rc::new(move |keystring: &str| {
            sink.borrow_mut().push(keystring.to_string());
        });
        (handler, calls)
    }

    fn manager() -> KeyGrabManager<FakeKeyboard> {
        KeyGrabManager::new(FakeKeyboard::us_layout()).unwrap()
    }

    fn keycode(manager: &KeyGrabManager<FakeKeyboard>, name: &str) -> Keycode {
        manager
            .backend()
            .keycode_of(keysyms::from_name(name).unwrap())
    }

    #[test]
    fn bind_grabs_every_lock_combination() {
        let mut manager = manager();
        let (handler, _) = recorder();
        manager.bind("<Control>t", handler).unwrap();

        let t = keycode(&manager, "t");
        assert_eq!(manager.backend().grab_count(), 8);
        for locks in [
            RealModifiers::empty(),
            RealModifiers::MOD2,
            RealModifiers::LOCK,
            RealModifiers::MOD5,
            RealModifiers::MOD2 | RealModifiers::LOCK | RealModifiers::MOD5,
        ] {
            assert!(manager
                .backend()
                .is_grabbed(t, RealModifiers::CONTROL | locks));
        }
    }

    #[test]
    fn control_t_fires_under_every_lock_state() {
        let mut manager = manager();
        let (handler, calls) = recorder();
        manager.bind("<Control>t", handler).unwrap();
        let t = keycode(&manager, "t");

        let ignorable = manager.ignorable;
        for locks in ignorable.combinations() {
            let state = (RealModifiers::CONTROL | locks).bits();
            assert!(manager.dispatch(t, state, 1), "locks {:?}", locks);
        }
        assert_eq!(calls.borrow().len(), 8);
    }

    #[test]
    fn extra_real_modifier_does_not_fire() {
        let mut manager = manager();
        let (handler, calls) = recorder();
        manager.bind("<Control>t", handler).unwrap();
        let t = keycode(&manager, "t");

        let state = (RealModifiers::CONTROL | RealModifiers::SHIFT).bits();
        assert!(!manager.dispatch(t, state, 1));
        assert!(!manager.dispatch(t, 0, 1));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn super_resolves_to_mod4() {
        let mut manager = manager();
        let (handler, calls) = recorder();
        manager.bind("<Super>F1", handler).unwrap();
        let f1 = keycode(&manager, "F1");

        assert!(manager.dispatch(f1, RealModifiers::MOD4.bits(), 5));
        assert_eq!(*calls.borrow(), vec!["<Super>F1".to_string()]);
    }

    #[test]
    fn bind_failures_leave_no_binding() {
        let mut manager = manager();
        let (handler, _) = recorder();

        assert!(matches!(
            manager.bind("   ", handler.clone()),
            Err(BindError::Empty)
        ));
        assert!(matches!(
            manager.bind("<Control>nosuchkey", handler.clone()),
            Err(BindError::Unparseable(_))
        ));
        assert!(matches!(
            manager.bind("F30", handler.clone()),
            Err(BindError::NoKeycode { keysym, .. }) if keysym == keysyms::F1 + 29
        ));

        let f2 = keycode(&manager, "F2");
        manager.backend().fail_grabs_for(f2);
        assert!(matches!(
            manager.bind("F2", handler),
            Err(BindError::Protocol { .. })
        ));

        assert_eq!(manager.bound_keystrings().count(), 0);
        assert_eq!(manager.backend().grab_count(), 0);
    }

    #[test]
    #[tracing_test::traced_test]
    fn grab_errors_are_logged_with_the_keystring() {
        let mut manager = manager();
        let (handler, _) = recorder();
        let f5 = keycode(&manager, "F5");
        manager.backend().fail_grabs_for(f5);

        assert!(manager.bind("<Alt>F5", handler).is_err());
        assert!(logs_contain("Binding '<Alt>F5' failed"));
    }

    #[test]
    fn unbind_requires_the_same_handler() {
        let mut manager = manager();
        let (handler, _) = recorder();
        let (other, _) = recorder();
        manager.bind("F12", handler.clone()).unwrap();

        assert!(!manager.unbind("F12", &other));
        assert!(!manager.unbind("F11", &handler));
        assert_eq!(manager.backend().grab_count(), 8);

        assert!(manager.unbind("F12", &handler));
        assert_eq!(manager.backend().grab_count(), 0);
        assert_eq!(manager.bound_keystrings().count(), 0);
    }

    #[test]
    fn first_registered_duplicate_wins() {
        let mut manager = manager();
        let (first, first_calls) = recorder();
        let (second, second_calls) = recorder();
        manager.bind("<Control>q", first).unwrap();
        manager.bind("<Ctrl>Q", second).unwrap();

        let q = keycode(&manager, "q");
        assert!(manager.dispatch(q, RealModifiers::CONTROL.bits(), 1));
        assert_eq!(first_calls.borrow().len(), 1);
        assert!(second_calls.borrow().is_empty());
    }

    #[test]
    fn event_time_is_visible_only_during_dispatch() {
        let mut manager = manager();
        let clock = manager.event_clock();
        let seen = Rc::new(Cell::new(None));
        let seen_in_handler = Rc::clone(&seen);
        let handler_clock = clock.clone();
        manager
            .bind(
                "F1",
                Rc::new(move |_: &str| seen_in_handler.set(handler_clock.current_event_time())),
            )
            .unwrap();

        let f1 = keycode(&manager, "F1");
        let event = KeyboardEvent::KeyPress {
            keycode: f1,
            state: 0,
            time: 4242,
        };
        assert!(manager.handle_event(&event));
        assert_eq!(seen.get(), Some(4242));
        assert_eq!(manager.current_event_time(), None);
        assert_eq!(clock.current_event_time(), None);
    }

    #[test]
    fn key_release_does_not_dispatch() {
        let mut manager = manager();
        let (handler, calls) = recorder();
        manager.bind("F1", handler).unwrap();
        let f1 = keycode(&manager, "F1");

        let event = KeyboardEvent::KeyRelease {
            keycode: f1,
            state: 0,
            time: 1,
        };
        assert!(!manager.handle_event(&event));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn keymap_change_regrabs_with_new_modifiers() {
        let mut manager = manager();
        let (handler, calls) = recorder();
        manager.bind("<Super>t", handler).unwrap();
        let t = keycode(&manager, "t");
        assert!(manager.backend().is_grabbed(t, RealModifiers::MOD4));

        // Move both Super keys and Hyper onto Mod3.
        let super_r = keysyms::SUPER_R;
        let backend = &mut manager.backend;
        backend.move_modifier(keysyms::SUPER_L, 5);
        backend.move_modifier(super_r, 5);
        backend.move_modifier(keysyms::HYPER_L, 5);
        manager.handle_event(&KeyboardEvent::MappingChanged);

        assert!(!manager.backend().is_grabbed(t, RealModifiers::MOD4));
        assert!(manager.backend().is_grabbed(t, RealModifiers::MOD3));
        assert_eq!(manager.backend().grab_count(), 8);
        assert!(manager.dispatch(t, RealModifiers::MOD3.bits(), 1));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn modifier_keys_are_recognized() {
        let manager = manager();
        assert!(manager.is_modifier(keycode(&manager, "Shift_L")));
        assert!(manager.is_modifier(keycode(&manager, "Num_Lock")));
        assert!(!manager.is_modifier(keycode(&manager, "a")));
    }

    #[test]
    fn unbind_all_releases_grabs() {
        let mut manager = manager();
        let (handler, _) = recorder();
        manager.bind("F3", handler).unwrap();
        manager.unbind_all();
        assert_eq!(manager.backend().grab_count(), 0);
    }
}
