//! [`KeyboardBackend`] over an x11rb connection.

use std::rc::Rc;

use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::xproto::{ConnectionExt as _, GrabMode, Mapping, ModMask, Window};
use x11rb::protocol::Event;

use crate::backend::{
    BackendError, KeyboardBackend, KeyboardEvent, Keycode, ModifierKeycodes,
};
use crate::keysyms::{Keysym, NO_SYMBOL};
use crate::modifiers::{RealModifiers, MODIFIER_SLOTS};

impl From<ConnectionError> for BackendError {
    fn from(err: ConnectionError) -> Self {
        BackendError::Connection(err.to_string())
    }
}

impl From<ReplyError> for BackendError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::ConnectionError(err) => err.into(),
            ReplyError::X11Error(err) => BackendError::Protocol(format!(
                "{:?} (bad value {:#x}, major opcode {})",
                err.error_kind, err.bad_value, err.major_opcode
            )),
        }
    }
}

/// Keyboard state of one X display, grabbing on its root window.
pub struct X11Keyboard<C: Connection> {
    conn: Rc<C>,
    root: Window,
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
    serial: u64,
}

impl<C: Connection> X11Keyboard<C> {
    pub fn new(conn: Rc<C>, root: Window) -> Result<Self, BackendError> {
        let mut keyboard = Self {
            conn,
            root,
            min_keycode: 0,
            keysyms_per_keycode: 0,
            keysyms: Vec::new(),
            serial: 0,
        };
        keyboard.load_mapping()?;
        Ok(keyboard)
    }

    fn load_mapping(&mut self) -> Result<(), BackendError> {
        let (min, max) = {
            let setup = self.conn.setup();
            (setup.min_keycode, setup.max_keycode)
        };
        let reply = self
            .conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()?;

        self.min_keycode = min;
        self.keysyms_per_keycode = usize::from(reply.keysyms_per_keycode);
        self.keysyms = reply.keysyms;
        self.serial += 1;
        tracing::debug!(
            "Loaded keyboard mapping {}: keycodes {}..={}, {} keysyms per keycode",
            self.serial,
            min,
            max,
            self.keysyms_per_keycode
        );
        Ok(())
    }

    fn row(&self, keycode: Keycode) -> &[Keysym] {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return &[];
        }
        let start = usize::from(keycode - self.min_keycode) * self.keysyms_per_keycode;
        self.keysyms
            .get(start..start + self.keysyms_per_keycode)
            .unwrap_or(&[])
    }
}

impl<C: Connection> KeyboardBackend for X11Keyboard<C> {
    fn keymap_serial(&self) -> u64 {
        self.serial
    }

    fn modifier_keycodes(&self) -> Result<ModifierKeycodes, BackendError> {
        let reply = self.conn.get_modifier_mapping()?.reply()?;
        let keycodes = reply.keycodes;
        if keycodes.len() % MODIFIER_SLOTS != 0 {
            util::debug_panic!(
                "modifier mapping holds {} keycodes, not a multiple of {}",
                keycodes.len(),
                MODIFIER_SLOTS
            );
        }
        let per_modifier = keycodes.len() / MODIFIER_SLOTS;
        Ok(std::array::from_fn(|slot| {
            keycodes
                .iter()
                .skip(slot * per_modifier)
                .take(per_modifier)
                .copied()
                .filter(|keycode| *keycode != 0)
                .collect()
        }))
    }

    fn keysyms_for_keycode(&self, keycode: Keycode) -> Vec<Keysym> {
        self.row(keycode)
            .iter()
            .copied()
            .filter(|keysym| *keysym != NO_SYMBOL)
            .collect()
    }

    /// Searches column by column, so a keysym on the unshifted level wins.
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode> {
        if keysym == NO_SYMBOL || self.keysyms_per_keycode == 0 {
            return None;
        }
        let per = self.keysyms_per_keycode;
        (0..per).find_map(|column| {
            self.keysyms
                .chunks_exact(per)
                .position(|row| row[column] == keysym)
                .and_then(|index| u8::try_from(usize::from(self.min_keycode) + index).ok())
        })
    }

    fn grab_keys(&self, keycode: Keycode, masks: &[RealModifiers]) -> Result<(), BackendError> {
        let mut cookies = Vec::with_capacity(masks.len());
        for mask in masks {
            cookies.push(self.conn.grab_key(
                false,
                self.root,
                ModMask::from(mask.bits()),
                keycode,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?);
        }

        let mut first_error = None;
        for cookie in cookies {
            if let Err(err) = cookie.check() {
                first_error.get_or_insert(BackendError::from(err));
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn ungrab_keys(&self, keycode: Keycode, masks: &[RealModifiers]) -> Result<(), BackendError> {
        for mask in masks {
            self.conn
                .ungrab_key(keycode, self.root, ModMask::from(mask.bits()))?
                .ignore_error();
        }
        self.conn.flush()?;
        Ok(())
    }

    fn refresh_keymap(&mut self) -> Result<(), BackendError> {
        self.load_mapping()
    }
}

/// The part of an X event the grab manager consumes, if any.
pub fn keyboard_event(event: &Event) -> Option<KeyboardEvent> {
    match event {
        Event::KeyPress(e) => Some(KeyboardEvent::KeyPress {
            keycode: e.detail,
            state: u16::from(e.state),
            time: e.time,
        }),
        Event::KeyRelease(e) => Some(KeyboardEvent::KeyRelease {
            keycode: e.detail,
            state: u16::from(e.state),
            time: e.time,
        }),
        Event::MappingNotify(e) if e.request != Mapping::POINTER => {
            Some(KeyboardEvent::MappingChanged)
        }
        _ => None,
    }
}
