//! [`DropDownWindow`] on an X11 top-level window, driven through EWMH.

use std::rc::Rc;

use anyhow::{Context as _, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    AtomEnum, ClientMessageData, ClientMessageEvent, ConfigureWindowAux, ConnectionExt as _,
    CreateWindowAux, EventMask, InputFocus, PropMode, StackMode, Timestamp, Window, WindowClass,
    CLIENT_MESSAGE_EVENT,
};
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, COPY_FROM_PARENT, CURRENT_TIME};

use crate::geometry::{Rect, ScreenSize};
use crate::pull::DropDownWindow;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        UTF8_STRING,
        _NET_WM_NAME,
        _NET_WM_STATE,
        _NET_WM_STATE_STICKY,
        _NET_WM_STATE_ABOVE,
        _NET_ACTIVE_WINDOW,
    }
}

const NET_WM_STATE_REMOVE: u32 = 0;
const NET_WM_STATE_ADD: u32 = 1;
/// Source indication for EWMH requests: a pager, which window managers
/// trust to change focus.
const SOURCE_PAGER: u32 = 2;
const WM_CLASS: &[u8] = b"tilda\0Tilda\0";

pub struct X11Window<C: Connection> {
    conn: Rc<C>,
    window: Window,
    root: Window,
    screen: ScreenSize,
    atoms: Atoms,
}

impl<C: Connection> X11Window<C> {
    /// Create the (unmapped) window on screen `screen_num`.
    pub fn create(conn: Rc<C>, screen_num: usize, title: &str, rect: Rect) -> Result<Self> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .with_context(|| format!("X server has no screen {screen_num}"))?;
        let root = screen.root;
        let size = ScreenSize {
            width: u32::from(screen.width_in_pixels),
            height: u32::from(screen.height_in_pixels),
        };
        let black = screen.black_pixel;

        let atoms = Atoms::new(conn.as_ref())?
            .reply()
            .context("interning EWMH atoms")?;
        let window = conn.generate_id()?;
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            clamp_coord(rect.x),
            clamp_coord(rect.y),
            clamp_extent(rect.width),
            clamp_extent(rect.height),
            0,
            WindowClass::INPUT_OUTPUT,
            COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(black)
                .event_mask(EventMask::FOCUS_CHANGE | EventMask::STRUCTURE_NOTIFY),
        )?
        .check()
        .context("creating the drop-down window")?;

        let this = Self {
            conn,
            window,
            root,
            screen: size,
            atoms,
        };
        this.set_title(title)?;
        this.conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            WM_CLASS,
        )?;
        this.conn.flush()?;
        tracing::debug!(window, "Created drop-down window");
        Ok(this)
    }

    pub fn id(&self) -> Window {
        self.window
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.conn.change_property8(
            PropMode::REPLACE,
            self.window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            title.as_bytes(),
        )?;
        self.conn.change_property8(
            PropMode::REPLACE,
            self.window,
            self.atoms._NET_WM_NAME,
            self.atoms.UTF8_STRING,
            title.as_bytes(),
        )?;
        Ok(())
    }

    /// Send an EWMH client message about this window to the root window.
    fn send_root_message(&self, type_: u32, data: [u32; 5]) -> Result<()> {
        let event = ClientMessageEvent {
            response_type: CLIENT_MESSAGE_EVENT,
            format: 32,
            sequence: 0,
            window: self.window,
            type_,
            data: ClientMessageData::from(data),
        };
        self.conn.send_event(
            false,
            self.root,
            EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
            event,
        )?;
        Ok(())
    }

    fn change_state(&self, add: bool, state: u32) -> Result<()> {
        let action = if add {
            NET_WM_STATE_ADD
        } else {
            NET_WM_STATE_REMOVE
        };
        self.send_root_message(
            self.atoms._NET_WM_STATE,
            [action, state, 0, SOURCE_PAGER, 0],
        )
    }
}

impl<C: Connection> DropDownWindow for X11Window<C> {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn show(&mut self) -> Result<()> {
        self.conn.map_window(self.window)?;
        Ok(())
    }

    fn hide(&mut self) -> Result<()> {
        self.conn.unmap_window(self.window)?;
        Ok(())
    }

    fn move_resize(&mut self, rect: Rect) -> Result<()> {
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width)
                .height(rect.height),
        )?;
        Ok(())
    }

    fn stick(&mut self) -> Result<()> {
        self.change_state(true, self.atoms._NET_WM_STATE_STICKY)
    }

    fn set_keep_above(&mut self, above: bool) -> Result<()> {
        self.change_state(above, self.atoms._NET_WM_STATE_ABOVE)
    }

    fn activate(&mut self, time: Option<Timestamp>) -> Result<()> {
        let time = time.unwrap_or(CURRENT_TIME);
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.send_root_message(
            self.atoms._NET_ACTIVE_WINDOW,
            [SOURCE_PAGER, time, 0, 0, 0],
        )?;
        // Fails with BadMatch while the window manager has not mapped us yet.
        self.conn
            .set_input_focus(InputFocus::PARENT, self.window, time)?
            .ignore_error();
        Ok(())
    }

    /// Holding the input focus counts, as does being the EWMH active window.
    fn is_active(&self) -> Result<bool> {
        if self.conn.get_input_focus()?.reply()?.focus == self.window {
            return Ok(true);
        }
        let reply = self
            .conn
            .get_property(
                false,
                self.root,
                self.atoms._NET_ACTIVE_WINDOW,
                AtomEnum::WINDOW,
                0,
                1,
            )?
            .reply()?;
        let active = reply.value32().and_then(|mut values| values.next());
        Ok(active == Some(self.window))
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

impl<C: Connection> Drop for X11Window<C> {
    fn drop(&mut self) {
        if let Ok(cookie) = self.conn.destroy_window(self.window) {
            cookie.ignore_error();
        }
        let _ = self.conn.flush();
    }
}

fn clamp_coord(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

fn clamp_extent(value: u32) -> u16 {
    value.clamp(1, u32::from(u16::MAX)) as u16
}
