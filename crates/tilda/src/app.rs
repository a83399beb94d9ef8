//! The running drop-down terminal: window, hotkey and config, glued together
//! by a single-threaded X event loop.

use std::cell::RefCell;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use keybinder::{keyboard_event, BindError, Handler, KeyGrabManager, X11Keyboard};
use settings::constants::timing::IDLE_WAIT;
use settings::{default_key_for_instance, Config, ConfigStore, ConfigWatcher};
use tilda_window::{
    Placement, PullAction, PullAnimationController, PullSettings, Rect, X11Window,
};
use util::ResultExt as _;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{NotifyDetail, NotifyMode};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

type Controller = PullAnimationController<X11Window<RustConnection>>;

/// Hotkey to bind for `config`, or `None` when the shortcut is unset.
pub fn hotkey(config: &dyn ConfigStore, instance: u32) -> Option<String> {
    match config.get_string("key").as_deref() {
        None => {
            let key = default_key_for_instance(instance);
            tracing::info!("No hotkey configured, using {}", key);
            Some(key)
        }
        Some(key) if keybinder::is_unset(key) => None,
        Some(key) => Some(key.to_string()),
    }
}

pub struct App {
    conn: Rc<RustConnection>,
    keys: KeyGrabManager<X11Keyboard<RustConnection>>,
    controller: Rc<RefCell<Controller>>,
    handler: Handler,
    bound_key: Option<String>,
    instance: u32,
    config: Config,
    config_path: PathBuf,
    watcher: Option<(ConfigWatcher, mpsc::Receiver<Config>)>,
}

impl App {
    pub fn new(config: Config, config_path: PathBuf, instance: u32) -> Result<Self> {
        let (conn, screen_num) =
            x11rb::connect(None).context("cannot connect to the X server")?;
        let conn = Rc::new(conn);
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .with_context(|| format!("X server has no screen {screen_num}"))?;

        let placement = Placement::from_config(&config);
        let window = X11Window::create(
            Rc::clone(&conn),
            screen_num,
            &config.title,
            Rect::new(placement.x, placement.y, placement.width, placement.height),
        )?;
        let controller = Rc::new(RefCell::new(PullAnimationController::new(
            window,
            PullSettings::from_config(&config),
        )));

        let keyboard = X11Keyboard::new(Rc::clone(&conn), root)?;
        let keys = KeyGrabManager::new(keyboard)?;
        let handler = pull_handler(&controller, keys.event_clock());

        let watcher = settings::watch_config(&config_path);
        Ok(Self {
            conn,
            keys,
            controller,
            handler,
            bound_key: None,
            instance,
            config,
            config_path,
            watcher,
        })
    }

    /// Grab the configured hotkey.
    pub fn bind_hotkey(&mut self) -> Result<(), BindError> {
        let Some(key) = hotkey(&self.config, self.instance) else {
            tracing::warn!("Hotkey is unset, the window can only be shown at startup");
            return Ok(());
        };
        self.keys.bind(&key, Rc::clone(&self.handler))?;
        tracing::info!("Bound hotkey {}", key);
        self.bound_key = Some(key);
        Ok(())
    }

    /// Pull the window down unless it should start hidden.
    pub fn show_initial(&mut self) -> Result<()> {
        if self.config.hidden {
            tracing::debug!("Starting hidden");
            return Ok(());
        }
        let mut controller = self.controller.borrow_mut();
        controller.pull(PullAction::Down, false, None)?;
        Ok(())
    }

    /// Process X events and config changes until `shutdown` is set or the
    /// X connection fails.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        tracing::info!("Entering event loop");
        while !shutdown.load(Ordering::Relaxed) {
            let mut idle = true;
            while let Some(event) = self
                .conn
                .poll_for_event()
                .context("lost the X connection")?
            {
                idle = false;
                self.handle_event(&event);
            }

            let changes: Vec<Config> = match &self.watcher {
                Some((_, rx)) => rx.try_iter().collect(),
                None => Vec::new(),
            };
            for config in changes {
                idle = false;
                self.apply_config(config);
            }

            if idle {
                let fd = self.conn.stream().as_raw_fd();
                wait_readable(fd, IDLE_WAIT).context("waiting for X events")?;
            }
        }
        tracing::info!("Leaving event loop");
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        if let Some(keyboard) = keyboard_event(event) {
            self.keys.handle_event(&keyboard);
            return;
        }
        match event {
            Event::FocusIn(e) => {
                let ours = e.event == self.controller.borrow().window().id();
                if ours && e.mode == NotifyMode::NORMAL {
                    tracing::trace!("Window received focus");
                    self.controller.borrow_mut().window_focused();
                }
            }
            Event::FocusOut(e) => {
                let ours = e.event == self.controller.borrow().window().id();
                if ours
                    && self.config.auto_hide_on_focus_lost
                    && e.mode == NotifyMode::NORMAL
                    && e.detail != NotifyDetail::INFERIOR
                {
                    tracing::debug!("Window lost focus, hiding");
                    self.controller
                        .borrow_mut()
                        .pull(PullAction::Up, true, None)
                        .log_err("hiding the window on focus loss");
                }
            }
            Event::Error(err) => {
                tracing::warn!("X error: {:?}", err);
            }
            _ => {}
        }
    }

    fn apply_config(&mut self, config: Config) {
        let key_changed = config.key != self.config.key;
        if config.title != self.config.title {
            self.controller
                .borrow()
                .window()
                .set_title(&config.title)
                .log_err("setting the window title");
        }
        self.controller
            .borrow_mut()
            .set_settings(PullSettings::from_config(&config));
        let previous = std::mem::replace(&mut self.config, config);

        if key_changed {
            self.rebind(previous);
        }
    }

    /// Swap the hotkey for the one in the current config. On failure the
    /// previous hotkey stays bound.
    fn rebind(&mut self, previous: Config) {
        if let Some(old) = self.bound_key.take() {
            self.keys.unbind(&old, &self.handler);
        }
        match self.bind_hotkey() {
            Ok(()) => {}
            Err(err) => {
                tracing::error!("Cannot bind the new hotkey: {}", err);
                self.config.key = previous.key;
                self.bind_hotkey().log_err("restoring the previous hotkey");
            }
        }
    }

    /// Release grabs and persist the config.
    pub fn shutdown(mut self) {
        self.keys.unbind_all();
        settings::save_config(&self.config_path, &self.config).log_err("saving the config");
        self.conn.flush().log_err("flushing the X connection");
    }
}

/// Hotkey handler toggling the window, timestamped with the key press.
fn pull_handler(controller: &Rc<RefCell<Controller>>, clock: keybinder::EventClock) -> Handler {
    let controller = Rc::clone(controller);
    Rc::new(move |keystring: &str| {
        tracing::debug!("Hotkey {} pressed", keystring);
        let time = clock.current_event_time();
        match controller.try_borrow_mut() {
            Ok(mut controller) => {
                controller
                    .pull(PullAction::Toggle, false, time)
                    .log_err("toggling the window");
            }
            Err(_) => tracing::warn!("Hotkey {} fired during a pull, ignored", keystring),
        }
    })
}

/// Block until `fd` is readable or `timeout` passes. A signal ends the wait
/// early so the caller can check its shutdown flag.
fn wait_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    // SAFETY: `pollfd` is a single valid entry that outlives the call.
    let rc = unsafe { libc::poll(&mut pollfd, 1, millis) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use std::os::unix::net::UnixStream;
    use std::time::Instant;
    use test_case::test_case;

    #[test_case(None, 0, Some("F1") ; "missing key gets the instance default")]
    #[test_case(None, 2, Some("F3") ; "third instance")]
    #[test_case(Some("NULL"), 0, None ; "unset sentinel")]
    #[test_case(Some("<Control>grave"), 4, Some("<Control>grave") ; "configured key")]
    fn hotkey_for_config(key: Option<&str>, instance: u32, expected: Option<&str>) {
        let config = Config {
            key: key.map(str::to_string),
            ..Config::default()
        };
        assert_eq!(hotkey(&config, instance).as_deref(), expected);
    }

    #[test]
    fn idle_wait_times_out_without_data() {
        let (ours, _theirs) = UnixStream::pair().unwrap();
        let start = Instant::now();
        assert!(!wait_readable(ours.as_raw_fd(), Duration::from_millis(30)).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn idle_wait_wakes_on_data() {
        let (ours, mut theirs) = UnixStream::pair().unwrap();
        theirs.write_all(b"x").unwrap();
        let start = Instant::now();
        assert!(wait_readable(ours.as_raw_fd(), Duration::from_secs(5)).unwrap());
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
