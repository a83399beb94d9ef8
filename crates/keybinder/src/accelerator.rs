//! Accelerator strings such as `<Control><Alt>t`.

use std::fmt;
use std::str::FromStr;

use crate::keysyms::{self, Keysym, NO_SYMBOL};
use crate::modifiers::VirtualModifiers;

/// Stored in place of an accelerator for a shortcut that is not bound.
pub const UNSET_SHORTCUT: &str = "NULL";

/// Modifier names in formatting order.
const MODIFIER_NAMES: &[(VirtualModifiers, &str)] = &[
    (VirtualModifiers::RELEASE, "<Release>"),
    (VirtualModifiers::SHIFT, "<Shift>"),
    (VirtualModifiers::CONTROL, "<Control>"),
    (VirtualModifiers::ALT, "<Alt>"),
    (VirtualModifiers::MOD2, "<Mod2>"),
    (VirtualModifiers::MOD3, "<Mod3>"),
    (VirtualModifiers::MOD4, "<Mod4>"),
    (VirtualModifiers::MOD5, "<Mod5>"),
    (VirtualModifiers::META, "<Meta>"),
    (VirtualModifiers::HYPER, "<Hyper>"),
    (VirtualModifiers::SUPER, "<Super>"),
];

/// A parsed accelerator: one keysym plus the virtual modifiers held with it.
///
/// The keysym is `NO_SYMBOL` for modifier-only accelerators like `<Control>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Accelerator {
    pub keysym: Keysym,
    pub modifiers: VirtualModifiers,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid accelerator '{0}'")]
pub struct ParseAcceleratorError(pub String);

impl Accelerator {
    pub fn new(keysym: Keysym, modifiers: VirtualModifiers) -> Self {
        Self { keysym, modifiers }
    }
}

impl FromStr for Accelerator {
    type Err = ParseAcceleratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseAcceleratorError(s.to_string());
        let mut rest = s.trim();
        let mut modifiers = VirtualModifiers::empty();

        while let Some(after) = rest.strip_prefix('<') {
            let end = after.find('>').ok_or_else(invalid)?;
            modifiers |= modifier_from_token(&after[..end]);
            rest = &after[end + 1..];
        }

        let keysym = if rest.is_empty() {
            NO_SYMBOL
        } else {
            keysyms::from_name(rest)
                .map(keysyms::to_lower)
                .ok_or_else(invalid)?
        };

        if keysym == NO_SYMBOL && modifiers.is_empty() {
            return Err(invalid());
        }
        Ok(Self { keysym, modifiers })
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in MODIFIER_NAMES {
            if self.modifiers.contains(*flag) {
                f.write_str(name)?;
            }
        }
        if self.keysym != NO_SYMBOL {
            f.write_str(&keysyms::name(self.keysym))?;
        }
        Ok(())
    }
}

/// Unknown tokens contribute nothing and are skipped.
fn modifier_from_token(token: &str) -> VirtualModifiers {
    match token.to_ascii_lowercase().as_str() {
        "release" => VirtualModifiers::RELEASE,
        "control" | "ctrl" | "ctl" | "primary" => VirtualModifiers::CONTROL,
        "shift" | "shft" => VirtualModifiers::SHIFT,
        "alt" | "mod1" => VirtualModifiers::ALT,
        "mod2" => VirtualModifiers::MOD2,
        "mod3" => VirtualModifiers::MOD3,
        "mod4" => VirtualModifiers::MOD4,
        "mod5" => VirtualModifiers::MOD5,
        "meta" => VirtualModifiers::META,
        "super" => VirtualModifiers::SUPER,
        "hyper" => VirtualModifiers::HYPER,
        other => {
            tracing::trace!("Ignoring unknown accelerator token <{}>", other);
            VirtualModifiers::empty()
        }
    }
}

/// Whether `shortcut` may be stored in a shortcut slot: either [`UNSET_SHORTCUT`]
/// or a parsable accelerator.
pub fn validate_shortcut(shortcut: &str) -> bool {
    is_unset(shortcut) || shortcut.parse::<Accelerator>().is_ok()
}

pub fn is_unset(shortcut: &str) -> bool {
    shortcut == UNSET_SHORTCUT
}
