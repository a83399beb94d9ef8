//! Keysym names and helpers.
//!
//! Covers the X11 names that make sense in a hotkey: printable Latin-1,
//! editing/navigation keys, the keypad, function keys F1..F35 and the
//! modifier keys themselves. Anything else can be written as `U<hex>`
//! (a Unicode code point) or `0x<hex>` (a raw keysym).

/// An X11 keysym value.
pub type Keysym = u32;

pub const NO_SYMBOL: Keysym = 0;

pub const SCROLL_LOCK: Keysym = 0xff14;
pub const MODE_SWITCH: Keysym = 0xff7e;
pub const NUM_LOCK: Keysym = 0xff7f;
pub const F1: Keysym = 0xffbe;
pub const F35: Keysym = 0xffe0;
pub const SHIFT_L: Keysym = 0xffe1;
pub const CONTROL_L: Keysym = 0xffe3;
pub const CAPS_LOCK: Keysym = 0xffe5;
pub const META_L: Keysym = 0xffe7;
pub const META_R: Keysym = 0xffe8;
pub const ALT_L: Keysym = 0xffe9;
pub const ALT_R: Keysym = 0xffea;
pub const SUPER_L: Keysym = 0xffeb;
pub const SUPER_R: Keysym = 0xffec;
pub const HYPER_L: Keysym = 0xffed;
pub const HYPER_R: Keysym = 0xffee;

const UNICODE_OFFSET: Keysym = 0x0100_0000;

/// Named keysyms. When two names share a value the first one is used for formatting.
static NAMED: &[(&str, Keysym)] = &[
    ("space", 0x0020),
    ("exclam", 0x0021),
    ("quotedbl", 0x0022),
    ("numbersign", 0x0023),
    ("dollar", 0x0024),
    ("percent", 0x0025),
    ("ampersand", 0x0026),
    ("apostrophe", 0x0027),
    ("parenleft", 0x0028),
    ("parenright", 0x0029),
    ("asterisk", 0x002a),
    ("plus", 0x002b),
    ("comma", 0x002c),
    ("minus", 0x002d),
    ("period", 0x002e),
    ("slash", 0x002f),
    ("colon", 0x003a),
    ("semicolon", 0x003b),
    ("less", 0x003c),
    ("equal", 0x003d),
    ("greater", 0x003e),
    ("question", 0x003f),
    ("at", 0x0040),
    ("bracketleft", 0x005b),
    ("backslash", 0x005c),
    ("bracketright", 0x005d),
    ("asciicircum", 0x005e),
    ("underscore", 0x005f),
    ("grave", 0x0060),
    ("braceleft", 0x007b),
    ("bar", 0x007c),
    ("braceright", 0x007d),
    ("asciitilde", 0x007e),
    ("section", 0x00a7),
    ("degree", 0x00b0),
    ("ISO_Level3_Shift", 0xfe03),
    ("BackSpace", 0xff08),
    ("Tab", 0xff09),
    ("Linefeed", 0xff0a),
    ("Clear", 0xff0b),
    ("Return", 0xff0d),
    ("Pause", 0xff13),
    ("Scroll_Lock", SCROLL_LOCK),
    ("Sys_Req", 0xff15),
    ("Escape", 0xff1b),
    ("Home", 0xff50),
    ("Left", 0xff51),
    ("Up", 0xff52),
    ("Right", 0xff53),
    ("Down", 0xff54),
    ("Page_Up", 0xff55),
    ("Prior", 0xff55),
    ("Page_Down", 0xff56),
    ("Next", 0xff56),
    ("End", 0xff57),
    ("Begin", 0xff58),
    ("Select", 0xff60),
    ("Print", 0xff61),
    ("Execute", 0xff62),
    ("Insert", 0xff63),
    ("Undo", 0xff65),
    ("Redo", 0xff66),
    ("Menu", 0xff67),
    ("Find", 0xff68),
    ("Cancel", 0xff69),
    ("Help", 0xff6a),
    ("Break", 0xff6b),
    ("Mode_switch", MODE_SWITCH),
    ("Num_Lock", NUM_LOCK),
    ("KP_Space", 0xff80),
    ("KP_Tab", 0xff89),
    ("KP_Enter", 0xff8d),
    ("KP_Home", 0xff95),
    ("KP_Left", 0xff96),
    ("KP_Up", 0xff97),
    ("KP_Right", 0xff98),
    ("KP_Down", 0xff99),
    ("KP_Page_Up", 0xff9a),
    ("KP_Prior", 0xff9a),
    ("KP_Page_Down", 0xff9b),
    ("KP_Next", 0xff9b),
    ("KP_End", 0xff9c),
    ("KP_Begin", 0xff9d),
    ("KP_Insert", 0xff9e),
    ("KP_Delete", 0xff9f),
    ("KP_Multiply", 0xffaa),
    ("KP_Add", 0xffab),
    ("KP_Separator", 0xffac),
    ("KP_Subtract", 0xffad),
    ("KP_Decimal", 0xffae),
    ("KP_Divide", 0xffaf),
    ("KP_0", 0xffb0),
    ("KP_1", 0xffb1),
    ("KP_2", 0xffb2),
    ("KP_3", 0xffb3),
    ("KP_4", 0xffb4),
    ("KP_5", 0xffb5),
    ("KP_6", 0xffb6),
    ("KP_7", 0xffb7),
    ("KP_8", 0xffb8),
    ("KP_9", 0xffb9),
    ("KP_Equal", 0xffbd),
    ("Shift_L", SHIFT_L),
    ("Shift_R", 0xffe2),
    ("Control_L", CONTROL_L),
    ("Control_R", 0xffe4),
    ("Caps_Lock", CAPS_LOCK),
    ("Shift_Lock", 0xffe6),
    ("Meta_L", META_L),
    ("Meta_R", META_R),
    ("Alt_L", ALT_L),
    ("Alt_R", ALT_R),
    ("Super_L", SUPER_L),
    ("Super_R", SUPER_R),
    ("Hyper_L", HYPER_L),
    ("Hyper_R", HYPER_R),
    ("Delete", 0xffff),
];

/// Look up the keysym for an X11 keysym name. Names are case-sensitive.
pub fn from_name(name: &str) -> Option<Keysym> {
    if let Some((_, keysym)) = NAMED.iter().find(|(n, _)| *n == name) {
        return Some(*keysym);
    }

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(from_char(c));
    }

    if let Some(n) = name.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=35).contains(&n).then(|| F1 + n - 1);
    }

    if let Some(hex) = name.strip_prefix('U') {
        let code_point = u32::from_str_radix(hex, 16).ok()?;
        return char::from_u32(code_point).map(from_char);
    }

    if let Some(hex) = name.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16)
            .ok()
            .filter(|keysym| *keysym != NO_SYMBOL);
    }

    None
}

/// Canonical name for `keysym`, the inverse of [`from_name`].
pub fn name(keysym: Keysym) -> String {
    if let Some((name, _)) = NAMED.iter().find(|(_, k)| *k == keysym) {
        return (*name).to_string();
    }
    if (F1..=F35).contains(&keysym) {
        return format!("F{}", keysym - F1 + 1);
    }
    if let Some(c) = to_char(keysym) {
        if c.is_alphanumeric() && keysym < 0x100 {
            return c.to_string();
        }
        return format!("U{:04X}", c as u32);
    }
    format!("0x{keysym:x}")
}

/// Keysym for a character: Latin-1 maps directly, the rest through the Unicode range.
pub fn from_char(c: char) -> Keysym {
    let code_point = c as u32;
    if (0x20..=0x7e).contains(&code_point) || (0xa0..=0xff).contains(&code_point) {
        code_point
    } else {
        UNICODE_OFFSET | code_point
    }
}

fn to_char(keysym: Keysym) -> Option<char> {
    if (0x20..=0x7e).contains(&keysym) || (0xa0..=0xff).contains(&keysym) {
        return char::from_u32(keysym);
    }
    if keysym & 0xff00_0000 == UNICODE_OFFSET {
        return char::from_u32(keysym & 0x00ff_ffff);
    }
    None
}

/// Lowercase form of a keysym. Only Latin letters have case here.
pub fn to_lower(keysym: Keysym) -> Keysym {
    match keysym {
        0x41..=0x5a => keysym + 0x20,
        // Latin-1 capitals, skipping the multiplication sign.
        0xc0..=0xde if keysym != 0xd7 => keysym + 0x20,
        _ => keysym,
    }
}
