//! Property tests for accelerator parsing and formatting.

use keybinder::{keysyms, Accelerator, VirtualModifiers};
use proptest::prelude::*;

/// Modifiers the formatter writes out.
fn printable_modifiers() -> impl Strategy<Value = VirtualModifiers> {
    let flags = [
        VirtualModifiers::RELEASE,
        VirtualModifiers::SHIFT,
        VirtualModifiers::CONTROL,
        VirtualModifiers::ALT,
        VirtualModifiers::MOD2,
        VirtualModifiers::MOD3,
        VirtualModifiers::MOD4,
        VirtualModifiers::MOD5,
        VirtualModifiers::META,
        VirtualModifiers::HYPER,
        VirtualModifiers::SUPER,
    ];
    proptest::collection::vec(any::<bool>(), flags.len()).prop_map(move |picks| {
        flags
            .iter()
            .zip(picks)
            .filter(|(_, picked)| *picked)
            .fold(VirtualModifiers::empty(), |mods, (flag, _)| mods | *flag)
    })
}

fn keysym() -> impl Strategy<Value = keysyms::Keysym> {
    prop_oneof![
        (b'a'..=b'z').prop_map(u32::from),
        (b'0'..=b'9').prop_map(u32::from),
        (keysyms::F1..=keysyms::F35),
        prop::sample::select(vec![
            0xff08, 0xff09, 0xff0d, 0xff1b, 0xff50, 0xff55, 0xff56, 0xff63, 0xffff, 0x20, 0x2b,
            0x2d, 0xe9,
        ]),
        (0x0400u32..0x0500).prop_map(|cp| 0x0100_0000 | cp),
    ]
}

proptest! {
    #[test]
    fn format_then_parse_is_identity(keysym in keysym(), modifiers in printable_modifiers()) {
        let accel = Accelerator::new(keysym, modifiers);
        let text = accel.to_string();
        let parsed: Accelerator = text.parse().unwrap();
        prop_assert_eq!(parsed, accel, "via {}", text);
    }

    #[test]
    fn parse_is_case_insensitive_for_modifiers(modifiers in printable_modifiers()) {
        let accel = Accelerator::new(0x74, modifiers);
        let upper = accel.to_string().to_uppercase();
        let parsed: Accelerator = upper.parse().unwrap();
        prop_assert_eq!(parsed, accel);
    }
}
