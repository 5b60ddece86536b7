//! Voice style resolution.
//!
//! A style is either a named preset from the static table below or an
//! arbitrary natural-language instruction. Any non-empty string is valid:
//! names not in the table pass through verbatim as custom instructions.

/// Named preset -> natural-language delivery instruction.
static STYLE_TABLE: &[(&str, &str)] = &[
    (
        "warm",
        "Speak warmly and encouragingly, like a close friend greeting you in the morning.",
    ),
    (
        "cheerful",
        "Speak with bright, upbeat energy and a smile in your voice.",
    ),
    (
        "calm",
        "Speak slowly and gently, with a soothing, unhurried delivery.",
    ),
    (
        "newscaster",
        "Speak with the crisp, measured cadence of a radio news anchor.",
    ),
    (
        "drill_sergeant",
        "Speak loudly and briskly, with clipped, commanding delivery.",
    ),
];

const DEFAULT_STYLE: &str = "warm";

/// Tagged voice style, resolved once at the configuration boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceStyle {
    /// Key into the preset table.
    Named(String),
    /// Free-form instruction used verbatim.
    Custom(String),
}

impl Default for VoiceStyle {
    fn default() -> Self {
        VoiceStyle::Named(DEFAULT_STYLE.to_string())
    }
}

impl VoiceStyle {
    /// Resolve a raw configuration string. Known names become `Named`;
    /// anything else is a `Custom` instruction; empty falls back to the
    /// default preset.
    pub fn resolve(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return VoiceStyle::default();
        }
        let key = trimmed.to_lowercase();
        if STYLE_TABLE.iter().any(|(name, _)| *name == key) {
            VoiceStyle::Named(key)
        } else {
            VoiceStyle::Custom(trimmed.to_string())
        }
    }

    /// The instruction handed to the TTS provider.
    pub fn instruction(&self) -> &str {
        match self {
            VoiceStyle::Named(key) => STYLE_TABLE
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, instruction)| *instruction)
                // Named is only built through resolve, so the lookup holds;
                // fall back to the key itself if one is constructed by hand.
                .unwrap_or(key),
            VoiceStyle::Custom(instruction) => instruction,
        }
    }

    /// Names of the built-in presets.
    pub fn preset_names() -> Vec<&'static str> {
        STYLE_TABLE.iter().map(|(name, _)| *name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_resolve_to_presets() {
        assert_eq!(
            VoiceStyle::resolve("cheerful"),
            VoiceStyle::Named("cheerful".to_string())
        );
        assert_eq!(
            VoiceStyle::resolve("CALM"),
            VoiceStyle::Named("calm".to_string())
        );
        assert!(VoiceStyle::resolve("warm").instruction().contains("warmly"));
    }

    #[test]
    fn unknown_strings_become_custom_instructions() {
        let style = VoiceStyle::resolve("whisper like a librarian");
        assert_eq!(
            style,
            VoiceStyle::Custom("whisper like a librarian".to_string())
        );
        assert_eq!(style.instruction(), "whisper like a librarian");
    }

    #[test]
    fn empty_style_falls_back_to_default() {
        assert_eq!(VoiceStyle::resolve(""), VoiceStyle::default());
        assert_eq!(VoiceStyle::resolve("   "), VoiceStyle::default());
    }

    #[test]
    fn preset_names_cover_the_table() {
        let names = VoiceStyle::preset_names();
        assert!(names.contains(&"warm"));
        assert!(names.contains(&"cheerful"));
        assert!(names.contains(&"calm"));
    }
}
