//! Voice catalogs and voice selection

use serde::{Deserialize, Serialize};

/// Preferred platform voices, best first
///
/// Chrome, Edge and Safari ship these names; the last entry catches any
/// voice that merely advertises the Korean locale in its name.
pub const KOREAN_VOICE_PRIORITY: &[&str] = &[
    "Google 한국의",
    "Microsoft Heami - Korean (South Korea)",
    "Yuna",
    "ko-KR",
];

/// A voice a backend can speak with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// Backend-specific identifier
    pub id: String,
    pub name: String,
    /// BCP 47 language tag, e.g. `ko-KR`
    pub language: String,
    /// Text shown in the voice picker
    pub label: String,
}

impl VoiceDescriptor {
    pub fn new(id: &str, name: &str, language: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            label: label.to_string(),
        }
    }

    /// True if this voice is the one a user-supplied hint refers to
    pub fn matches_hint(&self, hint: &str) -> bool {
        self.id == hint || self.name == hint
    }
}

/// Curated voices of the voice service
pub fn service_voices() -> Vec<VoiceDescriptor> {
    vec![
        VoiceDescriptor::new("ko+f3", "Korean Female", "ko-KR", "한국어 여성 (권장)"),
        VoiceDescriptor::new("ko+m3", "Korean Male", "ko-KR", "한국어 남성"),
    ]
}

/// Pick a voice from a platform catalog
///
/// Priority entries are tried in declared order. For each one the first
/// catalog voice whose name contains it, or whose language starts with
/// `locale`, wins. So a locale match anywhere in the catalog satisfies the
/// first priority entry; that tie-break is intentional.
pub fn select_voice<'a>(
    catalog: &'a [VoiceDescriptor],
    priority: &[&str],
    locale: &str,
) -> Option<&'a VoiceDescriptor> {
    priority.iter().find_map(|preferred| {
        catalog
            .iter()
            .find(|voice| voice.name.contains(preferred) || voice.language.starts_with(locale))
    })
}

/// Voice for one utterance from a platform catalog
///
/// The user's pick (`hint`, by id or name) comes first, then
/// [`select_voice`], then the first voice whose language is exactly `lang`.
pub fn resolve_voice<'a>(
    catalog: &'a [VoiceDescriptor],
    hint: Option<&str>,
    locale: &str,
    lang: &str,
) -> Option<&'a VoiceDescriptor> {
    hint.and_then(|hint| catalog.iter().find(|v| v.matches_hint(hint)))
        .or_else(|| select_voice(catalog, KOREAN_VOICE_PRIORITY, locale))
        .or_else(|| catalog.iter().find(|v| v.language.eq_ignore_ascii_case(lang)))
}

/// Voices whose language tag starts with `locale`
pub fn filter_locale(catalog: &[VoiceDescriptor], locale: &str) -> Vec<VoiceDescriptor> {
    catalog
        .iter()
        .filter(|voice| voice.language.starts_with(locale))
        .cloned()
        .collect()
}
