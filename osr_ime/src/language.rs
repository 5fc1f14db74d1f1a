// SPDX-License-Identifier: GPL-3.0-or-later

//! Input language identifiers and how each language family wants the
//! candidate window placed.

const LANG_CHINESE: u16 = 0x04;
const LANG_JAPANESE: u16 = 0x11;
const LANG_KOREAN: u16 = 0x12;

/// Windows LANGID: primary language in the low 10 bits, sublanguage above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LangId(pub u16);

impl LangId {
    /// MAKELANGID(LANG_NEUTRAL, SUBLANG_DEFAULT)
    pub const USER_DEFAULT: LangId = LangId(0x0400);
    pub const EN_US: LangId = LangId(0x0409);

    pub const fn primary(self) -> u16 {
        self.0 & 0x3ff
    }

    pub const fn family(self) -> LanguageFamily {
        match self.primary() {
            LANG_CHINESE => LanguageFamily::Chinese,
            LANG_JAPANESE => LanguageFamily::Japanese,
            LANG_KOREAN => LanguageFamily::Korean,
            _ => LanguageFamily::Other,
        }
    }

    /// Parses a keyboard layout identifier such as `00000411` or `E0200404`.
    ///
    /// The name of the layout itself carries the language in its low word,
    /// which is what IMEs care about. The language the layout is installed
    /// under can differ.
    pub fn from_layout_name(klid: &str) -> Option<LangId> {
        let klid = klid.trim_end_matches('\0');
        if klid.len() != 8 {
            return None;
        }
        let low_word = klid.get(4..)?;
        u16::from_str_radix(low_word, 16).ok().map(LangId)
    }
}

impl Default for LangId {
    fn default() -> Self {
        LangId::USER_DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFamily {
    Chinese,
    Japanese,
    Korean,
    Other,
}

/// Where the system caret goes relative to the character rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretAnchor {
    TopLeft,
    BottomLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositioningPolicy {
    /// Some Chinese and Japanese IMEs ignore ImmSetCandidateWindow and read
    /// GetCaretPos instead, so a temporary system caret is needed.
    pub system_caret: bool,
    /// Chinese IMEs with TSF/CUAS enabled use CFS_CANDIDATEPOS.
    pub candidate_position: bool,
    pub caret_anchor: CaretAnchor,
    /// Korean IMEs anchor the candidate window from the lower-left corner of
    /// the caret.
    pub exclude_offset_y: i32,
}

const KOREAN_CARET_MARGIN: i32 = 1;

impl PositioningPolicy {
    pub const fn for_family(family: LanguageFamily) -> PositioningPolicy {
        let default = PositioningPolicy {
            system_caret: false,
            candidate_position: false,
            caret_anchor: CaretAnchor::TopLeft,
            exclude_offset_y: 0,
        };
        match family {
            LanguageFamily::Chinese => PositioningPolicy {
                system_caret: true,
                candidate_position: true,
                ..default
            },
            LanguageFamily::Japanese => PositioningPolicy {
                system_caret: true,
                caret_anchor: CaretAnchor::BottomLeft,
                ..default
            },
            LanguageFamily::Korean => PositioningPolicy {
                exclude_offset_y: KOREAN_CARET_MARGIN,
                ..default
            },
            LanguageFamily::Other => default,
        }
    }

    pub const fn for_language(lang: LangId) -> PositioningPolicy {
        Self::for_family(lang.family())
    }
}
