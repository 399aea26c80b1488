use serde::{Deserialize, Serialize};

use crate::store::Reducer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
}

/// UI preferences; kept in memory only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppPrefs {
    pub theme: Theme,
    pub language: Language,
    pub sidebar_collapsed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefsAction {
    SetTheme(Theme),
    SetLanguage(Language),
    ToggleSidebar,
}

impl Reducer for AppPrefs {
    type Action = PrefsAction;

    fn reduce(&self, action: PrefsAction) -> Self {
        match action {
            PrefsAction::SetTheme(theme) => Self { theme, ..*self },
            PrefsAction::SetLanguage(language) => Self { language, ..*self },
            PrefsAction::ToggleSidebar => Self {
                sidebar_collapsed: !self.sidebar_collapsed,
                ..*self
            },
        }
    }
}
