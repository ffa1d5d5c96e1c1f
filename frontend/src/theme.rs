use crate::utils::storage::{KeyValueStore, StorageHandle, THEME_KEY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn code(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct ThemePreference {
    storage: StorageHandle,
}

impl ThemePreference {
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Theme {
        self.storage
            .get(THEME_KEY)
            .and_then(|code| Theme::from_code(&code))
            .unwrap_or_default()
    }

    pub fn save(&self, theme: Theme) {
        if let Err(e) = self.storage.set(THEME_KEY, theme.code()) {
            log::warn!("Could not persist theme: {}", e);
        }
    }

    /// Flips `current`, persists and returns the new theme.
    pub fn toggle(&self, current: Theme) -> Theme {
        let next = current.toggled();
        self.save(next);
        next
    }
}

/// Puts or removes the `dark` class on `<html>`.
pub fn apply_to_document(theme: Theme) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };
    let classes = root.class_list();
    let result = match theme {
        Theme::Dark => classes.add_1("dark"),
        Theme::Light => classes.remove_1("dark"),
    };
    if result.is_err() {
        log::warn!("Could not update document theme class");
    }
}
