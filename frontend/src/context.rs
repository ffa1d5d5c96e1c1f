use thiserror::Error;
use yew::prelude::*;

use crate::i18n::{translate, Language, LanguagePreference};
use crate::theme::{apply_to_document, Theme, ThemePreference};
use crate::utils::storage::StorageHandle;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContextError {
    #[error("{0} is missing above this component")]
    MissingProvider(&'static str),
}

#[derive(Properties, PartialEq)]
pub struct ProviderProps {
    #[prop_or_default]
    pub children: Children,
    #[prop_or_default]
    pub storage: StorageHandle,
}

#[derive(Clone, PartialEq)]
pub struct LanguageContext {
    pub language: Language,
    on_set: Callback<Language>,
}

impl LanguageContext {
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        translate(self.language, key)
    }

    pub fn set_language(&self, language: Language) {
        self.on_set.emit(language);
    }
}

#[derive(Clone, PartialEq)]
pub struct ThemeContext {
    pub theme: Theme,
    on_toggle: Callback<()>,
}

impl ThemeContext {
    /// Switches light/dark and persists the new theme.
    pub fn toggle(&self) {
        self.on_toggle.emit(());
    }
}

#[function_component(LanguageProvider)]
pub fn language_provider(props: &ProviderProps) -> Html {
    let preference = use_memo(|storage| LanguagePreference::new(storage.clone()), props.storage.clone());
    let language = {
        let preference = preference.clone();
        use_state(move || preference.load())
    };

    let on_set = {
        let language = language.clone();
        Callback::from(move |next: Language| {
            preference.save(next);
            language.set(next);
        })
    };

    let context = LanguageContext {
        language: *language,
        on_set,
    };
    html! {
        <ContextProvider<LanguageContext> context={context}>
            { props.children.clone() }
        </ContextProvider<LanguageContext>>
    }
}

#[function_component(ThemeProvider)]
pub fn theme_provider(props: &ProviderProps) -> Html {
    let preference = use_memo(|storage| ThemePreference::new(storage.clone()), props.storage.clone());
    let theme = {
        let preference = preference.clone();
        use_state(move || preference.load())
    };

    {
        use_effect_with_deps(
            move |theme| {
                apply_to_document(*theme);
                || ()
            },
            *theme,
        );
    }

    let on_toggle = {
        let theme = theme.clone();
        Callback::from(move |_: ()| theme.set(preference.toggle(*theme)))
    };

    let context = ThemeContext {
        theme: *theme,
        on_toggle,
    };
    html! {
        <ContextProvider<ThemeContext> context={context}>
            { props.children.clone() }
        </ContextProvider<ThemeContext>>
    }
}

#[hook]
pub fn use_language() -> Result<LanguageContext, ContextError> {
    use_context::<LanguageContext>().ok_or(ContextError::MissingProvider("LanguageProvider"))
}

#[hook]
pub fn use_theme() -> Result<ThemeContext, ContextError> {
    use_context::<ThemeContext>().ok_or(ContextError::MissingProvider("ThemeProvider"))
}

/// Shown in place of a subtree that was mounted without its provider.
pub fn provider_error(error: &ContextError) -> Html {
    log::error!("{}", error);
    html! { <div class="config-error">{ error.to_string() }</div> }
}
