use yew::prelude::*;
use yew_router::prelude::*;

use crate::context::{provider_error, use_language, use_theme};
use crate::i18n::Language;
use crate::theme::Theme;
use crate::Route;

#[function_component(Settings)]
pub fn settings() -> Html {
    let navigator = use_navigator();
    let language = use_language();
    let theme = use_theme();

    let (language, theme) = match (language, theme) {
        (Ok(language), Ok(theme)) => (language, theme),
        (Err(e), _) | (_, Err(e)) => return provider_error(&e),
    };
    let t = |key: &'static str| language.t(key);

    // Both preferences persist as soon as they are picked.
    let theme_button = |choice: Theme, label_key: &'static str| {
        let class = classes!("btn", "outline", (theme.theme == choice).then_some("selected"));
        let theme = theme.clone();
        let onclick = Callback::from(move |_: MouseEvent| {
            if theme.theme != choice {
                theme.toggle();
            }
        });
        html! { <button {class} {onclick}>{ t(label_key) }</button> }
    };
    let language_button = |choice: Language, label_key: &'static str| {
        let class = classes!("btn", "outline", (language.language == choice).then_some("selected"));
        let language = language.clone();
        let onclick = Callback::from(move |_: MouseEvent| language.set_language(choice));
        html! { <button {class} {onclick}>{ t(label_key) }</button> }
    };

    let on_save = Callback::from(move |_: MouseEvent| {
        if let Some(navigator) = &navigator {
            navigator.push(&Route::Home);
        }
    });

    html! {
        <div class="container settings-page">
            <h1>{ t("settings_title") }</h1>
            <div class="card">
                <p>{ t("settings_subtitle") }</p>

                <h3>{ t("theme") }</h3>
                <div class="cards">
                    { theme_button(Theme::Light, "light_theme") }
                    { theme_button(Theme::Dark, "dark_theme") }
                </div>

                <h3>{ t("language_label") }</h3>
                <div class="cards">
                    { language_button(Language::Ru, "russian") }
                    { language_button(Language::En, "english") }
                </div>

                <button class="btn" onclick={on_save}>{ t("save_settings") }</button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use yew::LocalServerRenderer;
    use crate::context::{LanguageProvider, ThemeProvider};
    use crate::utils::storage::{KeyValueStore, MemoryStorage, StorageHandle, LANGUAGE_KEY, THEME_KEY};

    #[derive(Properties, PartialEq)]
    struct PageProps {
        storage: StorageHandle,
    }

    #[function_component(SettingsPage)]
    fn settings_page(props: &PageProps) -> Html {
        html! {
            <ThemeProvider storage={props.storage.clone()}>
                <LanguageProvider storage={props.storage.clone()}>
                    <Settings />
                </LanguageProvider>
            </ThemeProvider>
        }
    }

    #[tokio::test]
    async fn stored_choices_are_marked_selected() {
        let store = MemoryStorage::new();
        store.set(THEME_KEY, "dark").unwrap();
        store.set(LANGUAGE_KEY, "en").unwrap();

        let props = PageProps { storage: StorageHandle(Rc::new(store)) };
        let html = tokio::task::LocalSet::new()
            .run_until(LocalServerRenderer::<SettingsPage>::with_props(props).hydratable(false).render())
            .await;

        assert_eq!(html.matches("selected").count(), 2, "{}", html);
        assert!(!html.contains("config-error"));
    }
}
