use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::auth::captcha;
use crate::auth::form::{
    submit_mock, submit_networked, AuthMode, Credentials, FormError, HttpAuthTransport, TimerDelay,
};
use crate::auth::oauth::{OAuthPopup, OAuthProvider};
use crate::config;
use crate::context::{provider_error, use_language, LanguageContext};
use crate::utils::storage::{StorageHandle, AUTH_TOKEN_KEY};

#[derive(Properties, PartialEq)]
pub struct AuthFormProps {
    #[prop_or_default]
    pub on_close: Option<Callback<()>>,
    #[prop_or_default]
    pub storage: StorageHandle,
}

fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}

fn report(language: &LanguageContext, error: &FormError) {
    log::warn!("Auth form error: {}", error);
    let message = error
        .server_message()
        .map(str::to_string)
        .unwrap_or_else(|| language.t(error.message_key()).to_string());
    alert(&message);
}

fn input_handler(state: &UseStateHandle<String>) -> Callback<InputEvent> {
    let state = state.clone();
    Callback::from(move |e: InputEvent| {
        let input: HtmlInputElement = e.target_unchecked_into();
        state.set(input.value());
    })
}

#[function_component(AuthForm)]
pub fn auth_form(props: &AuthFormProps) -> Html {
    let language = use_language();
    let mode = use_state(AuthMode::default);
    let email = use_state(String::new);
    let password = use_state(String::new);
    let confirm_password = use_state(String::new);
    let loading = use_state(|| false);

    let language = match language {
        Ok(language) => language,
        Err(e) => return provider_error(&e),
    };
    let t = |key: &'static str| language.t(key);

    let close = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: ()| {
            if let Some(on_close) = &on_close {
                on_close.emit(());
            }
        })
    };

    let onsubmit = {
        let mode = mode.clone();
        let email = email.clone();
        let password = password.clone();
        let confirm_password = confirm_password.clone();
        let loading = loading.clone();
        let language = language.clone();
        let storage = props.storage.clone();
        let close = close.clone();

        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            if *loading {
                return;
            }
            let credentials = Credentials {
                email: (*email).clone(),
                password: (*password).clone(),
                confirm_password: (*confirm_password).clone(),
            };
            let mode = *mode;
            let loading = loading.clone();
            let language = language.clone();
            let storage = storage.clone();
            let close = close.clone();

            if config::auth_mock_enabled() {
                // Empty fields fail before the delayed path starts.
                if credentials.email.is_empty() || credentials.password.is_empty() {
                    report(&language, &FormError::EmptyFields);
                    return;
                }
                loading.set(true);
                spawn_local(async move {
                    let result = submit_mock(&TimerDelay, &*storage, &credentials).await;
                    loading.set(false);
                    match result {
                        Ok(()) => {
                            alert(language.t("login_success"));
                            close.emit(());
                        }
                        Err(e) => report(&language, &e),
                    }
                });
                return;
            }

            loading.set(true);
            spawn_local(async move {
                let action = match mode {
                    AuthMode::Login => "login",
                    AuthMode::Register => "register",
                };
                let captcha_token = captcha::execute(action).await;
                let transport = HttpAuthTransport { storage: storage.clone() };
                let result = submit_networked(&transport, &*storage, mode, &credentials, captcha_token).await;
                loading.set(false);
                match result {
                    Ok(_) => close.emit(()),
                    Err(e) => report(&language, &e),
                }
            });
        })
    };

    let on_switch_mode = {
        let mode = mode.clone();
        let confirm_password = confirm_password.clone();
        Callback::from(move |_: MouseEvent| {
            mode.set(mode.switched());
            confirm_password.set(String::new());
        })
    };

    let oauth_buttons = OAuthProvider::ALL.iter().map(|&provider| {
        let language = language.clone();
        let storage = props.storage.clone();
        let close = close.clone();
        let onclick = Callback::from(move |_: MouseEvent| {
            let popup = match OAuthPopup::open(provider) {
                Ok(popup) => popup,
                Err(e) => {
                    log::warn!("{} sign-in failed: {}", provider.slug(), e);
                    alert(language.t(e.message_key()));
                    return;
                }
            };
            let language = language.clone();
            let storage = storage.clone();
            let close = close.clone();
            spawn_local(async move {
                match popup.wait().await {
                    Ok(message) => {
                        if let Err(e) = storage.set(AUTH_TOKEN_KEY, &message.token) {
                            log::warn!("Could not persist auth token: {}", e);
                        }
                        log::info!("Signed in with {} as user {}", provider.slug(), message.user_id);
                        close.emit(());
                    }
                    Err(e) => {
                        log::info!("{} sign-in did not finish: {}", provider.slug(), e);
                        alert(language.t(e.message_key()));
                    }
                }
            });
        });
        html! {
            <button type="button" class="btn outline" {onclick} disabled={*loading}>
                { provider.label() }
            </button>
        }
    });

    let is_register = *mode == AuthMode::Register;
    html! {
        <div class="card auth-form">
            <h2>{ if is_register { t("auth_register_title") } else { t("auth_login_title") } }</h2>
            <p>{ t("auth_subtitle") }</p>
            <form {onsubmit}>
                <label for="auth-email">{ t("email") }</label>
                <input
                    id="auth-email"
                    type="email"
                    placeholder="example@mail.com"
                    value={(*email).clone()}
                    oninput={input_handler(&email)}
                    required=true
                />
                <label for="auth-password">{ t("password") }</label>
                <input
                    id="auth-password"
                    type="password"
                    placeholder="••••••••"
                    value={(*password).clone()}
                    oninput={input_handler(&password)}
                    required=true
                />
                if is_register {
                    <label for="auth-confirm">{ t("confirm_password") }</label>
                    <input
                        id="auth-confirm"
                        type="password"
                        value={(*confirm_password).clone()}
                        oninput={input_handler(&confirm_password)}
                        required=true
                    />
                }
                <button type="submit" class="btn" disabled={*loading}>
                    if *loading {
                        { t("loading") }
                    } else if is_register {
                        { t("register") }
                    } else {
                        { t("login") }
                    }
                </button>
            </form>
            <button type="button" class="btn outline" onclick={on_switch_mode}>
                { if is_register { t("switch_to_login") } else { t("switch_to_register") } }
            </button>
            if !config::auth_mock_enabled() {
                <p>{ t("or_continue_with") }</p>
                <div class="oauth-buttons">
                    { for oauth_buttons }
                </div>
            }
            <p class="secure-note">{ t("secure_connection") }</p>
        </div>
    }
}
