use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;
use yew_router::components::Link;

use crate::components::auth_form::AuthForm;
use crate::config;
use crate::context::{provider_error, use_language};
use crate::i18n::Language;
use crate::utils::api::Api;
use crate::utils::storage::{StorageHandle, AUTH_TOKEN_KEY, USER_EMAIL_KEY};
use crate::Route;

const CONTACT_EMAIL: &str = "fantomproject@internet.ru";
const CONTACT_TELEGRAM: &str = "FantomProject_support_bot";

struct Plan {
    name_key: &'static str,
    desc_key: &'static str,
    price: &'static str,
}

const PLANS: [Plan; 3] = [
    Plan { name_key: "starter", desc_key: "starter_desc", price: "990 ₽" },
    Plan { name_key: "professional", desc_key: "professional_desc", price: "2 990 ₽" },
    Plan { name_key: "enterprise", desc_key: "enterprise_desc", price: "9 990 ₽" },
];

const FEATURES: [(&str, &str); 3] = [
    ("feature1_title", "feature1_desc"),
    ("feature2_title", "feature2_desc"),
    ("feature3_title", "feature3_desc"),
];

const FAQ: [(&str, &str); 6] = [
    ("faq1_q", "faq1_a"),
    ("faq2_q", "faq2_a"),
    ("faq3_q", "faq3_a"),
    ("faq4_q", "faq4_a"),
    ("faq5_q", "faq5_a"),
    ("faq6_q", "faq6_a"),
];

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatus {
    authenticated: bool,
}

/// Signed in means a stored token (or, in mock mode, a stored email).
fn has_local_session(storage: &StorageHandle) -> bool {
    let key = if config::auth_mock_enabled() { USER_EMAIL_KEY } else { AUTH_TOKEN_KEY };
    storage.get(key).is_some()
}

#[function_component(Landing)]
pub fn landing() -> Html {
    let language = use_language();
    let storage = use_memo(|_| StorageHandle::browser(), ());
    let signed_in = {
        let storage = storage.clone();
        use_state(move || has_local_session(&storage))
    };
    let show_auth = use_state(|| false);

    // Confirm a stored token is still accepted by the backend.
    {
        let signed_in = signed_in.clone();
        let storage = storage.clone();
        use_effect_with_deps(
            move |_| {
                if !config::auth_mock_enabled() && storage.get(AUTH_TOKEN_KEY).is_some() {
                    spawn_local(async move {
                        match Api::get("/api/auth/session", (*storage).clone()).send().await {
                            Ok(response) if response.ok() => {
                                let active = response
                                    .json::<SessionStatus>()
                                    .await
                                    .map(|status| status.authenticated)
                                    .unwrap_or(false);
                                signed_in.set(active);
                            }
                            Ok(_) => signed_in.set(false),
                            Err(e) => log::warn!("Session check failed: {}", e),
                        }
                    });
                }
                || ()
            },
            (),
        );
    }

    let language = match language {
        Ok(language) => language,
        Err(e) => return provider_error(&e),
    };
    let t = |key: &'static str| language.t(key);

    let on_open_auth = {
        let show_auth = show_auth.clone();
        Callback::from(move |_: MouseEvent| show_auth.set(true))
    };
    let on_close_auth = {
        let show_auth = show_auth.clone();
        let signed_in = signed_in.clone();
        let storage = storage.clone();
        Callback::from(move |_: ()| {
            show_auth.set(false);
            signed_in.set(has_local_session(&storage));
        })
    };
    let on_backdrop = {
        let show_auth = show_auth.clone();
        Callback::from(move |_: MouseEvent| show_auth.set(false))
    };

    let on_logout = {
        let signed_in = signed_in.clone();
        let storage = storage.clone();
        Callback::from(move |_: MouseEvent| {
            let signed_in = signed_in.clone();
            let storage = storage.clone();
            if config::auth_mock_enabled() {
                storage.remove(USER_EMAIL_KEY);
                signed_in.set(false);
                return;
            }
            spawn_local(async move {
                if let Err(e) = Api::post("/api/auth/logout", (*storage).clone()).send().await {
                    log::warn!("Logout request failed: {}", e);
                }
                storage.remove(AUTH_TOKEN_KEY);
                signed_in.set(false);
            });
        })
    };

    let on_switch_language = {
        let language = language.clone();
        Callback::from(move |_: MouseEvent| {
            let next = match language.language {
                Language::Ru => Language::En,
                Language::En => Language::Ru,
            };
            language.set_language(next);
        })
    };

    html! {
        <div class="landing-page">
            <header class="container site-header">
                <span class="logo">{"YAPPERTAR AI"}</span>
                <nav>
                    <a href="#home">{ t("home") }</a>
                    <a href="#features">{ t("features") }</a>
                    <a href="#pricing">{ t("pricing") }</a>
                    <a href="#faq">{ t("faq") }</a>
                    <a href="#contacts">{ t("contacts") }</a>
                </nav>
                <div class="header-actions">
                    <button onclick={on_switch_language}>
                        { match language.language { Language::Ru => "EN", Language::En => "RU" } }
                    </button>
                    <Link<Route> to={Route::Settings}>{ t("settings") }</Link<Route>>
                    if *signed_in {
                        <button class="btn outline" onclick={on_logout}>{ t("logout") }</button>
                    } else {
                        <button class="btn" onclick={on_open_auth.clone()}>{ t("login") }</button>
                    }
                </div>
            </header>

            <main>
                <section id="home" class="container hero">
                    <h1>{ t("hero_title") }</h1>
                    <p>{ t("hero_subtitle") }</p>
                    <button class="btn" onclick={on_open_auth}>{ t("get_started") }</button>
                    <a class="btn outline" href="#contacts">{ t("watch_demo") }</a>
                </section>

                <section id="features" class="container">
                    <h2>{ t("features_title") }</h2>
                    <p>{ t("features_subtitle") }</p>
                    <div class="cards">
                        { for FEATURES.iter().map(|&(title, desc)| html! {
                            <div class="card">
                                <h3>{ t(title) }</h3>
                                <p>{ t(desc) }</p>
                            </div>
                        }) }
                    </div>
                </section>

                <section id="pricing" class="container">
                    <h2>{ t("pricing_title") }</h2>
                    <p>{ t("pricing_subtitle") }</p>
                    <div class="cards">
                        { for PLANS.iter().map(|plan| html! {
                            <div class="card">
                                <h3>{ t(plan.name_key) }</h3>
                                <p>{ t(plan.desc_key) }</p>
                                <p class="price">{ plan.price }<span>{ t("month") }</span></p>
                                <a class="btn" href="#contacts">{ t("choose_plan") }</a>
                            </div>
                        }) }
                    </div>
                </section>

                <section id="faq" class="container">
                    <h2>{ t("faq_title") }</h2>
                    <p>{ t("faq_subtitle") }</p>
                    { for FAQ.iter().map(|&(question, answer)| html! {
                        <details class="card">
                            <summary>{ t(question) }</summary>
                            <p>{ t(answer) }</p>
                        </details>
                    }) }
                </section>

                <section id="contacts" class="container">
                    <h2>{ t("contacts_title") }</h2>
                    <p>{ t("contacts_subtitle") }</p>
                    <div class="cards">
                        <div class="card">
                            <h3>{ t("email") }</h3>
                            <a href={format!("mailto:{}", CONTACT_EMAIL)}>{ CONTACT_EMAIL }</a>
                        </div>
                        <div class="card">
                            <h3>{ t("telegram") }</h3>
                            <a href={format!("https://t.me/{}", CONTACT_TELEGRAM)} target="_blank" rel="noopener noreferrer">
                                { format!("@{}", CONTACT_TELEGRAM) }
                            </a>
                        </div>
                    </div>
                    <a class="btn" href={format!("mailto:{}", CONTACT_EMAIL)}>{ t("request_demo") }</a>
                </section>
            </main>

            <footer class="container">
                <span>{ format!("© 2025 YAPPERTAR AI. {}", t("rights_reserved")) }</span>
            </footer>

            if *show_auth {
                <div class="modal-backdrop" onclick={on_backdrop}>
                    <div onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}>
                        <AuthForm on_close={on_close_auth} storage={(*storage).clone()} />
                    </div>
                </div>
            }
        </div>
    }
}
