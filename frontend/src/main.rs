use yew::prelude::*;
use yew_router::prelude::*;

mod config;
mod context;
mod i18n;
mod theme;
mod auth {
    pub mod captcha;
    pub mod form;
    pub mod oauth;
}
mod components {
    pub mod auth_form;
}
mod pages {
    pub mod landing;
    pub mod login;
    pub mod not_found;
    pub mod settings;
}
mod utils {
    pub mod api;
    pub mod storage;
}

use context::{LanguageProvider, ThemeProvider};
use pages::{landing::Landing, login::Login, not_found::NotFound, settings::Settings};

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/settings")]
    Settings,
    #[at("/login")]
    Login,
    #[not_found]
    #[at("/404")]
    NotFound,
}

fn switch(routes: Route) -> Html {
    match routes {
        Route::Home => html! { <Landing /> },
        Route::Settings => html! { <Settings /> },
        Route::Login => html! { <Login /> },
        Route::NotFound => html! { <NotFound /> },
    }
}

#[function_component(App)]
pub fn app() -> Html {
    html! {
        <ThemeProvider>
            <LanguageProvider>
                <BrowserRouter>
                    <Switch<Route> render={switch} />
                </BrowserRouter>
            </LanguageProvider>
        </ThemeProvider>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    auth::captcha::load_script();
    log::info!(
        "Starting YAPPERTAR AI frontend (backend {}, mock auth: {})",
        config::get_backend_url(),
        config::auth_mock_enabled()
    );
    yew::Renderer::<App>::new().render();
}
