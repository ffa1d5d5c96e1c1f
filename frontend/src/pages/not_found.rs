use yew::prelude::*;
use yew_router::components::Link;

use crate::context::{provider_error, use_language};
use crate::Route;

#[function_component(NotFound)]
pub fn not_found() -> Html {
    let language = match use_language() {
        Ok(language) => language,
        Err(e) => return provider_error(&e),
    };

    html! {
        <div class="container not-found">
            <h1>{"404"}</h1>
            <p>{ language.t("not_found_title") }</p>
            <Link<Route> to={Route::Home}>{ language.t("back_home") }</Link<Route>>
        </div>
    }
}
