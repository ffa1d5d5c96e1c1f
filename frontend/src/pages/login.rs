use yew::prelude::*;
use yew_router::prelude::*;

use crate::components::auth_form::AuthForm;
use crate::Route;

#[function_component(Login)]
pub fn login() -> Html {
    let navigator = use_navigator();
    let on_close = Callback::from(move |_: ()| {
        if let Some(navigator) = &navigator {
            navigator.push(&Route::Home);
        }
    });

    html! {
        <div class="container login-page">
            <AuthForm {on_close} />
        </div>
    }
}
