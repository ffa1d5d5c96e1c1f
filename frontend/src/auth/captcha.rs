use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::config;

const SCRIPT_URL: &str = "https://www.google.com/recaptcha/api.js";

/// Injects the reCAPTCHA v3 script when a site key was configured.
pub fn load_script() {
    let Some(site_key) = config::recaptcha_site_key() else {
        log::info!("No reCAPTCHA site key configured");
        return;
    };
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    let Some(head) = document.head() else {
        return;
    };
    let script = match document.create_element("script") {
        Ok(script) => script,
        Err(_) => return,
    };
    let src = format!("{}?render={}", SCRIPT_URL, site_key);
    if script.set_attribute("src", &src).is_err()
        || script.set_attribute("async", "").is_err()
        || head.append_child(&script).is_err()
    {
        log::warn!("Could not load the reCAPTCHA script");
    }
}

/// Runs `grecaptcha.execute(siteKey, {action})`. Any missing piece (site
/// key, global object, rejected promise) yields `None`.
pub async fn execute(action: &str) -> Option<String> {
    let site_key = config::recaptcha_site_key()?;
    let window = web_sys::window()?;
    let grecaptcha = Reflect::get(&window, &JsValue::from_str("grecaptcha")).ok()?;
    if grecaptcha.is_undefined() || grecaptcha.is_null() {
        log::debug!("grecaptcha is not loaded");
        return None;
    }

    let execute: Function = Reflect::get(&grecaptcha, &JsValue::from_str("execute"))
        .ok()?
        .dyn_into()
        .ok()?;
    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("action"), &JsValue::from_str(action)).ok()?;

    let promise: Promise = execute
        .call2(&grecaptcha, &JsValue::from_str(site_key), &options)
        .ok()?
        .dyn_into()
        .ok()?;
    match JsFuture::from(promise).await {
        Ok(token) => token.as_string(),
        Err(e) => {
            log::warn!("grecaptcha.execute failed: {:?}", e);
            None
        }
    }
}
