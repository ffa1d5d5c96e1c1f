use std::cell::RefCell;
use std::rc::Rc;
use futures::channel::oneshot;
use futures::future::{select, Either};
use gloo_timers::future::TimeoutFuture;
use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::prelude::Closure;
use wasm_bindgen::JsCast;
use web_sys::MessageEvent;

use crate::config;

const NONCE_LENGTH: usize = 24;
const NONCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const CLOSED_POLL_MS: u32 = 500;
const POPUP_FEATURES: &str = "width=500,height=650";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Yandex,
    Vk,
}

impl OAuthProvider {
    pub const ALL: [OAuthProvider; 3] = [OAuthProvider::Google, OAuthProvider::Yandex, OAuthProvider::Vk];

    pub fn slug(self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Yandex => "yandex",
            OAuthProvider::Vk => "vk",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OAuthProvider::Google => "Google",
            OAuthProvider::Yandex => "Яндекс",
            OAuthProvider::Vk => "VK",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OAuthError {
    #[error("no browser window")]
    NoWindow,
    #[error("popup was blocked")]
    PopupBlocked,
    #[error("popup was closed before signing in")]
    PopupClosed,
    #[error("could not listen for popup messages")]
    Listener,
}

impl OAuthError {
    pub fn message_key(&self) -> &'static str {
        match self {
            OAuthError::PopupBlocked => "error_popup_blocked",
            OAuthError::PopupClosed => "error_popup_closed",
            OAuthError::NoWindow | OAuthError::Listener => "error_server",
        }
    }
}

/// Payload posted by the callback page to `window.opener`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OAuthMessage {
    pub token: String,
    pub user_id: i32,
    pub nonce: Option<String>,
}

/// Accepts a message only from the backend origin and only when it echoes
/// the nonce of the popup that is waiting.
pub fn accept_message(expected_origin: &str, expected_nonce: &str, origin: &str, payload: &str) -> Option<OAuthMessage> {
    if origin != expected_origin {
        return None;
    }
    let message: OAuthMessage = serde_json::from_str(payload).ok()?;
    if message.nonce.as_deref() != Some(expected_nonce) || message.token.is_empty() {
        return None;
    }
    Some(message)
}

pub fn popup_url(backend_url: &str, provider: OAuthProvider, nonce: &str) -> String {
    format!("{}/api/auth/oauth/{}?nonce={}", backend_url, provider.slug(), nonce)
}

fn generate_nonce() -> String {
    (0..NONCE_LENGTH)
        .map(|_| {
            let index = (js_sys::Math::random() * NONCE_ALPHABET.len() as f64) as usize;
            NONCE_ALPHABET[index.min(NONCE_ALPHABET.len() - 1)] as char
        })
        .collect()
}

/// One sign-in popup. Owns the only `message` listener for it, which is
/// removed when the handle is dropped.
pub struct OAuthPopup {
    window: web_sys::Window,
    popup: web_sys::Window,
    listener: Closure<dyn FnMut(MessageEvent)>,
    receiver: Option<oneshot::Receiver<OAuthMessage>>,
}

impl OAuthPopup {
    pub fn open(provider: OAuthProvider) -> Result<Self, OAuthError> {
        let window = web_sys::window().ok_or(OAuthError::NoWindow)?;
        let nonce = generate_nonce();
        let (sender, receiver) = oneshot::channel();
        let sender = Rc::new(RefCell::new(Some(sender)));

        let expected_origin = config::backend_origin();
        let listener = Closure::<dyn FnMut(MessageEvent)>::new({
            let nonce = nonce.clone();
            move |event: MessageEvent| {
                let payload = js_sys::JSON::stringify(&event.data())
                    .ok()
                    .and_then(|s| s.as_string());
                let Some(payload) = payload else { return };
                if let Some(message) = accept_message(&expected_origin, &nonce, &event.origin(), &payload) {
                    if let Some(sender) = sender.borrow_mut().take() {
                        let _ = sender.send(message);
                    }
                }
            }
        });
        window
            .add_event_listener_with_callback("message", listener.as_ref().unchecked_ref())
            .map_err(|_| OAuthError::Listener)?;

        let url = popup_url(config::get_backend_url(), provider, &nonce);
        let popup = match window.open_with_url_and_target_and_features(&url, "yappertar_oauth", POPUP_FEATURES) {
            Ok(Some(popup)) => popup,
            _ => {
                let _ = window.remove_event_listener_with_callback("message", listener.as_ref().unchecked_ref());
                return Err(OAuthError::PopupBlocked);
            }
        };
        log::info!("Opened {} sign-in popup", provider.slug());

        Ok(Self {
            window,
            popup,
            listener,
            receiver: Some(receiver),
        })
    }

    /// Resolves with the first accepted message, or `PopupClosed` once the
    /// user shuts the popup without finishing.
    pub async fn wait(mut self) -> Result<OAuthMessage, OAuthError> {
        let receiver = self.receiver.take().ok_or(OAuthError::PopupClosed)?;
        let popup = self.popup.clone();
        let closed = Box::pin(async move {
            loop {
                TimeoutFuture::new(CLOSED_POLL_MS).await;
                if popup.closed().unwrap_or(true) {
                    break;
                }
            }
        });

        match select(receiver, closed).await {
            Either::Left((Ok(message), _)) => Ok(message),
            Either::Left((Err(_), _)) => Err(OAuthError::PopupClosed),
            // The message can land in the same tick the popup closes itself.
            Either::Right(((), mut receiver)) => match receiver.try_recv() {
                Ok(Some(message)) => Ok(message),
                _ => Err(OAuthError::PopupClosed),
            },
        }
    }
}

impl Drop for OAuthPopup {
    fn drop(&mut self) {
        let _ = self
            .window
            .remove_event_listener_with_callback("message", self.listener.as_ref().unchecked_ref());
    }
}
