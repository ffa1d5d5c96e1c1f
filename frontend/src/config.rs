// Build-time settings, read with option_env! so `trunk build` picks them up
// from the environment.

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

pub fn get_backend_url() -> &'static str {
    option_env!("YAPPERTAR_BACKEND_URL")
        .map(|url| url.trim_end_matches('/'))
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_BACKEND_URL)
}

/// Scheme, host and port of the backend; messages from the OAuth popup
/// must come from here.
pub fn backend_origin() -> String {
    origin_of(get_backend_url())
}

pub fn recaptcha_site_key() -> Option<&'static str> {
    option_env!("YAPPERTAR_RECAPTCHA_SITE_KEY").filter(|key| !key.is_empty())
}

/// Mock mode skips the backend entirely and fakes a login locally.
pub fn auth_mock_enabled() -> bool {
    option_env!("YAPPERTAR_AUTH_MOCK").is_some()
}

fn origin_of(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    format!("{}://{}", scheme, authority)
}
