use crate::utils::get_header;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Serialize;
use url::form_urlencoded;

const FLASH_COOKIE: &str = "flash";
pub const LINKS_PATH: &str = "/links";

/// One-shot message shown on the next page the user sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flash {
    pub level: String,
    pub message: String,
}

impl Flash {
    pub fn success(message: &str) -> Self {
        Self {
            level: "success".into(),
            message: message.into(),
        }
    }

    fn to_cookie(&self) -> String {
        let value = form_urlencoded::Serializer::new(String::new())
            .append_pair("level", &self.level)
            .append_pair("message", &self.message)
            .finish();
        format!("{FLASH_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax")
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let cookies = get_header(COOKIE.as_str(), headers)?;
        let value = cookies
            .split(';')
            .filter_map(|cookie| cookie.trim().split_once('='))
            .find(|(name, _)| *name == FLASH_COOKIE)
            .map(|(_, value)| value)?;
        let mut level = None;
        let mut message = None;
        for (key, value) in form_urlencoded::parse(value.as_bytes()) {
            match key.as_ref() {
                "level" => level = Some(value.into_owned()),
                "message" => message = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Self {
            level: level?,
            message: message?,
        })
    }
}

pub fn clear_cookie() -> String {
    format!("{FLASH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

pub fn redirect_with_flash(flash: Flash) -> Response {
    ([(SET_COOKIE, flash.to_cookie())], Redirect::to(LINKS_PATH)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn redirect_carries_flash_cookie() {
        let response = redirect_with_flash(Flash::success("Link Saved Successfully"));

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], LINKS_PATH);
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert_eq!(
            cookie,
            "flash=level=success&message=Link+Saved+Successfully; Path=/; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn flash_is_read_back_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            "theme=dark; flash=level=success&message=Link+Removed+Successfully"
                .parse()
                .unwrap(),
        );

        assert_eq!(
            Flash::from_headers(&headers),
            Some(Flash::success("Link Removed Successfully"))
        );
    }

    #[test]
    fn malformed_or_missing_flash_is_ignored() {
        let mut headers = HeaderMap::new();
        assert_eq!(Flash::from_headers(&headers), None);
        headers.insert(COOKIE, "flash=level=success".parse().unwrap());
        assert_eq!(Flash::from_headers(&headers), None);
    }
}
