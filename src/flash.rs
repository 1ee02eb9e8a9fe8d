use axum::{
    headers::Cookie,
    http::header::SET_COOKIE,
    response::{IntoResponse, Redirect, Response},
};
use url::form_urlencoded;

pub const FLASH_COOKIE: &str = "forge_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

impl FlashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Success => "success",
            FlashKind::Error => "error",
        }
    }
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(self.kind.as_str(), &self.message)
            .finish()
    }

    fn decode(raw: &str) -> Option<Self> {
        let (kind, message) = form_urlencoded::parse(raw.as_bytes()).next()?;
        let kind = match kind.as_ref() {
            "success" => FlashKind::Success,
            "error" => FlashKind::Error,
            _ => return None,
        };
        Some(Self {
            kind,
            message: message.into_owned(),
        })
    }

    fn set_cookie(&self) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            FLASH_COOKIE,
            self.encode()
        )
    }
}

/// Cookie attribute string that deletes the flash
pub fn clear_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0", FLASH_COOKIE)
}

/// Read the pending flash, if any. The page rendering it must clear the cookie.
pub fn peek(cookies: Option<&Cookie>) -> Option<Flash> {
    cookies
        .and_then(|c| c.get(FLASH_COOKIE))
        .and_then(Flash::decode)
}

/// Post/redirect/get with a flash attached
pub fn redirect_with(to: &str, flash: Flash) -> Response {
    ([(SET_COOKIE, flash.set_cookie())], Redirect::to(to)).into_response()
}
