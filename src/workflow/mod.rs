//! Client-side effects requested by request handlers, and the two flows that
//! request them: post submission and sign-out.

pub mod sign_out;
pub mod submission;

use std::convert::Infallible;
use std::sync::{Mutex, PoisonError};

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use serde::Serialize;
use tracing::warn;

pub const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");
pub const HX_REFRESH: HeaderName = HeaderName::from_static("hx-refresh");
pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(String),
    /// Full reload of the current page, dropping all client state.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
}

impl Toast {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, to: Navigation);
}

pub trait Notifier: Send + Sync {
    fn toast(&self, toast: Toast);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate(Navigation),
    Toast(Toast),
}

/// Collects effects during a request and turns them into htmx response headers.
#[derive(Debug, Default)]
pub struct ClientEffects {
    effects: Mutex<Vec<Effect>>,
}

impl ClientEffects {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, effect: Effect) {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(effect);
    }

    pub fn take(&self) -> Vec<Effect> {
        std::mem::take(&mut *self.effects.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[cfg(test)]
    pub fn navigations(&self) -> Vec<Navigation> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|e| match e {
                Effect::Navigate(n) => Some(n.clone()),
                Effect::Toast(_) => None,
            })
            .collect()
    }

    #[cfg(test)]
    pub fn toasts(&self) -> Vec<Toast> {
        self.effects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|e| match e {
                Effect::Toast(t) => Some(t.clone()),
                Effect::Navigate(_) => None,
            })
            .collect()
    }
}

impl Navigator for ClientEffects {
    fn navigate(&self, to: Navigation) {
        self.push(Effect::Navigate(to));
    }
}

impl Notifier for ClientEffects {
    fn toast(&self, toast: Toast) {
        self.push(Effect::Toast(toast));
    }
}

#[derive(Serialize)]
struct ToastTrigger {
    #[serde(rename = "showToast")]
    show_toast: Vec<Toast>,
}

impl IntoResponseParts for ClientEffects {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let mut toasts = Vec::new();
        for effect in self.take() {
            match effect {
                Effect::Navigate(Navigation::To(path)) => match HeaderValue::from_str(&path) {
                    Ok(v) => {
                        res.headers_mut().insert(HX_REDIRECT, v);
                    }
                    Err(e) => warn!(%path, %e, "unusable redirect target"),
                },
                Effect::Navigate(Navigation::Reload) => {
                    res.headers_mut()
                        .insert(HX_REFRESH, HeaderValue::from_static("true"));
                }
                Effect::Toast(t) => toasts.push(t),
            }
        }

        if !toasts.is_empty() {
            let trigger = ToastTrigger { show_toast: toasts };
            match serde_json::to_string(&trigger)
                .map_err(anyhow::Error::from)
                .and_then(|json| Ok(HeaderValue::from_str(&json)?))
            {
                Ok(v) => {
                    res.headers_mut().insert(HX_TRIGGER, v);
                }
                Err(e) => warn!(%e, "dropping toast header"),
            }
        }
        Ok(res)
    }
}
