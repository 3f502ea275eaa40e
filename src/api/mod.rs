//! The API surface handed to every plugin call.
//!
//! [`FoodApi`] bundles the [`Food`] constructor with the shared helpers a
//! restaurant plugin needs, so plugins never reach for the underlying
//! libraries themselves:
//!
//! - HTML parsing ([`Document`], via `scraper`)
//! - HTTP fetching ([`HttpClient`], via `reqwest`)
//! - PDF text extraction (`pdf` feature, via `pdfium-render`)
//! - ISO-week calendar helpers
//!
//! Helpers are pass-through: failures from the network or parse layer are
//! returned to the plugin unchanged.
//!
//! # Example
//!
//! ```rust,no_run
//! use mat::api::FoodApi;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let api = FoodApi::new()?;
//! let doc = api.soup("<ul><li>Soup</li></ul>");
//! let dishes: Vec<_> = doc
//!     .select("li")?
//!     .into_iter()
//!     .map(|li| api.food(li.text, ""))
//!     .collect();
//! assert_eq!(dishes.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod html;
pub mod http;
#[cfg(feature = "pdf")]
pub mod pdf;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::food::Food;

pub use calendar::PluginDate;
pub use html::{Document, Element};
pub use http::{HttpClient, HttpResponse};

/// Errors raised by API helpers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid CSS selector '{0}'")]
    Selector(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("no Tokio runtime available for the HTTP client")]
    NoRuntime,
}

/// Facade passed to every plugin call. Cheap to clone.
#[derive(Clone)]
pub struct FoodApi {
    inner: Arc<Inner>,
}

struct Inner {
    http: HttpClient,
    today: NaiveDate,
}

impl FoodApi {
    /// Facade whose notion of "today" is the local date.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_today(Local::now().date_naive())
    }

    /// Facade with an explicit reference date for `is_today` and friends.
    pub fn with_today(today: NaiveDate) -> Result<Self, ApiError> {
        Ok(Self {
            inner: Arc::new(Inner {
                http: HttpClient::new()?,
                today,
            }),
        })
    }

    pub fn today(&self) -> NaiveDate {
        self.inner.today
    }

    pub fn food(&self, dish: impl Into<String>, description: impl Into<String>) -> Food {
        Food::new(dish, description)
    }

    pub fn soup(&self, html: &str) -> Document {
        Document::parse(html)
    }

    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    /// Fetch a PDF and return the text of each page. Blocking.
    #[cfg(feature = "pdf")]
    pub fn pdf_text(&self, url: &str) -> Result<Vec<String>, ApiError> {
        let bytes = self.inner.http.get_bytes(url)?;
        pdf::page_texts(&bytes)
    }

    pub fn week_of(&self, date: NaiveDate) -> u32 {
        calendar::week_of(date)
    }

    pub fn week_is_even(&self, date: NaiveDate) -> bool {
        calendar::week_is_even(date)
    }

    pub fn week_is_odd(&self, date: NaiveDate) -> bool {
        calendar::week_is_odd(date)
    }

    pub fn is_today(&self, date: NaiveDate) -> bool {
        date == self.inner.today
    }

    pub fn is_current_week(&self, date: NaiveDate) -> bool {
        calendar::is_same_week(date, self.inner.today)
    }

    pub fn is_weekday(&self, date: NaiveDate) -> bool {
        calendar::is_weekday(date)
    }
}
