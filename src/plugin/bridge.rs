//! Glue between the QuickJS context of a script plugin and [`FoodApi`].
//!
//! Native helpers are registered as `__mat_*` globals and always return a
//! JSON envelope, `{"ok": value}` or `{"err": message}`. The prelude wraps
//! them into the `api` object scripts receive and turns `err` envelopes into
//! thrown `Error`s, so script code sees ordinary exceptions.

use std::fmt::Display;

use chrono::NaiveDate;
use rquickjs::{Ctx, Function};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::api::{calendar, Document, FoodApi};

/// Script-side half of the bridge. Evaluated before the plugin source.
const PRELUDE: &str = r#"
(function () {
    const unwrap = (json) => {
        const envelope = JSON.parse(json);
        if ('err' in envelope) throw new Error(envelope.err);
        return envelope.ok;
    };
    const text = (value) => (value === null || value === undefined) ? '' : String(value);
    const iso = (date) => (date !== null && typeof date === 'object' && 'iso' in date) ? date.iso : text(date);
    const first = (found) => found.length ? found[0] : null;
    const FOOD = Symbol('food');

    const soup = (html) => {
        const source = text(html);
        const scoped = (scope, css) => unwrap(__mat_select(source, scope, text(css))).map((element) =>
            Object.assign(element, {
                attr: (key) => Object.prototype.hasOwnProperty.call(element.attrs, key) ? element.attrs[key] : null,
                select: (inner) => scoped(element.index, inner),
                select_one: (inner) => first(scoped(element.index, inner)),
                toString: () => element.text,
            }));
        return Object.freeze({
            select: (css) => scoped(-1, css),
            select_one: (css) => first(scoped(-1, css)),
            text: () => __mat_text(source),
        });
    };

    const response = (raw) => Object.assign(raw, {
        ok: raw.status >= 200 && raw.status < 300,
        json: () => JSON.parse(raw.text),
    });

    const logger = (level) => (...parts) => __mat_log(level, parts.map(String).join(' '));

    const makeApi = () => Object.freeze({
        food: (dish, description) => {
            const entry = { dish: text(dish), description: text(description) };
            Object.defineProperty(entry, FOOD, { value: true });
            return Object.freeze(entry);
        },
        soup,
        get: (url) => response(unwrap(__mat_http_get(text(url)))),
        pdf: typeof __mat_pdf === 'function' ? (url) => unwrap(__mat_pdf(text(url))) : null,
        week_of: (date) => unwrap(__mat_week_of(iso(date))),
        week_is_even: (date) => unwrap(__mat_week_is_even(iso(date))),
        week_is_odd: (date) => unwrap(__mat_week_is_odd(iso(date))),
        is_today: (date) => unwrap(__mat_is_today(iso(date))),
        is_current_week: (date) => unwrap(__mat_is_current_week(iso(date))),
        is_weekday: (date) => unwrap(__mat_is_weekday(iso(date))),
        json: JSON,
        log: Object.freeze({
            debug: logger('debug'),
            info: logger('info'),
            warn: logger('warn'),
            error: logger('error'),
        }),
    });

    globalThis.console = {
        log: logger('debug'),
        debug: logger('debug'),
        info: logger('info'),
        warn: logger('warn'),
        error: logger('error'),
    };

    Object.defineProperty(globalThis, '__mat_call_name', {
        value: () => {
            const result = name();
            if (typeof result !== 'string') throw new TypeError('name() must return a string');
            return result;
        },
    });

    Object.defineProperty(globalThis, '__mat_call_food', {
        value: (dateJson) => {
            const raw = JSON.parse(dateJson);
            const date = Object.freeze(Object.assign(raw, { toString: () => raw.iso }));
            const result = food(makeApi(), date);
            if (result === null || result === undefined) return '[]';
            if (typeof result[Symbol.iterator] !== 'function') {
                throw new TypeError('food() must return an iterable of api.food() values');
            }
            const dishes = [];
            for (const item of result) {
                if (item === null || typeof item !== 'object' || item[FOOD] !== true) {
                    throw new TypeError('food() returned a value not built with api.food()');
                }
                dishes.push({ dish: item.dish, description: item.description });
            }
            return JSON.stringify(dishes);
        },
    });
})();
"#;

/// Result envelope understood by the prelude's `unwrap`.
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum Envelope<T> {
    Ok(T),
    Err(String),
}

fn envelope<T: Serialize, E: Display>(result: Result<T, E>) -> String {
    let envelope = match result {
        Ok(value) => Envelope::Ok(value),
        Err(e) => Envelope::Err(e.to_string()),
    };
    serde_json::to_string(&envelope)
        .unwrap_or_else(|e| serde_json::json!({ "err": e.to_string() }).to_string())
}

#[derive(Clone, Copy)]
enum DateQuery {
    WeekOf,
    WeekIsEven,
    WeekIsOdd,
    IsToday,
    IsCurrentWeek,
    IsWeekday,
}

const DATE_QUERIES: [(&str, DateQuery); 6] = [
    ("__mat_week_of", DateQuery::WeekOf),
    ("__mat_week_is_even", DateQuery::WeekIsEven),
    ("__mat_week_is_odd", DateQuery::WeekIsOdd),
    ("__mat_is_today", DateQuery::IsToday),
    ("__mat_is_current_week", DateQuery::IsCurrentWeek),
    ("__mat_is_weekday", DateQuery::IsWeekday),
];

impl DateQuery {
    fn answer(self, api: &FoodApi, date: NaiveDate) -> serde_json::Value {
        match self {
            Self::WeekOf => api.week_of(date).into(),
            Self::WeekIsEven => api.week_is_even(date).into(),
            Self::WeekIsOdd => api.week_is_odd(date).into(),
            Self::IsToday => api.is_today(date).into(),
            Self::IsCurrentWeek => api.is_current_week(date).into(),
            Self::IsWeekday => api.is_weekday(date).into(),
        }
    }
}

/// Register the stateless helpers and evaluate the prelude.
///
/// Called once per context, before the plugin source, so logging and HTML
/// parsing work at load time too. `plugin` tags log lines from the script.
pub(crate) fn install_prelude(ctx: &Ctx<'_>, plugin: &str) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    globals.set(
        "__mat_select",
        Function::new(ctx.clone(), |html: String, scope: i32, css: String| {
            let doc = Document::parse(&html);
            envelope(match usize::try_from(scope) {
                Ok(scope) => doc.select_within(scope, &css),
                Err(_) => doc.select(&css),
            })
        })?,
    )?;

    globals.set(
        "__mat_text",
        Function::new(ctx.clone(), |html: String| Document::parse(&html).text())?,
    )?;

    let plugin = plugin.to_string();
    globals.set(
        "__mat_log",
        Function::new(ctx.clone(), move |level: String, message: String| {
            log(&plugin, &level, &message);
        })?,
    )?;

    ctx.eval::<(), _>(PRELUDE)
}

/// Register the native helpers backed by `api`.
///
/// Called before every `food()` call so each call sees the facade it was
/// given.
pub(crate) fn install_api(ctx: &Ctx<'_>, api: &FoodApi) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    let http = api.clone();
    globals.set(
        "__mat_http_get",
        Function::new(ctx.clone(), move |url: String| {
            envelope(http.http().get(&url))
        })?,
    )?;

    #[cfg(feature = "pdf")]
    {
        let pdf = api.clone();
        globals.set(
            "__mat_pdf",
            Function::new(ctx.clone(), move |url: String| envelope(pdf.pdf_text(&url)))?,
        )?;
    }

    for (global, query) in DATE_QUERIES {
        let api = api.clone();
        globals.set(
            global,
            Function::new(ctx.clone(), move |date: String| {
                envelope(calendar::parse_date(&date).map(|date| query.answer(&api, date)))
            })?,
        )?;
    }

    Ok(())
}

fn log(plugin: &str, level: &str, message: &str) {
    match level {
        "debug" => debug!(target: "plugin", plugin, "{message}"),
        "warn" => warn!(target: "plugin", plugin, "{message}"),
        "error" => error!(target: "plugin", plugin, "{message}"),
        _ => info!(target: "plugin", plugin, "{message}"),
    }
}
