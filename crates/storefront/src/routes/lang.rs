//! Language switch.

use axum::{
    extract::Path,
    http::{HeaderMap, header},
    response::Redirect,
};
use tower_sessions::Session;
use url::Url;

use gamewar_core::Language;

use crate::error::AppError;
use crate::models::session_keys;

/// Store the language and go back to the page the visitor came from.
///
/// Unknown codes leave the language unchanged.
pub async fn switch(
    session: Session,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Result<Redirect, AppError> {
    match code.parse::<Language>() {
        Ok(lang) => session.insert(session_keys::LANG, lang).await?,
        Err(_) => tracing::debug!(code = %code, "Unknown language code"),
    }
    Ok(Redirect::to(&back_path(&headers)))
}

/// Path and query of the `Referer`, so the redirect never leaves the site.
fn back_path(headers: &HeaderMap) -> String {
    headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|referer| Url::parse(referer).ok())
        .map_or_else(
            || "/".to_owned(),
            |url| match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_owned(),
            },
        )
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_back_path_keeps_only_path_and_query() {
        let mut headers = HeaderMap::new();
        assert_eq!(back_path(&headers), "/");

        headers.insert(
            header::REFERER,
            HeaderValue::from_static("https://evil.example/products?q=ps5"),
        );
        assert_eq!(back_path(&headers), "/products?q=ps5");

        headers.insert(header::REFERER, HeaderValue::from_static("not a url"));
        assert_eq!(back_path(&headers), "/");
    }
}
