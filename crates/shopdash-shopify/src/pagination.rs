//! Cursor extraction for Shopify's `Link`-header pagination.
//!
//! Each catalog page response carries a `Link` header listing URLs for the
//! adjacent pages; the cursor is the `page_info` query parameter of the
//! `rel="next"` URL. Cursors are base64url-encoded and need no percent
//! decoding.
//!
//! ```text
//! <https://shop.com/products.json?limit=250&page_info=PREV>; rel="previous",
//! <https://shop.com/products.json?limit=250&page_info=NEXT>; rel="next"
//! ```

/// Extracts the `page_info` cursor for the next page from a `Link` header.
///
/// Returns `None` when the header is absent, carries no `rel="next"`
/// segment (last page), or the next URL has no `page_info` parameter.
#[must_use]
pub fn next_page_cursor(link_header: Option<&str>) -> Option<String> {
    let next_url = link_header?
        .split(',')
        .map(str::trim)
        .filter(|segment| segment.contains(r#"rel="next""#))
        .find_map(bracketed_url)?;

    query_value(next_url, "page_info")
}

/// Returns the URL between `<` and `>` in a single link directive.
fn bracketed_url(segment: &str) -> Option<&str> {
    let start = segment.find('<')? + 1;
    let end = segment.find('>')?;
    (start < end).then(|| &segment[start..end])
}

/// Extracts a named query parameter's value from a URL string.
fn query_value(url: &str, param: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let needle = format!("{param}=");

    query.split('&').find_map(|pair| {
        let value = pair.strip_prefix(needle.as_str())?;
        let value = value.split('#').next().unwrap_or(value);
        (!value.is_empty()).then(|| value.to_owned())
    })
}
