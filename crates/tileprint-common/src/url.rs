//! Tile URL templates.
//!
//! Templates use the slippy-map placeholders `{z}`, `{x}`, `{y}` and an
//! optional `{s}` subdomain, e.g. `https://{s}.tile.example.org/{z}/{x}/{y}.png`.

/// Expand a tile URL template for one tile address.
///
/// `subdomain` replaces `{s}`; pass `None` if the template has no `{s}` (an
/// unreplaced `{s}` is left as-is).
#[must_use]
pub fn expand_template(template: &str, z: u8, x: u32, y: u32, subdomain: Option<&str>) -> String {
    let mut url = template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string());
    if let Some(s) = subdomain {
        url = url.replace("{s}", s);
    }
    url
}

/// Pick the subdomain for a tile the same way slippy-map clients do:
/// `(x + y) mod n`, so neighbouring tiles spread across hosts.
#[must_use]
pub fn pick_subdomain(subdomains: &[String], x: u32, y: u32) -> Option<&str> {
    if subdomains.is_empty() {
        return None;
    }
    let index = (u64::from(x) + u64::from(y)) % subdomains.len() as u64;
    subdomains
        .get(usize::try_from(index).ok()?)
        .map(String::as_str)
}

/// Resolve a template that may be a relative filesystem path against
/// `base_dir` (typically the directory of the job file).
///
/// Absolute URLs (`http:`, `https:`, `data:`, `file:`) and absolute paths are
/// returned unchanged.
#[must_use]
pub fn resolve_url(href: &str, base_dir: Option<&str>) -> String {
    if href.starts_with("http://")
        || href.starts_with("https://")
        || href.starts_with("data:")
        || href.starts_with("file:")
        || href.starts_with('/')
    {
        return href.to_string();
    }

    let Some(base) = base_dir else {
        return href.to_string();
    };
    if base.is_empty() {
        return href.to_string();
    }
    if base.ends_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}
