use url::Url;

use crate::selector::SelectError;

/// Builds the redirect target for `rest` below a mirror's base URL.
///
/// The mirror's own path is kept as the root, so `/core/os/foo` on
/// `https://m.example/archlinux/` becomes
/// `https://m.example/archlinux/core/os/foo`. Only the path is replaced;
/// dot segments are resolved by the URL parser and can never change the host.
pub fn redirect_target(base: &str, rest: &str) -> Result<Url, SelectError> {
    let mut url = Url::parse(base).map_err(|source| SelectError::MalformedMirrorUrl {
        url: base.to_string(),
        source,
    })?;
    if url.cannot_be_a_base() {
        return Err(SelectError::MalformedMirrorUrl {
            url: base.to_string(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }

    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return Ok(url);
    }

    let joined = format!("{}/{}", url.path().trim_end_matches('/'), rest);
    url.set_path(&joined);
    Ok(url)
}
