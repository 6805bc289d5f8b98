//! Standalone boundary endpoints that live next to the redirect
//! engine but are not part of its rule set.

use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

/// Social-card image URL that old pages still link to.
const LEGACY_SOCIAL_IMAGE_URL: &str =
    "https://res.cloudinary.com/site-media/image/upload/c_fill,w_2400,h_1256/social-background.png";

/// Redirect for the pre-CDN social image path.
pub async fn legacy_social_image() -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, LEGACY_SOCIAL_IMAGE_URL)],
    )
        .into_response()
}

/// Client-side redirect page.
///
/// Reflects the `url` query parameter back as a browser-side redirect
/// so link previews only ever see this page, not the destination.
/// This is a deliberate open redirect used for harmless pranks; see
/// DESIGN.md before changing it.
pub async fn reflect_redirect() -> Html<&'static str> {
    Html(
        r#"<!--
  This page performs a client-side redirect so that link unfurlers
  cannot see where it really goes.
-->
<script>
  var urlToRedirectTo = getQueryStringParam(location.href, 'url') || '/'
  window.location.replace(urlToRedirectTo)
  function getQueryStringParam(url, name) {
    var regexReadyName = name.replace(/[\[]/, '\\[').replace(/[\]]/, '\\]')
    var regex = new RegExp('[\\?&]' + regexReadyName + '=([^&#]*)')
    var results = regex.exec(url)
    return results === null
      ? ''
      : decodeURIComponent(results[1].replace(/\+/g, ' '))
  }
</script>
"#,
    )
}

/// Stand-in for the website proper. Anything the redirect rules do
/// not claim lands here.
pub async fn site_fallback() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
