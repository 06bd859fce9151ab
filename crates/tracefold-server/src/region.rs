//! Region resolution from SigV4 request headers.

use axum::http::{header::AUTHORIZATION, HeaderMap};

/// Region named in the `Credential=` scope of a SigV4 `Authorization`
/// header, e.g. `Credential=AKID/20240101/us-east-1/xray/aws4_request`.
pub fn region_from_headers(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (_, rest) = auth.split_once("Credential=")?;
    let scope = rest.split([',', ' ']).next()?;
    scope.split('/').nth(2).filter(|r| !r.is_empty())
}
