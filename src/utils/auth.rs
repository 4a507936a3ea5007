//! Authentication headers for API requests

use crate::api::Credential;
use crate::core::constants::API_KEY_HEADER;

/// Attach the credential to an outbound request.
///
/// The policy assistant API authenticates every route with a single
/// `X-API-Key` header; there is no bearer-token or cookie flow.
pub fn add_api_key_header(
    request: reqwest::RequestBuilder,
    credential: &Credential,
) -> reqwest::RequestBuilder {
    request.header(API_KEY_HEADER, credential.expose())
}
