use actix_web::{HttpRequest, HttpResponse};
use siren_core::UnitCode;

use crate::routes::common::{bad_request, unauthorized};

const UNIT_HEADER: &str = "x-siren-unit-id";

/// Calling unit identity, supplied by the session collaborator in front of
/// this service. The engine trusts it and only checks that it matches the
/// referenced incident's assigned unit.
pub fn caller_unit(req: &HttpRequest) -> Result<UnitCode, HttpResponse> {
    let value = header_value(req, UNIT_HEADER)
        .ok_or_else(|| unauthorized("missing unit identity header"))?;
    let code = UnitCode::new(value);
    if code.is_empty() {
        return Err(bad_request("unit identity header is empty"));
    }
    Ok(code)
}

fn header_value(req: &HttpRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
}
