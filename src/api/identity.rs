use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::clients::{ACTOR_ID_HEADER, ACTOR_ROLES_HEADER};
use crate::domain::access::{Actor, Roles};
use crate::domain::order::OrderError;

/// Actor resolved upstream and carried in `X-User-Id` / `X-User-Roles`
impl FromRequest for Actor {
    type Error = OrderError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req.headers()))
    }
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, OrderError> {
    let id = header_str(headers, ACTOR_ID_HEADER)?
        .ok_or_else(|| OrderError::InvalidArgument(format!("Missing {ACTOR_ID_HEADER} header")))?
        .trim()
        .parse()
        .map_err(|_| OrderError::InvalidArgument(format!("{ACTOR_ID_HEADER} must be an integer")))?;

    let roles = match header_str(headers, ACTOR_ROLES_HEADER)? {
        Some(value) => Roles::parse_header(value)?,
        None => Roles::empty(),
    };

    Ok(Actor::new(id, roles))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, OrderError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| OrderError::InvalidArgument(format!("{name} header is not valid text")))
        })
        .transpose()
}
