//! Bridge between the `pagination` crate and domain paging.
//!
//! List endpoints accept `?cursor=&limit=` and answer with the
//! `{ data, nextCursor }` envelope. Cursors wrap a [`PageKey`].

use pagination::{PageParams, Paginated, PaginationError};
use serde_json::json;

use crate::domain::{Error, Page, PageKey, PageRequest};

/// Validate query parameters into a domain page request.
pub(crate) fn page_request(params: &PageParams) -> Result<PageRequest, Error> {
    let limit = params.limit().map_err(pagination_error)?;
    let after = params
        .cursor::<PageKey>()
        .map_err(pagination_error)?
        .map(pagination::Cursor::into_key);
    Ok(PageRequest::new(after, limit))
}

/// Wrap a domain page in the list envelope, mapping each item.
pub(crate) fn paginated<T, U>(page: Page<T>, map: impl FnMut(T) -> U) -> Result<Paginated<U>, Error> {
    let Page { items, next } = page;
    Paginated::new(items.into_iter().map(map).collect(), next)
        .map_err(|err| Error::internal(format!("failed to encode cursor: {err}")))
}

fn pagination_error(err: PaginationError) -> Error {
    let (field, code) = match &err {
        PaginationError::InvalidLimit { .. } => ("limit", "out_of_range"),
        PaginationError::InvalidEncoding
        | PaginationError::InvalidPayload { .. }
        | PaginationError::Encode { .. } => ("cursor", "invalid_cursor"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}
