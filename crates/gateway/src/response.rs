//! Response writers

use axum::{
    http::{header::LOCATION, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use talentforge_common::pagination::Paged;
use uuid::Uuid;

/// 200 with a plain JSON string
pub struct Message(pub &'static str);

impl IntoResponse for Message {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self.0)).into_response()
    }
}

/// 201 with the id of the created resource
pub struct Created(pub Uuid);

impl IntoResponse for Created {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(json!({ "id": self.0 }))).into_response()
    }
}

/// 200 confirmation pointing at the new resource through `Location`
pub struct Located {
    pub message: &'static str,
    pub location: String,
}

impl IntoResponse for Located {
    fn into_response(self) -> Response {
        let mut response = Message(self.message).into_response();
        if let Ok(location) = HeaderValue::from_str(&self.location) {
            response.headers_mut().insert(LOCATION, location);
        }
        response
    }
}

pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

pub const TOTAL_COUNT: &str = "x-total-count";

/// A page of DTOs as a JSON array with the total in `X-Total-Count`
///
/// Lists can carry extra aggregate headers computed over the whole filtered
/// set, such as `X-Total-Lifetime-Value`.
pub struct Listed<T> {
    page: Paged<T>,
    headers: Vec<(&'static str, String)>,
}

impl<T> Listed<T> {
    pub fn new(page: Paged<T>) -> Self {
        Self {
            page,
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl ToString) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

impl<T> From<Paged<T>> for Listed<T> {
    fn from(page: Paged<T>) -> Self {
        Self::new(page)
    }
}

impl<T> IntoResponse for Listed<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let total = self.page.total;
        let mut response = Json(self.page.items).into_response();
        let headers = response.headers_mut();

        headers.insert(HeaderName::from_static(TOTAL_COUNT), HeaderValue::from(total));
        for (name, value) in self.headers {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }

        response
    }
}
