//! Static asset serving for production mode.
//!
//! Files under the static root are served directly; any path without a
//! matching file gets the index document with `200 OK` so client-side
//! routes resolve in the single-page application. Directories are never
//! redirected or listed; they get the index document too.

use std::path::Path;

use axum::body::Body;
use axum::http::{Request, Response};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};

#[derive(Clone)]
pub struct StaticAssets {
    service: ServeDir<ServeFile>,
}

impl StaticAssets {
    pub fn new(root: &Path, index_document: &str) -> Self {
        let index = ServeFile::new(root.join(index_document));
        Self {
            service: ServeDir::new(root)
                .append_index_html_on_directories(false)
                .fallback(index),
        }
    }

    pub async fn serve(&self, request: Request<Body>) -> Response<Body> {
        match self.service.clone().oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}
