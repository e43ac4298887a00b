//! API documentation: the OpenAPI document and a Swagger UI page.

use axum::Router;
use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;

use crate::state::AppState;

pub const OPENAPI_PATH: &str = "/docs/swagger.yaml";

const OPENAPI_YAML: &str = include_str!("../../docs/openapi.yaml");

const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>Notify Hub API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {
      window.ui = SwaggerUIBundle({ url: "/docs/swagger.yaml", dom_id: "#swagger-ui" });
    };
  </script>
</body>
</html>
"##;

pub fn router<S, C>() -> Router<AppState<S, C>>
where
    S: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    Router::new()
        .route("/docs", get(swagger_ui))
        .route(OPENAPI_PATH, get(openapi_document))
}

async fn swagger_ui() -> Html<&'static str> {
    Html(SWAGGER_UI_HTML)
}

async fn openapi_document() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/yaml")], OPENAPI_YAML)
}
