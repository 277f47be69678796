//! services/api/src/bin/openapi.rs
//!
//! This binary writes the OpenAPI 3.0 document for the HTTP routes so the web
//! client can generate its bindings. The output path defaults to
//! `openapi.json` and may be given as the first argument.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("OpenAPI specification generated at {}", path);
    Ok(())
}
