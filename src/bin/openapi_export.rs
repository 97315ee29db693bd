// Prints the OpenAPI document as JSON
// Usage: cargo run --bin openapi_export > openapi.json

use utoipa::OpenApi;

use course_api::api::openapi::ApiDoc;

fn main() -> anyhow::Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
