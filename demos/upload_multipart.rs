use serde::Deserialize;
use simplehttp::{Bytes, prelude::*};
use snafu::prelude::*;

#[derive(Debug, Deserialize)]
struct Echo {
    form: std::collections::BTreeMap<String, String>,
    files: std::collections::BTreeMap<String, String>,
}

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| "https://httpbin.org".to_owned());
    let path = std::env::args()
        .nth(1)
        .whatever_context("Usage: upload_multipart <FILE>")?;

    let mut form = MultipartFormData::new();
    form.add_bytes(Bytes::from_static(b"simplehttp"), "client")
        .call();
    form.add_file(&path, "upload")
        .call()
        .whatever_context("Failed to add file")?;

    let session = Session::new(
        base_url
            .as_str()
            .into_base_url()
            .whatever_context("Invalid BASE_URL")?,
        SessionConfig::default(),
        reqwest::Client::new(),
    );

    let echo = session
        .response(&Request::<Echo>::post(
            "post",
            Body::from(form),
            Query::new(),
        ))
        .await
        .whatever_context("Upload failed")?;

    println!("form fields: {:?}", echo.form);
    println!("files: {:?}", echo.files.keys().collect::<Vec<_>>());

    Ok(())
}
