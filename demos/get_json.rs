use serde::Deserialize;
use simplehttp::{
    interceptor::{DefaultHeaders, Interceptors, SharedBackoffRetry},
    prelude::*,
};
use snafu::prelude::*;

#[derive(Debug, Deserialize)]
struct Slideshow {
    title: String,
    author: String,
}

#[derive(Debug, Deserialize)]
struct Document {
    slideshow: Slideshow,
}

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let base_url = std::env::var("BASE_URL").unwrap_or_else(|_| "https://httpbin.org".to_owned());

    let mut headers = simplehttp::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        simplehttp::header::HeaderValue::from_static("simplehttp-demo"),
    );

    let config = SessionConfig::builder()
        .encoder(JsonEncoder)
        .decoder(JsonDecoder)
        .interceptors(
            Interceptors::new()
                .with(DefaultHeaders::new(headers))
                .with(SharedBackoffRetry::default()),
        )
        .rescue_limit(3)
        .build();
    let session = Session::new(
        base_url
            .as_str()
            .into_base_url()
            .whatever_context("Invalid BASE_URL")?,
        config,
        reqwest::Client::new(),
    );

    let document = session
        .response(&Request::<Document>::get("json", Query::new()))
        .await
        .whatever_context("Failed to fetch document")?;

    println!(
        "{} by {}",
        document.slideshow.title, document.slideshow.author
    );

    Ok(())
}
