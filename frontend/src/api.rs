use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use gloo_net::http::{Request, RequestBuilder};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, File, FormData, RequestCredentials};

use support_core::config::DEFAULT_API_BASE;
use support_core::polling::{LocalSpawner, Sleeper};
use support_core::redirect::{Navigator, Redirect};
use support_core::transport::{
    ApiRequest, FilePart, FormPart, Method, MultipartForm, RawResponse, RequestBody, Transport,
    TransportError,
};
use support_core::SupportConfig;

/// Base URL of the backend API server, overridable at build time.
pub fn api_base() -> &'static str {
    option_env!("SUPPORT_API_BASE").unwrap_or(DEFAULT_API_BASE)
}

pub fn support_config() -> SupportConfig {
    SupportConfig::with_base_url(api_base())
}

/// `fetch` with the session cookie attached to every call.
pub struct FetchTransport;

#[async_trait(?Send)]
impl Transport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = request.url.clone();
        let fail = |reason: String| TransportError {
            url: url.clone(),
            reason,
        };

        let builder = builder_for(request.method, &request.url)
            .credentials(RequestCredentials::Include);
        let prepared = match request.body {
            RequestBody::Empty => builder.build(),
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => {
                let data = form_data(form).map_err(|e| fail(js_error(e)))?;
                builder.body(data)
            }
        }
        .map_err(|e| fail(e.to_string()))?;

        let response = prepared.send().await.map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| fail(e.to_string()))?;
        Ok(RawResponse::new(status, body))
    }
}

fn builder_for(method: Method, url: &str) -> RequestBuilder {
    match method {
        Method::Get => Request::get(url),
        Method::Post => Request::post(url),
        Method::Put => Request::put(url),
        Method::Delete => Request::delete(url),
    }
}

fn form_data(form: MultipartForm) -> Result<FormData, JsValue> {
    let data = FormData::new()?;
    for part in form.into_parts() {
        match part {
            FormPart::Text { name, value } => data.append_with_str(&name, &value)?,
            FormPart::File { name, file } => {
                let bytes = Uint8Array::from(file.bytes.as_slice());
                let options = BlobPropertyBag::new();
                options.set_type(&file.mime_type);
                let blob = Blob::new_with_u8_array_sequence_and_options(
                    &Array::of1(&bytes),
                    &options,
                )?;
                data.append_with_blob_and_filename(&name, &blob, &file.filename)?;
            }
        }
    }
    Ok(data)
}

fn js_error(err: JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Reads a picked file into memory so the core can size-check and upload it.
pub async fn read_file(file: &File) -> Result<FilePart, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(js_error)?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    Ok(FilePart::new(file.name(), file.type_(), bytes))
}

/// Full page navigation through `window.location`.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, redirect: &Redirect) {
        go_to(&redirect.path);
    }
}

pub fn go_to(path: &str) {
    if let Err(err) = leptos::prelude::window().location().set_href(path) {
        log::error!("Navigation to {path} failed: {}", js_error(err));
    }
}

pub struct GlooSleeper;

#[async_trait(?Send)]
impl Sleeper for GlooSleeper {
    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}

pub struct BrowserSpawner;

impl LocalSpawner for BrowserSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        leptos::task::spawn_local(task);
    }
}
