#![allow(dead_code)]

use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use support_core::polling::{LocalSpawner, PollSchedule, Poller, Sleeper};
use support_core::redirect::{Navigator, Redirect, SystemClock};
use support_core::transport::{
    ApiRequest, FormPart, Method, RawResponse, RequestBody, Transport, TransportError,
};
use support_core::{ApiClient, SupportConfig};
use support_desk::config::ServerConfig;
use support_desk::{app, AppState};

pub struct TestServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(ServerConfig::default()).await
    }

    pub async fn spawn_with(config: ServerConfig) -> Self {
        let router = app(AppState::new(&config), &config).expect("build router");
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let address: SocketAddr = listener.local_addr().expect("test listener local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("run test server");
        });
        Self {
            base_url: format!("http://{address}"),
            shutdown: Some(shutdown_tx),
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A cookie-keeping client, like a browser tab.
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("build reqwest client")
    }

    pub async fn login(&self, client: &reqwest::Client, name: &str, role: &str) -> Value {
        let response = client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "name": name, "role": role }))
            .send()
            .await
            .expect("login request");
        assert_eq!(response.status(), 200);
        response.json::<Value>().await.expect("login body")["data"].clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(3), self.handle).await;
    }
}

/// Core transport over reqwest, sharing the client's cookie jar.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let url = request.url.clone();
        let fail = |reason: String| TransportError {
            url: url.clone(),
            reason,
        };
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => {
                let mut multipart = Form::new();
                for part in form.into_parts() {
                    multipart = match part {
                        FormPart::Text { name, value } => multipart.text(name, value),
                        FormPart::File { name, file } => {
                            let part = Part::bytes(file.bytes)
                                .file_name(file.filename)
                                .mime_str(&file.mime_type)
                                .map_err(|e| fail(e.to_string()))?;
                            multipart.part(name, part)
                        }
                    };
                }
                builder.multipart(multipart)
            }
        };
        let response = builder.send().await.map_err(|e| fail(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| fail(e.to_string()))?;
        Ok(RawResponse::new(status, body))
    }
}

#[derive(Default)]
pub struct NoNavigation;

impl Navigator for NoNavigation {
    fn navigate(&self, redirect: &Redirect) {
        panic!("unexpected redirect to {}", redirect.path);
    }
}

pub struct TokioSleeper;

#[async_trait(?Send)]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub struct LocalSetSpawner;

impl LocalSpawner for LocalSetSpawner {
    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

/// Client config with fast polling so tests do not wait for 3 s ticks.
pub fn fast_config(server: &TestServer) -> SupportConfig {
    SupportConfig {
        poll_interval_ms: 50,
        error_backoff_ms: 100,
        ..SupportConfig::with_base_url(&server.base_url)
    }
}

pub fn api_client(client: reqwest::Client, config: &SupportConfig) -> Rc<ApiClient<ReqwestTransport>> {
    Rc::new(ApiClient::new(
        ReqwestTransport::new(client),
        config,
        Rc::new(NoNavigation),
        Rc::new(SystemClock),
    ))
}

pub fn poller(config: &SupportConfig) -> Poller {
    Poller::new(
        PollSchedule::from_config(config),
        Rc::new(TokioSleeper),
        Rc::new(LocalSetSpawner),
    )
}
