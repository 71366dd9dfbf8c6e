//! In-process S3 mock used by the integration tests / 测试用的本地 S3 模拟服务
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use yaolist_storage::drivers::s3::{CredentialSource, Credentials, S3Driver, StaticCredentials};

pub const BUCKET: &str = "mongotool";
/// Page size of a real ListObjects call / 单页最大条目数
pub const MAX_KEYS: usize = 1000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_credentials() -> Arc<dyn CredentialSource> {
    Arc::new(StaticCredentials::new(Credentials::new("AKIDEXAMPLE", "secret")))
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Default)]
struct MockState {
    objects: BTreeMap<String, Bytes>,
    requests: Vec<RecordedRequest>,
    put_status: Option<StatusCode>,
    list_status: Option<StatusCode>,
    list_body: Option<String>,
}

type SharedState = Arc<Mutex<MockState>>;

#[derive(Clone)]
pub struct MockS3 {
    addr: SocketAddr,
    state: SharedState,
}

impl MockS3 {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state: SharedState = Arc::new(Mutex::new(MockState::default()));

        let app = Router::new().fallback(handle).with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Path-style bucket endpoint / 路径风格的存储桶地址
    pub fn bucket_url(&self) -> String {
        format!("http://{}/{}", self.addr, BUCKET)
    }

    pub fn driver(&self) -> S3Driver {
        S3Driver::new(self.bucket_url(), test_credentials()).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    pub fn count(&self, method: &Method) -> usize {
        self.state.lock().requests.iter().filter(|r| &r.method == method).count()
    }

    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.state.lock().objects.insert(key.to_string(), data.into());
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn fail_puts_with(&self, status: StatusCode) {
        self.state.lock().put_status = Some(status);
    }

    pub fn fail_lists_with(&self, status: StatusCode) {
        self.state.lock().list_status = Some(status);
    }

    pub fn serve_listing_body(&self, body: &str) {
        self.state.lock().list_body = Some(body.to_string());
    }
}

fn error_body(code: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>{}</Code></Error>", code)
}

fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == name).then(|| urlencoding::decode(v).unwrap().into_owned())
    })
}

fn render_listing(objects: &BTreeMap<String, Bytes>, prefix: &str) -> String {
    let matching: Vec<(&String, &Bytes)> = objects.iter().filter(|(k, _)| k.starts_with(prefix)).collect();
    let truncated = matching.len() > MAX_KEYS;

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.push_str("<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">");
    xml.push_str(&format!("<Name>{}</Name><Prefix>{}</Prefix><MaxKeys>{}</MaxKeys>", BUCKET, prefix, MAX_KEYS));
    xml.push_str(&format!("<IsTruncated>{}</IsTruncated>", truncated));
    for (key, data) in matching.into_iter().take(MAX_KEYS) {
        xml.push_str(&format!(
            "<Contents><Key>{}</Key><LastModified>2013-05-24T00:00:00.000Z</LastModified>\
             <ETag>&quot;etag&quot;</ETag><Size>{}</Size><StorageClass>STANDARD</StorageClass></Contents>",
            key,
            data.len()
        ));
    }
    xml.push_str("</ListBucketResult>");
    xml
}

async fn handle(State(state): State<SharedState>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let mut state = state.lock();
    state.requests.push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers.clone(),
        body: body.clone(),
    });

    let signed = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"))
        .unwrap_or(false);
    if !signed {
        return (StatusCode::FORBIDDEN, error_body("AccessDenied")).into_response();
    }

    let bucket_root = format!("/{}", BUCKET);
    let Some(rest) = uri.path().strip_prefix(&bucket_root) else {
        return (StatusCode::NOT_FOUND, error_body("NoSuchBucket")).into_response();
    };
    let key = urlencoding::decode(rest.trim_start_matches('/')).unwrap().into_owned();

    match (method, key.is_empty()) {
        (Method::GET, true) => {
            if let Some(status) = state.list_status {
                return (status, error_body("InternalError")).into_response();
            }
            if let Some(body) = state.list_body.clone() {
                return (StatusCode::OK, body).into_response();
            }
            let prefix = query_param(uri.query(), "prefix").unwrap_or_default();
            (StatusCode::OK, render_listing(&state.objects, &prefix)).into_response()
        }
        (Method::PUT, false) => {
            if let Some(status) = state.put_status {
                return (status, error_body("AccessDenied")).into_response();
            }
            state.objects.insert(key, body);
            StatusCode::OK.into_response()
        }
        (Method::GET, false) => match state.objects.get(&key) {
            Some(data) => (StatusCode::OK, data.clone()).into_response(),
            None => (StatusCode::NOT_FOUND, error_body("NoSuchKey")).into_response(),
        },
        _ => (StatusCode::METHOD_NOT_ALLOWED, error_body("MethodNotAllowed")).into_response(),
    }
}
