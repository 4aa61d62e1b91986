//! Integration tests for the catalog client.
//!
//! Each test starts an in-memory mock of the catalog API on a random port
//! and drives the stores and views against it.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::auth::{read_token, AuthStorage, MemoryStorage};
use crate::config::Config;
use crate::errors::ClientError;
use crate::models::{
    CreateProductInput, FilterPatch, LoginInput, Phone, Product, ProductFilters, RegisterInput,
    Thumbnail, UpdateProductInput,
};
use crate::view::{AuthGuard, EditOutcome};
use crate::AppContext;

const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
];

/// A request seen by the mock API.
#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    authorization: Option<String>,
}

/// A thumbnail file part received by the mock API.
#[derive(Debug, Clone, PartialEq)]
struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Backend {
    /// Newest first
    products: Vec<Product>,
    requests: Vec<Recorded>,
    list_queries: Vec<HashMap<String, String>>,
    /// Per-request delays for the list endpoint, consumed in order
    list_delays: VecDeque<Duration>,
    /// Delay once `list_delays` is empty
    list_delay: Duration,
    uploads: Vec<Upload>,
    register_bodies: Vec<Value>,
    fail_thumbnail: bool,
}

type Shared = Arc<Mutex<Backend>>;

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Produto não encontrado", "statusCode": 404 })),
    )
        .into_response()
}

async fn record_requests(shared: Shared, request: Request, next: Next) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    shared.lock().unwrap().requests.push(Recorded {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization,
    });
    next.run(request).await
}

async fn list_products(
    State(shared): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let delay = {
        let mut backend = shared.lock().unwrap();
        backend.list_queries.push(query.clone());
        let fallback = backend.list_delay;
        backend.list_delays.pop_front().unwrap_or(fallback)
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size: usize = query
        .get("pageSize")
        .and_then(|p| p.parse().ok())
        .unwrap_or(10);
    let filter = query
        .get("filter")
        .map(|f| f.to_lowercase())
        .unwrap_or_default();
    if filter == "erro" {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Falha na busca" })),
        )
            .into_response();
    }

    let backend = shared.lock().unwrap();
    let matching: Vec<&Product> = backend
        .products
        .iter()
        .filter(|p| p.title.to_lowercase().contains(&filter))
        .collect();
    let total = matching.len();
    let data: Vec<Product> = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    Json(json!({
        "data": data,
        "meta": {
            "page": page,
            "pageSize": page_size,
            "total": total,
            "totalPages": total.div_ceil(page_size),
        }
    }))
    .into_response()
}

async fn get_product(State(shared): State<Shared>, Path(id): Path<String>) -> Response {
    let backend = shared.lock().unwrap();
    match backend.products.iter().find(|p| p.id == id) {
        Some(product) => Json(product.clone()).into_response(),
        None => not_found(),
    }
}

struct FormData {
    text: HashMap<String, String>,
    file: Option<Upload>,
}

async fn read_form(mut multipart: Multipart) -> FormData {
    let mut form = FormData {
        text: HashMap::new(),
        file: None,
    };
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "thumbnail" {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.unwrap().to_vec();
            form.file = Some(Upload {
                filename,
                content_type,
                bytes,
            });
        } else {
            form.text.insert(name, field.text().await.unwrap());
        }
    }
    form
}

async fn create_product(State(shared): State<Shared>, multipart: Multipart) -> Response {
    let mut form = read_form(multipart).await;
    let title = form.text.remove("title").unwrap_or_default();
    let description = form.text.remove("description").unwrap_or_default();

    if title == "Duplicado" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Produto já existe", "statusCode": 409 })),
        )
            .into_response();
    }
    let Some(upload) = form.file else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": ["thumbnail should not be empty"] })),
        )
            .into_response();
    };

    let product = Product {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        description,
        status: true,
        updated_at: now(),
        thumbnail: Some(format!(
            "https://cdn.test/{}",
            upload.filename.clone().unwrap_or_default()
        )),
    };

    let mut backend = shared.lock().unwrap();
    backend.uploads.push(upload);
    backend.products.insert(0, product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn update_product(
    State(shared): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut backend = shared.lock().unwrap();
    let Some(product) = backend.products.iter_mut().find(|p| p.id == id) else {
        return not_found();
    };
    if let Some(title) = body["title"].as_str() {
        product.title = title.to_string();
    }
    if let Some(description) = body["description"].as_str() {
        product.description = description.to_string();
    }
    if let Some(status) = body["status"].as_bool() {
        product.status = status;
    }
    product.updated_at = now();
    Json(product.clone()).into_response()
}

async fn update_thumbnail(
    State(shared): State<Shared>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let form = read_form(multipart).await;
    let mut backend = shared.lock().unwrap();
    if backend.fail_thumbnail {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Falha ao processar imagem" })),
        )
            .into_response();
    }
    let Some(upload) = form.file else {
        return (StatusCode::BAD_REQUEST, Json(json!({}))).into_response();
    };
    let Some(position) = backend.products.iter().position(|p| p.id == id) else {
        return not_found();
    };
    let product = &mut backend.products[position];
    product.thumbnail = Some(format!(
        "https://cdn.test/{}",
        upload.filename.clone().unwrap_or_default()
    ));
    product.updated_at = now();
    let product = product.clone();
    backend.uploads.push(upload);
    Json(product).into_response()
}

async fn delete_product(State(shared): State<Shared>, Path(id): Path<String>) -> Response {
    let mut backend = shared.lock().unwrap();
    let before = backend.products.len();
    backend.products.retain(|p| p.id != id);
    if backend.products.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn serve_asset(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "logo.png" => ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    if email == "notoken@example.com" {
        return Json(json!({ "message": "ok" })).into_response();
    }
    if password != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Credenciais inválidas", "statusCode": 401 })),
        )
            .into_response();
    }
    Json(json!({
        "accessToken": "tok-123",
        "user": {
            "id": "u1",
            "name": "Ana",
            "email": email,
            "status": "ACTIVE",
            "emailStatus": "VERIFIED",
            "platformRole": "USER",
            "avatar": ""
        }
    }))
    .into_response()
}

async fn register(State(shared): State<Shared>, Json(body): Json<Value>) -> Response {
    shared.lock().unwrap().register_bodies.push(body.clone());
    match body["email"].as_str().unwrap_or_default() {
        "exists@example.com" => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "E-mail já cadastrado" })),
        )
            .into_response(),
        email if email.starts_with("pending") => Json(json!({ "id": "u2" })).into_response(),
        _ => Json(json!({ "id": "u2", "jwt": "reg-tok" })).into_response(),
    }
}

fn mock_router(shared: Shared) -> Router {
    let recorder = shared.clone();

    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/thumbnail/{id}", patch(update_thumbnail))
        .route("/assets/{name}", get(serve_asset))
        .route("/auth/login", post(login))
        .route("/users", post(register))
        .layer(middleware::from_fn(move |req, next| {
            record_requests(recorder.clone(), req, next)
        }))
        .with_state(shared)
}

/// Test fixture for integration tests.
struct TestFixture {
    base_url: String,
    backend: Shared,
    storage: Arc<MemoryStorage>,
    context: AppContext,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_storage(MemoryStorage::new()).await
    }

    async fn logged_in() -> Self {
        Self::with_storage(MemoryStorage::with_blob(
            r#"{"state":{"token":"seed-token","user":null},"version":0}"#,
        ))
        .await
    }

    async fn with_storage(storage: MemoryStorage) -> Self {
        let backend: Shared = Arc::new(Mutex::new(Backend::default()));
        let app = mock_router(backend.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let storage = Arc::new(storage);
        let context = AppContext::with_storage(Config::for_base_url(&base_url), storage.clone())
            .expect("Failed to build context");

        TestFixture {
            base_url,
            backend,
            storage,
            context,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn backend(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    fn seed(&self, count: usize) {
        let mut backend = self.backend();
        for i in 1..=count {
            backend.products.push(Product {
                id: format!("seed-{:02}", i),
                title: format!("Produto {:02}", i),
                description: "Descrição de teste do produto".to_string(),
                status: i % 2 == 0,
                updated_at: "2025-01-01T00:00:00Z".to_string(),
                thumbnail: None,
            });
        }
    }

    fn last_list_query(&self) -> HashMap<String, String> {
        self.backend()
            .list_queries
            .last()
            .cloned()
            .expect("no list request recorded")
    }

    fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        self.backend()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }
}

fn create_input(title: &str, thumbnail: Thumbnail) -> CreateProductInput {
    CreateProductInput {
        title: title.to_string(),
        description: "short but valid desc".to_string(),
        thumbnail,
    }
}

fn png_thumbnail(filename: &str) -> Thumbnail {
    Thumbnail::binary(PNG_BYTES.to_vec(), filename, "image/png")
}

// ─── Listing, filters and pagination ────────────────────────────────────────

#[tokio::test]
async fn test_pagination_and_change_page() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(25);
    let view = fixture.context.products_view();

    assert!(view.mount(None).await);

    let state = view.state();
    assert_eq!(state.products.len(), 10);
    assert_eq!(state.meta.unwrap().total, 25);
    assert_eq!(state.meta.unwrap().total_pages, 3);
    assert!(view.is_first_page());
    assert!(!view.is_last_page());
    assert!(view.has_products());

    let query = fixture.last_list_query();
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
    assert_eq!(query.get("pageSize").map(String::as_str), Some("10"));
    assert!(!query.contains_key("filter"));

    let outcome = view.change_page(2).await;
    assert!(outcome.success);
    assert_eq!(view.state().filters.page, 2);
    assert_eq!(
        fixture.last_list_query().get("page").map(String::as_str),
        Some("2")
    );
    assert_eq!(view.state().products[0].id, "seed-11");

    view.change_page(3).await;
    assert_eq!(view.state().products.len(), 5);
    assert!(view.is_last_page());
    assert!(!view.is_first_page());
    assert_eq!(view.current_page(), 3);
}

#[tokio::test]
async fn test_search_resets_page_and_sends_filter() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(25);
    let view = fixture.context.products_view();
    view.mount(None).await;
    view.change_page(3).await;

    let outcome = view.search(FilterPatch::filter("Produto 2")).await;
    assert!(outcome.success);

    let state = view.state();
    assert_eq!(state.filters.page, 1);
    assert_eq!(state.filters.filter, "Produto 2");
    assert_eq!(state.meta.unwrap().total, 6);

    let query = fixture.last_list_query();
    assert_eq!(query.get("filter").map(String::as_str), Some("Produto 2"));
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_invalid_page_size_never_hits_network() {
    let fixture = TestFixture::logged_in().await;
    let view = fixture.context.products_view();

    let outcome = view
        .search(FilterPatch {
            page_size: Some(500),
            ..FilterPatch::default()
        })
        .await;

    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("100"));
    assert!(fixture.backend().list_queries.is_empty());
}

#[tokio::test]
async fn test_fetch_then_set_same_filters_is_noop() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(15);
    let store = &fixture.context.products;

    let filters = ProductFilters {
        page: 2,
        page_size: 5,
        filter: "Produto".to_string(),
    };
    store.fetch_products(Some(filters.clone())).await.unwrap();
    assert_eq!(store.filters(), filters);

    store.set_filters(&FilterPatch::from(filters.clone()));
    assert_eq!(store.filters(), filters);
}

#[tokio::test]
async fn test_set_filters_does_not_fetch() {
    let fixture = TestFixture::logged_in().await;
    let store = &fixture.context.products;
    let mut updates = store.subscribe();

    store.set_filters(&FilterPatch::filter("mesa"));

    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().filters.filter, "mesa");
    assert_eq!(store.filters().page, 1);
    assert!(fixture.backend().list_queries.is_empty());
}

#[tokio::test]
async fn test_mount_fetches_once() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(3);
    let view = fixture.context.products_view();

    let initial = ProductFilters {
        page: 1,
        page_size: 2,
        filter: String::new(),
    };
    assert!(view.mount(Some(initial.clone())).await);
    assert!(!view.mount(None).await);
    assert!(!view.mount(Some(ProductFilters::default())).await);

    assert_eq!(fixture.backend().list_queries.len(), 1);
    assert_eq!(view.state().filters, initial);
    assert_eq!(view.state().products.len(), 2);
}

#[tokio::test]
async fn test_later_fetch_wins_over_slower_earlier_one() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(25);
    fixture
        .backend()
        .list_delays
        .push_back(Duration::from_millis(400));
    let store = fixture.context.products.clone();

    let slow = store.clone();
    let first = tokio::spawn(async move {
        slow.fetch_products(Some(ProductFilters::default())).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = ProductFilters {
        page: 2,
        ..ProductFilters::default()
    };
    store.fetch_products(Some(second)).await.unwrap();
    first.await.unwrap().unwrap();

    let state = store.snapshot();
    assert_eq!(state.filters.page, 2);
    assert_eq!(state.meta.unwrap().page, 2);
    assert_eq!(state.products[0].id, "seed-11");
    assert!(!state.loading);
}

// ─── Create ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_url_thumbnail_uploads_downloaded_bytes() {
    let fixture = TestFixture::logged_in().await;
    let view = fixture.context.products_view();

    let from_url = view
        .create(create_input(
            "Logo remoto",
            Thumbnail::Remote(fixture.url("/assets/logo.png")),
        ))
        .await;
    assert!(from_url.success, "{:?}", from_url.error);

    let from_file = view
        .create(create_input("Logo local", png_thumbnail("logo.png")))
        .await;
    assert!(from_file.success, "{:?}", from_file.error);

    let uploads = fixture.backend().uploads.clone();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0], uploads[1]);
    assert_eq!(uploads[0].bytes, PNG_BYTES);
    assert_eq!(uploads[0].filename.as_deref(), Some("logo.png"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("image/png"));

    // Download goes out without credentials, the upload with them
    let downloads = fixture.requests_to("GET", "/assets/logo.png");
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].authorization, None);
    let creates = fixture.requests_to("POST", "/products");
    assert!(creates
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer seed-token")));

    assert_eq!(
        from_url.data.unwrap().thumbnail.as_deref(),
        Some("https://cdn.test/logo.png")
    );
}

#[tokio::test]
async fn test_create_prepends_before_reconcile_resolves() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(12);
    let view = fixture.context.products_view();
    view.mount(None).await;
    fixture.backend().list_delay = Duration::from_millis(300);

    let outcome = view
        .create(create_input("Novo produto", png_thumbnail("novo.png")))
        .await;
    let created = outcome.data.expect("create failed");

    let state = view.state();
    assert_eq!(state.products[0].id, created.id);
    assert_eq!(state.products.len(), 11);

    fixture.context.products.settle().await;

    let state = view.state();
    assert_eq!(state.products[0].id, created.id);
    assert_eq!(state.products.len(), 10);
    assert_eq!(state.meta.unwrap().total, 13);
}

#[tokio::test]
async fn test_create_with_unreachable_thumbnail_fails_cleanly() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(2);
    let view = fixture.context.products_view();
    view.mount(None).await;
    let before = view.state().products;

    let outcome = view
        .create(create_input(
            "A produto",
            Thumbnail::Remote(fixture.url("/assets/missing.png")),
        ))
        .await;

    assert!(!outcome.success);
    assert!(!outcome.error.unwrap().is_empty());

    let state = view.state();
    assert!(state.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert_eq!(state.products, before);
    assert!(!state.loading);
    assert!(fixture.requests_to("POST", "/products").is_empty());

    let err = fixture
        .context
        .products
        .create_product(create_input(
            "A produto",
            Thumbnail::Remote(fixture.url("/assets/missing.png")),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_server_message_surfaces_in_outcome() {
    let fixture = TestFixture::logged_in().await;
    let view = fixture.context.products_view();

    let outcome = view
        .create(create_input("Duplicado", png_thumbnail("d.png")))
        .await;

    assert_eq!(outcome.error.as_deref(), Some("Produto já existe"));
    assert_eq!(view.state().error.as_deref(), Some("Produto já existe"));

    view.clear_error();
    assert_eq!(view.state().error, None);
}

#[tokio::test]
async fn test_validation_blocks_create() {
    let fixture = TestFixture::logged_in().await;
    let view = fixture.context.products_view();

    let outcome = view
        .create(create_input("ab", png_thumbnail("a.png")))
        .await;

    assert_eq!(
        outcome.error.as_deref(),
        Some("Título deve ter pelo menos 3 caracteres")
    );
    assert!(fixture.requests_to("POST", "/products").is_empty());
    assert_eq!(view.state().error, None);
}

// ─── Update, thumbnail and delete ───────────────────────────────────────────

#[tokio::test]
async fn test_update_keeps_position() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(3);
    let view = fixture.context.products_view();
    view.mount(None).await;

    let input = UpdateProductInput {
        title: "Produto renomeado".to_string(),
        description: "Descrição nova do produto".to_string(),
        status: false,
    };
    let outcome = view.update("seed-02", &input).await;
    assert!(outcome.success);

    let state = view.state();
    assert_eq!(state.position("seed-02"), Some(1));
    assert_eq!(state.products[1].title, "Produto renomeado");
    assert!(!state.products[1].status);
    assert_eq!(state.products.len(), 3);
}

#[tokio::test]
async fn test_concurrent_updates_are_both_applied() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(3);
    let view = fixture.context.products_view();
    view.mount(None).await;

    let first = UpdateProductInput {
        title: "Primeiro editado".to_string(),
        description: "Descrição nova do produto".to_string(),
        status: true,
    };
    let third = UpdateProductInput {
        title: "Terceiro editado".to_string(),
        ..first.clone()
    };

    let (a, b) = tokio::join!(view.update("seed-01", &first), view.update("seed-03", &third));
    assert!(a.success && b.success);

    let titles: Vec<String> = view.state().products.into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["Primeiro editado", "Produto 02", "Terceiro editado"]);
}

#[tokio::test]
async fn test_update_thumbnail_replaces_current_product() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(2);
    let view = fixture.context.products_view();
    view.mount(None).await;
    let store = &fixture.context.products;
    store.fetch_product("seed-01").await.unwrap();

    let outcome = view
        .update_thumbnail("seed-01", png_thumbnail("capa.png"))
        .await;
    assert!(outcome.success);

    let state = view.state();
    let expected = Some("https://cdn.test/capa.png");
    assert_eq!(state.products[0].thumbnail.as_deref(), expected);
    assert_eq!(
        state.current_product.unwrap().thumbnail.as_deref(),
        expected
    );
}

#[tokio::test]
async fn test_edit_reports_thumbnail_failure_separately() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(3);
    fixture.backend().fail_thumbnail = true;
    let view = fixture.context.products_view();
    view.mount(None).await;

    let input = UpdateProductInput {
        title: "Produto editado".to_string(),
        description: "Descrição nova do produto".to_string(),
        status: true,
    };
    let outcome = view
        .edit("seed-02", &input, Some(png_thumbnail("nova.png")))
        .await;

    match outcome {
        EditOutcome::ThumbnailFailed { product, error } => {
            assert_eq!(product.title, "Produto editado");
            assert_eq!(error, "Falha ao processar imagem");
        }
        other => panic!("expected thumbnail failure, got {other:?}"),
    }

    // Metadata stays committed on the server and locally
    assert_eq!(fixture.backend().products[1].title, "Produto editado");
    assert_eq!(fixture.backend().products[1].thumbnail, None);
    assert_eq!(view.state().products[1].title, "Produto editado");
}

#[tokio::test]
async fn test_edit_success_with_and_without_thumbnail() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(1);
    let view = fixture.context.products_view();
    view.mount(None).await;

    let input = UpdateProductInput {
        title: "Só metadados".to_string(),
        description: "Descrição nova do produto".to_string(),
        status: true,
    };
    let outcome = view.edit("seed-01", &input, None).await;
    assert!(outcome.is_success());
    assert!(fixture.requests_to("PATCH", "/products/thumbnail/seed-01").is_empty());

    let outcome = view
        .edit("seed-01", &input, Some(png_thumbnail("nova.png")))
        .await;
    match outcome {
        EditOutcome::Updated(product) => {
            assert_eq!(product.thumbnail.as_deref(), Some("https://cdn.test/nova.png"))
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_edit_metadata_failure_skips_thumbnail() {
    let fixture = TestFixture::logged_in().await;
    let view = fixture.context.products_view();

    let input = UpdateProductInput {
        title: "Inexistente".to_string(),
        description: "Descrição nova do produto".to_string(),
        status: true,
    };
    let outcome = view
        .edit("missing", &input, Some(png_thumbnail("x.png")))
        .await;

    assert_eq!(outcome.error(), Some("Produto não encontrado"));
    assert!(matches!(outcome, EditOutcome::MetadataFailed { .. }));
    assert!(fixture.requests_to("PATCH", "/products/thumbnail/missing").is_empty());
}

#[tokio::test]
async fn test_delete_removes_before_reconcile_resolves() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(12);
    let view = fixture.context.products_view();
    view.mount(None).await;
    let store = &fixture.context.products;
    store.fetch_product("seed-01").await.unwrap();
    fixture.backend().list_delay = Duration::from_millis(300);

    let outcome = view.remove("seed-01").await;
    assert!(outcome.success);

    let state = view.state();
    assert!(!state.contains("seed-01"));
    assert_eq!(state.products.len(), 9);
    assert_eq!(state.current_product, None);

    store.settle().await;

    let state = view.state();
    assert!(!state.contains("seed-01"));
    assert_eq!(state.products.len(), 10);
    assert!(state.contains("seed-11"));
    assert_eq!(state.meta.unwrap().total, 11);
}

#[tokio::test]
async fn test_reconcile_never_overwrites_newer_fetch() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(25);
    let view = fixture.context.products_view();
    view.mount(None).await;
    fixture
        .backend()
        .list_delays
        .push_back(Duration::from_millis(400));

    let outcome = view.remove("seed-05").await;
    assert!(outcome.success);
    tokio::time::sleep(Duration::from_millis(50)).await;

    view.change_page(2).await;
    fixture.context.products.settle().await;

    let state = view.state();
    assert_eq!(state.filters.page, 2);
    assert_eq!(state.meta.unwrap().page, 2);
    assert_eq!(state.products[0].id, "seed-12");
}

#[tokio::test]
async fn test_failed_search_is_not_undone_by_older_reconcile() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(12);
    let view = fixture.context.products_view();
    view.mount(None).await;
    fixture
        .backend()
        .list_delays
        .push_back(Duration::from_millis(400));

    assert!(view.remove("seed-03").await.success);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = view.search(FilterPatch::filter("erro")).await;
    assert_eq!(outcome.error.as_deref(), Some("Falha na busca"));
    fixture.context.products.settle().await;

    let state = view.state();
    assert_eq!(state.filters.filter, "erro");
    assert_eq!(state.error.as_deref(), Some("Falha na busca"));
    assert!(!state.contains("seed-03"));
    assert_eq!(state.products.len(), 9);
}

#[tokio::test]
async fn test_applied_page_clears_previous_error() {
    let fixture = TestFixture::logged_in().await;
    fixture.seed(3);
    let view = fixture.context.products_view();

    assert!(!view.search(FilterPatch::filter("erro")).await.success);
    assert!(view.state().error.is_some());

    let store = fixture.context.products.clone();
    store.fetch_products(Some(ProductFilters::default())).await.unwrap();
    assert_eq!(store.snapshot().error, None);
    assert_eq!(store.snapshot().products.len(), 3);
}

#[tokio::test]
async fn test_get_missing_product_is_not_found() {
    let fixture = TestFixture::logged_in().await;
    let store = &fixture.context.products;

    let err = store.fetch_product("nope").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound { .. }));
    assert_eq!(store.snapshot().error.as_deref(), Some("Produto não encontrado"));

    let outcome = fixture.context.products_view().remove("nope").await;
    assert_eq!(outcome.error.as_deref(), Some("Produto não encontrado"));
}

// ─── Authentication ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_bearer_header_follows_storage() {
    let fixture = TestFixture::logged_in().await;
    let store = &fixture.context.products;

    store.fetch_products(None).await.unwrap();
    fixture.storage.save("{broken").unwrap();
    store.fetch_products(None).await.unwrap();
    fixture.storage.save(r#"{"token":"flat-token"}"#).unwrap();
    store.fetch_products(None).await.unwrap();

    let headers: Vec<Option<String>> = fixture
        .requests_to("GET", "/products")
        .into_iter()
        .map(|r| r.authorization)
        .collect();
    assert_eq!(
        headers,
        vec![
            Some("Bearer seed-token".to_string()),
            None,
            Some("Bearer flat-token".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_login_persists_and_logout_clears() {
    let fixture = TestFixture::new().await;
    let auth = fixture.context.auth_view();
    assert_eq!(auth.guard(), AuthGuard::Redirect("/login"));

    let outcome = auth
        .login(&LoginInput {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert!(auth.is_authenticated());
    assert_eq!(auth.guard(), AuthGuard::Render);
    assert_eq!(auth.user().unwrap().name, "Ana");
    assert_eq!(read_token(fixture.storage.as_ref()).as_deref(), Some("tok-123"));

    fixture.context.products.fetch_products(None).await.unwrap();

    assert!(auth.logout().success);
    assert!(!auth.is_authenticated());
    assert_eq!(read_token(fixture.storage.as_ref()), None);

    fixture.context.products.fetch_products(None).await.unwrap();

    let headers: Vec<Option<String>> = fixture
        .requests_to("GET", "/products")
        .into_iter()
        .map(|r| r.authorization)
        .collect();
    assert_eq!(headers, vec![Some("Bearer tok-123".to_string()), None]);
}

#[tokio::test]
async fn test_session_survives_new_context() {
    let fixture = TestFixture::new().await;
    fixture
        .context
        .auth
        .login(&LoginInput {
            email: "ana@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap();

    let again = AppContext::with_storage(
        Config::for_base_url(fixture.base_url.clone()),
        fixture.storage.clone(),
    )
    .unwrap();
    let auth = again.auth_view();
    assert!(auth.is_hydrated());
    assert!(auth.is_authenticated());
    assert_eq!(auth.user().unwrap().email, "ana@example.com");
}

#[tokio::test]
async fn test_login_without_token_fails() {
    let fixture = TestFixture::new().await;
    let store = &fixture.context.auth;

    let err = store
        .login(&LoginInput {
            email: "notoken@example.com".to_string(),
            password: "secret".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::MissingToken));
    let state = store.snapshot();
    assert_eq!(state.error.as_deref(), Some("Token não retornado pela API."));
    assert_eq!(state.token, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_login_bad_credentials_message() {
    let fixture = TestFixture::new().await;
    let auth = fixture.context.auth_view();

    let outcome = auth
        .login(&LoginInput {
            email: "ana@example.com".to_string(),
            password: "wrong".to_string(),
        })
        .await;

    assert_eq!(outcome.error.as_deref(), Some("Credenciais inválidas"));
    assert!(!auth.is_authenticated());
    assert_eq!(read_token(fixture.storage.as_ref()), None);
}

#[tokio::test]
async fn test_register_sends_sanitized_phone() {
    let fixture = TestFixture::new().await;
    let auth = fixture.context.auth_view();

    let input = RegisterInput {
        name: "Bruno".to_string(),
        email: "bruno@example.com".to_string(),
        password: "s3nha".to_string(),
        verify_password: "s3nha".to_string(),
        phone: Some(Phone {
            country: Some("+55".to_string()),
            ddd: Some("(21)".to_string()),
            number: Some("99999-8888".to_string()),
        }),
    };
    let outcome = auth.register(&input).await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert!(auth.is_authenticated());
    assert_eq!(read_token(fixture.storage.as_ref()).as_deref(), Some("reg-tok"));

    let body = fixture.backend().register_bodies[0].clone();
    assert_eq!(body["verifyPassword"], "s3nha");
    assert_eq!(body["phone"], json!({ "country": "55", "ddd": "21", "number": "999998888" }));
}

#[tokio::test]
async fn test_register_without_token_or_with_conflict() {
    let fixture = TestFixture::new().await;
    let auth = fixture.context.auth_view();

    let mut input = RegisterInput {
        name: "Carla".to_string(),
        email: "pending@example.com".to_string(),
        password: "abc".to_string(),
        verify_password: "abc".to_string(),
        phone: None,
    };
    assert!(auth.register(&input).await.success);
    assert!(!auth.is_authenticated());
    assert_eq!(auth.state().error, None);

    input.email = "exists@example.com".to_string();
    let outcome = auth.register(&input).await;
    assert_eq!(outcome.error.as_deref(), Some("E-mail já cadastrado"));

    input.verify_password = "different".to_string();
    let outcome = auth.register(&input).await;
    assert_eq!(outcome.error.as_deref(), Some("As senhas não coincidem"));
    assert_eq!(fixture.backend().register_bodies.len(), 2);
}
