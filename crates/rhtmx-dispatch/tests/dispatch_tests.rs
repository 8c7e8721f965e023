/// Integration tests for command compilation and request dispatch
///
/// Applications are assembled with `AppBuilder` (or raw commands) and driven
/// through `Dispatcher::handle` the way a server would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use pretty_assertions::assert_eq;
use rhtmx_dispatch::fs_routes::{FsEntry, FsRouteFile};
use rhtmx_dispatch::{
    apply_commands, page, text_response, AppBuilder, Command, Component, Config, Dispatcher,
    Handler, HtmlRenderer, HttpError, LayoutConfig, Method, Methods, Middleware, Route,
    RouteConfig, Router, RoutingConfig,
};
use serde_json::{json, Value};

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn respond(body: &'static str) -> Middleware {
    Middleware::new(move |_ctx| Box::pin(async move { Ok(text_response(StatusCode::OK, body)) }))
}

/// Records its name in `ctx.state["trail"]` and continues
fn mark(name: &'static str) -> Middleware {
    Middleware::new(move |ctx| {
        Box::pin(async move {
            let trail = ctx
                .state
                .entry("trail")
                .or_insert_with(|| Value::Array(vec![]));
            if let Value::Array(items) = trail {
                items.push(Value::from(name));
            }
            ctx.next().await
        })
    })
}

fn echo_trail() -> Middleware {
    Middleware::new(|ctx| {
        Box::pin(async move {
            let trail = ctx.state.get("trail").cloned().unwrap_or(Value::Null);
            Ok(text_response(StatusCode::OK, trail.to_string()))
        })
    })
}

fn tag(name: &'static str) -> Component {
    Component::new(move |props| match props.children {
        Some(children) => format!("<{name}>{children}</{name}>"),
        None => format!("<{name}/>"),
    })
}

fn fail(status: StatusCode) -> Handler {
    Handler::new(move |_ctx| Box::pin(async move { Err(HttpError::new(status).into()) }))
}

async fn body_of(app: &Dispatcher, method: &str, uri: &str) -> (StatusCode, String) {
    let res = app.handle(request(method, uri)).await;
    (res.status(), res.into_body())
}

// ============================================================================
// Method registration
// ============================================================================

#[tokio::test]
async fn test_route_with_all_methods_and_single_handler() {
    let route = Route::new()
        .with_component(tag("page"))
        .with_handler(Handler::render_component());
    let app = AppBuilder::new()
        .with_command(Command::route("/all", route).with_route_config(RouteConfig {
            methods: Methods::All,
            ..Default::default()
        }))
        .build()
        .unwrap();

    assert_eq!(app.router().allowed_methods("/all"), Method::ALL.to_vec());
    for method in Method::ALL {
        let (status, _) = body_of(&app, method.as_str(), "/all").await;
        assert_eq!(status, StatusCode::OK, "{} /all", method);
    }
}

#[tokio::test]
async fn test_empty_route_is_always_404() {
    let app = AppBuilder::new()
        .with_route("/nothing", Route::new())
        .build()
        .unwrap();

    let (status, _) = body_of(&app, "GET", "/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = body_of(&app, "DELETE", "/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_method_map_route_gets_default_get() {
    let route = Route::new()
        .with_component(Component::new(|props| format!("saved={}", props.data)))
        .with_method_handler(
            Method::Post,
            Handler::new(|_ctx| Box::pin(async { Ok(page(json!(true))) })),
        );
    let app = AppBuilder::new().with_route("/form", route).build().unwrap();

    assert_eq!(body_of(&app, "GET", "/form").await.1, "saved=null");
    assert_eq!(body_of(&app, "POST", "/form").await.1, "saved=true");
    assert_eq!(body_of(&app, "HEAD", "/form").await, (StatusCode::OK, String::new()));

    let res = app.handle(request("PUT", "/form")).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[header::ALLOW], "GET, POST");
}

#[tokio::test]
async fn test_get_only_handler_405_for_post() {
    let app = AppBuilder::new()
        .with_get("/page", respond("page"))
        .build()
        .unwrap();

    assert_eq!(body_of(&app, "GET", "/page").await.1, "page");

    let head = app.handle(request("HEAD", "/page")).await;
    assert_eq!(head.status(), StatusCode::OK);
    assert!(head.body().is_empty());

    let post = app.handle(request("POST", "/page")).await;
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(post.headers()[header::ALLOW], "GET");
}

#[tokio::test]
async fn test_global_middleware_sees_405() {
    let global = Middleware::new(|ctx| {
        Box::pin(async move {
            let mut res = ctx.next().await?;
            res.headers_mut()
                .insert("x-global", header::HeaderValue::from_static("1"));
            Ok(res)
        })
    });
    let app = AppBuilder::new()
        .with_middleware("/", global)
        .with_get("/page", respond("page"))
        .build()
        .unwrap();

    let get = app.handle(request("GET", "/page")).await;
    assert_eq!(get.headers()["x-global"], "1");

    let post = app.handle(request("POST", "/page")).await;
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(post.headers()[header::ALLOW], "GET");
    assert_eq!(post.headers()["x-global"], "1");
}

#[tokio::test]
async fn test_with_all_answers_every_method() {
    let app = AppBuilder::new()
        .with_all("/any", respond("any"))
        .build()
        .unwrap();
    assert_eq!(body_of(&app, "PATCH", "/any").await.1, "any");
    assert_eq!(body_of(&app, "OPTIONS", "/any").await.1, "any");
}

// ============================================================================
// Segment inheritance
// ============================================================================

#[tokio::test]
async fn test_middlewares_accumulate_in_registration_order() {
    let app = AppBuilder::new()
        .with_middleware("/", mark("root"))
        .with_middleware("/api", mark("api-1"))
        .with_middleware("/api", mark("api-2"))
        .with_get("/api/users", echo_trail())
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/api/users").await.1,
        r#"["root","api-1","api-2"]"#
    );
}

#[tokio::test]
async fn test_middleware_declared_after_route_does_not_apply() {
    let app = AppBuilder::new()
        .with_get("/late", echo_trail())
        .with_middleware("/", mark("late"))
        .build()
        .unwrap();

    assert_eq!(body_of(&app, "GET", "/late").await.1, "null");
}

#[tokio::test]
async fn test_layouts_and_app_wrap_pages() {
    let app = AppBuilder::new()
        .with_app(tag("html"))
        .with_layout("/", tag("root"))
        .with_layout("/docs", tag("docs"))
        .with_route("/docs/intro", Route::new().with_component(tag("intro")))
        .with_route("/", Route::new().with_component(tag("home")))
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/docs/intro").await.1,
        "<html><root><docs><intro/></docs></root></html>"
    );
    assert_eq!(body_of(&app, "GET", "/").await.1, "<html><root><home/></root></html>");
}

#[tokio::test]
async fn test_command_route_config_skips_app() {
    let page = Route::new().with_component(tag("page"));
    let app = AppBuilder::new()
        .with_app(tag("html"))
        .with_command(Command::route("/x", page).with_route_config(RouteConfig {
            skip_app_wrapper: true,
            ..Default::default()
        }))
        .build()
        .unwrap();

    assert_eq!(body_of(&app, "GET", "/x").await.1, "<page/>");
}

#[tokio::test]
async fn test_layout_config_skips() {
    let app = AppBuilder::new()
        .with_app(tag("html"))
        .with_layout("/", tag("root"))
        .with_command(
            Command::layout("/bare", tag("bare")).with_layout_config(LayoutConfig {
                skip_app_wrapper: true,
                skip_inherited_layouts: true,
            }),
        )
        .with_route("/bare/page", Route::new().with_component(tag("page")))
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/bare/page").await.1,
        "<bare><page/></bare>"
    );
}

#[tokio::test]
async fn test_route_config_skips_and_css() {
    let route = Route::new()
        .with_component(tag("page"))
        .with_css("/page.css")
        .with_config(RouteConfig {
            skip_app_wrapper: true,
            ..Default::default()
        });
    let app = AppBuilder::new()
        .with_app(tag("html"))
        .with_route("/styled", route)
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/styled").await.1,
        "<link rel=\"stylesheet\" href=\"/page.css\"><page/>"
    );
}

// ============================================================================
// Error and not-found fallbacks
// ============================================================================

#[tokio::test]
async fn test_error_route_renders_with_failing_status() {
    let error_page = Route::new().with_component(Component::new(|props| {
        format!(
            "error {} at {}",
            props.status.as_u16(),
            props.error.map(|e| e.to_string()).unwrap_or_default()
        )
    }));
    let failing = Route::new()
        .with_component(tag("never"))
        .with_handler(fail(StatusCode::FORBIDDEN));

    let app = AppBuilder::new()
        .with_error("/admin", error_page)
        .with_route("/admin/panel", failing)
        .build()
        .unwrap();

    let (status, body) = body_of(&app, "GET", "/admin/panel").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "error 403 at HTTP error 403 Forbidden");
}

#[tokio::test]
async fn test_error_route_declared_after_route_still_applies() {
    init_tracing();
    let app = AppBuilder::new()
        .with_route(
            "/x",
            Route::new().with_handler(Handler::new(|_ctx| {
                Box::pin(async { Err(anyhow::anyhow!("boom")) })
            })),
        )
        .with_error("/", Route::new().with_component(tag("oops")))
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/x").await,
        (StatusCode::INTERNAL_SERVER_ERROR, "<oops/>".to_string())
    );
}

#[tokio::test]
async fn test_root_not_found_handles_unmatched_paths() {
    let app = AppBuilder::new()
        .with_layout("/", tag("root"))
        .with_not_found(Route::new().with_component(tag("missing")))
        .with_get("/", respond("home"))
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/nowhere").await,
        (StatusCode::NOT_FOUND, "<root><missing/></root>".to_string())
    );
}

#[tokio::test]
async fn test_not_found_middleware_fallback() {
    let app = AppBuilder::new()
        .with_not_found(Middleware::new(|ctx| {
            Box::pin(async move {
                Ok(text_response(
                    StatusCode::NOT_FOUND,
                    format!("no page at {}", ctx.path),
                ))
            })
        }))
        .build()
        .unwrap();

    assert_eq!(
        body_of(&app, "GET", "/lost").await,
        (StatusCode::NOT_FOUND, "no page at /lost".to_string())
    );
}

#[tokio::test]
async fn test_unmatched_without_fallback_is_plain_404() {
    let app = AppBuilder::new().build().unwrap();
    assert_eq!(
        body_of(&app, "GET", "/missing").await,
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    );
}

#[tokio::test]
async fn test_root_middlewares_run_for_unmatched_requests() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let app = AppBuilder::new()
        .with_middleware(
            "/",
            Middleware::new(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { ctx.next().await })
            }),
        )
        .build()
        .unwrap();

    let (status, _) = body_of(&app, "GET", "/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Lazy routes
// ============================================================================

#[tokio::test]
async fn test_lazy_route_loads_once_under_concurrent_requests() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let app = AppBuilder::new()
        .with_lazy_route("/lazy/:id", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(Route::new().with_component(Component::new(|props| {
                    format!("item {}", props.params["id"])
                })))
            }
        })
        .build()
        .unwrap();
    let app = Arc::new(app);

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let app = Arc::clone(&app);
            tokio::spawn(async move {
                let res = app.handle(request("GET", &format!("/lazy/{}", i))).await;
                (i, res.into_body())
            })
        })
        .collect();

    for task in tasks {
        let (i, body) = task.await.unwrap();
        assert_eq!(body, format!("item {}", i));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_lazy_route_failure_propagates() {
    init_tracing();
    let app = AppBuilder::new()
        .with_lazy_route("/broken", || async { Err(anyhow::anyhow!("chunk missing")) })
        .build()
        .unwrap();

    let (status, _) = body_of(&app, "GET", "/broken").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_lazy_middleware() {
    let lazy = rhtmx_dispatch::Lazy::new(|| async { Ok(mark("lazy")) });
    let app = AppBuilder::new()
        .with_command(Command::middleware("/", [lazy]))
        .with_get("/", echo_trail())
        .build()
        .unwrap();

    assert_eq!(body_of(&app, "GET", "/").await.1, r#"["lazy"]"#);
}

// ============================================================================
// Filesystem routes and mounting
// ============================================================================

#[tokio::test]
async fn test_fs_routes_are_spliced_in_place() {
    let files = vec![
        FsRouteFile::new("blog/[slug]", FsEntry::Page(Route::new().with_component(tag("post")))),
        FsRouteFile::new("blog/_layout", FsEntry::layout(tag("blog"))),
        FsRouteFile::new("blog/new", FsEntry::Page(Route::new().with_component(tag("editor")))),
    ];

    let app = AppBuilder::new()
        .with_get("/blog/pinned", respond("hand-written"))
        .with_fs_routes("/", files)
        .with_get("/blog/:other", respond("shadowed"))
        .build()
        .unwrap();

    assert_eq!(body_of(&app, "GET", "/blog/pinned").await.1, "hand-written");
    assert_eq!(body_of(&app, "GET", "/blog/new").await.1, "<blog><editor/></blog>");
    assert_eq!(body_of(&app, "GET", "/blog/hello").await.1, "<blog><post/></blog>");
}

#[tokio::test]
async fn test_fs_route_groups_share_layouts() {
    let files = vec![
        FsRouteFile::new("(admin)/_layout", FsEntry::layout(tag("admin"))),
        FsRouteFile::new("(admin)/users", FsEntry::Page(Route::new().with_component(tag("users")))),
        FsRouteFile::new("about", FsEntry::Page(Route::new().with_component(tag("about")))),
    ];
    let app = AppBuilder::new().with_fs_routes("/", files).build().unwrap();

    assert_eq!(body_of(&app, "GET", "/users").await.1, "<admin><users/></admin>");
    assert_eq!(body_of(&app, "GET", "/about").await.1, "<about/>");
}

#[tokio::test]
async fn test_base_path_from_config() {
    let config = Config {
        routing: RoutingConfig {
            base_path: Some("/app".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    let app = AppBuilder::new()
        .with_config(config)
        .with_get("/", respond("root"))
        .with_get("/users", respond("users"))
        .build()
        .unwrap();

    assert_eq!(body_of(&app, "GET", "/app").await.1, "root");
    assert_eq!(body_of(&app, "GET", "/app/users").await.1, "users");
    assert_eq!(body_of(&app, "GET", "/users").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_raw_commands_with_apply_commands() {
    let mut router = Router::new();
    let root = apply_commands(
        &mut router,
        vec![
            Command::middleware("/", [mark("global")]),
            Command::handler("/ping", Method::Get, [echo_trail()]),
        ],
        "",
    )
    .unwrap();
    let app = Dispatcher::new(router, root, Arc::new(HtmlRenderer), RoutingConfig::default());

    assert_eq!(body_of(&app, "GET", "/ping").await.1, r#"["global"]"#);
}
