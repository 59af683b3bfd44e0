use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, groups, jobs, profile, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .merge(profile::router())
                .merge(groups::router())
                .merge(jobs::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::auth::services::grant_admin;

    struct TestApp {
        state: AppState,
    }

    impl TestApp {
        async fn new() -> Self {
            Self {
                state: AppState::for_tests().await,
            }
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(v) => {
                    req = req.header(header::CONTENT_TYPE, "application/json");
                    Body::from(v.to_string())
                }
                None => Body::empty(),
            };
            let res = build_app(self.state.clone())
                .oneshot(req.body(body).unwrap())
                .await
                .unwrap();
            let status = res.status();
            let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
            let value = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, value)
        }

        async fn register(&self, username: &str) -> i64 {
            let (status, body) = self
                .call(
                    Method::POST,
                    "/api/v1/auth/register",
                    None,
                    Some(json!({
                        "username": username,
                        "password": "password123",
                        "first_name": "Test",
                        "last_name": username,
                        "email": format!("{username}@example.com"),
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{body}");
            body["id"].as_i64().unwrap()
        }

        async fn login(&self, username: &str) -> (StatusCode, Value) {
            self.call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"username": username, "password": "password123"})),
            )
            .await
        }

        async fn token(&self, username: &str) -> String {
            let (status, body) = self.login(username).await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["access_token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new().await;
        let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn register_login_and_me() {
        let app = TestApp::new().await;
        let id = app.register("alice").await;

        let (status, _) = app
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": "alice",
                    "password": "password123",
                    "first_name": "A",
                    "last_name": "B",
                    "email": "other@example.com",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"username": "alice", "password": "nope"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");

        let (status, body) = app.login("alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], id);
        let refresh = body["refresh_token"].as_str().unwrap().to_string();

        let token = app.token("alice").await;
        let (status, me) = app.call(Method::GET, "/api/v1/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");
        assert_eq!(me["is_admin"], false);

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/auth/refresh",
                None,
                Some(json!({"refresh_token": refresh})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].is_string());

        let (status, _) = app
            .call(
                Method::POST,
                "/api/v1/auth/refresh",
                None,
                Some(json!({"refresh_token": token})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn requests_without_token_are_rejected() {
        let app = TestApp::new().await;
        let (status, _) = app.call(Method::GET, "/api/v1/jobs", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.call(Method::GET, "/api/v1/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn moderation_rules() {
        let app = TestApp::new().await;
        let admin_id = app.register("root").await;
        let user_id = app.register("bob").await;
        assert!(grant_admin(&app.state.db, admin_id).await.unwrap());
        let admin = app.token("root").await;
        let bob = app.token("bob").await;

        // nobody acts on themselves
        for path in ["suspend", "unsuspend"] {
            let uri = format!("/api/v1/users/{admin_id}/{path}");
            let (status, _) = app.call(Method::POST, &uri, Some(&admin), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
        let uri = format!("/api/v1/users/{admin_id}");
        let (status, _) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let uri = format!("/api/v1/users/{user_id}");
        let (status, _) = app.call(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // plain users neither list nor moderate
        let (status, _) = app.call(Method::GET, "/api/v1/users", Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let uri = format!("/api/v1/users/{admin_id}/suspend");
        let (status, _) = app.call(Method::POST, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // suspended users cannot log in
        let uri = format!("/api/v1/users/{user_id}/suspend");
        let (status, _) = app.call(Method::POST, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.login("bob").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/v1/users/{user_id}/unsuspend");
        let (status, _) = app.call(Method::POST, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.login("bob").await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/api/v1/users/{user_id}");
        let (status, _) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call(Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn earlier_tokens_stop_working_after_suspension() {
        let app = TestApp::new().await;
        let admin_id = app.register("root").await;
        let user_id = app.register("bob").await;
        assert!(grant_admin(&app.state.db, admin_id).await.unwrap());
        let admin = app.token("root").await;
        let bob = app.token("bob").await;

        let uri = format!("/api/v1/users/{user_id}/suspend");
        let (status, _) = app.call(Method::POST, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let group = json!({"name": "Eng", "description": "x"});
        let (status, _) = app
            .call(Method::POST, "/api/v1/groups", Some(&bob), Some(group.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let own = format!("/api/v1/users/{user_id}");
        let (status, _) = app
            .call(Method::PUT, &own, Some(&bob), Some(json!({"tagline": "still here"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.call(Method::GET, "/api/v1/me", Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let uri = format!("/api/v1/users/{user_id}/unsuspend");
        let (status, _) = app.call(Method::POST, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .call(Method::POST, "/api/v1/groups", Some(&bob), Some(group))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = app.call(Method::DELETE, &own, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call(Method::GET, "/api/v1/jobs", Some(&bob), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_edits_need_owner_or_admin() {
        let app = TestApp::new().await;
        let alice_id = app.register("alice").await;
        app.register("mallory").await;
        let alice = app.token("alice").await;
        let mallory = app.token("mallory").await;

        let uri = format!("/api/v1/users/{alice_id}/skills");
        let skill = json!({"description": "rust", "years": 3});
        let (status, _) = app.call(Method::POST, &uri, Some(&mallory), Some(skill.clone())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app.call(Method::POST, &uri, Some(&alice), Some(skill)).await;
        assert_eq!(status, StatusCode::CREATED);
        let skill_id = body["id"].as_i64().unwrap();

        let uri = format!("/api/v1/skills/{skill_id}");
        let (status, _) = app
            .call(Method::PUT, &uri, Some(&mallory), Some(json!({"years": 30})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app
            .call(Method::PUT, &uri, Some(&alice), Some(json!({"years": 4})))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app
            .call(Method::PUT, &uri, Some(&alice), Some(json!({"years": -2})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let uri = format!("/api/v1/users/{alice_id}");
        let (status, profile) = app.call(Method::GET, &uri, Some(&mallory), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["skills"][0]["years"], 4);
        assert_eq!(profile["skills"][0]["description"], "rust");

        let (status, _) = app
            .call(Method::PUT, &uri, Some(&alice), Some(json!({"tagline": "hello", "city": null})))
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, profile) = app.call(Method::GET, &uri, Some(&alice), None).await;
        assert_eq!(profile["tagline"], "hello");
        assert_eq!(profile["first_name"], "Test");
    }

    #[tokio::test]
    async fn group_admin_controls_group() {
        let app = TestApp::new().await;
        app.register("owner").await;
        app.register("member").await;
        let owner = app.token("owner").await;
        let member = app.token("member").await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/groups",
                Some(&owner),
                Some(json!({"name": "Eng", "description": "engineering"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let gid = body["id"].as_i64().unwrap();

        let join = format!("/api/v1/groups/{gid}/join");
        let (status, _) = app.call(Method::POST, &join, Some(&member), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call(Method::POST, &join, Some(&member), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let uri = format!("/api/v1/groups/{gid}");
        let (status, _) = app
            .call(Method::PUT, &uri, Some(&member), Some(json!({"name": "Mine"})))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = app.call(Method::DELETE, &uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let leave = format!("/api/v1/groups/{gid}/leave");
        let (status, _) = app.call(Method::POST, &leave, Some(&owner), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, group) = app.call(Method::GET, &uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(group["members"].as_array().unwrap().len(), 2);

        let (status, _) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call(Method::POST, &join, Some(&member), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn jobs_are_admin_managed_and_searchable() {
        let app = TestApp::new().await;
        let admin_id = app.register("root").await;
        app.register("seeker").await;
        grant_admin(&app.state.db, admin_id).await.unwrap();
        let admin = app.token("root").await;
        let seeker = app.token("seeker").await;

        let company = json!({"name": "Initech"});
        let (status, _) = app
            .call(Method::POST, "/api/v1/companies", Some(&seeker), Some(company.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app
            .call(Method::POST, "/api/v1/companies", Some(&admin), Some(company))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let company_id = body["id"].as_i64().unwrap();

        let job = json!({
            "company_id": company_id,
            "title": "Rust Engineer",
            "description": "services",
        });
        let (status, _) = app
            .call(Method::POST, "/api/v1/jobs", Some(&seeker), Some(job.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = app.call(Method::POST, "/api/v1/jobs", Some(&admin), Some(job)).await;
        assert_eq!(status, StatusCode::CREATED);
        let job_id = body["id"].as_i64().unwrap();

        let (status, hits) = app
            .call(Method::GET, "/api/v1/jobs?q=rust&mode=any", Some(&seeker), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.as_array().unwrap().len(), 1);
        let (_, hits) = app
            .call(Method::GET, "/api/v1/jobs?q=rust&mode=all", Some(&seeker), None)
            .await;
        assert!(hits.as_array().unwrap().is_empty());

        let apply = format!("/api/v1/jobs/{job_id}/apply");
        let (status, ack) = app.call(Method::POST, &apply, Some(&seeker), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["job_id"], job_id);

        let uri = format!("/api/v1/jobs/{job_id}");
        let (status, _) = app.call(Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.call(Method::POST, &apply, Some(&seeker), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
