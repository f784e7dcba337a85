#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use pinboard_api::{AppState, AppStateInner, EngineSettings, router};
use pinboard_db::Database;
use pinboard_storage::{LocalObjectStore, UrlSigner};

pub const PUBLIC_URL: &str = "http://localhost:3000";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct Profile {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let dir = std::env::temp_dir().join(format!("pinboard-api-{}", Uuid::new_v4()));
        let signer = UrlSigner::new(b"media-secret", Duration::from_secs(300)).unwrap();
        let storage = LocalObjectStore::new(dir, PUBLIC_URL, signer).await.unwrap();
        let state = AppStateInner::new(
            db,
            storage,
            "test-jwt-secret".into(),
            EngineSettings::default(),
        );
        Self {
            router: router(state.clone()),
            state,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    /// JSON request; `body: None` sends an empty body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, bytes) = self.send(req).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn register(&self, username: &str) -> Profile {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "password": "correct horse",
                    "firstName": username,
                    "lastName": "Tester",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        Profile {
            id: body["data"]["profileId"].as_str().unwrap().parse().unwrap(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn create_board(&self, owner: &Profile, body: Value) -> Uuid {
        let (status, resp) = self
            .call(Method::POST, "/boards", Some(&owner.token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{resp}");
        resp["data"]["_id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn add_post(&self, author: &Profile, board_id: Uuid) -> Uuid {
        let (status, resp) = self
            .call(
                Method::POST,
                &format!("/boards/{}/posts", board_id),
                Some(&author.token),
                Some(json!({ "title": "Ideas", "tags": ["ideas"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{resp}");
        resp["data"]["_id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn add_thing(&self, author: &Profile, board_id: Uuid, post_id: Uuid, body: Value) -> Uuid {
        let (status, resp) = self
            .call(
                Method::POST,
                &format!("/boards/{}/posts/{}/things", board_id, post_id),
                Some(&author.token),
                Some(body),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{resp}");
        resp["data"]["_id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn send_invite(&self, manager: &Profile, board_id: Uuid, target: Uuid, role: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            &format!("/boards/{}/members", board_id),
            Some(&manager.token),
            Some(json!({ "profileID": target, "role": role })),
        )
        .await
    }

    /// `kind` is `accept` or `decline`.
    pub async fn answer_invite(&self, invitee: &Profile, board_id: Uuid, kind: &str) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/invitations",
            Some(&invitee.token),
            Some(json!({ "boardID": board_id, "type": kind })),
        )
        .await
    }

    /// Invite and accept: the invitee holds `role` afterwards.
    pub async fn invite(&self, manager: &Profile, board_id: Uuid, invitee: &Profile, role: &str) -> (StatusCode, Value) {
        let (status, resp) = self.send_invite(manager, board_id, invitee.id, role).await;
        assert_eq!(status, StatusCode::OK, "{resp}");
        self.answer_invite(invitee, board_id, "accept").await
    }

    pub async fn board_things(&self, caller: &Profile, board_id: Uuid, body: Option<Value>) -> Value {
        self.board_things_query(caller, board_id, "", body).await
    }

    pub async fn board_things_query(
        &self,
        caller: &Profile,
        board_id: Uuid,
        query: &str,
        body: Option<Value>,
    ) -> Value {
        let (status, resp) = self
            .call(
                Method::GET,
                &format!("/boards/{}/things{}", board_id, query),
                Some(&caller.token),
                body,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{resp}");
        resp
    }
}
