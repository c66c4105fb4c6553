use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, header},
};
use serde::{Deserialize, Serialize};

use crate::{
  entity::{Status, user},
  prelude::*,
  state::AppState,
};

fn authorize(app: &AppState, headers: &HeaderMap) -> Result<()> {
  let Some(secret) = app.config.secret.as_deref() else {
    return Err(Error::Unauthorized);
  };

  let token = headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "));

  match token {
    Some(token) if same_secret(token.as_bytes(), secret.as_bytes()) => Ok(()),
    _ => Err(Error::Unauthorized),
  }
}

/// Compares without short-circuiting on the first differing byte.
fn same_secret(given: &[u8], expected: &[u8]) -> bool {
  given.len() == expected.len()
    && given.iter().zip(expected).fold(0u8, |diff, (a, b)| diff | (a ^ b)) == 0
}

pub async fn health() -> &'static str {
  "OK"
}

pub async fn users(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<user::Model>>> {
  authorize(&app, &headers)?;
  Ok(Json(app.sv().user.all().await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusReq {
  pub whatsapp: String,
  pub status: Status,
}

#[derive(Debug, Serialize)]
pub struct StatusRes {
  pub success: bool,
  pub updated: usize,
}

pub async fn set_status(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<StatusReq>,
) -> Result<Json<StatusRes>> {
  authorize(&app, &headers)?;

  if !req.status.is_known() {
    return Err(Error::InvalidArgs(format!(
      "unknown status `{}`",
      req.status.as_str()
    )));
  }

  info!("API sets {} to {:?}", req.whatsapp, req.status);
  let users = app.sv().user.set_status(req.whatsapp, req.status).await?;

  let updated = users.len();
  let notify = app.clone();
  tokio::spawn(async move { notify.notify_status(&users).await });

  Ok(Json(StatusRes { success: true, updated }))
}

#[derive(Debug, Deserialize)]
pub struct LinkReq {
  pub link: String,
}

pub async fn set_link(
  State(app): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(req): Json<LinkReq>,
) -> Result<Json<json::Value>> {
  authorize(&app, &headers)?;
  app.sv().link.set(req.link).await?;
  Ok(Json(json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use tempfile::TempDir;
  use teloxide::Bot;
  use tower::ServiceExt;

  use super::*;
  use crate::{entity::Document, plugins::server::routes, state::Config, store};

  async fn setup() -> (TempDir, Arc<AppState>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");

    let doc = Document {
      users: vec![user::Model::pending(
        "Alice".into(),
        "+1".into(),
        0,
        Date::from_ymd_opt(2024, 3, 1).unwrap(),
      )],
      ..Default::default()
    };
    store::save(&path, &doc).await.unwrap();

    let config = Config {
      data_file: path,
      secret: Some("s3cret".into()),
      ..Config::default()
    };
    (dir, Arc::new(AppState::new(Bot::new("0:test"), config)))
  }

  fn request(
    method: &str,
    uri: &str,
    body: Option<json::Value>,
  ) -> Request<Body> {
    let builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::AUTHORIZATION, "Bearer s3cret")
      .header(header::CONTENT_TYPE, "application/json");

    match body {
      Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    }
  }

  #[tokio::test]
  async fn test_health_is_public() {
    let (_dir, app) = setup().await;

    let res = routes(app)
      .oneshot(Request::get("/health").body(Body::empty()).unwrap())
      .await
      .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn test_users_requires_secret() {
    let (_dir, app) = setup().await;

    let res = routes(app)
      .oneshot(Request::get("/api/users").body(Body::empty()).unwrap())
      .await
      .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn test_list_users() {
    let (_dir, app) = setup().await;

    let res =
      routes(app).oneshot(request("GET", "/api/users", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let users: json::Value = json::from_slice(&body).unwrap();
    assert_eq!(users[0]["whatsapp"], "+1");
    assert_eq!(users[0]["status"], "pending");
  }

  #[tokio::test]
  async fn test_set_status() {
    let (_dir, app) = setup().await;

    let body = json::json!({ "whatsapp": "+1", "status": "rejected" });
    let res = routes(app.clone())
      .oneshot(request("POST", "/api/status", Some(body)))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let users = app.sv().user.all().await.unwrap();
    assert_eq!(users[0].status, Status::Rejected);
  }

  #[tokio::test]
  async fn test_set_status_unknown_number() {
    let (_dir, app) = setup().await;

    let body = json::json!({ "whatsapp": "+404", "status": "verified" });
    let res = routes(app)
      .oneshot(request("POST", "/api/status", Some(body)))
      .await
      .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn test_set_link() {
    let (_dir, app) = setup().await;

    let body = json::json!({ "link": "https://chat.whatsapp.com/x" });
    let res = routes(app.clone())
      .oneshot(request("POST", "/api/link", Some(body)))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let link = app.sv().link.get().await.unwrap();
    assert_eq!(link.as_deref(), Some("https://chat.whatsapp.com/x"));
  }

  #[tokio::test]
  async fn test_set_status_rejects_unknown_status() {
    let (_dir, app) = setup().await;

    let body = json::json!({ "whatsapp": "+1", "status": "banned" });
    let res = routes(app.clone())
      .oneshot(request("POST", "/api/status", Some(body)))
      .await
      .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let users = app.sv().user.all().await.unwrap();
    assert_eq!(users[0].status, Status::Pending);
  }

  #[tokio::test]
  async fn test_wrong_secret_is_rejected() {
    let (_dir, app) = setup().await;

    let res = routes(app)
      .oneshot(
        Request::get("/api/users")
          .header(header::AUTHORIZATION, "Bearer s3creT")
          .body(Body::empty())
          .unwrap(),
      )
      .await
      .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  #[test]
  fn test_same_secret() {
    assert!(same_secret(b"s3cret", b"s3cret"));
    assert!(!same_secret(b"s3cret", b"s3creT"));
    assert!(!same_secret(b"s3cre", b"s3cret"));
    assert!(!same_secret(b"", b"s3cret"));
  }
}
