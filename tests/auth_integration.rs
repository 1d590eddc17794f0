//! End-to-end tests for the authentication endpoints and role-gated routes

mod support;

use blog_server::client::decode_identity;
use blog_server::domain::UserRole;
use serde_json::{json, Value};
use support::{spawn_app, token_pair};

// --- Signup ---

#[tokio::test]
async fn signup_signin_refresh_scenario() {
    let app = spawn_app().await;

    let response = app.signup("a@b.com", "password1").await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("accessToken").is_some());
    assert!(body.get("refreshToken").is_some());
    assert!(body.get("expiresAtUtc").is_some());

    let access_token = body["accessToken"].as_str().unwrap();
    let signup_refresh = body["refreshToken"].as_str().unwrap().to_string();
    assert_eq!(decode_identity(access_token).unwrap().role, UserRole::Guest);

    let response = app.signin("a@b.com", "password1").await;
    assert_eq!(200, response.status().as_u16());

    let response = app.signin("a@b.com", "wrong").await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid credentials.");

    let response = app.refresh(&signup_refresh).await;
    assert_eq!(200, response.status().as_u16());

    let replay = app.refresh(&signup_refresh).await;
    assert_eq!(401, replay.status().as_u16());
    let body: Value = replay.json().await.unwrap();
    assert_eq!(body["message"], "Invalid refresh token.");
}

#[tokio::test]
async fn signup_with_requested_role() {
    let app = spawn_app().await;

    let response = app
        .post_json(
            "/auth/signup",
            &json!({ "email": "ed@b.com", "password": "password1", "role": "editor" }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let pair = token_pair(response).await;
    assert_eq!(decode_identity(&pair.access_token).unwrap().role, UserRole::Editor);
}

#[tokio::test]
async fn signup_returns_409_for_duplicate_email() {
    let app = spawn_app().await;

    app.signup_pair("dup@example.com").await;
    let response = app.signup("  DUP@example.com ", "password2").await;

    assert_eq!(409, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn signup_returns_400_for_invalid_input() {
    let app = spawn_app().await;

    let test_cases = vec![
        (json!({ "email": "not-an-email", "password": "password1" }), "email"),
        (json!({ "email": "a@b.com", "password": "short" }), "password"),
        (json!({ "email": "a@b.com", "password": "password1", "role": "superuser" }), "role"),
        (json!({ "email": "", "password": "password1" }), "email"),
    ];

    for (body, field) in test_cases {
        let response = app.post_json("/auth/signup", &body).await;
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 for payload {}",
            body
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["errors"].get(field).is_some(), "missing field error for {}", field);
    }
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/auth/signup"))
        .header("Content-Type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();

    assert_eq!(400, response.status().as_u16());
}

// --- Signin ---

#[tokio::test]
async fn signin_failures_share_one_message() {
    let app = spawn_app().await;
    app.signup_pair("known@example.com").await;

    let wrong_password = app.signin("known@example.com", "wrongpassword").await;
    let unknown_email = app.signin("unknown@example.com", "password1").await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["code"], b["code"]);
}

// --- Refresh ---

#[tokio::test]
async fn refresh_returns_400_when_token_missing() {
    let app = spawn_app().await;

    let response = app.post_json("/auth/refresh", &json!({})).await;
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn refresh_with_unknown_token_returns_401() {
    let app = spawn_app().await;

    let response = app.refresh("DEADBEEF").await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn concurrent_refreshes_have_one_winner() {
    let app = spawn_app().await;
    let pair = app.signup_pair("race@example.com").await;

    let (first, second) = tokio::join!(
        app.refresh(&pair.refresh_token),
        app.refresh(&pair.refresh_token)
    );

    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 401]);
}

// --- Logout ---

#[tokio::test]
async fn logout_requires_authentication() {
    let app = spawn_app().await;
    let pair = app.signup_pair("out@example.com").await;

    let response = app
        .post_json("/auth/logout", &json!({ "refreshToken": pair.refresh_token }))
        .await;
    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn logout_revokes_and_is_idempotent() {
    let app = spawn_app().await;
    let pair = app.signup_pair("out@example.com").await;

    for body in [
        json!({ "refreshToken": pair.refresh_token }),
        json!({ "refreshToken": pair.refresh_token }),
        json!({ "refreshToken": "" }),
    ] {
        let response = app
            .client
            .post(app.url("/auth/logout"))
            .bearer_auth(&pair.access_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(204, response.status().as_u16());
    }

    let response = app.refresh(&pair.refresh_token).await;
    assert_eq!(401, response.status().as_u16());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn logout_with_expired_access_token_is_rejected_before_revoking() {
    let app = spawn_app().await;
    let pair = app.signup_pair("stale@example.com").await;
    let expired = app.expired_access_token("stale@example.com").await;

    let response = app
        .client
        .post(app.url("/auth/logout"))
        .bearer_auth(&expired)
        .json(&json!({ "refreshToken": pair.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    // The gate answered first, so the refresh token is still live; clients
    // must renew before they can revoke it.
    let response = app.refresh(&pair.refresh_token).await;
    assert_eq!(200, response.status().as_u16());
}

// --- Protected routes ---

#[tokio::test]
async fn me_returns_current_user() {
    let app = spawn_app().await;
    let pair = app.signup_pair("me@example.com").await;

    let response = app
        .client
        .get(app.url("/me"))
        .bearer_auth(&pair.access_token)
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "me@example.com");
    assert_eq!(body["role"], "Guest");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn protected_route_rejects_missing_or_bad_token() {
    let app = spawn_app().await;

    let missing = app.client.get(app.url("/me")).send().await.unwrap();
    assert_eq!(401, missing.status().as_u16());
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["code"], "MISSING_TOKEN");

    let bad = app
        .client
        .get(app.url("/me"))
        .bearer_auth("not.a.token")
        .send()
        .await
        .unwrap();
    assert_eq!(401, bad.status().as_u16());
    let body: Value = bad.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired token.");
}

#[tokio::test]
async fn admin_routes_forbid_other_roles() {
    let app = spawn_app().await;
    let guest = app.signup_pair("guest@example.com").await;
    let editor = app.signup_with_role("editor@example.com", UserRole::Editor).await;

    for token in [&guest.access_token, &editor.access_token] {
        let response = app
            .client
            .get(app.url("/users"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(403, response.status().as_u16());
    }
}

#[tokio::test]
async fn admin_can_list_and_fetch_users() {
    let app = spawn_app().await;
    let admin = app.signup_with_role("admin@example.com", UserRole::Admin).await;
    app.signup_pair("b@example.com").await;

    let response = app
        .client
        .get(app.url("/users"))
        .bearer_auth(&admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let users: Vec<Value> = response.json().await.unwrap();
    assert_eq!(users.len(), 2);

    let id = users[1]["id"].as_str().unwrap();
    let response = app
        .client
        .get(app.url(&format!("/users/{}", id)))
        .bearer_auth(&admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let response = app
        .client
        .get(app.url(&format!("/users/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn role_change_applies_after_refresh() {
    let app = spawn_app().await;
    let admin = app.signup_with_role("admin@example.com", UserRole::Admin).await;
    let member = app.signup_pair("member@example.com").await;
    let member_id = decode_identity(&member.access_token).unwrap().id;

    let response = app
        .client
        .patch(app.url(&format!("/users/{}/role", member_id)))
        .bearer_auth(&admin.access_token)
        .json(&json!({ "role": "Admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["role"], "Admin");

    // The old access token still carries Guest
    let response = app
        .client
        .get(app.url("/users"))
        .bearer_auth(&member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(403, response.status().as_u16());

    let refreshed = token_pair(app.refresh(&member.refresh_token).await).await;
    let response = app
        .client
        .get(app.url("/users"))
        .bearer_auth(&refreshed.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn role_update_rejects_unknown_role() {
    let app = spawn_app().await;
    let admin = app.signup_with_role("admin@example.com", UserRole::Admin).await;
    let admin_id = decode_identity(&admin.access_token).unwrap().id;

    for role in ["", "owner"] {
        let response = app
            .client
            .patch(app.url(&format!("/users/{}/role", admin_id)))
            .bearer_auth(&admin.access_token)
            .json(&json!({ "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(400, response.status().as_u16());
    }
}
