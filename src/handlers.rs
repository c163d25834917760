// src/handlers.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{config::AppState, middleware::auth::auth_guard};

pub mod indents;
pub mod loading_sheets;
pub mod multi_truck;

/// Rotas da API. Tudo exceto `/api/health` exige o bearer token.
pub fn router(app_state: AppState) -> Router {
    let indent_routes = Router::new()
        .route("/search", post(indents::search_indent))
        .route("/batches", post(indents::batch_details));

    let multi_truck_routes = Router::new()
        .route("/sessions", post(multi_truck::open_session))
        .route("/sessions/{id}", get(multi_truck::get_session).delete(multi_truck::close_session))
        .route("/sessions/{id}/actions", post(multi_truck::apply_action))
        .route("/sessions/{id}/assignments/{index}", delete(multi_truck::remove_assignment))
        .route("/sessions/{id}/save", post(multi_truck::save_all));

    let loading_sheet_routes = Router::new()
        .route("/creation-data", get(indents::creation_data))
        .route("/editor", post(loading_sheets::open_editor))
        .route("/editor/{id}", get(loading_sheets::get_editor).delete(loading_sheets::close_editor))
        .route("/editor/{id}/actions", post(loading_sheets::apply_editor_action))
        .route("/editor/{id}/save-changes", post(loading_sheets::save_changes))
        .route("/editor/{id}/submit", post(loading_sheets::submit));

    let protected = Router::new()
        .nest("/indents", indent_routes)
        .nest("/multi-truck", multi_truck_routes)
        .nest("/loading-sheets", loading_sheet_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        middleware::auth::tests::{far_future, token_for},
        models::allocation::LoadingSheetNo,
        services::{dispatch_service::tests::gateway, DispatchService},
    };

    const SECRET: &str = "test-secret";

    fn app() -> Router {
        router(AppState::new(SECRET.to_string(), DispatchService::new(Arc::new(gateway()))))
    }

    async fn api_call(
        router: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
        token: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
            None => Body::empty(),
        };
        let req = builder.body(body).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            json!(null)
        } else {
            serde_json::from_slice(&bytes).unwrap_or(json!(null))
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_is_public() {
        let req = Request::builder().uri("/api/health").body(Body::empty()).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn requests_without_a_valid_token_are_unauthorized() {
        let app = app();
        let (status, _) = api_call(&app, "POST", "/api/multi-truck/sessions", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let forged = token_for("operator-1", "wrong-secret", far_future());
        let (status, body) = api_call(&app, "POST", "/api/multi-truck/sessions", None, Some(&forged)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or missing bearer token.");
    }

    #[tokio::test]
    async fn assign_vehicle_and_save_all_round_trip() {
        let app = app();
        let token = token_for("operator-1", SECRET, far_future());

        // O número segue o último emitido no mês corrente
        let expected = LoadingSheetNo::following(gateway().last_sheet_no, Utc::now().date_naive())
            .unwrap()
            .to_string();

        let (status, body) = api_call(&app, "POST", "/api/multi-truck/sessions", None, Some(&token)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["loadingSheetNo"], expected.as_str());
        let id = body["sessionId"].as_str().unwrap().to_string();
        let actions_uri = format!("/api/multi-truck/sessions/{id}/actions");

        let actions = vec![
            json!({ "type": "selectIndent", "indentNo": "IND-1" }),
            json!({ "type": "setDispatchType", "itemId": "1", "dispatchType": "ML", "checked": true }),
            json!({ "type": "setMagazine", "itemId": "1", "magazine": "MAG-2" }),
            json!({ "type": "setLoadCase", "itemId": "1", "loadCase": 30 }),
        ];
        for action in actions {
            let (status, _) = api_call(&app, "POST", &actions_uri, Some(action), Some(&token)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let assign = json!({
            "type": "assignVehicle",
            "vehicle": { "transporterName": "Acme Logistics", "truckNo": "TRUCK-1", "licenseNo": "LIC-1" }
        });
        let (status, body) = api_call(&app, "POST", &actions_uri, Some(assign), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assignments"].as_array().unwrap().len(), 1);
        assert_eq!(body["ledger"][0]["loadcase"], 30);
        assert_eq!(body["ledger"][0]["remcase"], 0);
        assert_eq!(body["notices"][0]["level"], "info");

        let save_uri = format!("/api/multi-truck/sessions/{id}/save");
        let (status, body) = api_call(&app, "POST", &save_uri, None, Some(&token)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["loadingSheetNos"], json!([expected]));
    }

    #[tokio::test]
    async fn rejected_action_returns_the_specific_message() {
        let app = app();
        let token = token_for("operator-1", SECRET, far_future());
        let (_, body) = api_call(&app, "POST", "/api/multi-truck/sessions", None, Some(&token)).await;
        let actions_uri = format!("/api/multi-truck/sessions/{}/actions", body["sessionId"].as_str().unwrap());

        api_call(&app, "POST", &actions_uri, Some(json!({ "type": "selectIndent", "indentNo": "IND-1" })), Some(&token)).await;
        let (status, body) = api_call(
            &app,
            "POST",
            &actions_uri,
            Some(json!({ "type": "setLoadCase", "itemId": "2", "loadCase": 11 })),
            Some(&token),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["error"],
            "Load Case (11) for main allocation of item XYZ 32MM exceeds available remaining cases (10)."
        );
    }

    #[tokio::test]
    async fn invalid_search_payload_is_a_bad_request() {
        let app = app();
        let token = token_for("operator-1", SECRET, far_future());
        let (status, body) = api_call(
            &app,
            "POST",
            "/api/indents/search",
            Some(json!({ "dispDate": "2024-07-15", "indentNo": "" })),
            Some(&token),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["indent_no"][0], "indentNo is required.");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app();
        let token = token_for("operator-1", SECRET, far_future());
        let uri = format!("/api/multi-truck/sessions/{}", uuid::Uuid::new_v4());
        let (status, _) = api_call(&app, "GET", &uri, None, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn closed_session_is_not_found() {
        let app = app();
        let token = token_for("operator-1", SECRET, far_future());
        let (_, body) = api_call(&app, "POST", "/api/multi-truck/sessions", None, Some(&token)).await;
        let uri = format!("/api/multi-truck/sessions/{}", body["sessionId"].as_str().unwrap());

        let (status, _) = api_call(&app, "DELETE", &uri, None, Some(&token)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = api_call(&app, "GET", &uri, None, Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Session "));
    }

    #[tokio::test]
    async fn another_operator_cannot_touch_the_session() {
        let app = app();
        let owner = token_for("operator-1", SECRET, far_future());
        let other = token_for("operator-2", SECRET, far_future());
        let (_, body) = api_call(&app, "POST", "/api/multi-truck/sessions", None, Some(&owner)).await;
        let id = body["sessionId"].as_str().unwrap().to_string();

        let uri = format!("/api/multi-truck/sessions/{id}");
        let (status, body) = api_call(&app, "GET", &uri, None, Some(&other)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], format!("Session {id} belongs to another operator."));

        let (status, _) = api_call(&app, "DELETE", &uri, None, Some(&other)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = api_call(&app, "GET", &uri, None, Some(&owner)).await;
        assert_eq!(status, StatusCode::OK);
    }
}
