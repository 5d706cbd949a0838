//! HTTP surfaces for the agents.

use std::net::SocketAddr;
use std::sync::Arc;

use allocation::ProposalRequest;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use mcp::Transport;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::info;

use crate::Result;
use crate::acknowledgement::Acknowledgement;
use crate::media_agent::{
    ManageTacticRequest, ProposedTactics, ProposedTacticsRequest, ReportingComplete,
    SimpleMediaAgent, TacticFeedbackRequest, TacticPatch,
};
use crate::outcome_agent::{
    AcceptProposalRequest, GetProposalsResponse, accept_proposal, get_proposals,
};

/// Routes for [`SimpleMediaAgent`].
pub fn media_agent_router<T: Transport + 'static>(agent: Arc<SimpleMediaAgent<T>>) -> Router {
    Router::new()
        .route("/get-proposed-tactics", post(proposed_tactics::<T>))
        .route("/manage-tactic", post(manage_tactic::<T>))
        .route("/tactic-context-updated", post(context_updated::<T>))
        .route("/tactic-creatives-updated", post(creatives_updated::<T>))
        .route("/tactic-feedback", post(feedback::<T>))
        .route("/webhook/reporting-complete", post(reporting_complete::<T>))
        .route("/health", get(health))
        .with_state(agent)
}

/// Routes for the outcome agent.
pub fn outcome_agent_router() -> Router {
    Router::new()
        .route("/get-proposals", post(proposals))
        .route("/accept-proposal", post(accept))
        .route("/health", get(health))
}

/// Bind `port` on all interfaces and serve `router`.
pub async fn serve(router: Router, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}

async fn proposed_tactics<T: Transport + 'static>(
    State(agent): State<Arc<SimpleMediaAgent<T>>>,
    Json(request): Json<ProposedTacticsRequest>,
) -> Result<Json<ProposedTactics>> {
    Ok(Json(agent.get_proposed_tactics(&request).await?))
}

async fn manage_tactic<T: Transport + 'static>(
    State(agent): State<Arc<SimpleMediaAgent<T>>>,
    Json(request): Json<ManageTacticRequest>,
) -> Result<Json<Acknowledgement>> {
    Ok(Json(agent.manage_tactic(&request).await?))
}

async fn context_updated<T: Transport + 'static>(
    State(agent): State<Arc<SimpleMediaAgent<T>>>,
    Json(update): Json<TacticPatch>,
) -> Json<Acknowledgement> {
    Json(agent.tactic_context_updated(&update).await)
}

async fn creatives_updated<T: Transport + 'static>(
    State(agent): State<Arc<SimpleMediaAgent<T>>>,
    Json(update): Json<TacticPatch>,
) -> Json<Acknowledgement> {
    Json(agent.tactic_creatives_updated(&update).await)
}

async fn feedback<T: Transport + 'static>(
    State(agent): State<Arc<SimpleMediaAgent<T>>>,
    Json(request): Json<TacticFeedbackRequest>,
) -> Json<Acknowledgement> {
    Json(agent.tactic_feedback(&request).await)
}

async fn reporting_complete<T: Transport + 'static>(
    State(agent): State<Arc<SimpleMediaAgent<T>>>,
    Json(report): Json<ReportingComplete>,
) -> Result<Json<Acknowledgement>> {
    Ok(Json(agent.reporting_complete(&report).await?))
}

async fn proposals(Json(request): Json<ProposalRequest>) -> Json<GetProposalsResponse> {
    Json(get_proposals(&request))
}

async fn accept(Json(request): Json<AcceptProposalRequest>) -> Json<Acknowledgement> {
    match accept_proposal(&request) {
        Ok(ack) => Json(ack),
        Err(err) => Json(Acknowledgement::declined(err.reason)),
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocation::AllocationConfig;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use client::Session;
    use mcp::CallToolResult;
    use mcp::testing::ScriptedTransport;
    use tower::ServiceExt;

    async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn media_router(transport: &ScriptedTransport) -> Router {
        let session = Arc::new(Session::with_transport(transport.clone()));
        let agent = SimpleMediaAgent::new(session, AllocationConfig::default()).unwrap();
        media_agent_router(Arc::new(agent))
    }

    #[tokio::test]
    async fn accept_proposal_declines_invalid_budget() {
        let (status, body) = post_json(
            outcome_agent_router(),
            "/accept-proposal",
            json!({"tacticId": "t", "campaignContext": {"budget": 0}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"acknowledged": false, "reason": "Budget must be greater than 0"})
        );
    }

    #[tokio::test]
    async fn accept_proposal_declines_missing_budget() {
        for context in [json!({}), json!({"budget": "5000"})] {
            let (status, body) = post_json(
                outcome_agent_router(),
                "/accept-proposal",
                json!({"tacticId": "t", "campaignContext": context}),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body,
                json!({"acknowledged": false, "reason": "Budget must be greater than 0"})
            );
        }
    }

    #[tokio::test]
    async fn accept_proposal_acknowledges() {
        let (_, body) = post_json(
            outcome_agent_router(),
            "/accept-proposal",
            json!({"tacticId": "t", "campaignContext": {"budget": 100}}),
        )
        .await;
        assert_eq!(body, json!({"acknowledged": true}));
    }

    #[tokio::test]
    async fn get_proposals_route() {
        let (status, body) = post_json(
            outcome_agent_router(),
            "/get-proposals",
            json!({
                "campaignId": "c",
                "seatId": "s",
                "products": [{"product_ref": "p", "floor_price": 1.0}]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let proposals = body["proposals"].as_array().unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0]["sku"], "outcome-agent-unknown");
        assert_eq!(proposals[0]["budgetCapacity"], 100.0);
    }

    #[tokio::test]
    async fn proposed_tactics_error_is_server_error() {
        let transport = ScriptedTransport::new();
        transport.respond("agent_list", CallToolResult::structured(json!({"data": []})));

        let (status, body) = post_json(
            media_router(&transport),
            "/get-proposed-tactics",
            json!({"campaignId": "c", "seatId": "s"}),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("No products available from 0 agents")
        );
    }

    #[tokio::test]
    async fn event_routes_acknowledge() {
        let transport = ScriptedTransport::new();
        let router = media_router(&transport);

        let (_, body) = post_json(
            router.clone(),
            "/tactic-context-updated",
            json!({"tacticId": "t", "patch": [{"op": "replace", "path": "/budget", "value": 10}]}),
        )
        .await;
        assert_eq!(body, json!({"acknowledged": true}));

        let (_, body) = post_json(
            router.clone(),
            "/tactic-creatives-updated",
            json!({"tacticId": "t", "patch": []}),
        )
        .await;
        assert_eq!(body, json!({"acknowledged": true}));

        let (_, body) = post_json(
            router.clone(),
            "/tactic-feedback",
            json!({"tacticId": "t", "deliveryIndex": 0.9, "performanceIndex": 1.1}),
        )
        .await;
        assert_eq!(body, json!({"acknowledged": true}));

        let (_, body) = post_json(
            router,
            "/webhook/reporting-complete",
            json!({"tacticId": "t", "reportingData": {}}),
        )
        .await;
        assert_eq!(body, json!({"acknowledged": true, "message": "Tactic not found"}));
    }

    #[tokio::test]
    async fn manage_tactic_route() {
        let transport = ScriptedTransport::new();
        transport
            .respond(
                "agent_list",
                CallToolResult::structured(json!({"data": [{"id": "a"}]})),
            )
            .respond(
                "product_discover",
                CallToolResult::structured(json!({"data": [{"id": "p", "floorPrice": 1.5}]})),
            )
            .respond("media_buy_create", CallToolResult::structured(json!({"id": "mb"})));

        let (status, body) = post_json(
            media_router(&transport),
            "/manage-tactic",
            json!({"tacticId": "t", "tacticContext": {"budget": 5000}}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"acknowledged": true, "mediaBuysCreated": 1}));
    }

    #[tokio::test]
    async fn health_routes() {
        for router in [outcome_agent_router(), media_router(&ScriptedTransport::new())] {
            let response = router
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
