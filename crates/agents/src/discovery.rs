//! Product discovery across registered sales agents.

use allocation::{Product, Targeting};
use client::{AgentType, DataList, Session};
use futures::future::join_all;
use mcp::Transport;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::Result;

#[derive(Debug, Clone, Deserialize)]
struct SalesAgent {
    id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferedProduct {
    id: String,
    #[serde(default)]
    floor_price: Option<f64>,
    #[serde(default)]
    recommended_price: Option<f64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    targeting: Option<Targeting>,
}

/// Inventory gathered from every reachable sales agent.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Sales agents that were asked, reachable or not.
    pub agents: usize,
    /// Products in agent order, then offer order.
    pub products: Vec<Product>,
}

/// Ask every sales agent for its products concurrently.
///
/// Listing the agents must succeed. An agent whose discovery call fails is
/// logged and skipped.
pub async fn discover_products<T: Transport>(session: &Session<T>) -> Result<Discovery> {
    let agents: DataList<SalesAgent> = session
        .agents()
        .list(json!({ "type": AgentType::Sales }))
        .await?;

    let requests = agents.data.iter().map(|agent| async move {
        let offered: client::Result<DataList<OfferedProduct>> = session
            .products()
            .discover(json!({ "salesAgentId": agent.id }))
            .await;
        (agent, offered)
    });

    let mut products = Vec::new();
    for (agent, offered) in join_all(requests).await {
        match offered {
            Ok(offered) => {
                debug!(agent = %agent.id, count = offered.data.len(), "discovered products");
                products.extend(offered.data.into_iter().map(|p| Product {
                    id: p.id,
                    sales_agent_id: agent.id.clone(),
                    floor_price: p.floor_price,
                    recommended_price: p.recommended_price,
                    name: p.name,
                    targeting: p.targeting,
                }));
            }
            Err(err) => warn!(agent = %agent.id, error = %err, "product discovery failed"),
        }
    }

    Ok(Discovery {
        agents: agents.data.len(),
        products,
    })
}
