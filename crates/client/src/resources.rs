//! Typed wrappers over remote operations.
//!
//! Each method is a direct call into [`Session::invoke`] with a fixed tool
//! name; argument and response shapes are chosen by the caller.

use mcp::Transport;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::session::Session;

/// Response envelope used by list-style operations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DataList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Agent categories accepted by `agent_list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentType {
    Sales,
    Outcome,
}

macro_rules! resource {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$doc:meta])* $method:ident => $tool:literal; )*
        }
    ) => {
        $(#[$meta])*
        pub struct $name<'a, T: Transport> {
            session: &'a Session<T>,
        }

        impl<'a, T: Transport> $name<'a, T> {
            $(
                $(#[$doc])*
                pub async fn $method<R, A>(&self, args: A) -> Result<R>
                where
                    R: DeserializeOwned,
                    A: Serialize,
                {
                    self.session.invoke($tool, args).await
                }
            )*
        }
    };
}

resource! {
    /// Registered agents (sales and outcome).
    Agents {
        /// List agents, optionally filtered by `type`.
        list => "agent_list";
        get => "agent_get";
        register => "agent_register";
        update => "agent_update";
        unregister => "agent_unregister";
    }
}

resource! {
    /// Media products offered by sales agents.
    Products {
        /// Ask a sales agent for its product inventory.
        discover => "product_discover";
        list => "product_list";
    }
}

resource! {
    /// Media buys issued against tactics.
    MediaBuys {
        create => "media_buy_create";
        list => "media_buy_list";
        get => "media_buy_get";
        update => "media_buy_update";
        execute => "media_buy_execute";
    }
}

resource! {
    Campaigns {
        list => "campaign_list";
        get => "campaign_get";
        create => "campaign_create";
        update => "campaign_update";
        delete => "campaign_delete";
    }
}

resource! {
    Tactics {
        list => "tactic_list";
        get => "tactic_get";
        create => "tactic_create";
    }
}

resource! {
    BrandAgents {
        list => "brand_agent_list";
        get => "brand_agent_get";
        create => "brand_agent_create";
    }
}

impl<T: Transport> Session<T> {
    pub fn agents(&self) -> Agents<'_, T> {
        Agents { session: self }
    }

    pub fn products(&self) -> Products<'_, T> {
        Products { session: self }
    }

    pub fn media_buys(&self) -> MediaBuys<'_, T> {
        MediaBuys { session: self }
    }

    pub fn campaigns(&self) -> Campaigns<'_, T> {
        Campaigns { session: self }
    }

    pub fn tactics(&self) -> Tactics<'_, T> {
        Tactics { session: self }
    }

    pub fn brand_agents(&self) -> BrandAgents<'_, T> {
        BrandAgents { session: self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::CallToolResult;
    use mcp::testing::ScriptedTransport;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn wrappers_call_fixed_tool_names() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({"data": []})));
        let session = Session::with_transport(transport.clone());

        let _: Value = session.campaigns().get(json!({"campaignId": "1"})).await.unwrap();
        let _: Value = session.media_buys().list(json!({"tacticId": "t"})).await.unwrap();
        let _: Value = session.brand_agents().create(json!({"name": "b"})).await.unwrap();

        let names: Vec<_> = transport.calls().into_iter().map(|c| c.name).collect();
        assert_eq!(names, ["campaign_get", "media_buy_list", "brand_agent_create"]);
    }

    #[tokio::test]
    async fn agent_list_decodes_envelope() {
        #[derive(Deserialize)]
        struct Agent {
            id: String,
        }

        let transport = ScriptedTransport::new();
        transport.respond(
            "agent_list",
            CallToolResult::structured(json!({"data": [{"id": "a1"}, {"id": "a2"}], "total": 2})),
        );
        let session = Session::with_transport(transport.clone());

        let agents: DataList<Agent> = session
            .agents()
            .list(json!({"type": AgentType::Sales}))
            .await
            .unwrap();

        assert_eq!(agents.data.len(), 2);
        assert_eq!(agents.data[1].id, "a2");
        assert_eq!(agents.total, Some(2));
        assert_eq!(transport.calls()[0].arguments["type"], "SALES");
    }

    #[test]
    fn data_list_defaults_to_empty() {
        let list: DataList<Value> = serde_json::from_value(json!({})).unwrap();
        assert!(list.data.is_empty());
    }
}
