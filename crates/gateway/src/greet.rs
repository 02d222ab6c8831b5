//! MCP server exposing the `greet_user` tool.

use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    schemars::{self, JsonSchema},
    tool, tool_handler, tool_router,
};
use serde::Deserialize;

/// Parameters for the `greet_user` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GreetUserParams {
    /// Name of the person to greet.
    pub name: String,
}

/// MCP greeting server. One instance is built per HTTP request.
#[derive(Debug, Clone)]
pub struct GreetServer {
    name: String,
    version: String,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GreetServer {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Greets the user with a personalized message.")]
    async fn greet_user(&self, Parameters(params): Parameters<GreetUserParams>) -> String {
        tracing::info!(name = %params.name, "invoked greet_user");
        format!("Hi {}, welcome to Scalekit!", params.name)
    }
}

#[tool_handler]
impl ServerHandler for GreetServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                version: self.version.clone(),
                ..Default::default()
            },
            instructions: Some("Greeting server protected by OAuth 2.1 bearer tokens.".into()),
        }
    }
}
