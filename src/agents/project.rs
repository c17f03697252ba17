//! Property project agent: demand letters, client emails, project status.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::agents::{
    build_messages, classify, run_tool, Agent, AgentContext, AgentError, AgentResponse,
    TEXT_GENERATION_FALLBACK,
};
use crate::llm::LlmClient;
use crate::tools::Tool;

const SYSTEM_PROMPT: &str = "You are a project assistant for a real-estate brokerage. You help \
    agents manage construction projects, draft demand letters for overdue balances, and write \
    client correspondence. Keep drafts formal and ready for review.";

const KEYWORDS: &[&str] = &[
    "project",
    "demand letter",
    "client",
    "email",
    "construction",
    "unit",
    "building",
];

/// What kind of project request the input is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectRequest {
    DemandLetter,
    ClientEmail,
    ProjectStatus,
    General,
}

const CLASSIFY_TABLE: &[(ProjectRequest, &[&str])] = &[
    (ProjectRequest::DemandLetter, &["demand letter", "overdue", "payment due"]),
    (ProjectRequest::ClientEmail, &["email", "follow up", "follow-up"]),
    (
        ProjectRequest::ProjectStatus,
        &["status", "milestone", "construction", "progress"],
    ),
];

fn next_steps_for(category: ProjectRequest) -> &'static [&'static str] {
    match category {
        ProjectRequest::DemandLetter => &[
            "Have the demand letter reviewed before sending",
            "Log the letter against the client's account",
        ],
        ProjectRequest::ClientEmail => &[
            "Review the draft and personalize the greeting",
            "Send from the brokerage mailbox",
        ],
        ProjectRequest::ProjectStatus => &[
            "Confirm milestone dates with the site manager",
            "Update the project board",
        ],
        ProjectRequest::General => &["Specify the project or client this request is about"],
    }
}

/// Property project agent.
pub struct PropertyProjectAgent {
    llm: Arc<dyn LlmClient>,
    demand_letter: Arc<dyn Tool>,
    client_email: Arc<dyn Tool>,
}

impl PropertyProjectAgent {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            demand_letter: Arc::new(DemandLetterTool),
            client_email: Arc::new(ClientEmailTool),
        }
    }

    /// Classify the input into one request category.
    pub fn classify_request(input: &str) -> ProjectRequest {
        classify(input, CLASSIFY_TABLE, ProjectRequest::General)
    }

    /// Build tool parameters from the project context.
    fn project_params(context: &AgentContext) -> Value {
        let get = |key: &str, default: &str| -> String {
            context
                .project_context
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        json!({
            "client_name": get("client_name", "the client"),
            "property_address": get("property_address", "the property"),
            "amount_owed": context
                .project_context
                .get("amount_owed")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            "subject": get("subject", "Project update"),
        })
    }
}

#[async_trait]
impl Agent for PropertyProjectAgent {
    fn id(&self) -> &str {
        "property-project"
    }

    fn name(&self) -> &str {
        "Property Project Agent"
    }

    fn description(&self) -> &str {
        "Construction project tracking, demand letters, and client correspondence"
    }

    fn keywords(&self) -> &[&str] {
        KEYWORDS
    }

    async fn execute(
        &self,
        input: &str,
        context: &AgentContext,
    ) -> Result<AgentResponse, AgentError> {
        let messages = build_messages(SYSTEM_PROMPT, context, input);
        let message = match self.llm.complete(&messages).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Text generation failed, using fallback message: {}", e);
                TEXT_GENERATION_FALLBACK.to_string()
            }
        };

        let category = Self::classify_request(input);
        let params = Self::project_params(context);

        let mut actions = Vec::new();
        let mut tools_used = Vec::new();
        let mut data = serde_json::Map::new();

        match category {
            ProjectRequest::DemandLetter => {
                if let Some(result) =
                    run_tool(&*self.demand_letter, params, &mut actions, &mut tools_used).await
                {
                    data.insert("demand_letter".to_string(), result);
                }
            }
            ProjectRequest::ClientEmail => {
                if let Some(result) =
                    run_tool(&*self.client_email, params, &mut actions, &mut tools_used).await
                {
                    data.insert("client_email".to_string(), result);
                }
            }
            ProjectRequest::ProjectStatus | ProjectRequest::General => {}
        }

        let has_tool_data = !data.is_empty();
        Ok(AgentResponse {
            message,
            actions,
            tools_used,
            next_steps: next_steps_for(category)
                .iter()
                .map(|s| s.to_string())
                .collect(),
            confidence: if has_tool_data { 0.9 } else { 0.6 },
            // Demand letters are legal documents and always need review.
            needs_human_intervention: category == ProjectRequest::DemandLetter,
            data: has_tool_data.then(|| Value::Object(data)),
            visualizations: None,
        })
    }
}

/// Draft a formal demand letter for an overdue balance.
struct DemandLetterTool;

#[async_trait]
impl Tool for DemandLetterTool {
    fn name(&self) -> &str {
        "generate_demand_letter"
    }

    fn description(&self) -> &str {
        "Draft a formal demand letter for an overdue balance on a property"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client_name": { "type": "string", "description": "Name of the debtor" },
                "property_address": { "type": "string", "description": "Property the balance relates to" },
                "amount_owed": { "type": "number", "description": "Outstanding balance in dollars" }
            },
            "required": ["client_name", "amount_owed"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let client_name = params["client_name"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'client_name' parameter"))?;
        let amount_owed = params["amount_owed"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("Missing 'amount_owed' parameter"))?;
        let property_address = params["property_address"].as_str().unwrap_or("the property");

        let date = Utc::now().format("%B %-d, %Y");
        let letter = format!(
            "{date}\n\nDear {client_name},\n\nThis letter serves as formal notice that a balance \
             of ${amount_owed:.2} remains outstanding in connection with {property_address}. \
             Payment in full is due within 30 days of the date of this letter.\n\nIf payment has \
             already been made, please disregard this notice and send confirmation of the \
             transaction.\n\nSincerely,\nAccounts Department"
        );

        Ok(json!({
            "letter": letter,
            "amount_owed": amount_owed,
            "due_in_days": 30,
        }))
    }
}

/// Draft a short client email on a given subject.
struct ClientEmailTool;

#[async_trait]
impl Tool for ClientEmailTool {
    fn name(&self) -> &str {
        "draft_client_email"
    }

    fn description(&self) -> &str {
        "Draft a short client email on a given subject"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client_name": { "type": "string", "description": "Recipient name" },
                "subject": { "type": "string", "description": "Email subject line" }
            },
            "required": ["client_name", "subject"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let client_name = params["client_name"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'client_name' parameter"))?;
        let subject = params["subject"].as_str().unwrap_or("Project update");

        let body = format!(
            "Hi {client_name},\n\nI wanted to share a quick update on \"{subject}\". I'll follow \
             up with full details shortly; in the meantime, let me know if you have any \
             questions.\n\nBest regards"
        );

        Ok(json!({
            "subject": subject,
            "body": body,
        }))
    }
}
