//! Financial analysis agent: mortgage qualification, affordability, refinancing.
//!
//! This is the reference agent implementation - the other agents repeat
//! its shape with different prompts, tables, and tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::{
    build_messages, classify, run_tool, Agent, AgentContext, AgentError, AgentResponse,
    TEXT_GENERATION_FALLBACK,
};
use crate::datasource::MortgageDataSource;
use crate::llm::LlmClient;
use crate::tools::Tool;

const SYSTEM_PROMPT: &str = "You are a financial analyst for a real-estate brokerage. \
    You help agents assess mortgage qualification, affordability, and refinancing options \
    for their clients. Be concrete, cite the numbers you are given, and flag anything that \
    needs a licensed professional.";

const KEYWORDS: &[&str] = &[
    "mortgage",
    "loan",
    "qualification",
    "preapproval",
    "tax",
    "refinance",
];

/// What kind of financial request the input is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinancialRequest {
    MortgageQualification,
    Refinance,
    Affordability,
    TaxEstimate,
    General,
}

const CLASSIFY_TABLE: &[(FinancialRequest, &[&str])] = &[
    (
        FinancialRequest::MortgageQualification,
        &["qualification", "qualify", "preapproval", "pre-approval"],
    ),
    (FinancialRequest::Refinance, &["refinance", "refi"]),
    (
        FinancialRequest::Affordability,
        &["afford", "budget", "monthly payment", "price range"],
    ),
    (FinancialRequest::TaxEstimate, &["tax"]),
];

fn next_steps_for(category: FinancialRequest) -> &'static [&'static str] {
    match category {
        FinancialRequest::MortgageQualification => &[
            "Collect pay stubs and W-2s for underwriting",
            "Request a credit report refresh",
            "Share the qualification summary with the client",
        ],
        FinancialRequest::Refinance => &[
            "Confirm the current payoff balance with the servicer",
            "Compare closing-cost estimates from two lenders",
        ],
        FinancialRequest::Affordability => &[
            "Review the price range with the client",
            "Compare loan programs at the quoted rates",
        ],
        FinancialRequest::TaxEstimate => {
            &["Refer the client to a tax professional for filing advice"]
        }
        FinancialRequest::General => {
            &["Ask the client for income and debt details to run the numbers"]
        }
    }
}

/// Financial analysis agent.
pub struct FinancialAgent {
    llm: Arc<dyn LlmClient>,
    qualification: Arc<dyn Tool>,
    affordability: Arc<dyn Tool>,
    refinance: Arc<dyn Tool>,
}

impl FinancialAgent {
    pub fn new(llm: Arc<dyn LlmClient>, rates: Arc<dyn MortgageDataSource>) -> Self {
        Self {
            llm,
            qualification: Arc::new(MortgageQualificationTool {
                rates: Arc::clone(&rates),
            }),
            affordability: Arc::new(AffordabilityTool {
                rates: Arc::clone(&rates),
            }),
            refinance: Arc::new(RefinanceTool { rates }),
        }
    }

    /// Classify the input into one request category.
    pub fn classify_request(input: &str) -> FinancialRequest {
        classify(input, CLASSIFY_TABLE, FinancialRequest::General)
    }

    /// Build tool parameters from the client profile in the context.
    fn borrower_params(context: &AgentContext) -> Value {
        json!({
            "annual_income": profile_f64(context, "annual_income", 75_000.0),
            "monthly_debts": profile_f64(context, "monthly_debts", 500.0),
            "credit_score": profile_f64(context, "credit_score", 700.0),
            "down_payment": profile_f64(context, "down_payment", 40_000.0),
            "current_rate": profile_f64(context, "current_rate", 7.5),
            "current_balance": profile_f64(context, "current_balance", 320_000.0),
        })
    }
}

fn profile_f64(context: &AgentContext, key: &str, default: f64) -> f64 {
    context
        .user_profile
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(default)
}

#[async_trait]
impl Agent for FinancialAgent {
    fn id(&self) -> &str {
        "financial"
    }

    fn name(&self) -> &str {
        "Financial Analysis Agent"
    }

    fn description(&self) -> &str {
        "Mortgage qualification, affordability analysis, and refinancing for clients"
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
        let params = Self::borrower_params(context);

        let mut actions = Vec::new();
        let mut tools_used = Vec::new();
        let mut data = serde_json::Map::new();

        match category {
            FinancialRequest::MortgageQualification => {
                if let Some(result) =
                    run_tool(&*self.qualification, params, &mut actions, &mut tools_used).await
                {
                    data.insert("qualification".to_string(), result);
                }
            }
            FinancialRequest::Affordability => {
                if let Some(result) =
                    run_tool(&*self.affordability, params, &mut actions, &mut tools_used).await
                {
                    data.insert("affordability".to_string(), result);
                }
            }
            FinancialRequest::Refinance => {
                if let Some(result) =
                    run_tool(&*self.refinance, params, &mut actions, &mut tools_used).await
                {
                    data.insert("refinance".to_string(), result);
                }
            }
            FinancialRequest::TaxEstimate | FinancialRequest::General => {}
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
            needs_human_intervention: false,
            data: has_tool_data.then(|| Value::Object(data)),
            visualizations: None,
        })
    }
}

/// Monthly payment for an amortized loan at `annual_rate` percent over `years`.
fn monthly_payment(principal: f64, annual_rate: f64, years: u32) -> f64 {
    let r = annual_rate / 100.0 / 12.0;
    let n = (years * 12) as f64;
    if r == 0.0 {
        return principal / n;
    }
    principal * (r * (1.0 + r).powf(n)) / ((1.0 + r).powf(n) - 1.0)
}

/// Largest principal whose monthly payment fits `payment` at the given terms.
fn max_principal(payment: f64, annual_rate: f64, years: u32) -> f64 {
    let r = annual_rate / 100.0 / 12.0;
    let n = (years * 12) as f64;
    if r == 0.0 {
        return payment * n;
    }
    payment * ((1.0 + r).powf(n) - 1.0) / (r * (1.0 + r).powf(n))
}

/// Estimate how large a mortgage a borrower qualifies for.
struct MortgageQualificationTool {
    rates: Arc<dyn MortgageDataSource>,
}

#[async_trait]
impl Tool for MortgageQualificationTool {
    fn name(&self) -> &str {
        "mortgage_qualification"
    }

    fn description(&self) -> &str {
        "Estimate the maximum mortgage a borrower qualifies for from income, debts, and credit"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "annual_income": { "type": "number", "description": "Gross annual income in dollars" },
                "monthly_debts": { "type": "number", "description": "Existing monthly debt payments" },
                "credit_score": { "type": "number", "description": "FICO credit score" },
                "down_payment": { "type": "number", "description": "Available down payment in dollars" }
            },
            "required": ["annual_income"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let annual_income = params["annual_income"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("Missing 'annual_income' parameter"))?;
        let monthly_debts = params["monthly_debts"].as_f64().unwrap_or(0.0);
        let credit_score = params["credit_score"].as_f64().unwrap_or(700.0);
        let down_payment = params["down_payment"].as_f64().unwrap_or(0.0);

        let rates = self.rates.current_rates().await?;
        let max_dti = self.rates.max_debt_to_income();

        let monthly_income = annual_income / 12.0;
        let max_housing_payment = (monthly_income * max_dti / 100.0 - monthly_debts).max(0.0);
        let max_loan = max_principal(max_housing_payment, rates.thirty_year_fixed, 30);
        let qualified = credit_score >= 620.0 && max_housing_payment > 0.0;

        Ok(json!({
            "qualified": qualified,
            "max_loan_amount": max_loan.round(),
            "max_purchase_price": (max_loan + down_payment).round(),
            "max_monthly_payment": max_housing_payment.round(),
            "rate_used": rates.thirty_year_fixed,
            "debt_to_income_limit": max_dti,
        }))
    }
}

/// Translate income and debts into a comfortable purchase price range.
struct AffordabilityTool {
    rates: Arc<dyn MortgageDataSource>,
}

#[async_trait]
impl Tool for AffordabilityTool {
    fn name(&self) -> &str {
        "affordability_analysis"
    }

    fn description(&self) -> &str {
        "Estimate a comfortable purchase price range from income, debts, and down payment"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "annual_income": { "type": "number", "description": "Gross annual income in dollars" },
                "monthly_debts": { "type": "number", "description": "Existing monthly debt payments" },
                "down_payment": { "type": "number", "description": "Available down payment in dollars" }
            },
            "required": ["annual_income"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let annual_income = params["annual_income"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("Missing 'annual_income' parameter"))?;
        let monthly_debts = params["monthly_debts"].as_f64().unwrap_or(0.0);
        let down_payment = params["down_payment"].as_f64().unwrap_or(0.0);

        let rates = self.rates.current_rates().await?;
        let monthly_income = annual_income / 12.0;

        // Comfortable band: 28% of gross income on housing; stretch band at the DTI limit.
        let comfortable_payment = (monthly_income * 0.28 - monthly_debts).max(0.0);
        let stretch_payment =
            (monthly_income * self.rates.max_debt_to_income() / 100.0 - monthly_debts).max(0.0);

        let comfortable_price =
            max_principal(comfortable_payment, rates.thirty_year_fixed, 30) + down_payment;
        let stretch_price =
            max_principal(stretch_payment, rates.thirty_year_fixed, 30) + down_payment;

        Ok(json!({
            "comfortable_price": comfortable_price.round(),
            "stretch_price": stretch_price.round(),
            "comfortable_monthly_payment": comfortable_payment.round(),
            "rate_used": rates.thirty_year_fixed,
        }))
    }
}

/// Compare the current loan against today's rates.
struct RefinanceTool {
    rates: Arc<dyn MortgageDataSource>,
}

#[async_trait]
impl Tool for RefinanceTool {
    fn name(&self) -> &str {
        "refinance_analysis"
    }

    fn description(&self) -> &str {
        "Compare an existing mortgage against current rates and estimate break-even"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "current_rate": { "type": "number", "description": "Current APR, percent" },
                "current_balance": { "type": "number", "description": "Remaining principal in dollars" }
            },
            "required": ["current_rate", "current_balance"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let current_rate = params["current_rate"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("Missing 'current_rate' parameter"))?;
        let current_balance = params["current_balance"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("Missing 'current_balance' parameter"))?;

        let rates = self.rates.current_rates().await?;
        let current_payment = monthly_payment(current_balance, current_rate, 30);
        let new_payment = monthly_payment(current_balance, rates.thirty_year_fixed, 30);
        let monthly_savings = current_payment - new_payment;
        let closing_costs = current_balance * 0.015;
        let break_even_months = if monthly_savings > 0.0 {
            Some((closing_costs / monthly_savings).ceil() as u32)
        } else {
            None
        };

        Ok(json!({
            "current_monthly_payment": current_payment.round(),
            "new_monthly_payment": new_payment.round(),
            "monthly_savings": monthly_savings.round(),
            "new_rate": rates.thirty_year_fixed,
            "estimated_closing_costs": closing_costs.round(),
            "break_even_months": break_even_months,
            "worthwhile": monthly_savings > 0.0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::FixtureMortgageRates;
    use crate::llm::testing::{FailingLlm, ScriptedLlm};

    fn agent_with(llm: Arc<dyn LlmClient>) -> FinancialAgent {
        FinancialAgent::new(llm, Arc::new(FixtureMortgageRates))
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            FinancialAgent::classify_request("Calculate mortgage qualification for a client"),
            FinancialRequest::MortgageQualification
        );
        assert_eq!(
            FinancialAgent::classify_request("should they refinance at current rates?"),
            FinancialRequest::Refinance
        );
        assert_eq!(
            FinancialAgent::classify_request("what can they afford on this income"),
            FinancialRequest::Affordability
        );
        assert_eq!(
            FinancialAgent::classify_request("property tax implications"),
            FinancialRequest::TaxEstimate
        );
        assert_eq!(
            FinancialAgent::classify_request("hello there"),
            FinancialRequest::General
        );
    }

    #[tokio::test]
    async fn test_qualification_runs_tool_and_raises_confidence() {
        let agent = agent_with(Arc::new(ScriptedLlm::new("Here is the analysis.")));
        let ctx = AgentContext::new("s1");
        let response = agent
            .execute(
                "Calculate mortgage qualification for client with $80,000 income",
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(response.message, "Here is the analysis.");
        assert_eq!(response.tools_used, vec!["mortgage_qualification"]);
        assert_eq!(response.actions.len(), 1);
        assert_eq!(response.confidence, 0.9);
        assert!(response.data.is_some());
    }

    #[tokio::test]
    async fn test_general_request_runs_no_tools() {
        let agent = agent_with(Arc::new(ScriptedLlm::new("Happy to help.")));
        let ctx = AgentContext::new("s1");
        let response = agent.execute("hello there", &ctx).await.unwrap();

        assert!(response.tools_used.is_empty());
        assert!(response.actions.is_empty());
        assert_eq!(response.confidence, 0.6);
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_fallback_message() {
        let agent = agent_with(Arc::new(FailingLlm));
        let ctx = AgentContext::new("s1");
        let response = agent
            .execute("mortgage qualification check", &ctx)
            .await
            .unwrap();

        // Tool data is still produced; only the narrative degrades.
        assert_eq!(response.message, TEXT_GENERATION_FALLBACK);
        assert_eq!(response.tools_used, vec!["mortgage_qualification"]);
        assert_eq!(response.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_qualification_math_uses_profile() {
        let tool = MortgageQualificationTool {
            rates: Arc::new(FixtureMortgageRates),
        };
        let result = tool
            .execute(json!({
                "annual_income": 120_000.0,
                "monthly_debts": 400.0,
                "credit_score": 710.0,
                "down_payment": 60_000.0,
            }))
            .await
            .unwrap();

        assert_eq!(result["qualified"], true);
        let max_loan = result["max_loan_amount"].as_f64().unwrap();
        assert!(max_loan > 0.0);
        assert_eq!(
            result["max_purchase_price"].as_f64().unwrap(),
            (max_loan + 60_000.0).round()
        );
    }

    #[tokio::test]
    async fn test_low_credit_score_fails_qualification() {
        let tool = MortgageQualificationTool {
            rates: Arc::new(FixtureMortgageRates),
        };
        let result = tool
            .execute(json!({ "annual_income": 90_000.0, "credit_score": 560.0 }))
            .await
            .unwrap();
        assert_eq!(result["qualified"], false);
    }
}
