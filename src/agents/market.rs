//! Market analysis agent: area statistics, rental comparables, investment math.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agents::{
    build_messages, classify, run_tool, Agent, AgentContext, AgentError, AgentResponse,
    TEXT_GENERATION_FALLBACK,
};
use crate::datasource::{MarketDataSource, RentalDataSource};
use crate::llm::LlmClient;
use crate::tools::Tool;

const SYSTEM_PROMPT: &str = "You are a market analyst for a real-estate brokerage. You interpret \
    area statistics, rental comparables, and investment metrics for agents advising buyers and \
    investors. Be precise about which area and time frame the numbers describe.";

const KEYWORDS: &[&str] = &[
    "market",
    "analysis",
    "investment",
    "scrape",
    "data",
    "trend",
    "comparison",
    "valuation",
    "rental",
    "roi",
    "cap rate",
];

/// What kind of market request the input is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketRequest {
    InvestmentAnalysis,
    RentalComps,
    MarketStats,
    General,
}

const CLASSIFY_TABLE: &[(MarketRequest, &[&str])] = &[
    (
        MarketRequest::InvestmentAnalysis,
        &["investment", "roi", "cap rate", "cash flow"],
    ),
    (MarketRequest::RentalComps, &["rental", "rent comp", "comparable"]),
    (
        MarketRequest::MarketStats,
        &["market", "trend", "valuation", "statistics", "median price"],
    ),
];

fn next_steps_for(category: MarketRequest) -> &'static [&'static str] {
    match category {
        MarketRequest::InvestmentAnalysis => &[
            "Validate the cap rate against recent sales in the area",
            "Model financing scenarios with the financial agent",
        ],
        MarketRequest::RentalComps => &[
            "Verify the comparables are currently listed",
            "Adjust for condition and amenities before quoting a rent",
        ],
        MarketRequest::MarketStats => &[
            "Share the area snapshot with the client",
            "Set a price-change alert for the area",
        ],
        MarketRequest::General => &["Name the area or property to analyze"],
    }
}

/// Market analysis agent.
pub struct MarketAnalysisAgent {
    llm: Arc<dyn LlmClient>,
    market_statistics: Arc<dyn Tool>,
    rental_comparables: Arc<dyn Tool>,
}

impl MarketAnalysisAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        market: Arc<dyn MarketDataSource>,
        rentals: Arc<dyn RentalDataSource>,
    ) -> Self {
        Self {
            llm,
            market_statistics: Arc::new(MarketStatisticsTool { source: market }),
            rental_comparables: Arc::new(RentalComparablesTool { source: rentals }),
        }
    }

    /// Classify the input into one request category.
    pub fn classify_request(input: &str) -> MarketRequest {
        classify(input, CLASSIFY_TABLE, MarketRequest::General)
    }

    /// Build tool parameters from the project context.
    fn area_params(context: &AgentContext) -> Value {
        json!({
            "area": context
                .project_context
                .get("area")
                .and_then(Value::as_str)
                .unwrap_or("the metro area"),
            "bedrooms": context
                .project_context
                .get("bedrooms")
                .and_then(Value::as_u64)
                .unwrap_or(2),
        })
    }
}

#[async_trait]
impl Agent for MarketAnalysisAgent {
    fn id(&self) -> &str {
        "market-analysis"
    }

    fn name(&self) -> &str {
        "Market Analysis Agent"
    }

    fn description(&self) -> &str {
        "Area market statistics, rental comparables, and investment metrics"
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
        let params = Self::area_params(context);

        let mut actions = Vec::new();
        let mut tools_used = Vec::new();
        let mut data = serde_json::Map::new();

        match category {
            MarketRequest::MarketStats => {
                if let Some(result) = run_tool(
                    &*self.market_statistics,
                    params,
                    &mut actions,
                    &mut tools_used,
                )
                .await
                {
                    data.insert("market".to_string(), result);
                }
            }
            MarketRequest::RentalComps => {
                if let Some(result) = run_tool(
                    &*self.rental_comparables,
                    params,
                    &mut actions,
                    &mut tools_used,
                )
                .await
                {
                    data.insert("rentals".to_string(), result);
                }
            }
            MarketRequest::InvestmentAnalysis => {
                // Investment math needs both the price side and the rent side.
                let market = run_tool(
                    &*self.market_statistics,
                    params.clone(),
                    &mut actions,
                    &mut tools_used,
                )
                .await;
                let rentals = run_tool(
                    &*self.rental_comparables,
                    params,
                    &mut actions,
                    &mut tools_used,
                )
                .await;

                if let (Some(market), Some(rentals)) = (market, rentals) {
                    if let Some(metrics) = investment_metrics(&market, &rentals) {
                        data.insert("investment".to_string(), metrics);
                    }
                    data.insert("market".to_string(), market);
                    data.insert("rentals".to_string(), rentals);
                }
            }
            MarketRequest::General => {}
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

/// Gross yield and cap rate from a market snapshot and rental comps.
fn investment_metrics(market: &Value, rentals: &Value) -> Option<Value> {
    let median_price = market["median_price"].as_f64()?;
    let comps = rentals["comparables"].as_array()?;
    if comps.is_empty() || median_price <= 0.0 {
        return None;
    }
    let average_rent: f64 = comps
        .iter()
        .filter_map(|c| c["monthly_rent"].as_f64())
        .sum::<f64>()
        / comps.len() as f64;
    let annual_rent = average_rent * 12.0;
    // Assume 35% of gross rent goes to operating expenses.
    let net_operating_income = annual_rent * 0.65;

    Some(json!({
        "average_monthly_rent": average_rent.round(),
        "gross_yield_pct": (annual_rent / median_price * 100.0 * 10.0).round() / 10.0,
        "cap_rate_pct": (net_operating_income / median_price * 100.0 * 10.0).round() / 10.0,
    }))
}

/// Fetch the market snapshot for an area.
struct MarketStatisticsTool {
    source: Arc<dyn MarketDataSource>,
}

#[async_trait]
impl Tool for MarketStatisticsTool {
    fn name(&self) -> &str {
        "market_statistics"
    }

    fn description(&self) -> &str {
        "Fetch median price, days on market, inventory, and price trend for an area"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "area": { "type": "string", "description": "Neighborhood, city, or metro area" }
            },
            "required": ["area"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let area = params["area"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'area' parameter"))?;
        let snapshot = self.source.snapshot(area).await?;
        Ok(serde_json::to_value(snapshot)?)
    }
}

/// Fetch rental comparables for an area.
struct RentalComparablesTool {
    source: Arc<dyn RentalDataSource>,
}

#[async_trait]
impl Tool for RentalComparablesTool {
    fn name(&self) -> &str {
        "rental_comparables"
    }

    fn description(&self) -> &str {
        "Fetch comparable rental listings for an area and bedroom count"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "area": { "type": "string", "description": "Neighborhood, city, or metro area" },
                "bedrooms": { "type": "integer", "description": "Bedroom count to match" }
            },
            "required": ["area"]
        })
    }

    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let area = params["area"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing 'area' parameter"))?;
        let bedrooms = params["bedrooms"].as_u64().unwrap_or(2) as u32;
        let comps = self.source.comparables(area, bedrooms).await?;
        Ok(json!({ "area": area, "comparables": comps }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{FixtureMarketStats, FixtureRentalComps};
    use crate::llm::testing::ScriptedLlm;

    fn agent() -> MarketAnalysisAgent {
        MarketAnalysisAgent::new(
            Arc::new(ScriptedLlm::new("Market summary.")),
            Arc::new(FixtureMarketStats),
            Arc::new(FixtureRentalComps),
        )
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            MarketAnalysisAgent::classify_request("what's the ROI on this duplex"),
            MarketRequest::InvestmentAnalysis
        );
        assert_eq!(
            MarketAnalysisAgent::classify_request("pull rental comps nearby"),
            MarketRequest::RentalComps
        );
        assert_eq!(
            MarketAnalysisAgent::classify_request("how is the market trending"),
            MarketRequest::MarketStats
        );
        assert_eq!(
            MarketAnalysisAgent::classify_request("hello there"),
            MarketRequest::General
        );
    }

    #[tokio::test]
    async fn test_investment_analysis_runs_both_tools() {
        let mut ctx = AgentContext::new("s1");
        ctx.project_context
            .insert("area".to_string(), json!("Maple District"));

        let response = agent()
            .execute("run an investment analysis for a rental there", &ctx)
            .await
            .unwrap();

        assert_eq!(
            response.tools_used,
            vec!["market_statistics", "rental_comparables"]
        );
        let data = response.data.unwrap();
        assert!(data["investment"]["cap_rate_pct"].as_f64().unwrap() > 0.0);
        assert_eq!(data["market"]["area"], "Maple District");
    }

    #[tokio::test]
    async fn test_market_stats_single_tool() {
        let ctx = AgentContext::new("s1");
        let response = agent()
            .execute("give me a market valuation summary", &ctx)
            .await
            .unwrap();

        assert_eq!(response.tools_used, vec!["market_statistics"]);
        assert_eq!(response.confidence, 0.9);
    }
}
