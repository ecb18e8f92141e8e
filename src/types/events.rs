//! Engine lifecycle state and published events

use rust_decimal::Decimal;
use serde::Serialize;
use super::TradeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityEvent {
    pub asset: String,
    pub dex_price: Decimal,
    pub cex_price: Decimal,
    pub spread_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptContext {
    pub asset: String,
    pub funding_asset: String,
    pub financing_protocol: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEvent {
    pub message: String,
    pub context: Option<AttemptContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum EngineEvent {
    Started,
    Stopped,
    Opportunity(OpportunityEvent),
    TradeExecuted(TradeRecord),
    Warning(String),
    Error(ErrorEvent),
}

impl EngineEvent {
    pub fn error(message: impl Into<String>) -> Self {
        EngineEvent::Error(ErrorEvent {
            message: message.into(),
            context: None,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EngineEvent::Started => "started",
            EngineEvent::Stopped => "stopped",
            EngineEvent::Opportunity(_) => "opportunity",
            EngineEvent::TradeExecuted(_) => "tradeExecuted",
            EngineEvent::Warning(_) => "warning",
            EngineEvent::Error(_) => "error",
        }
    }
}
