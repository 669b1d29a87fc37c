// Response shapes returned by the bot backend. Every field is optional or
// defaulted, and an explicit `null` reads as the default: the client only
// checks for presence before display, it does not validate the server's
// schema.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `null` or absent both give `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope shared by the settings and document-store endpoints: a
/// `success` flag, an optional `error` text and the operation payload.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Reply<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Reply<T> {
    /// Split the envelope into the payload or the server-reported error.
    pub fn into_result(self) -> Result<T, String> {
        if self.success {
            Ok(self.body)
        } else {
            Err(self.error.unwrap_or_else(|| "unknown error".into()))
        }
    }
}

/// Payload of `/api/mt5-account-info`.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AccountSnapshot {
    pub account: Option<AccountInfo>,
    pub positions: Option<Vec<Position>>,
    pub summary: Option<PositionSummary>,
    pub today_summary: Option<PositionSummary>,
    pub timestamp: Option<Value>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AccountInfo {
    pub login: Option<Value>,
    pub server: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub balance: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub equity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub profit: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub margin: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub free_margin: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub margin_level: f64,
    pub currency: Option<String>,
}

/// One open position. MT5 encodes the side as `type`: 0 is a buy.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Position {
    pub ticket: Option<Value>,
    pub symbol: Option<String>,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub side: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub volume: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub price_open: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub profit: f64,
    pub comment: Option<String>,
}

impl Position {
    pub fn side_label(&self) -> &'static str {
        if self.side == 0 {
            "BUY"
        } else {
            "SELL"
        }
    }
}

/// Aggregates for all open positions, or for today's positions when
/// `period` is set.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PositionSummary {
    pub period: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_positions: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_profit: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub profitable_positions: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub losing_positions: u64,
}

/// Free-form acknowledgement carrying an optional human message.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Notice {
    pub message: Option<String>,
}

/// Remote configuration: group name to its key/value settings.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SettingsGroups {
    #[serde(deserialize_with = "null_as_default")]
    pub config: BTreeMap<String, Map<String, Value>>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CollectionList {
    #[serde(deserialize_with = "null_as_default")]
    pub collections: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CollectionStats {
    pub collection: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub document_count: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Cleared {
    #[serde(deserialize_with = "null_as_default")]
    pub deleted_count: u64,
    pub cutoff_date: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DocumentPage {
    #[serde(deserialize_with = "null_as_default")]
    pub documents: Vec<Map<String, Value>>,
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_flattens_payload() {
        let reply: Reply<CollectionList> = serde_json::from_value(json!({
            "success": true,
            "collections": ["news", "signals"],
            "count": 2
        }))
        .unwrap();
        let list = reply.into_result().unwrap();
        assert_eq!(list.collections, vec!["news", "signals"]);
        assert_eq!(list.count, 2);
    }

    #[test]
    fn reply_without_success_reports_error() {
        let reply: Reply<Cleared> =
            serde_json::from_value(json!({"success": false, "error": "permission denied"})).unwrap();
        assert_eq!(reply.into_result().unwrap_err(), "permission denied");

        let reply: Reply<Cleared> = serde_json::from_value(json!({})).unwrap();
        assert_eq!(reply.into_result().unwrap_err(), "unknown error");
    }

    #[test]
    fn snapshot_tolerates_missing_sections() {
        let snapshot: AccountSnapshot = serde_json::from_value(json!({
            "positions": [{"ticket": 42, "symbol": "XAUUSD", "type": 1, "volume": 0.1}]
        }))
        .unwrap();
        assert!(snapshot.account.is_none());
        let positions = snapshot.positions.unwrap();
        assert_eq!(positions[0].side_label(), "SELL");
        assert_eq!(positions[0].profit, 0.0);
    }

    #[test]
    fn null_numbers_read_as_zero() {
        let snapshot: AccountSnapshot = serde_json::from_value(json!({
            "account": {"login": 5123, "balance": 1000.0, "margin": null, "margin_level": null},
            "positions": [{"symbol": "EURUSD", "type": null, "volume": 0.5, "profit": null}],
            "summary": {"total_positions": null, "total_profit": 12.5}
        }))
        .unwrap();
        let account = snapshot.account.unwrap();
        assert_eq!(account.balance, 1000.0);
        assert_eq!(account.margin_level, 0.0);
        assert_eq!(snapshot.positions.unwrap()[0].profit, 0.0);
        assert_eq!(snapshot.summary.unwrap().total_positions, 0);

        let reply: Reply<DocumentPage> =
            serde_json::from_value(json!({"success": true, "documents": null, "count": null})).unwrap();
        let page = reply.into_result().unwrap();
        assert!(page.documents.is_empty());
        assert_eq!(page.count, 0);
    }
}
