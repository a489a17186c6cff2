/// Common types and utilities shared across handlers and services
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// One line of a stock request, transfer, or dispatch note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StockItem {
    pub product_id: String,
    pub description: String,
    pub quantity: i32,
    pub unit: String,
}

/// Loosely-typed item payload as submitted by portal clients. Older clients
/// send quantities as strings and identify products by any of several keys,
/// so every field is optional here and `normalize_items` sorts it out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StockItemInput {
    pub product_id: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub quantity: Value,
    pub unit: Option<String>,
}

/// Coerces raw item payloads into well-formed lines. Quantities are coerced
/// to integers; items that end up without a positive quantity or without any
/// product identification are dropped. Callers reject an empty result before
/// touching state.
pub fn normalize_items(items: &[StockItemInput]) -> Vec<StockItem> {
    items
        .iter()
        .filter_map(|item| {
            let quantity = coerce_quantity(&item.quantity)?;
            if quantity <= 0 {
                return None;
            }
            let product_id = item
                .product_id
                .clone()
                .or_else(|| item.description.clone())?;
            let description = item
                .description
                .clone()
                .unwrap_or_else(|| product_id.clone());
            if description.trim().is_empty() {
                return None;
            }
            Some(StockItem {
                product_id,
                description,
                quantity,
                unit: item.unit.clone().unwrap_or_else(|| "units".to_string()),
            })
        })
        .collect()
}

fn coerce_quantity(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
    .and_then(|n| i32::try_from(n).ok())
}

/// One approval decision on a stock request, newest first in the
/// `approvals` document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalEntry {
    pub role: String,
    pub approved: bool,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub notes: String,
}

/// Audit log entry for requests and transfers. Appended on every mutation,
/// never rewritten or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub action: String,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Ledger movement entry kept in the bounded per-record history ring.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MovementEntry {
    pub action: String,
    pub quantity: i32,
    pub available_quantity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Prepends `entry` to a JSON array document, truncating to `cap` entries.
/// Non-array documents (legacy rows) are replaced by a fresh array.
pub fn prepend_capped(document: &mut Value, entry: Value, cap: usize) {
    if !document.is_array() {
        *document = Value::Array(Vec::new());
    }
    let list = document.as_array_mut().expect("document is an array");
    list.insert(0, entry);
    list.truncate(cap);
}

/// Lower-case base36 rendering of a timestamp, as used in barcodes.
pub fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}

/// Random alphanumeric suffix for entity ids and references.
pub fn random_suffix(len: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Generates a prefixed entity id, e.g. `TRF-1733835600000-k3v9x2`.
pub fn new_entity_id(prefix: &str) -> String {
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_millis(),
        random_suffix(6)
    )
}
