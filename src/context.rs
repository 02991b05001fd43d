//! Shrinks wallet and governance data into something safe and small enough to
//! embed in an LLM prompt.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value, json};

const WALLET_TRANSFER_SAMPLE: usize = 5;
const RECENT_PROPOSALS: usize = 10;
const SUMMARY_SAMPLE: usize = 10;

pub const WALLET_CONTEXT: &str = "wallet";

const WALLET_PROMPT: &str = "You are an expert blockchain analytics assistant specialized in Polkadot and Substrate ecosystems. \
You help users understand their wallet activity, transactions, staking, and governance participation. \
Analyze the provided wallet data and answer questions clearly and concisely.";

const GOVERNANCE_PROMPT: &str = "You are an expert Polkadot governance analyst. You help users understand governance metrics, \
voting patterns, proposals, and treasury activities. Provide insights based on the data.";

/// Escapes quotes, backslashes and whitespace escapes, drops control characters, trims.
pub fn sanitize_str(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t");
    escaped
        .chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F..=0x9F))
        .collect::<String>()
        .trim()
        .to_string()
}

// Scalars are stringified, missing values become ""
fn sanitize_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => sanitize_str(s),
        Some(other) => sanitize_str(&other.to_string()),
    }
}

pub fn sanitize_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(s)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_value).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), sanitize_value(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Compact JSON description of a large row set: count, field names and a sanitised sample.
pub fn summarize_for_ai(rows: &[Value], max_items: usize) -> String {
    if rows.is_empty() {
        return "No data available".to_string();
    }

    let sample: Vec<Value> = rows.iter().take(max_items).map(sanitize_value).collect();
    let fields: Vec<&String> = rows[0]
        .as_object()
        .map(|fields| fields.keys().collect())
        .unwrap_or_default();

    json!({
        "totalCount": rows.len(),
        "sampleSize": sample.len(),
        "fields": fields,
        "sample": sample,
    })
    .to_string()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn or_zero(value: Option<&Value>) -> Value {
    value.filter(|v| is_truthy(v)).cloned().unwrap_or_else(|| json!(0))
}

fn array_of<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

/// Wallet summary: balances, transfer count plus a few recent transfers, staking accounts.
pub fn clean_wallet_context(wallet: &Value) -> Value {
    if wallet.is_null() {
        return Value::Null;
    }

    let transfers = array_of(wallet, "transfers");
    let recent: Vec<Value> = transfers
        .iter()
        .take(WALLET_TRANSFER_SAMPLE)
        .map(|t| {
            json!({
                "hash": sanitize_field(t.get("hash")),
                "amount": t.get("amount").cloned().unwrap_or(Value::Null),
                "from": sanitize_field(t.get("from")),
                "to": sanitize_field(t.get("to")),
                "timestamp": t.get("timestamp").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    let staking = wallet
        .get("staking")
        .filter(|s| is_truthy(s))
        .map(|staking| {
            json!({
                "controller": sanitize_field(staking.get("controller")),
                "rewardAccount": sanitize_field(staking.get("rewardAccount")),
            })
        })
        .unwrap_or(Value::Null);

    json!({
        "address": sanitize_field(wallet.get("address")),
        "balance": or_zero(wallet.get("balance")),
        "transferable": or_zero(wallet.get("transferable")),
        "locked": or_zero(wallet.get("locked")),
        "reserved": or_zero(wallet.get("reserved")),
        "transfers": {
            "count": transfers.len(),
            "recentSample": recent,
        },
        "extrinsics": {
            "count": array_of(wallet, "extrinsics").len(),
        },
        "staking": staking,
    })
}

/// Governance summary: the most recent proposals and the voter count.
pub fn clean_governance_context(governance: &Value) -> Value {
    if governance.is_null() {
        return Value::Null;
    }

    let proposals = array_of(governance, "proposals");
    let recent: Vec<Value> = sort_proposals_by_date(proposals)
        .iter()
        .take(RECENT_PROPOSALS)
        .map(|p| {
            json!({
                "id": p.get("id").cloned().unwrap_or(Value::Null),
                "title": sanitize_field(p.get("title")),
                "status": p.get("status").cloned().unwrap_or(Value::Null),
                "ayeVotes": or_zero(p.get("ayeVotes")),
                "nayVotes": or_zero(p.get("nayVotes")),
                "track": sanitize_field(p.get("track")),
            })
        })
        .collect();

    json!({
        "proposals": {
            "totalCount": proposals.len(),
            "recentProposals": recent,
        },
        "voters": {
            "totalCount": array_of(governance, "voters").len(),
        },
    })
}

/// Missing or unparseable dates map to the epoch so they sort last.
pub fn parse_proposal_date(value: Option<&Value>) -> DateTime<Utc> {
    let text = match value {
        Some(Value::String(s)) => s.trim(),
        Some(Value::Number(n)) => {
            return n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        }
        _ => return DateTime::<Utc>::UNIX_EPOCH,
    };
    if text.is_empty() || text == "N/A" {
        return DateTime::<Utc>::UNIX_EPOCH;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return parsed.with_timezone(&Utc);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return parsed.and_utc();
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn proposal_date(proposal: &Value) -> DateTime<Utc> {
    let field = ["createdDate", "startTime", "start_time"]
        .iter()
        .filter_map(|key| proposal.get(*key))
        .find(|value| is_truthy(value));
    parse_proposal_date(field)
}

/// Newest first.
pub fn sort_proposals_by_date(proposals: &[Value]) -> Vec<Value> {
    let mut sorted = proposals.to_vec();
    sorted.sort_by_key(|p| std::cmp::Reverse(proposal_date(p)));
    sorted
}

/// Reduces caller-supplied context to the summary for its kind.
pub fn prepare_context(context_type: Option<&str>, context: &Value) -> Value {
    if context_type == Some(WALLET_CONTEXT) {
        return clean_wallet_context(context);
    }
    if let Some(rows) = context.as_array() {
        return Value::String(summarize_for_ai(rows, SUMMARY_SAMPLE));
    }
    let looks_like_governance = context
        .as_object()
        .is_some_and(|fields: &Map<String, Value>| {
            fields.contains_key("proposals") || fields.contains_key("voters")
        });
    if looks_like_governance {
        clean_governance_context(context)
    } else {
        sanitize_value(context)
    }
}

pub fn system_prompt(context_type: Option<&str>, context: Option<&Value>) -> String {
    let (prompt, label) = if context_type == Some(WALLET_CONTEXT) {
        (WALLET_PROMPT, "Wallet Data Context")
    } else {
        (GOVERNANCE_PROMPT, "Governance Data Context")
    };

    match context.filter(|c| !c.is_null()) {
        Some(context) => {
            let pretty = serde_json::to_string_pretty(context).unwrap_or_default();
            format!("{prompt}\n\n{label}:\n{pretty}")
        }
        None => prompt.to_string(),
    }
}
