use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

// Subscan response envelope, `code` 0 means success
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscanResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub generated_at: i64,
    pub data: Option<T>,
}

impl SubscanResponse<Value> {
    pub fn decode<T: DeserializeOwned>(self) -> Result<SubscanResponse<T>, serde_json::Error> {
        let data = match self.data {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        Ok(SubscanResponse {
            code: self.code,
            message: self.message,
            generated_at: self.generated_at,
            data,
        })
    }
}

// Paged Subscan payload, `list` under whatever name the endpoint uses
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListData<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransfersData {
    #[serde(default)]
    pub transfers: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtrinsicsData {
    #[serde(default)]
    pub extrinsics: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Token {
    pub asset_id: String,
    pub balance: String,
    pub symbol: String,
    pub decimals: u32,
    pub price_usd: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Transaction {
    pub hash: String,
    pub block_num: u64,
    pub block_timestamp: i64,
    pub module: String,
    pub call_module_function: String,
    pub fee: String,
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: String,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u32,
    pub price: f64,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            symbol: "N/A".to_string(),
            decimals: 10,
            price: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    #[serde(rename = "accountData")]
    pub account_data: Value,
    #[serde(rename = "tokenMetadata")]
    pub token_metadata: TokenMetadata,
    pub transfers: Vec<Value>,
    pub extrinsics: Vec<Value>,
    pub staking: Vec<Value>,
    pub votes: Vec<Value>,
    pub last_updated: String,
}

// Polkassembly response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct PolkassemblyResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ActivityDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referendum_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UserActivity {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
    pub details: ActivityDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UserActivities {
    pub activities: Vec<UserActivity>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// OpenAI chat completion request format
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

// OpenAI chat completion response format
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub message: Option<CompletionMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}
