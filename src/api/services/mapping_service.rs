//! Field-mapping service: natural-language report prompts to SAP CDS field
//! mappings.
//!
//! The LLM is asked for strict JSON against a response schema; every failure
//! on that path (transport, HTTP status, empty output, parse, shape, empty
//! after normalization) falls back to a deterministic heuristic so the
//! endpoint never errors. The `_meta` block on the wire tells callers which
//! path produced the answer.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::env;
use std::time::Duration;
use tracing::warn;

use crate::models::field::{FieldMapping, FieldType};
use crate::models::preview::MappingSource;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SERVICE_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const MAX_PROMPT_FIELDS: usize = 12;
const MAX_DISPLAY_NAME_CHARS: usize = 70;

/// Command phrasing that must never survive as a field name.
const COMMON_PROMPT_NOISE: [&str; 7] = [
    "create report",
    "create a report",
    "generate report",
    "generate a report",
    "show me",
    "i need a report",
    "please create a report",
];

const SYSTEM_PROMPT: &str = r#"You are an SAP CDS field mapping expert.

Goal:
- Read the user request for a report.
- Extract only the business fields requested by the user.
- Choose the most appropriate SAP CDS view and CDS field for each one.

Hard rules:
- Return only JSON that matches the schema.
- Output fields only. Never output report title.
- Keep displayName in English.
- Keep displayName concise (usually 1 to 4 words), no full sentence.
- When the prompt explicitly lists fields, preserve the same field order.
- Do not include command text as a field (examples: "create report", "show me", "generate report").
- Do not merge different requested fields into one field.
- Do not invent unrelated fields.
- Avoid duplicates.
- Choose type only from: string, number, date, boolean.
- Do not depend on a fixed list of CDS views. Infer the best CDS view for each field.
- If uncertain, still return the best candidate CDS view and CDS field names."#;

static WITH_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bwith\b").expect("Invalid with-segment regex"));
static AND_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\band\b").expect("Invalid and-word regex"));
static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
static TOKEN_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(a|an|the|please|i|we|need|want|create|generate|show)\s+")
        .expect("Invalid token prefix regex")
});
static TOKEN_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+fields?$").expect("Invalid token suffix regex"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```json\n?|```\n?").expect("Invalid code fence regex"));

#[derive(Debug, Clone)]
pub struct MappingPayload {
    pub fields: Vec<FieldMapping>,
}

#[derive(Debug, Clone)]
pub struct MappingResult {
    pub payload: MappingPayload,
    pub source: MappingSource,
    /// Machine-readable cause whenever the answer is not a validated LLM one
    pub reason: Option<String>,
}

/// LLM-backed mapping client with the deterministic mock built in.
pub struct MappingService {
    client: Option<Client>,
    api_key: Option<String>,
    model: String,
    service_url: String,
    force_mock: bool,
}

impl MappingService {
    pub fn new(
        api_key: Option<String>,
        model: String,
        service_url: String,
        force_mock: bool,
    ) -> Self {
        let client = if api_key.is_some() {
            Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
                .build()
                .ok()
        } else {
            warn!("OpenAI API key not configured; field mapping uses the deterministic mock");
            None
        };

        Self {
            client,
            api_key,
            model,
            service_url,
            force_mock,
        }
    }

    /// Reads `OPENAI_API_KEY`, `AI_MODEL`, `AI_SERVICE_URL` and the `MOCK_AI`
    /// force-mock switch.
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let model = env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let service_url =
            env::var("AI_SERVICE_URL").unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string());
        let force_mock = env::var("MOCK_AI").is_ok_and(|v| v == "true");
        Self::new(api_key, model, service_url, force_mock)
    }

    /// Maps a prompt to fields. Never fails: every degraded path answers with
    /// the heuristic mock and a reason.
    pub async fn generate_field_mappings(&self, prompt: &str, force_mock: bool) -> MappingResult {
        let fallback = build_mock_payload(prompt);

        if force_mock || self.force_mock {
            return MappingResult {
                payload: fallback,
                source: MappingSource::Mock,
                reason: Some("force_mock_enabled".to_string()),
            };
        }
        let (Some(client), Some(api_key)) = (self.client.as_ref(), self.api_key.as_ref()) else {
            return MappingResult {
                payload: fallback,
                source: MappingSource::Mock,
                reason: Some("api_key_missing".to_string()),
            };
        };

        let request_body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!(
                    "User request:\n{}\n\nReturn only the JSON object defined by the schema.",
                    prompt
                )}
            ],
            "temperature": 0,
            "response_format": {
                "type": "json_schema",
                "json_schema": output_json_schema()
            }
        });

        let response = match client
            .post(&self.service_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("LLM mapping request failed, using mock fallback: {}", err);
                return mock_fallback(fallback, "llm_request_failed".to_string());
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!("LLM service returned error {}: {}", status, error_text);
            return mock_fallback(fallback, format!("llm_http_{}", status.as_u16()));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!("Failed to read LLM response body, using mock fallback: {}", err);
                return mock_fallback(fallback, "llm_request_failed".to_string());
            }
        };

        let content = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .unwrap_or("");
        if content.trim().is_empty() {
            warn!("No text content from LLM, using mock fallback");
            return mock_fallback(fallback, "llm_empty_output".to_string());
        }

        let parsed: Value = match serde_json::from_str(&clean_json_response(content)) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Failed to parse LLM response, using mock fallback: {}", err);
                return mock_fallback(fallback, "llm_parse_error".to_string());
            }
        };

        let Some(fields) = validate_agent_fields(&parsed) else {
            warn!("Invalid LLM payload shape, using mock fallback");
            return mock_fallback(fallback, "llm_invalid_schema".to_string());
        };

        match normalize_agent_fields(fields) {
            Some(normalized) => MappingResult {
                payload: MappingPayload { fields: normalized },
                source: MappingSource::External,
                reason: None,
            },
            None => {
                warn!("LLM payload normalized to empty fields, using mock fallback");
                mock_fallback(fallback, "llm_empty_after_normalization".to_string())
            }
        }
    }
}

fn mock_fallback(payload: MappingPayload, reason: String) -> MappingResult {
    MappingResult {
        payload,
        source: MappingSource::MockFallback,
        reason: Some(reason),
    }
}

/// Response schema sent with the request; the type enum deliberately stays at
/// the four scalar kinds while the validator below also accepts `enum` plus
/// `enumValues` from laxer models.
fn output_json_schema() -> Value {
    json!({
        "name": "sap_field_mapping",
        "strict": true,
        "schema": {
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "fields": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "displayName": {"type": "string", "minLength": 1},
                            "cdsField": {"type": "string", "minLength": 1},
                            "cdsView": {"type": "string", "minLength": 1},
                            "type": {
                                "type": "string",
                                "enum": ["string", "number", "date", "boolean"]
                            }
                        },
                        "required": ["displayName", "cdsField", "cdsView", "type"]
                    }
                }
            },
            "required": ["fields"]
        }
    })
}

/// Models occasionally wrap JSON in markdown fences despite instructions.
fn clean_json_response(text: &str) -> String {
    CODE_FENCE.replace_all(text.trim(), "").to_string()
}

fn validate_agent_fields(value: &Value) -> Option<Vec<FieldMapping>> {
    let entries = value.get("fields")?.as_array()?;
    let mut fields = Vec::with_capacity(entries.len());
    for entry in entries {
        let record = entry.as_object()?;
        let display_name = record.get("displayName")?.as_str()?;
        let cds_field = record.get("cdsField")?.as_str()?;
        let cds_view = record.get("cdsView")?.as_str()?;
        let field_type = FieldType::parse(record.get("type")?.as_str()?)?;
        let enum_values = match record.get("enumValues") {
            None => None,
            Some(Value::Array(values)) => {
                let mut items = Vec::with_capacity(values.len());
                for raw in values {
                    items.push(raw.as_str()?.to_string());
                }
                Some(items)
            }
            Some(_) => return None,
        };
        fields.push(FieldMapping {
            display_name: display_name.to_string(),
            cds_field: cds_field.to_string(),
            cds_view: cds_view.to_string(),
            field_type,
            enum_values,
        });
    }
    Some(fields)
}

/// Cleans an almost-valid response: collapses whitespace, drops fields with
/// blank names, overlong display names, or command-phrase noise, and dedupes
/// case-insensitively on (displayName, cdsView, cdsField). `None` when
/// nothing survives.
pub fn normalize_agent_fields(fields: Vec<FieldMapping>) -> Option<Vec<FieldMapping>> {
    let mut dedupe = HashSet::new();
    let mut normalized = Vec::new();

    for raw in fields {
        let display_name = normalize_whitespace(&raw.display_name);
        let cds_field = normalize_whitespace(&raw.cds_field);
        let cds_view = normalize_whitespace(&raw.cds_view);
        let display_name_key = display_name.to_lowercase();

        if display_name.is_empty() || cds_field.is_empty() || cds_view.is_empty() {
            continue;
        }
        if display_name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            continue;
        }
        if COMMON_PROMPT_NOISE
            .iter()
            .any(|noise| display_name_key.contains(noise))
        {
            continue;
        }

        let unique_key = format!(
            "{}|{}|{}",
            display_name_key,
            cds_view.to_lowercase(),
            cds_field.to_lowercase()
        );
        if !dedupe.insert(unique_key) {
            continue;
        }

        normalized.push(FieldMapping {
            display_name,
            cds_field,
            cds_view,
            field_type: raw.field_type,
            enum_values: raw.enum_values,
        });
    }

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic prompt-to-fields heuristic: tokenize the prompt into
/// candidate names, map each through the keyword table, and fall back to the
/// canonical Order/Item/Status trio when nothing usable was extracted.
pub fn build_mock_payload(prompt: &str) -> MappingPayload {
    let names = parse_requested_fields(prompt);
    let fields = if names.is_empty() {
        default_fields()
    } else {
        names.iter().map(|name| infer_field_mapping(name)).collect()
    };
    MappingPayload { fields }
}

/// Field-name extraction: prefer the segment after "with" (it usually holds
/// the direct list), turn "and" and "." into commas, then split, strip
/// article/verb prefixes and a trailing "field(s)", dedupe, cap at 12.
fn parse_requested_fields(prompt: &str) -> Vec<String> {
    let preferred_segment = match WITH_SEGMENT.find(prompt) {
        Some(found) => &prompt[found.end()..],
        None => prompt,
    };
    let comma_separated = AND_WORD.replace_all(preferred_segment, ",").replace('.', ",");
    let normalized = WHITESPACE_RUN.replace_all(&comma_separated, " ");

    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for raw_token in normalized.split(',') {
        let token = raw_token.trim();
        let token = TOKEN_PREFIX.replace(token, "");
        let token = TOKEN_SUFFIX.replace(&token, "");
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if seen.insert(token.to_string()) {
            tokens.push(token.to_string());
        }
        if tokens.len() == MAX_PROMPT_FIELDS {
            break;
        }
    }
    tokens
}

/// Keyword table mapping a candidate name to a canonical CDS view and field.
fn infer_field_mapping(field_name: &str) -> FieldMapping {
    let normalized = field_name.to_lowercase();
    let display_name = to_title_case(field_name);

    if normalized.contains("status") {
        return FieldMapping::new(&display_name, "Status", "I_SalesOrder", FieldType::Enum)
            .with_enum_values(&["Open", "In Progress", "Completed", "Cancelled"]);
    }
    if normalized.contains("quantity") {
        return FieldMapping::new(&display_name, "Quantity", "I_SalesOrderItem", FieldType::Number);
    }
    if normalized.contains("amount")
        || normalized.contains("price")
        || normalized.contains("value")
        || normalized.contains("total")
    {
        return FieldMapping::new(&display_name, "NetAmount", "I_SalesOrderItem", FieldType::Number);
    }
    if normalized.contains("date") {
        return FieldMapping::new(&display_name, "CreationDate", "I_SalesOrder", FieldType::Date);
    }
    if normalized.contains("customer") {
        return FieldMapping::new(&display_name, "CustomerName", "I_Customer", FieldType::String);
    }
    if normalized.contains("product") {
        return FieldMapping::new(&display_name, "ProductName", "I_Product", FieldType::String);
    }
    if normalized.contains("material") {
        return FieldMapping::new(&display_name, "MaterialName", "I_Material", FieldType::String);
    }
    if normalized.contains("item") {
        return FieldMapping::new(&display_name, "SalesOrderItem", "I_SalesOrderItem", FieldType::String);
    }
    if normalized.contains("order") {
        return FieldMapping::new(&display_name, "OrderID", "I_SalesOrder", FieldType::String);
    }

    let cds_field = to_cds_field_name(&display_name);
    FieldMapping::new(&display_name, &cds_field, "I_SalesOrder", FieldType::String)
}

fn default_fields() -> Vec<FieldMapping> {
    vec![
        FieldMapping::new("Order", "OrderID", "I_SalesOrder", FieldType::String),
        FieldMapping::new("Item", "SalesOrderItem", "I_SalesOrderItem", FieldType::String),
        FieldMapping::new("Status", "Status", "I_SalesOrder", FieldType::Enum)
            .with_enum_values(&["Open", "In Progress", "Completed", "Cancelled"]),
    ]
}

fn to_title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// "net amount" -> "NetAmount"; inner capitalization of each word survives.
fn to_cds_field_name(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == ' ' { c } else { ' ' })
        .collect();
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    if parts.is_empty() {
        return "FieldValue".to_string();
    }
    parts
        .iter()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
