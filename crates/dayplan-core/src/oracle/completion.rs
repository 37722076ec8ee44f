//! Oracle backed by an OpenAI-compatible chat completion endpoint.
//!
//! Every question asks for a small JSON document of a fixed shape. The
//! answer is decoded with `deny_unknown_fields`; anything else is a
//! contract violation, while HTTP and connection failures are transport
//! errors.

use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::validate::{check_extracted, strip_code_fence};
use super::{ExtractedEvent, Oracle, Slot, SlotRequest};
use crate::error::{ContractViolation, OracleError};
use crate::timeline::parse_time_of_day;

const EXTRACT_PROMPT: &str = "Read the user's text and list the events it mentions with their \
durations in minutes. If no duration is given for an event, use 0. Answer only with JSON of the \
form {\"events\": [{\"name\": \"Gym session\", \"minutes\": 60}]}.";

const ESTIMATE_PROMPT: &str = "Estimate how long the following event takes, in whole minutes. \
Answer only with JSON of the form {\"minutes\": 30}.";

const PRIORITY_PROMPT: &str = "Order the following events from most to least urgent. Use every \
event name exactly as given, once each. Answer only with JSON of the form \
{\"order\": [\"Event 1\", \"Event 2\"]}.";

const SLOT_PROMPT: &str = "Given an event, its duration and the free time slots of the day, \
choose a reasonable time for the event. The duration is flexible, but the chosen time must lie \
inside one of the free slots. Answer only with JSON of the form \
{\"slot\": {\"start\": \"09:00\", \"end\": \"10:00\"}}, or {\"slot\": null} if no slot is \
acceptable. Do not explain your answer.";

/// Endpoint and model settings for [`CompletionOracle`].
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model for extraction, estimates and ranking
    pub model: String,
    /// Model for slot choice
    pub slot_model: String,
    pub priority_temperature: f64,
    pub slot_temperature: f64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-3.5-turbo".to_string(),
            slot_model: "gpt-4-turbo".to_string(),
            priority_temperature: 0.3,
            slot_temperature: 0.7,
        }
    }
}

/// Oracle that asks a hosted language model.
pub struct CompletionOracle {
    client: Client,
    settings: CompletionSettings,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EventsAnswer {
    events: Vec<EventAnswer>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EventAnswer {
    name: String,
    minutes: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EstimateAnswer {
    minutes: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct OrderAnswer {
    order: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SlotAnswer {
    slot: Option<SlotTimes>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SlotTimes {
    start: String,
    end: String,
}

fn decode<T: for<'de> Deserialize<'de>>(what: &'static str, raw: &str) -> Result<T, ContractViolation> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|_| ContractViolation::Unparseable {
        what,
        raw: raw.to_string(),
    })
}

impl CompletionOracle {
    pub fn new(settings: CompletionSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    /// Send one system/user exchange and return the first choice's text.
    async fn complete(
        &self,
        model: &str,
        temperature: Option<f64>,
        system: &str,
        user: &str,
    ) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let mut body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        if let Some(t) = temperature {
            body["temperature"] = json!(t);
        }
        debug!(%model, %user, "oracle request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(OracleError::Transport(format!("HTTP {status}: {text}")));
        }

        let envelope: ChatResponse = resp
            .json()
            .await
            .map_err(|e| OracleError::Transport(format!("invalid completion envelope: {e}")))?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::Transport("completion has no content".to_string()))?;
        debug!(%content, "oracle answer");
        Ok(content)
    }
}

#[async_trait]
impl Oracle for CompletionOracle {
    async fn extract_events(&self, text: &str) -> Result<Vec<ExtractedEvent>, OracleError> {
        let raw = self
            .complete(&self.settings.model, None, EXTRACT_PROMPT, text)
            .await?;
        let answer: EventsAnswer = decode("event list", &raw)?;
        let events: Vec<ExtractedEvent> = answer
            .events
            .into_iter()
            .map(|e| ExtractedEvent::new(e.name.trim(), e.minutes))
            .collect();
        check_extracted(&events)?;
        Ok(events)
    }

    async fn estimate_duration(&self, event: &str) -> Result<Duration, OracleError> {
        let raw = self
            .complete(&self.settings.model, None, ESTIMATE_PROMPT, event)
            .await?;
        let answer: EstimateAnswer = decode("duration", &raw)?;
        if !answer.minutes.is_finite() {
            return Err(ContractViolation::Unparseable { what: "duration", raw }.into());
        }
        // Range is checked by the scheduler; only reject what cannot be a number of minutes.
        Ok(Duration::minutes(answer.minutes.round() as i64))
    }

    async fn rank_priority(&self, events: &[String]) -> Result<Vec<String>, OracleError> {
        let raw = self
            .complete(
                &self.settings.model,
                Some(self.settings.priority_temperature),
                PRIORITY_PROMPT,
                &events.join(", "),
            )
            .await?;
        let answer: OrderAnswer = decode("priority", &raw)?;
        Ok(answer.order.into_iter().map(|n| n.trim().to_string()).collect())
    }

    async fn choose_slot(&self, request: &SlotRequest<'_>) -> Result<Option<Slot>, OracleError> {
        let gaps: Vec<String> = request.gaps.iter().map(|g| format!("'{g}'")).collect();
        let user = format!(
            "The event name is {}, the event duration is {} minutes, and the available time slots are [{}].",
            request.event,
            request.duration.num_minutes(),
            gaps.join(", ")
        );
        let raw = self
            .complete(
                &self.settings.slot_model,
                Some(self.settings.slot_temperature),
                SLOT_PROMPT,
                &user,
            )
            .await?;

        let answer: SlotAnswer = decode("slot", &raw)?;
        let Some(times) = answer.slot else {
            return Ok(None);
        };
        let unparseable = || ContractViolation::Unparseable {
            what: "slot",
            raw: raw.clone(),
        };
        let start = parse_time_of_day(&times.start).map_err(|_| unparseable())?;
        let end = parse_time_of_day(&times.end).map_err(|_| unparseable())?;
        Ok(Some(Slot::new(request.day.at(start), request.day.at(end))))
    }
}
