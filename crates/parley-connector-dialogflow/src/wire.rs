//! Dialogflow REST wire types
//!
//! Only the subset of the `detectIntent` and `knowledgeBases` resources
//! this connector reads or writes. Proto `oneof` fields appear as optional
//! members; at most one of them is set on a given message.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================
// Request Types
// ============================================

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentRequest {
    pub query_input: QueryInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_params: Option<QueryParameters>,
    /// Base64-encoded audio when `query_input.audio_config` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_config: Option<OutputAudioConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EventInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_config: Option<InputAudioConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInput {
    pub text: String,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputAudioConfig {
    pub audio_encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAudioConfig {
    pub audio_encoding: String,
}

/// Query parameters; members not modelled here pass through `extra`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<WireContext>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub knowledge_base_names: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContext {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifespan_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

// ============================================
// Response Types
// ============================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectIntentResponse {
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub query_result: Option<QueryResult>,
    /// Base64-encoded synthesized speech
    #[serde(default)]
    pub output_audio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_required_params_present: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fulfillment_messages: Vec<IntentMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<WireContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_detection_confidence: Option<f64>,
    /// Members not modelled here (diagnostics, sentiment, knowledge answers)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback: Option<bool>,
}

/// One fulfillment message; exactly one variant member is expected
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<QuickReplies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simple_responses: Option<SimpleResponses>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_card: Option<BasicCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Suggestions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_out_suggestion: Option<LinkOutSuggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_select: Option<ListSelect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carousel_select: Option<CarouselSelect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_carousel_card: Option<BrowseCarouselCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_content: Option<MediaContent>,
}

/// Borrowed view of the variant carried by an [`IntentMessage`]
#[derive(Debug, Clone, Copy)]
pub enum MessageKind<'a> {
    Text(&'a TextMessage),
    Image(&'a Image),
    QuickReplies(&'a QuickReplies),
    Card(&'a CardMessage),
    Payload(&'a Map<String, Value>),
    SimpleResponses(&'a SimpleResponses),
    BasicCard(&'a BasicCard),
    Suggestions(&'a Suggestions),
    LinkOutSuggestion(&'a LinkOutSuggestion),
    ListSelect(&'a ListSelect),
    CarouselSelect(&'a CarouselSelect),
    BrowseCarouselCard(&'a BrowseCarouselCard),
    MediaContent(&'a MediaContent),
}

impl IntentMessage {
    /// The variant carried by this message, if it is one we know
    pub fn kind(&self) -> Option<MessageKind<'_>> {
        self.text
            .as_ref()
            .map(MessageKind::Text)
            .or_else(|| self.image.as_ref().map(MessageKind::Image))
            .or_else(|| self.quick_replies.as_ref().map(MessageKind::QuickReplies))
            .or_else(|| self.card.as_ref().map(MessageKind::Card))
            .or_else(|| self.simple_responses.as_ref().map(MessageKind::SimpleResponses))
            .or_else(|| self.basic_card.as_ref().map(MessageKind::BasicCard))
            .or_else(|| self.suggestions.as_ref().map(MessageKind::Suggestions))
            .or_else(|| {
                self.link_out_suggestion
                    .as_ref()
                    .map(MessageKind::LinkOutSuggestion)
            })
            .or_else(|| self.list_select.as_ref().map(MessageKind::ListSelect))
            .or_else(|| self.carousel_select.as_ref().map(MessageKind::CarouselSelect))
            .or_else(|| {
                self.browse_carousel_card
                    .as_ref()
                    .map(MessageKind::BrowseCarouselCard)
            })
            .or_else(|| self.media_content.as_ref().map(MessageKind::MediaContent))
            .or_else(|| self.payload.as_ref().map(MessageKind::Payload))
    }

    /// Platform name, with `PLATFORM_UNSPECIFIED` reported as `None`
    pub fn platform(&self) -> Option<&str> {
        self.platform
            .as_deref()
            .filter(|p| !p.is_empty() && *p != PLATFORM_UNSPECIFIED)
    }
}

pub const PLATFORM_UNSPECIFIED: &str = "PLATFORM_UNSPECIFIED";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    #[serde(default)]
    pub text: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickReplies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub quick_replies: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub buttons: Vec<CardButton>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardButton {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postback: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponses {
    #[serde(default)]
    pub simple_responses: Vec<SimpleResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_to_speech: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default)]
    pub buttons: Vec<BasicCardButton>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicCardButton {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_uri_action: Option<OpenUriAction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenUriAction {
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkOutSuggestion {
    #[serde(default)]
    pub destination_name: String,
    #[serde(default)]
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSelect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSelect {
    #[serde(default)]
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<SelectItemInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectItemInfo {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseCarouselCard {
    #[serde(default)]
    pub items: Vec<BrowseCarouselItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseCarouselItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_uri_action: Option<BrowseOpenUrlAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseOpenUrlAction {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_objects: Vec<MediaObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_image: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Image>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

// ============================================
// Knowledge Bases
// ============================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKnowledgeBasesResponse {
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBase>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBase {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_intent_message_kind() {
        let msg: IntentMessage = serde_json::from_value(json!({
            "platform": "ACTIONS_ON_GOOGLE",
            "suggestions": { "suggestions": [{ "title": "Yes" }] }
        }))
        .unwrap();

        assert_eq!(msg.platform(), Some("ACTIONS_ON_GOOGLE"));
        assert!(matches!(
            msg.kind(),
            Some(MessageKind::Suggestions(s)) if s.suggestions.len() == 1
        ));
    }

    #[test]
    fn test_unknown_variant_has_no_kind() {
        let msg: IntentMessage = serde_json::from_value(json!({
            "platform": "PLATFORM_UNSPECIFIED",
            "tableCard": { "title": "Table" }
        }))
        .unwrap();

        assert_eq!(msg.platform(), None);
        assert!(msg.kind().is_none());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = DetectIntentRequest {
            query_input: QueryInput {
                text: Some(TextInput {
                    text: "hi".into(),
                    language_code: "en".into(),
                }),
                ..Default::default()
            },
            query_params: Some(QueryParameters {
                contexts: vec![WireContext {
                    name: "projects/p/agent/sessions/s/contexts/c".into(),
                    lifespan_count: Some(2),
                    parameters: None,
                }],
                extra: json!({ "timeZone": "Europe/Vienna" })
                    .as_object()
                    .cloned()
                    .unwrap(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["queryInput"]["text"]["languageCode"], "en");
        assert_eq!(value["queryParams"]["contexts"][0]["lifespanCount"], 2);
        assert_eq!(value["queryParams"]["timeZone"], "Europe/Vienna");
        assert!(value["queryParams"].get("knowledgeBaseNames").is_none());
        assert!(value.get("inputAudio").is_none());
    }
}
