//! Response normalization
//!
//! Turns a `detectIntent` response into zero or more [`BotMessage`]s.
//! Each accepted fulfillment message becomes one bot message; all of
//! them share the NLP annotations, attachments and raw query result.

use parley::{Attachment, BotMessage, Button, Card, Media};
use tracing::{debug, warn};

use crate::config::DialogflowConfig;
use crate::parameters::extract_nlp;
use crate::wire::{DetectIntentResponse, Image, IntentMessage, MessageKind, SelectItem};

const OUTPUT_AUDIO_NAME: &str = "output.wav";
const OUTPUT_AUDIO_MIME: &str = "audio/wav";

/// Normalize a response into bot messages
pub fn normalize_response(
    config: &DialogflowConfig,
    response: &DetectIntentResponse,
) -> Vec<BotMessage> {
    let Some(result) = response.query_result.as_ref() else {
        warn!(response_id = %response.response_id, "Dialogflow response without query result");
        return Vec::new();
    };

    let template = BotMessage::new()
        .with_nlp(extract_nlp(result, &config.fallback_intents))
        .with_attachments(output_audio_attachments(response))
        .with_source_data(serde_json::to_value(result).unwrap_or_default());

    let mut messages = Vec::new();
    let platform = config.output_platform.as_deref();
    for message in select_messages(platform, &result.fulfillment_messages) {
        let mut bot_message = template.clone();
        if apply_message(&mut bot_message, message) {
            messages.push(bot_message);
        }
    }

    if messages.is_empty() && config.force_intent_resolution {
        debug!("No fulfillment content, emitting intent-only message");
        messages.push(template);
    }

    messages
}

/// Platform filter: prefer the configured platform, fall back to
/// platform-less messages when it has none
pub fn select_messages<'a>(
    platform: Option<&str>,
    messages: &'a [IntentMessage],
) -> Vec<&'a IntentMessage> {
    let unspecified = || -> Vec<&'a IntentMessage> {
        messages.iter().filter(|m| m.platform().is_none()).collect()
    };

    match platform {
        Some(platform) => {
            let matching: Vec<&IntentMessage> = messages
                .iter()
                .filter(|m| m.platform() == Some(platform))
                .collect();
            if matching.is_empty() {
                unspecified()
            } else {
                matching
            }
        }
        None => unspecified(),
    }
}

/// Copy the content of one fulfillment message; returns `false` when the
/// variant is not supported
fn apply_message(bot: &mut BotMessage, message: &IntentMessage) -> bool {
    let Some(kind) = message.kind() else {
        debug!(platform = ?message.platform, "Skipping unknown fulfillment message");
        return false;
    };

    match kind {
        MessageKind::Text(text) => {
            bot.message_text = Some(text.text.first().cloned().unwrap_or_default());
        }
        MessageKind::SimpleResponses(responses) => {
            let Some(first) = responses.simple_responses.first() else {
                return false;
            };
            bot.message_text = first
                .display_text
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| first.text_to_speech.clone());
        }
        MessageKind::Image(image) => {
            bot.media = image_media(image).into_iter().collect();
        }
        MessageKind::QuickReplies(replies) => {
            bot.message_text = replies.title.clone();
            bot.buttons = replies.quick_replies.iter().map(Button::text).collect();
        }
        MessageKind::Card(card) => {
            bot.message_text = card.title.clone();
            bot.cards = vec![Card {
                text: card.title.clone(),
                subtext: card.subtitle.clone(),
                content: None,
                image: card.image_uri.as_deref().map(uri_media),
                buttons: card
                    .buttons
                    .iter()
                    .map(|b| Button {
                        text: b.text.clone(),
                        payload: b.postback.clone(),
                        image_uri: None,
                    })
                    .collect(),
            }];
        }
        MessageKind::BasicCard(card) => {
            bot.cards = vec![Card {
                text: card.title.clone(),
                subtext: card.subtitle.clone(),
                content: card.formatted_text.clone(),
                image: card.image.as_ref().and_then(image_media),
                buttons: card
                    .buttons
                    .iter()
                    .map(|b| Button {
                        text: b.title.clone(),
                        payload: b.open_uri_action.as_ref().map(|a| a.uri.clone()),
                        image_uri: None,
                    })
                    .collect(),
            }];
        }
        MessageKind::Suggestions(suggestions) => {
            bot.buttons = suggestions
                .suggestions
                .iter()
                .map(|s| Button::text(&s.title))
                .collect();
        }
        MessageKind::LinkOutSuggestion(link) => {
            bot.buttons = vec![Button::text(&link.destination_name).with_payload(&link.uri)];
        }
        MessageKind::ListSelect(list) => {
            bot.message_text = list.title.clone();
            bot.cards = list.items.iter().map(select_item_card).collect();
        }
        MessageKind::CarouselSelect(carousel) => {
            bot.cards = carousel.items.iter().map(select_item_card).collect();
        }
        MessageKind::BrowseCarouselCard(carousel) => {
            bot.cards = carousel
                .items
                .iter()
                .map(|item| Card {
                    text: item.title.clone(),
                    subtext: item.description.clone(),
                    content: item.footer.clone(),
                    image: item.image.as_ref().and_then(image_media),
                    buttons: item
                        .open_uri_action
                        .iter()
                        .map(|action| Button {
                            text: item.title.clone(),
                            payload: Some(action.url.clone()),
                            image_uri: None,
                        })
                        .collect(),
                })
                .collect();
        }
        MessageKind::MediaContent(content) => {
            bot.media = content
                .media_objects
                .iter()
                .filter_map(|object| {
                    let uri = object.content_url.as_deref()?;
                    let mut media = uri_media(uri);
                    media.alt_text = object
                        .large_image
                        .as_ref()
                        .or(object.icon.as_ref())
                        .and_then(|image| image.accessibility_text.clone())
                        .or_else(|| object.name.clone());
                    Some(media)
                })
                .collect();
        }
        MessageKind::Payload(_) => {
            debug!("Skipping custom payload fulfillment message");
            return false;
        }
    }

    true
}

fn select_item_card(item: &SelectItem) -> Card {
    Card {
        text: item.title.clone(),
        subtext: item.description.clone(),
        content: None,
        image: item.image.as_ref().and_then(image_media),
        buttons: item
            .info
            .iter()
            .map(|info| Button {
                text: item.title.clone(),
                payload: Some(info.key.clone()),
                image_uri: None,
            })
            .collect(),
    }
}

fn image_media(image: &Image) -> Option<Media> {
    let uri = image.image_uri.as_deref().filter(|u| !u.is_empty())?;
    let mut media = uri_media(uri);
    media.alt_text = image.accessibility_text.clone();
    Some(media)
}

fn uri_media(uri: &str) -> Media {
    Media::uri(uri).with_mime_type(mime_from_uri(uri))
}

/// Guess a mime type from the URI's file extension
pub fn mime_from_uri(uri: &str) -> &'static str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file = path.rsplit('/').next().unwrap_or(path);
    let ext = file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn output_audio_attachments(response: &DetectIntentResponse) -> Vec<Attachment> {
    response
        .output_audio
        .as_ref()
        .filter(|audio| !audio.is_empty())
        .map(|audio| Attachment {
            name: OUTPUT_AUDIO_NAME.to_string(),
            mime_type: OUTPUT_AUDIO_MIME.to_string(),
            base64: audio.clone(),
        })
        .into_iter()
        .collect()
}
