use serde_json::{json, Value};

use crate::api_models::LineMessage;
use crate::recognition::{PipelineOutcome, VenueMatch};

pub const RECOGNIZING_TEXT: &str = "🔍 辨識中...";
pub const NOT_FOUND_TEXT: &str = "😅 抱歉辨識不出來";
pub const SEND_SCREENSHOT_TEXT: &str = "請傳截圖給我！📸";

const ACCENT_COLOR: &str = "#1DB446";
const CAROUSEL_LIMIT: usize = 12;

pub fn text(body: &str) -> LineMessage {
    LineMessage::Text {
        text: body.to_string(),
    }
}

fn venue_bubble(venue: &VenueMatch) -> Value {
    let mut body = vec![
        json!({
            "type": "text",
            "text": "🏪 找到店家！",
            "weight": "bold",
            "size": "md",
            "color": ACCENT_COLOR
        }),
        json!({
            "type": "text",
            "text": venue.name,
            "weight": "bold",
            "size": "xl",
            "margin": "md",
            "wrap": true
        }),
    ];
    if !venue.address.is_empty() {
        body.push(json!({
            "type": "text",
            "text": venue.address,
            "size": "sm",
            "color": "#999999",
            "margin": "md",
            "wrap": true
        }));
    }

    json!({
        "type": "bubble",
        "body": { "type": "box", "layout": "vertical", "contents": body },
        "footer": {
            "type": "box",
            "layout": "vertical",
            "contents": [{
                "type": "button",
                "style": "primary",
                "color": ACCENT_COLOR,
                "action": { "type": "uri", "label": "🗺️ 開啟地圖", "uri": venue.search_url }
            }]
        }
    })
}

fn alt_text(matches: &[VenueMatch]) -> String {
    match matches {
        [single] if single.address.is_empty() => single.name.clone(),
        [single] => format!("{} - {}", single.name, single.address),
        many => format!("找到 {} 間店家", many.len()),
    }
}

/// One bubble for a single venue, a carousel for several.
pub fn venue_message(matches: &[VenueMatch]) -> LineMessage {
    let shown = &matches[..matches.len().min(CAROUSEL_LIMIT)];
    let contents = match shown {
        [single] => venue_bubble(single),
        many => json!({
            "type": "carousel",
            "contents": many.iter().map(venue_bubble).collect::<Vec<_>>()
        }),
    };
    LineMessage::Flex {
        alt_text: alt_text(matches),
        contents,
    }
}

/// Renders a pipeline outcome; every kind of not-found looks the same to the user.
pub fn outcome_message(outcome: &PipelineOutcome) -> LineMessage {
    match outcome {
        PipelineOutcome::Found(matches) if !matches.is_empty() => venue_message(matches),
        _ => text(NOT_FOUND_TEXT),
    }
}
