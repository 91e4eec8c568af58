//! Channel history capture and HTML transcript rendering.

use chrono::{FixedOffset, Local, Offset};
use log::{debug, warn};

use crate::channels::{ChatPlatform, ChannelMessage};

pub const PAGE_SIZE: u8 = 100;
pub const MAX_MESSAGES: usize = 5000;

/// Walks the channel history backwards from the newest message and returns it
/// in chronological order, at most [`MAX_MESSAGES`] long.
///
/// A failed page ends the walk; whatever was collected before it is kept.
pub async fn capture_history(platform: &dyn ChatPlatform, channel_id: &str) -> Vec<ChannelMessage> {
    let mut collected: Vec<ChannelMessage> = Vec::new();
    let mut before: Option<String> = None;

    loop {
        let page = match platform
            .fetch_messages(channel_id, before.as_deref(), PAGE_SIZE)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    "History fetch for channel {} stopped after {} messages: {}",
                    channel_id,
                    collected.len(),
                    e
                );
                break;
            }
        };

        let Some(oldest) = page.last() else {
            break;
        };
        before = Some(oldest.id.clone());
        let short_page = page.len() < usize::from(PAGE_SIZE);
        collected.extend(page);

        if collected.len() >= MAX_MESSAGES || short_page {
            break;
        }
    }

    collected.truncate(MAX_MESSAGES);
    collected.reverse();
    debug!(
        "Captured {} messages from channel {}",
        collected.len(),
        channel_id
    );
    collected
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

const STYLE: &str = "body{background:#0d0f12;color:#e6e6e6;font-family:Arial,Helvetica,sans-serif;padding:20px}\
h1{color:#ffb3b3}\
.msg{padding:8px;border-bottom:1px solid #1f1f1f}\
.meta{color:#b8b8b8;font-size:12px}\
.content{white-space:pre-wrap}\
.att a{color:#8ab4ff;text-decoration:none}";

#[derive(Debug, Clone, Copy)]
pub struct TranscriptRenderer {
    offset: FixedOffset,
}

impl Default for TranscriptRenderer {
    fn default() -> Self {
        Self::local()
    }
}

impl TranscriptRenderer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Timestamps in the host's current UTC offset.
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    pub fn render(&self, title: &str, messages: &[ChannelMessage]) -> Vec<u8> {
        let title = escape_html(title);
        let mut html = String::with_capacity(512 + messages.len() * 160);

        html.push_str("<!doctype html><html><head><meta charset=\"utf-8\"><title>");
        html.push_str(&title);
        html.push_str("</title><style>");
        html.push_str(STYLE);
        html.push_str("</style></head><body><h1>");
        html.push_str(&title);
        html.push_str("</h1>\n");

        for message in messages {
            let when = message
                .timestamp
                .with_timezone(&self.offset)
                .format("%Y-%m-%d %H:%M:%S");
            html.push_str(&format!(
                "<div class=\"msg\"><div class=\"meta\">{} - <b>{}</b></div><div class=\"content\">{}</div>",
                when,
                escape_html(message.author.display_name()),
                escape_html(&message.content)
            ));
            for attachment in &message.attachments {
                html.push_str(&format!(
                    "<div class=\"att\"><a href=\"{}\" target=\"_blank\">{}</a></div>",
                    escape_html(&attachment.url),
                    escape_html(&attachment.filename)
                ));
            }
            html.push_str("</div>\n");
        }

        html.push_str("</body></html>");
        html.into_bytes()
    }
}

pub fn transcript_filename(channel_name: &str) -> String {
    format!("{channel_name}-transcript.html")
}
