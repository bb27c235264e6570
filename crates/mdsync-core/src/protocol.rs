//! Wire vocabulary shared with the rendering server.
//!
//! Every frame is a JSON object carrying a `type` tag and an optional `body`.
//! Inbound frames decode into [`ServerMessage`]; outbound frames are encoded
//! from [`ClientCommand`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stylesheet::StylesheetReference;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "body")]
pub enum ServerMessage {
    /// New content for the document body.
    HtmlUpdate(String),
    /// The stylesheet changed on disk. `None` re-applies the active one.
    CssUpdate(Option<StylesheetReference>),
    /// The server cycled to a different stylesheet.
    CssChange(StylesheetReference),
    Success,
    Error(String),
}

impl ServerMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            ServerMessage::HtmlUpdate(_) => "HtmlUpdate",
            ServerMessage::CssUpdate(_) => "CssUpdate",
            ServerMessage::CssChange(_) => "CssChange",
            ServerMessage::Success => "Success",
            ServerMessage::Error(_) => "Error",
        }
    }

    /// Encode as the server would. Used by fixtures and tooling.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "body")]
pub enum ClientCommand {
    ChangeCssNext,
    ChangeCssPrev,
    ExportHtml,
    RedirectDefault,
    Redirect(String),
}

impl ClientCommand {
    pub fn tag(&self) -> &'static str {
        match self {
            ClientCommand::ChangeCssNext => "ChangeCssNext",
            ClientCommand::ChangeCssPrev => "ChangeCssPrev",
            ClientCommand::ExportHtml => "ExportHtml",
            ClientCommand::RedirectDefault => "RedirectDefault",
            ClientCommand::Redirect(_) => "Redirect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed server message: {0}")]
    Malformed(String),
    #[error("server message has no type tag")]
    MissingTag,
    #[error("unknown server message type: {0}")]
    UnknownTag(String),
    #[error("server message {0} requires a body")]
    MissingBody(&'static str),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

pub fn decode(raw: &str) -> Result<ServerMessage, DecodeError> {
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|err| DecodeError::Malformed(err.to_string()))?;
    let kind = frame.kind.ok_or(DecodeError::MissingTag)?;
    let body = frame.body;
    match kind.as_str() {
        "HtmlUpdate" => body
            .map(ServerMessage::HtmlUpdate)
            .ok_or(DecodeError::MissingBody("HtmlUpdate")),
        "CssUpdate" => Ok(ServerMessage::CssUpdate(
            body.filter(|path| !path.trim().is_empty())
                .map(StylesheetReference::new),
        )),
        "CssChange" => body
            .filter(|path| !path.trim().is_empty())
            .map(|path| ServerMessage::CssChange(StylesheetReference::new(path)))
            .ok_or(DecodeError::MissingBody("CssChange")),
        "Success" => Ok(ServerMessage::Success),
        "Error" => Ok(ServerMessage::Error(body.unwrap_or_default())),
        _ => Err(DecodeError::UnknownTag(kind)),
    }
}

pub fn encode(command: &ClientCommand) -> String {
    // Unit and string variants cannot fail to serialize.
    serde_json::to_string(command)
        .unwrap_or_else(|_| format!(r#"{{"type":"{}"}}"#, command.tag()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_html_update() {
        let msg = decode(r#"{"type":"HtmlUpdate","body":"<p>hi</p>"}"#).expect("decode");
        assert_eq!(msg, ServerMessage::HtmlUpdate("<p>hi</p>".to_string()));
    }

    #[test]
    fn css_update_without_path_means_refresh() {
        for raw in [
            r#"{"type":"CssUpdate","body":""}"#,
            r#"{"type":"CssUpdate","body":null}"#,
            r#"{"type":"CssUpdate"}"#,
        ] {
            assert_eq!(decode(raw).expect("decode"), ServerMessage::CssUpdate(None));
        }

        let msg = decode(r#"{"type":"CssUpdate","body":"css/dark.css"}"#).expect("decode");
        assert_eq!(
            msg,
            ServerMessage::CssUpdate(Some(StylesheetReference::new("css/dark.css")))
        );
    }

    #[test]
    fn css_change_requires_a_path() {
        let msg = decode(r#"{"type":"CssChange","body":"css/b.css"}"#).expect("decode");
        assert_eq!(
            msg,
            ServerMessage::CssChange(StylesheetReference::new("css/b.css"))
        );
        assert_eq!(
            decode(r#"{"type":"CssChange","body":""}"#),
            Err(DecodeError::MissingBody("CssChange"))
        );
    }

    #[test]
    fn acknowledgements_decode() {
        assert_eq!(
            decode(r#"{"type":"Success","body":""}"#),
            Ok(ServerMessage::Success)
        );
        assert_eq!(
            decode(r#"{"type":"Error","body":"No css files provided"}"#),
            Ok(ServerMessage::Error("No css files provided".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_and_untagged_frames() {
        assert!(matches!(decode("{not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode(r#"{"type":"HtmlUpdate","body":42}"#),
            Err(DecodeError::Malformed(_))
        ));
        assert_eq!(decode(r#"{"body":"<p></p>"}"#), Err(DecodeError::MissingTag));
        assert_eq!(
            decode(r#"{"type":"HtmlUpdate"}"#),
            Err(DecodeError::MissingBody("HtmlUpdate"))
        );
    }

    #[test]
    fn unknown_tags_are_reported_by_name() {
        assert_eq!(
            decode(r#"{"type":"Reload","body":""}"#),
            Err(DecodeError::UnknownTag("Reload".to_string()))
        );
    }

    #[test]
    fn commands_encode_in_server_form() {
        assert_eq!(encode(&ClientCommand::ChangeCssNext), r#"{"type":"ChangeCssNext"}"#);
        assert_eq!(encode(&ClientCommand::ChangeCssPrev), r#"{"type":"ChangeCssPrev"}"#);
        assert_eq!(encode(&ClientCommand::ExportHtml), r#"{"type":"ExportHtml"}"#);
        assert_eq!(
            encode(&ClientCommand::RedirectDefault),
            r#"{"type":"RedirectDefault"}"#
        );
        assert_eq!(
            encode(&ClientCommand::Redirect("docs/intro.md".to_string())),
            r#"{"type":"Redirect","body":"docs/intro.md"}"#
        );
    }

    #[test]
    fn server_encoding_decodes_back() {
        let messages = [
            ServerMessage::HtmlUpdate("<h1>x</h1>".to_string()),
            ServerMessage::CssChange(StylesheetReference::new("css/a.css")),
            ServerMessage::Error("boom".to_string()),
        ];
        for message in messages {
            assert_eq!(decode(&message.encode()).expect("decode"), message);
        }
    }
}
