//! Terminal chat client.
//!
//! Drives a [`ChatWidget`] from line input. Plain lines are sent; lines
//! starting with `/` are commands.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::widget::{ChatTransport, ChatWidget, ImageAttachment, SendRejected};

const HELP: &str = "Commands: /image <path>, /remove, /session, /help, /quit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Send(String),
    AttachImage(String),
    RemoveImage,
    ShowSession,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Input {
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, arg)| (name, arg.trim()));
        match name {
            "image" if !arg.is_empty() => Self::AttachImage(arg.to_string()),
            "remove" => Self::RemoveImage,
            "session" => Self::ShowSession,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Read lines from `input` until EOF or `/quit`, writing the conversation to
/// `output`.
pub async fn run<R, W>(
    transport: &dyn ChatTransport,
    input: R,
    output: &mut W,
) -> anyhow::Result<ChatWidget>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut widget = ChatWidget::new();
    widget.open();
    let mut lines = input.lines();

    writeln!(output, "How can I help you today? ({HELP})")?;

    while let Some(line) = lines.next_line().await? {
        match Input::parse(&line) {
            Input::Empty => {}
            Input::Quit => break,
            Input::Help => writeln!(output, "{HELP}")?,
            Input::Unknown(text) => writeln!(output, "Unknown command: {text}")?,
            Input::ShowSession => match widget.session_id() {
                Some(id) => writeln!(output, "Session: {id}")?,
                None => writeln!(output, "No session yet")?,
            },
            Input::RemoveImage => {
                widget.remove_image();
                writeln!(output, "Image removed")?;
            }
            Input::AttachImage(path) => {
                let attachment = ImageAttachment::from_path(&path);
                writeln!(output, "Attached {}", attachment.name())?;
                widget.attach_image(attachment);
            }
            Input::Send(text) => {
                widget.set_draft(text);
                let before = widget.messages().len();
                match widget.send(transport).await {
                    Ok(()) => {
                        // Skip the user's own line; print what came back.
                        for message in widget.messages().iter().skip(before + 1) {
                            writeln!(output, "Assistant: {}", message.content())?;
                        }
                    }
                    Err(SendRejected::EmptyDraft | SendRejected::InFlight) => {}
                }
            }
        }
        output.flush()?;
    }

    Ok(widget)
}
