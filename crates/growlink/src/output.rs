use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use growlink_frame::{descriptor_name, DecodedRequest, IncomingEvent};
use growlink_server::Action;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One classified event, with whatever was decoded and sent for it.
#[derive(Debug, Default, Serialize)]
pub struct EventRow {
    pub index: usize,
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_budget: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_failed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound: Option<String>,
}

impl EventRow {
    pub fn new(index: usize, event: &IncomingEvent) -> Self {
        let mut row = Self {
            index,
            event: event.kind(),
            channel: event.channel(),
            ..Self::default()
        };
        match event {
            IncomingEvent::DataReceived { payload_budget, .. } => {
                row.payload_budget = Some(*payload_budget);
            }
            IncomingEvent::SerialConsoleLine(text) => row.text = Some(text.clone()),
            _ => {}
        }
        row
    }

    pub fn with_request(mut self, request: Option<&DecodedRequest>) -> Self {
        if let Some(request) = request {
            self.method = Some(request.method.as_str());
            self.path = Some(request.path.clone());
            if !request.body.is_empty() {
                self.body = Some(request.body.clone());
            }
        }
        self
    }

    pub fn with_action(mut self, action: Action, response_failed: bool) -> Self {
        self.action = Some(action_name(action));
        self.response_failed = Some(response_failed);
        self
    }

    pub fn with_outbound(mut self, bytes: &[u8], include_bytes: bool) -> Self {
        self.outbound_len = Some(bytes.len());
        if include_bytes {
            self.outbound = Some(bytes.escape_ascii().to_string());
        }
        self
    }

    fn request_cell(&self) -> String {
        match (&self.method, &self.path, &self.text) {
            (Some(method), Some(path), _) => match &self.body {
                Some(body) => format!("{method} {path} [{body}]"),
                None => format!("{method} {path}"),
            },
            (_, _, Some(text)) => format!("{text:?}"),
            _ => String::new(),
        }
    }

    fn channel_cell(&self) -> String {
        self.channel
            .map(|channel| descriptor_name(channel).to_string())
            .unwrap_or_default()
    }
}

pub fn action_name(action: Action) -> String {
    match action {
        Action::None => "none".to_string(),
        Action::Page(resource) => format!("page {resource}"),
        Action::Redirect => "redirect".to_string(),
        Action::NotFound => "not-found".to_string(),
    }
}

/// Print one row as it happens (JSON lines, one-row table, or one line).
pub fn print_row(row: &EventRow, format: OutputFormat) {
    print_rows(std::slice::from_ref(row), format);
}

pub fn print_rows(rows: &[EventRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                println!(
                    "{}",
                    serde_json::to_string(row).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "EVENT", "CHANNEL", "BUDGET", "REQUEST", "ACTION", "OUT"]);
            for row in rows {
                table.add_row(vec![
                    row.index.to_string(),
                    row.event.to_string(),
                    row.channel_cell(),
                    row.payload_budget.map(|b| b.to_string()).unwrap_or_default(),
                    row.request_cell(),
                    row.action.clone().unwrap_or_default(),
                    row.outbound_len.map(|n| n.to_string()).unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                let mut line = format!("#{} {}", row.index, row.event);
                if row.channel.is_some() {
                    line.push_str(&format!(" channel={}", row.channel_cell()));
                }
                if let Some(budget) = row.payload_budget {
                    line.push_str(&format!(" budget={budget}"));
                }
                let request = row.request_cell();
                if !request.is_empty() {
                    line.push_str(&format!(" {request}"));
                }
                if let Some(action) = &row.action {
                    line.push_str(&format!(" -> {action}"));
                }
                if row.response_failed == Some(true) {
                    line.push_str(" (send failed)");
                }
                if let Some(len) = row.outbound_len {
                    line.push_str(&format!(" out={len}"));
                }
                println!("{line}");
                if let Some(outbound) = &row.outbound {
                    println!("  {outbound}");
                }
            }
        }
    }
}
