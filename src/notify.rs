// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};

/// A sink for short operator notifications.
pub trait Notifier {
    fn notify(&self, message: &str) -> Result<()>;
}

/// Sends messages through a Telegram bot.
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::blocking::Client, token: String, chat_id: String) -> Self {
        Self {
            client,
            token,
            chat_id,
        }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let resp = self
            .client
            .post(url)
            .form(&[
                ("chat_id", self.chat_id.as_str()),
                ("text", message),
                ("parse_mode", "HTML"),
            ])
            .send()
            .map_err(|e| Error::Notify(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::Notify(format!("telegram answered {}: {}", status, body)));
        }
        Ok(())
    }
}

/// Writes notifications to the log. Used when no channel is configured.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) -> Result<()> {
        tracing::info!(target: "spendlog::notify", "{}", message.replace('\n', " | "));
        Ok(())
    }
}
