// Output side of the CLI. Everything the commands print goes through a
// `Renderer` so the same flows can write to the terminal or to a buffer.

use crate::api::Envelope;
use crate::codes::{self, ErrorCode};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use qrcode::render::unicode::Dense1x2;
use qrcode::QrCode;
use serde::Serialize;
use std::fmt::Display;
use std::io::{self, IsTerminal, Stdout, Write};
use std::time::Duration;

pub struct Renderer<W: Write> {
    out: W,
    styled: bool,
    raw: bool,
}

impl Renderer<Stdout> {
    /// Renderer on stdout, styled when stdout is a terminal.
    pub fn stdout() -> Self {
        let out = io::stdout();
        let styled = out.is_terminal();
        Renderer {
            out,
            styled,
            raw: false,
        }
    }
}

impl<W: Write> Renderer<W> {
    /// Plain renderer with no colours and no spinners.
    pub fn new(out: W) -> Self {
        Renderer {
            out,
            styled: false,
            raw: false,
        }
    }

    /// Also dump every envelope as JSON.
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    pub fn success(&mut self, text: impl Display) -> io::Result<()> {
        if self.styled {
            writeln!(self.out, "{}", text.to_string().green())
        } else {
            self.line(text)
        }
    }

    pub fn warn(&mut self, text: impl Display) -> io::Result<()> {
        if self.styled {
            writeln!(self.out, "{}", text.to_string().yellow())
        } else {
            self.line(text)
        }
    }

    /// `- Key: value` lines.
    pub fn fields(&mut self, rows: &[(&str, String)]) -> io::Result<()> {
        for (key, value) in rows {
            if self.styled {
                writeln!(self.out, "- {}: {value}", key.bold())?;
            } else {
                writeln!(self.out, "- {key}: {value}")?;
            }
        }
        Ok(())
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        writeln!(self.out, "{text}")
    }

    /// Dumps the envelope when raw output was requested.
    pub fn envelope(&mut self, envelope: &Envelope) -> io::Result<()> {
        if self.raw {
            self.json(envelope)?;
        }
        Ok(())
    }

    /// Explains a non-success envelope. Server-side and unknown codes also
    /// get the raw response.
    pub fn failure(&mut self, envelope: &Envelope) -> io::Result<()> {
        let dump = match ErrorCode::from_code(envelope.code) {
            Some(ErrorCode::Success) => return Ok(()),
            Some(code) => {
                self.warn(code.message())?;
                code.dumps_raw()
            }
            None => {
                self.warn(codes::describe(envelope.code))?;
                if !self.raw {
                    self.line("Here is the raw response:")?;
                }
                true
            }
        };
        if dump && !self.raw {
            self.json(envelope)?;
        }
        Ok(())
    }

    pub fn table(&mut self, title: &str, header: &[&str], rows: Vec<Vec<String>>) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header.to_vec());
        for row in rows {
            table.add_row(row);
        }
        if self.styled {
            writeln!(self.out, "{}", title.bold())?;
        } else {
            writeln!(self.out, "{title}")?;
        }
        writeln!(self.out, "{table}")
    }

    /// Prints `data` as a QR code made of half-block characters. Returns
    /// false when the data cannot be encoded; nothing is printed then.
    pub fn qr_code(&mut self, data: &str) -> io::Result<bool> {
        let code = match QrCode::new(data.as_bytes()) {
            Ok(code) => code,
            Err(err) => {
                log::warn!("cannot encode QR code: {err}");
                return Ok(false);
            }
        };
        let image = code
            .render::<Dense1x2>()
            .dark_color(Dense1x2::Light)
            .light_color(Dense1x2::Dark)
            .build();
        writeln!(self.out, "{image}")?;
        Ok(true)
    }

    /// Spinner for slow steps. Hidden unless the output is a terminal.
    pub fn spinner(&self, msg: &str) -> ProgressBar {
        if !self.styled {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(msg.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(code: i64) -> Envelope {
        Envelope {
            code,
            message: "raw message".into(),
            data: None,
        }
    }

    fn render(f: impl FnOnce(&mut Renderer<Vec<u8>>) -> io::Result<()>) -> String {
        let mut r = Renderer::new(Vec::new());
        f(&mut r).unwrap();
        String::from_utf8(r.into_inner()).unwrap()
    }

    #[test]
    fn mapped_code_prints_its_message_only() {
        let out = render(|r| r.failure(&envelope(103016)));
        assert_eq!(out.trim(), ErrorCode::InstanceNotFound.message());
    }

    #[test]
    fn server_error_dumps_raw_json() {
        let out = render(|r| r.failure(&envelope(500)));
        assert!(out.starts_with(ErrorCode::ServerError.message()));
        assert!(out.contains("\"message\": \"raw message\""));
    }

    #[test]
    fn unknown_code_falls_back() {
        let out = render(|r| r.failure(&envelope(987654)));
        assert!(out.to_lowercase().contains("unknown error"));
        assert!(out.contains("987654"));
        assert!(out.contains("\"code\": 987654"));
    }

    #[test]
    fn unknown_code_in_raw_mode_is_dumped_once() {
        let mut r = Renderer::new(Vec::new()).with_raw(true);
        let env = envelope(987654);
        r.envelope(&env).unwrap();
        r.failure(&env).unwrap();
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert!(!out.contains("Here is the raw response:"));
        assert_eq!(out.matches("\"code\": 987654").count(), 1);
        assert!(out.contains("987654`."));
    }

    #[test]
    fn qr_code_uses_block_characters() {
        let mut printed = false;
        let out = render(|r| {
            printed = r.qr_code("otpauth://totp/Funix:alice?secret=JBSWY3DP")?;
            Ok(())
        });
        assert!(printed);
        assert!(out.contains(['\u{2580}', '\u{2584}', '\u{2588}']));
        assert!(out.lines().count() > 10);
    }

    #[test]
    fn success_prints_nothing() {
        assert_eq!(render(|r| r.failure(&envelope(0))), "");
    }

    #[test]
    fn raw_mode_dumps_envelopes() {
        let mut r = Renderer::new(Vec::new()).with_raw(true);
        r.envelope(&Envelope {
            code: 0,
            message: String::new(),
            data: Some(json!({"token": "T"})),
        })
        .unwrap();
        let out = String::from_utf8(r.into_inner()).unwrap();
        assert!(out.contains("\"token\": \"T\""));
    }

    #[test]
    fn fields_and_table() {
        let out = render(|r| {
            r.fields(&[("Name", "demo".into()), ("ID", "7".into())])?;
            r.table(
                "Instances",
                &["ID", "Name"],
                vec![vec!["7".into(), "demo".into()]],
            )
        });
        assert!(out.contains("- Name: demo\n- ID: 7\n"));
        assert!(out.contains("Instances"));
        assert!(out.contains("demo"));
    }
}
