//! Caption parsing - WebVTT and SRT
//!
//! Cue text loaded through these parsers feeds the
//! [`CaptionsPlugin`](crate::plugins::CaptionsPlugin), which reports the cues
//! active at the current position.
//!
//! # Example
//!
//! ```rust
//! use dal_core::captions::WebVttParser;
//!
//! let vtt = r#"WEBVTT
//!
//! 00:00:00.000 --> 00:00:04.000
//! Hello, world!
//!
//! 00:00:04.000 --> 00:00:08.000
//! This is a subtitle.
//! "#;
//!
//! let cues = WebVttParser::parse(vtt).unwrap();
//! assert_eq!(cues.len(), 2);
//! ```

use crate::error::{Error, Result};
use crate::types::{CueAlignment, CueSettings, TextCue};
use std::iter::Peekable;
use std::str::Lines;

/// Caption file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionFormat {
    WebVtt,
    Srt,
}

impl CaptionFormat {
    /// Detect the format from file content
    pub fn detect(input: &str) -> Self {
        if input.trim_start_matches('\u{feff}').starts_with("WEBVTT") {
            CaptionFormat::WebVtt
        } else {
            CaptionFormat::Srt
        }
    }
}

/// Parse caption text in whichever format it is written in
pub fn parse(input: &str) -> Result<Vec<TextCue>> {
    match CaptionFormat::detect(input) {
        CaptionFormat::WebVtt => WebVttParser::parse(input),
        CaptionFormat::Srt => SrtParser::parse(input),
    }
}

/// WebVTT parser
pub struct WebVttParser;

impl WebVttParser {
    /// Parse a WebVTT string into a list of cues
    pub fn parse(input: &str) -> Result<Vec<TextCue>> {
        let input = input.trim_start_matches('\u{feff}');
        let mut lines = input.lines().peekable();

        let header = lines.next().unwrap_or("");
        if !header.starts_with("WEBVTT") {
            return Err(Error::CaptionParse("missing WEBVTT header".to_string()));
        }

        // Header metadata runs until the first blank line
        skip_block(&mut lines);

        let mut cues = Vec::new();
        loop {
            skip_blank(&mut lines);
            let Some(first_line) = lines.next() else {
                break;
            };

            if ["NOTE", "STYLE", "REGION"]
                .iter()
                .any(|keyword| first_line.starts_with(keyword))
            {
                skip_block(&mut lines);
                continue;
            }

            let (id, timing_line) = if first_line.contains("-->") {
                (None, first_line)
            } else {
                (Some(first_line.to_string()), lines.next().unwrap_or(""))
            };

            if !timing_line.contains("-->") {
                // Not a cue, drop the rest of the block
                skip_block(&mut lines);
                continue;
            }

            let (start_time, end_time, settings) = Self::parse_timing_line(timing_line)?;
            let text = collect_text(&mut lines);

            cues.push(TextCue {
                id: id.unwrap_or_else(|| format!("cue-{}", cues.len() + 1)),
                start_time,
                end_time,
                text,
                settings,
            });
        }

        Ok(cues)
    }

    /// Parse a timing line: "00:00:00.000 --> 00:00:04.000 align:center"
    fn parse_timing_line(line: &str) -> Result<(f64, f64, Option<CueSettings>)> {
        let (start, rest) = line
            .split_once("-->")
            .ok_or_else(|| Error::CaptionParse(format!("invalid timing line: {}", line)))?;

        let mut rest = rest.split_whitespace();
        let end = rest
            .next()
            .ok_or_else(|| Error::CaptionParse(format!("missing end time: {}", line)))?;

        let start = parse_timestamp(start.trim())?;
        let end = parse_timestamp(end)?;

        let settings: Vec<&str> = rest.collect();
        let settings = (!settings.is_empty()).then(|| Self::parse_settings(&settings));

        Ok((start, end, settings))
    }

    /// Parse cue settings such as `align:center position:50%`
    fn parse_settings(parts: &[&str]) -> CueSettings {
        let mut settings = CueSettings::default();

        for (key, value) in parts.iter().filter_map(|part| part.split_once(':')) {
            match key {
                "vertical" => settings.vertical = Some(value.to_string()),
                "line" => settings.line = value.trim_end_matches('%').parse().ok(),
                "position" => settings.position = value.trim_end_matches('%').parse().ok(),
                "size" => settings.size = value.trim_end_matches('%').parse().ok(),
                "align" => {
                    settings.align = match value {
                        "start" => Some(CueAlignment::Start),
                        "center" | "middle" => Some(CueAlignment::Center),
                        "end" => Some(CueAlignment::End),
                        "left" => Some(CueAlignment::Left),
                        "right" => Some(CueAlignment::Right),
                        _ => None,
                    };
                }
                _ => {}
            }
        }

        settings
    }

    /// Strip VTT markup tags from text
    pub fn strip_tags(text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut in_tag = false;

        for ch in text.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => in_tag = false,
                _ if !in_tag => result.push(ch),
                _ => {}
            }
        }

        result
    }
}

/// SRT (SubRip) parser
pub struct SrtParser;

impl SrtParser {
    /// Parse an SRT string into a list of cues
    pub fn parse(input: &str) -> Result<Vec<TextCue>> {
        let input = input.trim_start_matches('\u{feff}');
        let mut lines = input.lines().peekable();
        let mut cues = Vec::new();

        loop {
            skip_blank(&mut lines);
            let Some(number) = lines.next().map(str::trim) else {
                break;
            };

            let Some(timing_line) = lines.next() else {
                break;
            };
            let Some((start, end)) = timing_line.split_once("-->") else {
                skip_block(&mut lines);
                continue;
            };

            let start_time = parse_timestamp(start.trim())?;
            let end_time = parse_timestamp(end.trim())?;
            let text = collect_text(&mut lines);

            cues.push(TextCue {
                id: format!("srt-{}", number),
                start_time,
                end_time,
                text,
                settings: None,
            });
        }

        Ok(cues)
    }

    /// Strip HTML tags from SRT text
    pub fn strip_tags(text: &str) -> String {
        WebVttParser::strip_tags(text)
    }
}

/// Parse "hh:mm:ss.mmm", "mm:ss.mmm" or the SRT "hh:mm:ss,mmm" form
fn parse_timestamp(ts: &str) -> Result<f64> {
    let invalid = || Error::CaptionParse(format!("invalid timestamp: {}", ts));

    let mut total = 0.0;
    let parts: Vec<&str> = ts.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(invalid());
    }

    let (seconds, units) = parts.split_last().ok_or_else(invalid)?;
    for unit in units {
        let value: f64 = unit.parse().map_err(|_| invalid())?;
        total = total * 60.0 + value;
    }

    let seconds: f64 = seconds.replace(',', ".").parse().map_err(|_| invalid())?;
    Ok(total * 60.0 + seconds)
}

fn skip_blank(lines: &mut Peekable<Lines<'_>>) {
    while lines.next_if(|line| line.trim().is_empty()).is_some() {}
}

fn skip_block(lines: &mut Peekable<Lines<'_>>) {
    while lines.next_if(|line| !line.trim().is_empty()).is_some() {}
}

fn collect_text(lines: &mut Peekable<Lines<'_>>) -> String {
    let mut text = Vec::new();
    while let Some(line) = lines.next_if(|line| !line.trim().is_empty()) {
        text.push(line);
    }
    text.join("\n")
}

/// Convert SRT to WebVTT format
pub fn srt_to_vtt(srt: &str) -> String {
    let mut vtt = String::from("WEBVTT\n\n");

    for line in srt.lines() {
        if line.contains("-->") {
            vtt.push_str(&line.replace(',', "."));
        } else {
            vtt.push_str(line);
        }
        vtt.push('\n');
    }

    vtt
}

/// Find cues active at a given time
pub fn cues_at_time(cues: &[TextCue], time: f64) -> Vec<&TextCue> {
    cues.iter().filter(|c| c.is_active_at(time)).collect()
}
