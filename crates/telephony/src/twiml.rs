//! Minimal TwiML documents for the speech loop: `<Say>` and `<Gather input="speech">`.

use std::fmt::Write as _;

use shared::text::escape_markup as escape;

pub const TWIML_CONTENT_TYPE: &str = "text/xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    pub action: String,
    pub method: &'static str,
    pub timeout_secs: u32,
    pub prompt: String,
}

impl Gather {
    pub fn speech(action: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            method: "POST",
            timeout_secs: 4,
            prompt: prompt.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Say(String),
    Gather(Gather),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    pub fn gather(mut self, gather: Gather) -> Self {
        self.verbs.push(Verb::Gather(gather));
        self
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    let _ = write!(out, "<Say>{}</Say>", escape(text));
                }
                Verb::Gather(g) => {
                    let _ = write!(
                        out,
                        r#"<Gather action="{}" input="speech" method="{}" timeout="{}"><Say>{}</Say></Gather>"#,
                        escape(&g.action),
                        g.method,
                        g.timeout_secs,
                        escape(&g.prompt)
                    );
                }
            }
        }
        out.push_str("</Response>");
        out
    }
}

#[cfg(test)]
#[path = "tests/twiml_tests.rs"]
mod tests;
