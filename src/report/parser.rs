//! Streaming parser for Gallio XML reports.
//!
//! The schema belongs to Gallio, so the parser only looks for the handful of
//! elements it needs and skips everything else:
//!
//! ```text
//! <report>
//!   <testPackageRun>
//!     <testStepRun>
//!       <testStep name=".." fullName=".." isTestCase="true">
//!         <codeReference assembly=".." type=".." member=".."/>
//!       </testStep>
//!       <children> <testStepRun>..</testStepRun> </children>
//!       <testLog><streams><stream name="Failures">..text..</stream></streams></testLog>
//!       <result duration="0.012"><outcome status="failed" category="error"/></result>
//!     </testStepRun>
//! ```
//!
//! Namespaces are ignored: elements are matched on their local name.
use super::{Status, TestCaseResult, TestReport};
use crate::errors::SensorError;
use quick_xml::{events::BytesStart, events::Event, Reader};
use std::time::Duration;

/// Bytes of context kept on each side of a parse fault.
const FRAGMENT_RADIUS: usize = 40;

/// A report that could not be read to the end.
#[derive(Debug)]
pub struct ParseFailure {
    /// Always [SensorError::ReportParse].
    pub error: SensorError,
    /// Test cases completed before the fault, in report order.
    pub recovered: TestReport,
}

/// Per-`testStepRun` accumulator.
#[derive(Default)]
struct StepFrame {
    /// Element depth of the `testStepRun` start tag.
    depth: usize,
    is_test_case: bool,
    name: Option<String>,
    full_name: Option<String>,
    fixture: Option<String>,
    assembly: Option<String>,
    status: Option<String>,
    category: Option<String>,
    duration: Duration,
    failure: Option<String>,
    /// Depth of the open `Failures` stream, if inside one.
    failure_depth: Option<usize>,
}

impl StepFrame {
    fn into_case(self) -> Option<TestCaseResult> {
        if !self.is_test_case {
            return None;
        }
        let status = match &self.status {
            Some(status) => Status::from_outcome(status, self.category.as_deref()),
            None => Status::Unrecognized(String::new()),
        };
        Some(TestCaseResult {
            name: self
                .full_name
                .or(self.name)
                .unwrap_or_else(|| "<unnamed>".to_string()),
            fixture: self.fixture,
            assembly: self.assembly,
            status,
            duration: self.duration,
            message: self.failure,
        })
    }
}

struct ReportBuilder {
    /// Local names of the open elements.
    path: Vec<Vec<u8>>,
    frames: Vec<StepFrame>,
    cases: Vec<TestCaseResult>,
    seen_root: bool,
}

impl ReportBuilder {
    fn new() -> Self {
        Self {
            path: Vec::new(),
            frames: Vec::new(),
            cases: Vec::new(),
            seen_root: false,
        }
    }

    fn parent(&self) -> Option<&[u8]> {
        self.path.last().map(Vec::as_slice)
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<(), String> {
        let local = e.local_name();
        let name = local.as_ref();
        let depth = self.path.len();

        if !self.seen_root {
            if name != b"report" {
                return Err(format!(
                    "not a Gallio report: root element is <{}>",
                    String::from_utf8_lossy(name)
                ));
            }
            self.seen_root = true;
        }

        match name {
            b"testStepRun" => self.frames.push(StepFrame {
                depth,
                ..StepFrame::default()
            }),
            b"testStep" if self.parent() == Some(b"testStepRun") => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.name = attr(e, b"name");
                    frame.full_name = attr(e, b"fullName");
                    frame.is_test_case = attr(e, b"isTestCase")
                        .map(|v| v.eq_ignore_ascii_case("true"))
                        .unwrap_or(false);
                }
            }
            b"codeReference" if self.parent() == Some(b"testStep") => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.assembly = attr(e, b"assembly");
                    frame.fixture = attr(e, b"type");
                }
            }
            b"result" if self.parent() == Some(b"testStepRun") => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.duration = attr(e, b"duration")
                        .and_then(|d| d.trim().parse::<f64>().ok())
                        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                        .unwrap_or_default();
                }
            }
            b"outcome" if self.parent() == Some(b"result") => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.status = attr(e, b"status");
                    frame.category = attr(e, b"category");
                }
            }
            b"stream" if self.parent() == Some(b"streams") => {
                if let Some(frame) = self.frames.last_mut() {
                    if attr(e, b"name").as_deref() == Some("Failures") {
                        frame.failure_depth = Some(depth);
                    }
                }
            }
            _ => (),
        }
        self.path.push(name.to_vec());
        Ok(())
    }

    fn end(&mut self) {
        let name = match self.path.pop() {
            Some(name) => name,
            None => return,
        };
        let depth = self.path.len();
        if let Some(frame) = self.frames.last_mut() {
            if frame.failure_depth == Some(depth) {
                frame.failure_depth = None;
            }
        }
        if name == b"testStepRun"
            && self.frames.last().map(|f| f.depth) == Some(depth)
        {
            if let Some(case) = self.frames.pop().and_then(StepFrame::into_case) {
                self.cases.push(case);
            }
        }
    }

    fn text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if let Some(frame) = self.frames.last_mut() {
            if frame.failure_depth.is_some() {
                match &mut frame.failure {
                    Some(msg) => {
                        msg.push('\n');
                        msg.push_str(text);
                    }
                    None => frame.failure = Some(text.to_string()),
                }
            }
        }
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn fragment(bytes: &[u8], position: usize) -> String {
    let position = position.min(bytes.len());
    let start = position.saturating_sub(FRAGMENT_RADIUS);
    let end = (position + FRAGMENT_RADIUS).min(bytes.len());
    String::from_utf8_lossy(&bytes[start..end])
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// Parse the bytes of a Gallio report. Pure: the same bytes always give the
/// same report.
pub fn parse(bytes: &[u8]) -> Result<TestReport, ParseFailure> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);
    let mut builder = ReportBuilder::new();
    let mut buf = Vec::new();

    let fault = loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(err) => break Some(err.to_string()),
        };
        let step = match event {
            Event::Start(e) => builder.start(&e),
            Event::Empty(e) => builder.start(&e).map(|()| builder.end()),
            Event::End(_) => {
                builder.end();
                Ok(())
            }
            Event::Text(t) => match t.unescape() {
                Ok(text) => {
                    builder.text(&text);
                    Ok(())
                }
                Err(err) => Err(err.to_string()),
            },
            Event::CData(c) => {
                builder.text(&String::from_utf8_lossy(&c));
                Ok(())
            }
            Event::Eof => {
                if let Some(open) = builder.path.last() {
                    break Some(format!(
                        "unexpected end of document inside <{}>",
                        String::from_utf8_lossy(open)
                    ));
                }
                if !builder.seen_root {
                    break Some("document has no <report> element".to_string());
                }
                break None;
            }
            _ => Ok(()),
        };
        if let Err(message) = step {
            break Some(message);
        }
        buf.clear();
    };

    let report = TestReport::new(builder.cases);
    match fault {
        None => Ok(report),
        Some(message) => {
            let position = reader.buffer_position();
            Err(ParseFailure {
                error: SensorError::ReportParse {
                    position,
                    message,
                    fragment: fragment(bytes, position),
                },
                recovered: report,
            })
        }
    }
}
