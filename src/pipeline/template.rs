//! Document rendering: fill the Word template with the consolidated devices.
//!
//! A `.docx` is a zip archive; only `word/document.xml` is rewritten, every
//! other entry is copied through. Three edits are made to the body:
//!
//! 1. the `shd` placeholder (any case) becomes the identifier phrase
//!    ("Dựa theo HĐ số: 123-A/2024")
//! 2. the date line ("Tp.HCM, ngày day tháng month năm year") gets the
//!    rendering date
//! 3. the first table keeps its header row; all other rows are replaced by
//!    one row per device
//!
//! The body is streamed through `quick_xml`. Placeholder and date edits touch
//! the text of `<w:t>` elements only, so attribute values and element names
//! such as `<w:shd>` are never rewritten.

use crate::error::HandoverError;
use crate::record::{ConsolidatedDevice, DocumentIdentity, FieldValue, IdentifierKind};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::{NoExpand, Regex};
use std::io::{Cursor, Read, Write};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_PART: &str = "word/document.xml";
const FONT_NAME: &str = "Times New Roman";
/// Half-points: 24 = 12 pt.
const FONT_SIZE_HALF_POINTS: u32 = 24;
/// Cells per generated row: ordinal, description, unit, quantity, serials.
const ROW_CELLS: usize = 5;
const CENTERED_COLUMNS: [usize; 3] = [0, 2, 3];
const SERIAL_PREFIX: &str = "Số seri: ";
const DATE_LINE_MARKER: &str = "Tp.HCM";

static RE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)shd").unwrap());

static RE_ACCESSORY_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(cấu hình bao gồm|bao gồm|chi tiết cấu hình):").unwrap());

/// Fill a `.docx` template and return the new document bytes.
pub fn render_docx(
    template: &[u8],
    identity: &DocumentIdentity,
    devices: &[ConsolidatedDevice],
    date: NaiveDate,
) -> Result<Vec<u8>, HandoverError> {
    let mut archive = ZipArchive::new(Cursor::new(template)).map_err(|e| {
        HandoverError::TemplateInvalid {
            detail: format!("not a .docx archive: {}", e),
        }
    })?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut body_found = false;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| HandoverError::TemplateInvalid {
                detail: format!("entry {}: {}", i, e),
            })?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|e| HandoverError::Internal(format!("zip write: {}", e)))?;
            continue;
        }

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| HandoverError::TemplateInvalid {
                detail: format!("{}: {}", name, e),
            })?;

        if name == DOCUMENT_PART {
            body_found = true;
            let xml = String::from_utf8(content).map_err(|e| HandoverError::TemplateInvalid {
                detail: format!("{} is not UTF-8: {}", DOCUMENT_PART, e),
            })?;
            content = fill_document_xml(&xml, identity, devices, date)?.into_bytes();
        }

        writer
            .start_file(name, options)
            .map_err(|e| HandoverError::Internal(format!("zip write: {}", e)))?;
        writer
            .write_all(&content)
            .map_err(|e| HandoverError::Internal(format!("zip write: {}", e)))?;
    }

    if !body_found {
        return Err(HandoverError::TemplateInvalid {
            detail: format!("archive has no {}", DOCUMENT_PART),
        });
    }

    let cursor = writer
        .finish()
        .map_err(|e| HandoverError::Internal(format!("zip finish: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Apply the placeholder, date and table edits to `word/document.xml`.
///
/// One reader→writer pass over the body. Paragraphs are buffered until their
/// end tag so the date line is recognised from its own text, including when
/// it wraps nested paragraphs such as a text box.
pub fn fill_document_xml(
    xml: &str,
    identity: &DocumentIdentity,
    devices: &[ConsolidatedDevice],
    date: NaiveDate,
) -> Result<String, HandoverError> {
    let phrase = identifier_phrase(identity);
    let date = DateParts::new(date);
    let mut reader = Reader::from_str(xml);
    let mut sink = Sink::new();
    let mut table = TableEdit::default();
    let mut text_depth = 0usize;
    let mut replaced = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| HandoverError::TemplateInvalid {
            detail: format!("{} at byte {}: {}", DOCUMENT_PART, reader.buffer_position(), e),
        })?;
        if matches!(event, Event::Eof) {
            break;
        }

        match table.route(&event)? {
            Route::Drop => continue,
            Route::Keep => {}
            Route::RowsThenKeep => {
                let widths = table.widths();
                for (i, device) in devices.iter().enumerate() {
                    write_row(&mut sink, &device_cells(i + 1, device), table.columns, widths)?;
                }
            }
        }

        match event {
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                sink.open_paragraph(Event::Start(e.into_owned()));
            }
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                sink.close_paragraph(Event::End(e.into_owned()), &date)?;
            }
            Event::Start(e) if e.name().as_ref() == b"w:t" => {
                text_depth += 1;
                sink.emit(Event::Start(e.into_owned()))?;
            }
            Event::End(e) if e.name().as_ref() == b"w:t" => {
                text_depth = text_depth.saturating_sub(1);
                sink.emit(Event::End(e.into_owned()))?;
            }
            Event::Text(t) if text_depth > 0 => {
                let text = t.unescape().map_err(|e| HandoverError::TemplateInvalid {
                    detail: format!("{}: {}", DOCUMENT_PART, e),
                })?;
                let hits = RE_PLACEHOLDER.find_iter(&text).count();
                let text = if hits == 0 {
                    text.into_owned()
                } else {
                    replaced += hits;
                    RE_PLACEHOLDER.replace_all(&text, NoExpand(&phrase)).into_owned()
                };
                sink.emit_text(text)?;
            }
            other => sink.emit(other.into_owned())?,
        }
    }

    table.finish()?;
    if replaced == 0 {
        warn!("Template has no 'shd' placeholder; the identifier is not written");
    }
    sink.into_string()
}

/// Phrase that replaces the `shd` placeholder; empty when there is no identifier.
pub fn identifier_phrase(identity: &DocumentIdentity) -> String {
    let value = identity.identifier.trim();
    if value.is_empty() {
        return String::new();
    }
    match identity.kind {
        IdentifierKind::Contract => format!("Dựa theo HĐ số: {}", value),
        IdentifierKind::PurchaseOrder | IdentifierKind::Request => {
            format!("Dựa theo PO: {}", value)
        }
        IdentifierKind::Other => format!("Dựa theo số: {}", value),
    }
}

/// Multi-line description cell of a device row.
pub fn describe_device(device: &ConsolidatedDevice) -> String {
    format!(
        "{}\n- Model: {}\n- Hãng: {}\n- NSX: {}{}",
        device.name,
        device.model,
        device.brand,
        device.origin,
        format_accessories(&device.accessories)
    )
}

/// `"\n- Phụ kiện:\n  + A\n  + B"`, or empty when there are no accessories.
///
/// Lead-ins such as "Cấu hình bao gồm:" are dropped, en-dashes are treated as
/// hyphens and leading bullets are stripped from each line.
pub fn format_accessories(accessories: &FieldValue) -> String {
    let text = accessories.items().join("\n");
    let text = RE_ACCESSORY_HEADING.replace_all(&text, "").replace('–', "-");

    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches('-')
                .trim_start_matches('•')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .map(|line| format!("  + {}", line))
        .collect();

    if lines.is_empty() {
        String::new()
    } else {
        format!("\n- Phụ kiện:\n{}", lines.join("\n"))
    }
}

/// The five cell texts of the `ordinal`-th device row.
pub fn device_cells(ordinal: usize, device: &ConsolidatedDevice) -> [String; ROW_CELLS] {
    let serials = device.serial_text();
    [
        ordinal.to_string(),
        describe_device(device),
        device.unit.clone(),
        device.whole_quantity().to_string(),
        if serials.is_empty() {
            String::new()
        } else {
            format!("{}{}", SERIAL_PREFIX, serials)
        },
    ]
}

struct DateParts {
    day: String,
    month: String,
    year: String,
}

impl DateParts {
    fn new(date: NaiveDate) -> Self {
        Self {
            day: date.day().to_string(),
            month: date.month().to_string(),
            year: date.year().to_string(),
        }
    }

    fn is_date_line(text: &str) -> bool {
        text.contains(DATE_LINE_MARKER) && ["day", "month", "year"].iter().any(|t| text.contains(t))
    }

    fn fill(&self, text: &str) -> String {
        text.replace("day", &self.day)
            .replace("month", &self.month)
            .replace("year", &self.year)
    }
}

/// Buffered content of an open paragraph. `Text` holds the paragraph's own
/// `<w:t>` content, unescaped; text of nested paragraphs is already an event.
enum Piece {
    Event(Event<'static>),
    Text(String),
}

/// Output side of the pass: events go to the innermost open paragraph, or to
/// the writer when no paragraph is open.
struct Sink {
    writer: Writer<Vec<u8>>,
    paragraphs: Vec<Vec<Piece>>,
}

impl Sink {
    fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            paragraphs: Vec::new(),
        }
    }

    fn emit(&mut self, event: Event<'static>) -> Result<(), HandoverError> {
        match self.paragraphs.last_mut() {
            Some(pieces) => {
                pieces.push(Piece::Event(event));
                Ok(())
            }
            None => self
                .writer
                .write_event(event)
                .map_err(|e| HandoverError::Internal(format!("xml write: {}", e))),
        }
    }

    fn emit_text(&mut self, text: String) -> Result<(), HandoverError> {
        match self.paragraphs.last_mut() {
            Some(pieces) => {
                pieces.push(Piece::Text(text));
                Ok(())
            }
            None => self.emit(text_event(&text)),
        }
    }

    fn open_paragraph(&mut self, start: Event<'static>) {
        self.paragraphs.push(vec![Piece::Event(start)]);
    }

    fn close_paragraph(&mut self, end: Event<'static>, date: &DateParts) -> Result<(), HandoverError> {
        let mut pieces = self.paragraphs.pop().unwrap_or_default();
        pieces.push(Piece::Event(end));

        let text: String = pieces
            .iter()
            .filter_map(|p| match p {
                Piece::Text(t) => Some(t.as_str()),
                Piece::Event(_) => None,
            })
            .collect();
        let is_date_line = DateParts::is_date_line(&text);
        if is_date_line {
            debug!("Filling date line: {}", text);
        }

        for piece in pieces {
            let event = match piece {
                Piece::Event(event) => event,
                Piece::Text(t) if is_date_line => text_event(&date.fill(&t)),
                Piece::Text(t) => text_event(&t),
            };
            self.emit(event)?;
        }
        Ok(())
    }

    fn into_string(self) -> Result<String, HandoverError> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| HandoverError::Internal(format!("xml write: {}", e)))
    }
}

fn text_event(text: &str) -> Event<'static> {
    Event::Text(BytesText::from_escaped(escape(text)).into_owned())
}

enum Route {
    Keep,
    Drop,
    /// The first table is closing: device rows go in before its end tag.
    RowsThenKeep,
}

#[derive(Default)]
enum TableStage {
    #[default]
    Before,
    Open,
    Done,
}

/// Tracks the first table: keeps its header row, drops the rows after it.
#[derive(Default)]
struct TableEdit {
    stage: TableStage,
    /// Tables nested inside the first table's cells.
    nested: usize,
    /// Element depth inside a dropped row.
    skip: usize,
    in_header: bool,
    header_done: bool,
    columns: usize,
    grid: Vec<String>,
}

impl TableEdit {
    fn route(&mut self, event: &Event<'_>) -> Result<Route, HandoverError> {
        match self.stage {
            TableStage::Before => {
                if matches!(event, Event::Start(e) if e.name().as_ref() == b"w:tbl") {
                    self.stage = TableStage::Open;
                }
                return Ok(Route::Keep);
            }
            TableStage::Done => return Ok(Route::Keep),
            TableStage::Open => {}
        }

        if self.skip > 0 {
            match event {
                Event::Start(_) => self.skip += 1,
                Event::End(_) => self.skip -= 1,
                _ => {}
            }
            return Ok(Route::Drop);
        }

        let top = self.nested == 0;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => self.nested += 1,
                b"w:tr" if top && self.header_done => {
                    self.skip = 1;
                    return Ok(Route::Drop);
                }
                b"w:tr" if top => self.in_header = true,
                b"w:tc" if top && self.in_header => self.columns += 1,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tr" if top && self.header_done => return Ok(Route::Drop),
                b"w:gridCol" if top && !self.in_header && !self.header_done => {
                    if let Ok(Some(w)) = e.try_get_attribute("w:w") {
                        self.grid.push(String::from_utf8_lossy(&w.value).into_owned());
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:tbl" if !top => self.nested -= 1,
                b"w:tbl" => {
                    if !self.header_done {
                        return Err(HandoverError::TemplateInvalid {
                            detail: "first table has no header row".into(),
                        });
                    }
                    self.stage = TableStage::Done;
                    return Ok(Route::RowsThenKeep);
                }
                b"w:tr" if top && self.in_header => {
                    self.in_header = false;
                    self.header_done = true;
                    if self.columns < ROW_CELLS {
                        warn!(
                            "Template table has {} columns, {} expected; rows are truncated",
                            self.columns, ROW_CELLS
                        );
                    }
                }
                _ => {}
            },
            _ => {}
        }
        Ok(Route::Keep)
    }

    /// Grid widths, used only when there is one per header cell.
    fn widths(&self) -> Option<&[String]> {
        (self.grid.len() == self.columns).then_some(self.grid.as_slice())
    }

    fn finish(&self) -> Result<(), HandoverError> {
        let detail = match self.stage {
            TableStage::Done => return Ok(()),
            TableStage::Before => "template has no table",
            TableStage::Open => "first table is not closed",
        };
        Err(HandoverError::TemplateInvalid {
            detail: detail.into(),
        })
    }
}

fn write_row(
    sink: &mut Sink,
    cells: &[String; ROW_CELLS],
    columns: usize,
    widths: Option<&[String]>,
) -> Result<(), HandoverError> {
    sink.emit(start("w:tr"))?;
    for col in 0..columns {
        sink.emit(start("w:tc"))?;
        if let Some(w) = widths.and_then(|w| w.get(col)) {
            sink.emit(start("w:tcPr"))?;
            sink.emit(Event::Empty(
                BytesStart::new("w:tcW").with_attributes([("w:w", w.as_str()), ("w:type", "dxa")]),
            ))?;
            sink.emit(end("w:tcPr"))?;
        }
        match cells.get(col) {
            Some(text) => write_paragraph(sink, text, CENTERED_COLUMNS.contains(&col))?,
            None => sink.emit(Event::Empty(BytesStart::new("w:p")))?,
        }
        sink.emit(end("w:tc"))?;
    }
    sink.emit(end("w:tr"))
}

fn write_paragraph(sink: &mut Sink, text: &str, centered: bool) -> Result<(), HandoverError> {
    let align = if centered { "center" } else { "left" };
    let size = FONT_SIZE_HALF_POINTS.to_string();

    sink.emit(start("w:p"))?;
    sink.emit(start("w:pPr"))?;
    sink.emit(Event::Empty(
        BytesStart::new("w:jc").with_attributes([("w:val", align)]),
    ))?;
    sink.emit(end("w:pPr"))?;
    sink.emit(start("w:r"))?;
    sink.emit(start("w:rPr"))?;
    sink.emit(Event::Empty(BytesStart::new("w:rFonts").with_attributes([
        ("w:ascii", FONT_NAME),
        ("w:hAnsi", FONT_NAME),
        ("w:cs", FONT_NAME),
    ])))?;
    for tag in ["w:sz", "w:szCs"] {
        sink.emit(Event::Empty(
            BytesStart::new(tag).with_attributes([("w:val", size.as_str())]),
        ))?;
    }
    sink.emit(end("w:rPr"))?;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            sink.emit(Event::Empty(BytesStart::new("w:br")))?;
        }
        sink.emit(Event::Start(
            BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
        ))?;
        sink.emit(text_event(line))?;
        sink.emit(end("w:t"))?;
    }
    sink.emit(end("w:r"))?;
    sink.emit(end("w:p"))
}

fn start(tag: &'static str) -> Event<'static> {
    Event::Start(BytesStart::new(tag))
}

fn end(tag: &'static str) -> Event<'static> {
    Event::End(BytesEnd::new(tag))
}
