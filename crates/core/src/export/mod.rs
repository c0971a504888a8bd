//! Data handed to the document export collaborator.
//!
//! The core never renders pages itself. It supplies the notation, a
//! lyric/time/note table and the layout hints the exporter needs to paginate.

use std::{fmt, io::Write, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    pitch, EncodedScore, LyricEvent, LyricTimeline, Pitch, Result, TimedEvent, TranscriberError,
};

/// A4 sheet edges in millimetres.
const A4_SHORT_EDGE_MM: f64 = 210.0;
const A4_LONG_EDGE_MM: f64 = 297.0;

const FIRST_PAGE_TOP_MM: f64 = 40.0;
const CONTINUATION_TOP_MM: f64 = 20.0;
const ROW_HEIGHT_MM: f64 = 10.0;
const PAGE_BOTTOM_MM: f64 = 270.0;

pub const SOLFEGE_LINE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    Portrait,
    #[default]
    Landscape,
}

impl PageOrientation {
    pub fn paper_width_mm(self) -> f64 {
        match self {
            Self::Portrait => A4_SHORT_EDGE_MM,
            Self::Landscape => A4_LONG_EDGE_MM,
        }
    }
}

impl fmt::Display for PageOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portrait => f.write_str("portrait"),
            Self::Landscape => f.write_str("landscape"),
        }
    }
}

impl FromStr for PageOrientation {
    type Err = TranscriberError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            other => Err(TranscriberError::msg(format!("unknown page orientation `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub orientation: PageOrientation,
    /// Width of the rendered surface on the page.
    pub page_width_mm: f64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            orientation: PageOrientation::Landscape,
            page_width_mm: 277.0,
        }
    }
}

impl ExportSettings {
    pub fn new(orientation: PageOrientation, page_width_mm: f64) -> Result<Self> {
        let paper = orientation.paper_width_mm();
        if !(page_width_mm > 0.0 && page_width_mm <= paper) {
            return Err(TranscriberError::OutOfRange {
                name: "page width",
                value: page_width_mm,
                min: 0.0,
                max: paper,
            });
        }
        Ok(Self {
            orientation,
            page_width_mm,
        })
    }

    /// Left offset that centres the rendered surface on the sheet.
    pub fn margin_left_mm(&self) -> f64 {
        ((self.orientation.paper_width_mm() - self.page_width_mm) / 2.0).max(0.0)
    }
}

/// One line of the lyric table, e.g. `1.5s: "quiera" - C`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricRow {
    pub time: f64,
    pub text: String,
    pub note: String,
}

impl LyricRow {
    fn from_lyric(lyric: &LyricEvent) -> Self {
        Self {
            time: lyric.start_time,
            text: lyric.text.clone(),
            note: pitch::strip_octave(&lyric.pitch),
        }
    }
}

impl fmt::Display for LyricRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}s: \"{}\" - {}", self.time, self.text, self.note)
    }
}

/// Position of a lyric row on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedRow {
    pub row: usize,
    pub y_mm: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LyricPage {
    pub rows: Vec<PlacedRow>,
}

/// A group of lyrics with their solfège syllables underneath.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolfegeLine {
    pub words: Vec<String>,
    pub solfege: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    pub title: String,
    pub settings: ExportSettings,
    pub margin_left_mm: f64,
    pub notation: String,
    pub lyric_rows: Vec<LyricRow>,
    pub lyric_pages: Vec<LyricPage>,
    pub solfege_lines: Vec<SolfegeLine>,
    pub file_name: String,
}

impl ExportRequest {
    pub fn build(
        score: &EncodedScore,
        lyrics: Option<&LyricTimeline>,
        settings: ExportSettings,
    ) -> Self {
        let lyric_rows: Vec<LyricRow> = lyrics
            .map(|lyrics| lyrics.iter().map(LyricRow::from_lyric).collect())
            .unwrap_or_default();
        let lyric_pages = paginate(lyric_rows.len());
        let solfege_lines = lyrics
            .map(|lyrics| solfege_lines(lyrics.as_slice(), SOLFEGE_LINE_LEN))
            .unwrap_or_default();

        Self {
            title: score.metadata.title.clone(),
            settings,
            margin_left_mm: settings.margin_left_mm(),
            notation: score.to_abc(),
            lyric_rows,
            lyric_pages,
            solfege_lines,
            file_name: export_file_name(&score.metadata.title),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Receives finished export requests. Implementations own all rendering.
pub trait ExportSink {
    fn submit(&mut self, request: &ExportRequest) -> Result<()>;
}

/// Writes each request as pretty JSON to the wrapped writer.
#[derive(Debug)]
pub struct JsonExportSink<W> {
    writer: W,
}

impl<W: Write> JsonExportSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportSink for JsonExportSink<W> {
    fn submit(&mut self, request: &ExportRequest) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, request)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Lays out `row_count` table rows. The first page starts lower to leave room
/// for the heading; a row that moves past the bottom margin opens a new page
/// unless it was the last one.
pub fn paginate(row_count: usize) -> Vec<LyricPage> {
    if row_count == 0 {
        return Vec::new();
    }

    let mut pages = vec![LyricPage::default()];
    let mut y = FIRST_PAGE_TOP_MM;

    for row in 0..row_count {
        if let Some(page) = pages.last_mut() {
            page.rows.push(PlacedRow { row, y_mm: y });
        }
        y += ROW_HEIGHT_MM;
        if y > PAGE_BOTTOM_MM && row + 1 < row_count {
            pages.push(LyricPage::default());
            y = CONTINUATION_TOP_MM;
        }
    }

    pages
}

/// Groups lyrics into lines of `per_line` with fixed-do syllables.
pub fn solfege_lines(lyrics: &[LyricEvent], per_line: usize) -> Vec<SolfegeLine> {
    lyrics
        .chunks(per_line.max(1))
        .map(|chunk| SolfegeLine {
            words: chunk.iter().map(|l| l.text.clone()).collect(),
            solfege: chunk.iter().map(solfege_for).collect(),
        })
        .collect()
}

fn solfege_for(lyric: &LyricEvent) -> String {
    lyric
        .pitch()
        .map(|p: Pitch| p.class.solfege())
        .unwrap_or_else(|_| pitch::strip_octave(&lyric.pitch))
}

/// `"My  Song"` → `"My_Song_sheet_music.pdf"`.
pub fn export_file_name(title: &str) -> String {
    let stem = title.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{stem}_sheet_music.pdf")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NotationEncoder, NoteEvent, NoteTimeline};

    fn lyrics() -> LyricTimeline {
        LyricTimeline::from_events(vec![
            LyricEvent::new("Cómo", "C4", 0.0, 0.5),
            LyricEvent::new("quieres", "E4", 0.5, 0.5),
            LyricEvent::new("que", "G#4", 1.0, 0.3),
            LyricEvent::new("te", "A4", 1.3, 0.2),
            LyricEvent::new("quiera", "Bb5", 1.5, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn formats_table_rows_without_octaves() {
        let rows: Vec<String> = lyrics()
            .iter()
            .map(|l| LyricRow::from_lyric(l).to_string())
            .collect();
        assert_eq!(rows[0], "0.0s: \"Cómo\" - C");
        assert_eq!(rows[2], "1.0s: \"que\" - G#");
        assert_eq!(rows[4], "1.5s: \"quiera\" - Bb");
    }

    #[test]
    fn paginates_like_a_printed_table() {
        assert!(paginate(0).is_empty());

        let pages = paginate(60);
        assert_eq!(pages[0].rows.len(), 24);
        assert_eq!(pages[0].rows[0].y_mm, 40.0);
        assert_eq!(pages[0].rows[23].y_mm, 270.0);
        assert_eq!(pages[1].rows[0].y_mm, 20.0);
        assert_eq!(pages[1].rows.len(), 26);
        assert_eq!(pages[2].rows.len(), 10);

        // A full first page does not open an empty trailing page.
        assert_eq!(paginate(24).len(), 1);
    }

    #[test]
    fn groups_solfege_lines() {
        let lines = solfege_lines(lyrics().as_slice(), 4);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].solfege, ["DO", "MI", "SOL#", "LA"]);
        assert_eq!(lines[1].words, ["quiera"]);
        assert_eq!(lines[1].solfege, ["SI♭"]);
    }

    #[test]
    fn builds_request_from_score() {
        let notes = NoteTimeline::from_events(vec![NoteEvent::new("C4", 0.0, 0.5)]).unwrap();
        let lyrics = lyrics();
        let score = NotationEncoder::new().encode(&notes, Some(&lyrics), "Como  Quieres");
        let settings = ExportSettings::new(PageOrientation::Portrait, 180.0).unwrap();

        let request = ExportRequest::build(&score, Some(&lyrics), settings);
        assert_eq!(request.file_name, "Como_Quieres_sheet_music.pdf");
        assert_eq!(request.margin_left_mm, 15.0);
        assert!(request.notation.starts_with("X:1\nT:Como  Quieres\n"));
        assert_eq!(request.lyric_rows.len(), 5);
        assert_eq!(request.lyric_pages.len(), 1);

        let mut sink = JsonExportSink::new(Vec::new());
        sink.submit(&request).unwrap();
        let json = String::from_utf8(sink.into_inner()).unwrap();
        assert!(json.contains("\"file_name\": \"Como_Quieres_sheet_music.pdf\""));
    }

    #[test]
    fn validates_page_width() {
        assert!(ExportSettings::new(PageOrientation::Portrait, 250.0).is_err());
        assert!(ExportSettings::new(PageOrientation::Landscape, 0.0).is_err());
        let landscape = ExportSettings::new(PageOrientation::Landscape, 277.0).unwrap();
        assert_eq!(landscape.margin_left_mm(), 10.0);
    }

    #[test]
    fn parses_orientation_names() {
        assert_eq!("Portrait".parse::<PageOrientation>().unwrap(), PageOrientation::Portrait);
        assert!("sideways".parse::<PageOrientation>().is_err());
    }
}
