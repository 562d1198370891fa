use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SECTOR_RAW_SIZE: u64 = 2352;
pub const FRAMES_PER_SECOND: u64 = 75;
/// Lead-in pregap at the head of every disc.
pub const LEAD_IN_FRAMES: u64 = 150;

/// Back end for disc data. CUE/BIN today; the trait keeps the drive
/// independent of the container format.
pub trait CdImage: Send {
    /// Byte at an absolute disc position (lead-in pregap included).
    /// Positions outside any track read as zero.
    fn read_byte(&self, position: u64) -> u8;
    fn is_empty(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackType {
    Audio,
    Mode2_2352,
}

#[derive(Debug, Clone, Copy)]
pub struct Msf {
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
}

impl Msf {
    pub fn to_frames(self) -> u64 {
        (self.minute as u64 * 60 + self.second as u64) * FRAMES_PER_SECOND + self.frame as u64
    }
}

#[derive(Debug, Clone)]
pub struct CueTrack {
    pub number: u8,
    pub track_type: TrackType,
    pub pregap_frames: u64,
    pub index01: Msf,
}

#[derive(Debug, Clone)]
pub struct CueSheet {
    pub bin_path: PathBuf,
    pub tracks: Vec<CueTrack>,
}

/// One contiguous span of the BIN mapped into the absolute disc space.
#[derive(Debug, Clone, Copy)]
struct TrackSpan {
    disc_start: u64,
    file_start: u64,
}

pub struct CueBinImage {
    data: Mmap,
    spans: Vec<TrackSpan>,
}

impl CueBinImage {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<CueBinImage> {
        let sheet = parse_cue_file(&path)?;
        let file = File::open(&sheet.bin_path)?;
        // the BIN stays on disk, read-only mapped
        let data = unsafe { Mmap::map(&file)? };
        let spans = build_spans(&sheet);
        info!(
            "loaded disc '{}': {} bytes of sector data",
            path.as_ref().display(),
            data.len()
        );
        for track in &sheet.tracks {
            info!(
                "  track {:02} {:?} index01 {:02}:{:02}:{:02}",
                track.number,
                track.track_type,
                track.index01.minute,
                track.index01.second,
                track.index01.frame
            );
        }
        Ok(CueBinImage { data, spans })
    }
}

impl CdImage for CueBinImage {
    fn read_byte(&self, position: u64) -> u8 {
        read_spanned_byte(&self.spans, &self.data, position)
    }

    fn is_empty(&self) -> bool {
        self.data.len() == 0
    }
}

fn read_spanned_byte(spans: &[TrackSpan], data: &[u8], position: u64) -> u8 {
    for span in spans.iter().rev() {
        if position >= span.disc_start {
            let offset = span.file_start + (position - span.disc_start);
            return data.get(offset as usize).copied().unwrap_or(0);
        }
    }
    0
}

/// Maps each track into the absolute disc byte space: 150 lead-in frames,
/// then the BIN contents, shifted further by any PREGAP commands (which
/// occupy disc time but no file bytes).
fn build_spans(sheet: &CueSheet) -> Vec<TrackSpan> {
    let mut spans = Vec::with_capacity(sheet.tracks.len());
    let mut pregap_frames = LEAD_IN_FRAMES;
    for track in &sheet.tracks {
        pregap_frames += track.pregap_frames;
        let file_start = track.index01.to_frames() * SECTOR_RAW_SIZE;
        spans.push(TrackSpan {
            disc_start: file_start + pregap_frames * SECTOR_RAW_SIZE,
            file_start,
        });
    }
    spans
}

pub fn parse_cue_file<P: AsRef<Path>>(path: P) -> io::Result<CueSheet> {
    let file = File::open(&path)?;
    let base_dir = path.as_ref().parent().unwrap_or(Path::new("")).to_path_buf();
    parse_cue(BufReader::new(file), &base_dir)
}

fn parse_cue<R: BufRead>(reader: R, base_dir: &Path) -> io::Result<CueSheet> {
    let mut bin_path: Option<PathBuf> = None;
    let mut tracks: Vec<CueTrack> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let parts = split_cue_line(line.trim());
        if parts.is_empty() {
            continue;
        }
        match parts[0].as_str() {
            "FILE" => {
                if bin_path.is_some() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "cue sheets referencing more than one file are not supported",
                    ));
                }
                let name = parts
                    .get(1)
                    .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "FILE without a name"))?;
                bin_path = Some(base_dir.join(name));
            }
            "TRACK" => {
                let number = parts.get(1).and_then(|p| p.parse().ok()).unwrap_or(0);
                let track_type = match parts.get(2).map(String::as_str) {
                    Some("AUDIO") => TrackType::Audio,
                    Some("MODE2/2352") => TrackType::Mode2_2352,
                    other => {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("unsupported track type {:?}", other),
                        ))
                    }
                };
                tracks.push(CueTrack {
                    number,
                    track_type,
                    pregap_frames: 0,
                    index01: Msf { minute: 0, second: 0, frame: 0 },
                });
            }
            "PREGAP" => {
                if let (Some(track), Some(time)) = (tracks.last_mut(), parts.get(1)) {
                    track.pregap_frames = parse_msf(time).to_frames();
                }
            }
            "INDEX" => {
                let index_number: u8 = parts.get(1).and_then(|p| p.parse().ok()).unwrap_or(0);
                if index_number == 1 {
                    if let (Some(track), Some(time)) = (tracks.last_mut(), parts.get(2)) {
                        track.index01 = parse_msf(time);
                    }
                }
            }
            _ => {}
        }
    }

    let bin_path = bin_path
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "cue sheet has no FILE entry"))?;
    if tracks.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "cue sheet has no tracks"));
    }
    Ok(CueSheet { bin_path, tracks })
}

fn split_cue_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

fn parse_msf(s: &str) -> Msf {
    let mut parts = s.split(':');
    Msf {
        minute: parts.next().and_then(|p| p.parse().ok()).unwrap_or(0),
        second: parts.next().and_then(|p| p.parse().ok()).unwrap_or(0),
        frame: parts.next().and_then(|p| p.parse().ok()).unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const CUE: &str = r#"
FILE "game.bin" BINARY
  TRACK 01 MODE2/2352
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    PREGAP 00:02:00
    INDEX 01 01:00:00
"#;

    #[test]
    fn cue_parses_tracks_pregaps_and_file() {
        let sheet = parse_cue(Cursor::new(CUE), Path::new("/images")).unwrap();
        assert_eq!(sheet.bin_path, PathBuf::from("/images/game.bin"));
        assert_eq!(sheet.tracks.len(), 2);
        assert_eq!(sheet.tracks[0].track_type, TrackType::Mode2_2352);
        assert_eq!(sheet.tracks[0].pregap_frames, 0);
        assert_eq!(sheet.tracks[1].track_type, TrackType::Audio);
        assert_eq!(sheet.tracks[1].pregap_frames, 150);
        assert_eq!(sheet.tracks[1].index01.to_frames(), 60 * 75);
    }

    #[test]
    fn spans_account_for_lead_in_and_pregaps() {
        let sheet = parse_cue(Cursor::new(CUE), Path::new("")).unwrap();
        let spans = build_spans(&sheet);
        // track 1 data begins after the 150-frame lead-in
        assert_eq!(spans[0].disc_start, LEAD_IN_FRAMES * SECTOR_RAW_SIZE);
        assert_eq!(spans[0].file_start, 0);
        // track 2 shifts by its own pregap on top of the lead-in
        assert_eq!(
            spans[1].disc_start,
            (60 * 75 + 150 + 150) * SECTOR_RAW_SIZE
        );
        assert_eq!(spans[1].file_start, 60 * 75 * SECTOR_RAW_SIZE);
    }

    #[test]
    fn position_translation_reads_the_right_file_byte() {
        let sheet = parse_cue(Cursor::new(CUE), Path::new("")).unwrap();
        let spans = build_spans(&sheet);
        let mut data = vec![0u8; 2352 * 10];
        data[0] = 0xAB;
        data[2352] = 0xCD;
        let lead_in = LEAD_IN_FRAMES * SECTOR_RAW_SIZE;
        assert_eq!(read_spanned_byte(&spans, &data, lead_in), 0xAB);
        assert_eq!(read_spanned_byte(&spans, &data, lead_in + 2352), 0xCD);
        // before the first track there is nothing to read
        assert_eq!(read_spanned_byte(&spans, &data, 0), 0);
    }

    #[test]
    fn rejects_cue_without_file() {
        let result = parse_cue(Cursor::new("TRACK 01 MODE2/2352\n"), Path::new(""));
        assert!(result.is_err());
    }
}
