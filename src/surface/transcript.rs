//! In-memory output transcript

use chrono::{DateTime, Utc};

use super::{OutputSink, OutputTag};

/// A run of transcript text sharing one tag set
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Segment text
    pub text: String,
    /// Tags applied to the whole segment
    pub tags: Vec<OutputTag>,
    /// When the first part of the segment was written
    pub timestamp: DateTime<Utc>,
}

impl Segment {
    /// Check whether the segment carries a tag
    pub fn has_tag(&self, tag: OutputTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Append-only transcript keeping tagged segments
///
/// Consecutive writes with an identical tag set are merged into one
/// segment, mirroring how a text view coalesces equally styled runs.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Vec<Segment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// All segments in write order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Transcript text without tags
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Segments carrying `tag`
    pub fn segments_tagged(&self, tag: OutputTag) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.has_tag(tag))
    }

    /// Concatenated text of all segments carrying `tag`
    pub fn text_tagged(&self, tag: OutputTag) -> String {
        self.segments_tagged(tag).map(|s| s.text.as_str()).collect()
    }

    /// Number of non-overlapping occurrences of `needle` in text tagged `tag`
    pub fn count_tagged(&self, tag: OutputTag, needle: &str) -> usize {
        if needle.is_empty() {
            return 0;
        }
        self.segments_tagged(tag)
            .map(|s| s.text.matches(needle).count())
            .sum()
    }

    /// The most recently written segment
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Drop all segments
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}

impl OutputSink for Transcript {
    fn write(&mut self, text: &str, tags: &[OutputTag]) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.segments.last_mut() {
            if last.tags == tags {
                last.text.push_str(text);
                return;
            }
        }
        self.segments.push(Segment {
            text: text.to_string(),
            tags: tags.to_vec(),
            timestamp: Utc::now(),
        });
    }
}
