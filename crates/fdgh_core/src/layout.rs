use serde::Serialize;

use crate::error::{CodecError, ErrorCode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SectionId {
    Header,
    WorldMap,
    Rooms,
    Assets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionLayout {
    pub id: SectionId,
    pub range: ByteRange,
}

/// Where each FDGH section sits, in absolute file offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileLayout {
    pub file_len: usize,
    pub sections: Vec<SectionLayout>,
}

impl FileLayout {
    /// Build a layout from the byte range each section was read from. Sections
    /// are sorted by start so an unusual on-disk order is still described
    /// correctly.
    pub fn from_ranges(ranges: &[(SectionId, ByteRange)], file_len: usize) -> Self {
        let mut sections: Vec<SectionLayout> = ranges
            .iter()
            .map(|&(id, range)| SectionLayout { id, range })
            .collect();
        sections.sort_by_key(|section| section.range.start);
        Self { file_len, sections }
    }

    pub fn section(&self, id: SectionId) -> Option<&SectionLayout> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// Bytes no section claims, between sections or after the last one.
    /// Well-formed files only have alignment padding here.
    pub fn gaps(&self) -> Vec<ByteRange> {
        let mut gaps = Vec::new();
        let Some(first) = self.sections.first() else {
            return gaps;
        };
        let mut cursor = first.range.start;
        for section in &self.sections {
            if section.range.start > cursor {
                gaps.push(ByteRange {
                    start: cursor,
                    end: section.range.start,
                });
            }
            cursor = cursor.max(section.range.end);
        }
        if self.file_len > cursor {
            gaps.push(ByteRange {
                start: cursor,
                end: self.file_len,
            });
        }
        gaps
    }

    /// Sections must not overlap one another or run past the end of the file.
    pub fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(CodecError::new(
                ErrorCode::MalformedHeader,
                "file layout must contain at least one section",
            ));
        }

        let mut previous: Option<&SectionLayout> = None;
        for section in &self.sections {
            if section.range.end < section.range.start {
                return Err(CodecError::new(
                    ErrorCode::MalformedHeader,
                    format!(
                        "invalid section range {:?}: 0x{:x}..0x{:x}",
                        section.id, section.range.start, section.range.end
                    ),
                ));
            }
            if let Some(prev) = previous.filter(|prev| section.range.start < prev.range.end) {
                return Err(CodecError::new(
                    ErrorCode::MalformedHeader,
                    format!(
                        "section {:?} at 0x{:x} overlaps {:?}, which ends at 0x{:x}",
                        section.id, section.range.start, prev.id, prev.range.end
                    ),
                ));
            }
            if section.range.end > self.file_len {
                return Err(CodecError::new(
                    ErrorCode::TruncatedBuffer,
                    format!(
                        "section {:?} ends at 0x{:x}, past the end of the file at 0x{:x}",
                        section.id, section.range.end, self.file_len
                    ),
                ));
            }
            previous = Some(section);
        }

        Ok(())
    }
}
