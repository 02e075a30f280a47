//! Terminal marker detection over a chunked stream.

/// Watches a stream of text chunks for any of a fixed set of markers.
///
/// Only newly arrived text is scanned, together with a short tail of the
/// previous text (one byte shorter than the longest marker), so a marker
/// split across two reads is still found without rescanning the transcript.
#[derive(Debug)]
pub struct MarkerWatch<'m> {
    markers: &'m [&'m str],
    tail: String,
    keep: usize,
}

impl<'m> MarkerWatch<'m> {
    pub fn new(markers: &'m [&'m str]) -> Self {
        let keep = markers
            .iter()
            .map(|m| m.len())
            .max()
            .unwrap_or(0)
            .saturating_sub(1);
        Self {
            markers,
            tail: String::new(),
            keep,
        }
    }

    /// Feeds the next chunk and returns the first marker now visible.
    pub fn observe(&mut self, chunk: &str) -> Option<&'m str> {
        let mut window = std::mem::take(&mut self.tail);
        window.push_str(chunk);

        let hit = self.markers.iter().copied().find(|m| window.contains(m));

        let mut start = window.len().saturating_sub(self.keep);
        while !window.is_char_boundary(start) {
            start += 1;
        }
        self.tail = window.split_off(start);
        hit
    }
}
