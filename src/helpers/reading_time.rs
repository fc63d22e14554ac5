//! Reading time estimation

use crate::content::rich_text::as_text;
use crate::content::Section;

/// Default reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count words by splitting on single spaces. Empty text still yields one piece.
pub fn count_words(text: &str) -> usize {
    text.split(' ').count()
}

/// Heading words, zero for an empty heading
pub fn heading_words(heading: &str) -> usize {
    if heading.is_empty() {
        0
    } else {
        count_words(heading)
    }
}

/// Words in all section headings and plain-text bodies
pub fn word_count(sections: &[Section]) -> usize {
    sections
        .iter()
        .map(|section| heading_words(&section.heading) + count_words(&as_text(&section.body)))
        .sum()
}

/// Estimated minutes to read, rounded up. A post without sections reads in zero minutes.
pub fn reading_time(sections: &[Section], words_per_minute: usize) -> usize {
    word_count(sections).div_ceil(words_per_minute.max(1))
}
