use std::fmt::{self, Display};

/// An inclusive range of 1-based message sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceRange {
    start: u32,
    end: u32,
}

impl SequenceRange {
    /// Selects the newest `count` messages of a mailbox holding `total`.
    ///
    /// Sequence numbers are assigned in arrival order, so the newest messages
    /// sit at the top of the range. When the mailbox holds fewer than `count`
    /// messages the whole mailbox is selected. Returns `None` when there is
    /// nothing to fetch.
    pub fn most_recent(total: u32, count: u32) -> Option<Self> {
        if total == 0 || count == 0 {
            return None;
        }
        if total >= count {
            Some(Self {
                start: total - count + 1,
                end: total,
            })
        } else {
            Some(Self { start: 1, end: total })
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }
}

impl Display for SequenceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_takes_the_top_of_the_mailbox() {
        let range = SequenceRange::most_recent(7, 5).unwrap();
        assert_eq!(range.start(), 3);
        assert_eq!(range.end(), 7);
        assert_eq!(range.len(), 5);
        assert_eq!(range.to_string(), "3:7");
    }

    #[test]
    fn test_most_recent_length_matches_count() {
        for total in 1..=40u32 {
            for count in 1..=total {
                let range = SequenceRange::most_recent(total, count).unwrap();
                assert_eq!(range.len(), count, "total {total}, count {count}");
                assert_eq!(range.end(), total, "total {total}, count {count}");
            }
        }
    }

    #[test]
    fn test_most_recent_small_mailbox_selects_everything() {
        for count in 2..=20u32 {
            for total in 1..count {
                let range = SequenceRange::most_recent(total, count).unwrap();
                assert_eq!((range.start(), range.end()), (1, total));
                assert_eq!(range.len(), total);
            }
        }

        assert_eq!(SequenceRange::most_recent(2, 5).unwrap().to_string(), "1:2");
    }

    #[test]
    fn test_most_recent_nothing_to_fetch() {
        assert_eq!(SequenceRange::most_recent(0, 5), None);
        assert_eq!(SequenceRange::most_recent(0, 0), None);
        assert_eq!(SequenceRange::most_recent(12, 0), None);
    }

    #[test]
    fn test_single_message_range_display() {
        assert_eq!(SequenceRange::most_recent(9, 1).unwrap().to_string(), "9");
        assert_eq!(SequenceRange::most_recent(1, 10).unwrap().to_string(), "1");
    }

    #[test]
    fn test_most_recent_at_the_numeric_limit() {
        let range = SequenceRange::most_recent(u32::MAX, u32::MAX).unwrap();
        assert_eq!((range.start(), range.end()), (1, u32::MAX));
        assert_eq!(range.len(), u32::MAX);
    }
}
