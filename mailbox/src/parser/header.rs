//! Minimal RFC 5322 header block reader.
//!
//! Only the header part of a message is ever fetched, so the block is parsed
//! as a whole (complete, not streaming) and anything after the terminating
//! blank line is ignored.

use nom::{
    IResult, Offset, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{line_ending, not_line_ending, space0, space1},
    combinator::eof,
    multi::many0,
    sequence::{preceded, terminated},
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header block is empty")]
    Empty,
    #[error("line {line} is not a header field")]
    Malformed { line: usize },
}

type Field<'a> = (&'a [u8], Vec<&'a [u8]>);

/// Returns the `Subject` of a raw header block, or an empty string when the
/// block has none.
///
/// Folded lines are joined with a single space. Encoded words are left as
/// they appear on the wire.
pub fn parse_subject(raw: &[u8]) -> Result<String, HeaderError> {
    let fields = parse_fields(raw)?;

    let subject = fields
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(b"Subject"))
        .map(|(_, value)| unfold(value))
        .unwrap_or_default();

    Ok(String::from_utf8_lossy(&subject).into_owned())
}

fn parse_fields(raw: &[u8]) -> Result<Vec<Field<'_>>, HeaderError> {
    if raw.is_empty() {
        return Err(HeaderError::Empty);
    }

    match header_block(raw) {
        Ok((_body, fields)) => Ok(fields),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => Err(HeaderError::Malformed {
            line: line_number(raw, e.input),
        }),
        Err(nom::Err::Incomplete(_)) => Err(HeaderError::Malformed {
            line: line_number(raw, &raw[raw.len()..]),
        }),
    }
}

fn header_block(i: &[u8]) -> IResult<&[u8], Vec<Field<'_>>> {
    terminated(many0(field), line_end).parse(i)
}

// `Name: value` followed by any number of folded continuation lines. Old
// mailers put blanks between the name and the colon.
fn field(i: &[u8]) -> IResult<&[u8], Field<'_>> {
    let (i, name) = terminated(field_name, (space0, tag(":"))).parse(i)?;
    let (i, first) = line(i)?;
    let (i, mut rest) = many0(preceded(space1, line)).parse(i)?;
    rest.insert(0, first);
    Ok((i, (name, rest)))
}

fn field_name(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|c: u8| c.is_ascii_graphic() && c != b':').parse(i)
}

fn line(i: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(not_line_ending, line_end).parse(i)
}

// Either a line ending or the end of the block; servers sometimes drop the
// final CRLF of a header-only fetch.
fn line_end(i: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((line_ending, eof)).parse(i)
}

fn unfold(segments: &[&[u8]]) -> Vec<u8> {
    segments
        .iter()
        .map(|segment| segment.trim_ascii())
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(&b' ')
}

fn line_number(raw: &[u8], rest: &[u8]) -> usize {
    let consumed = raw.offset(rest);
    raw[..consumed].iter().filter(|&&c| c == b'\n').count() + 1
}
