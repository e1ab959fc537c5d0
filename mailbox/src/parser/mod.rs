use nom::{
    IResult, Offset, Parser,
    branch::alt,
    bytes::streaming::{tag, tag_no_case, take_while, take_while1},
    character::streaming::{crlf, digit1},
    combinator::{map, map_opt, map_res, opt},
    sequence::{preceded, terminated},
};
use thiserror::Error;

use crate::types::{OwnedResponse, Response, Status, Untagged};

pub mod fetch;
pub mod header;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Invalid IMAP response: {0:?}")]
    InvalidResponse(String),
}

/// Decodes the first complete response in `buf`.
///
/// Returns the owned response together with the number of bytes it occupied,
/// or `Ok(None)` when `buf` ends in the middle of a response.
pub fn decode(buf: &[u8]) -> Result<Option<(OwnedResponse, usize)>, ParserError> {
    match response(buf) {
        Ok((rest, resp)) => {
            let consumed = buf.offset(rest);
            Ok(Some((resp.into_owned(), consumed)))
        }
        Err(nom::Err::Incomplete(_)) => Ok(None),
        Err(_) => Err(ParserError::InvalidResponse(first_line(buf))),
    }
}

fn first_line(buf: &[u8]) -> String {
    let line = buf.split(|&c| c == b'\n').next().unwrap_or_default();
    let line = &line[..line.len().min(80)];
    String::from_utf8_lossy(line).trim_end().to_string()
}

fn response(i: &[u8]) -> IResult<&[u8], Response<&[u8]>> {
    terminated(alt((untagged_response, continuation, tagged_response)), crlf).parse(i)
}

fn untagged_response(i: &[u8]) -> IResult<&[u8], Response<&[u8]>> {
    map(
        preceded(tag("* "), alt((numbered_response, named_response))),
        Response::Untagged,
    )
    .parse(i)
}

fn tagged_response(i: &[u8]) -> IResult<&[u8], Response<&[u8]>> {
    map(
        (tag_token, tag(" "), status, text),
        |(tag, _, status, text)| Response::Tagged { tag, status, text },
    )
    .parse(i)
}

fn continuation(i: &[u8]) -> IResult<&[u8], Response<&[u8]>> {
    map(preceded(tag("+"), text), |text| Response::Continuation { text }).parse(i)
}

// `* 4 EXISTS`, `* 4 FETCH (...)`
fn numbered_response(i: &[u8]) -> IResult<&[u8], Untagged<&[u8]>> {
    let (i, n) = message_number(i)?;
    alt((
        map(preceded(tag_no_case("FETCH "), fetch::msg_att), move |attributes| {
            Untagged::Fetch { seq: n, attributes }
        }),
        map(tag_no_case("EXISTS"), move |_| Untagged::Exists(n)),
        map(tag_no_case("RECENT"), move |_| Untagged::Recent(n)),
        map(tag_no_case("EXPUNGE"), move |_| Untagged::Expunge(n)),
        map((atom, text), |(name, text)| Untagged::Other { name, text }),
    ))
    .parse(i)
}

// `* OK ...`, `* BYE ...`, `* CAPABILITY ...`
fn named_response(i: &[u8]) -> IResult<&[u8], Untagged<&[u8]>> {
    map((atom, text), |(name, text)| match Status::from_atom(name) {
        Some(status) => Untagged::Status { status, text },
        None => Untagged::Other { name, text },
    })
    .parse(i)
}

fn message_number(i: &[u8]) -> IResult<&[u8], u32> {
    terminated(number, tag(" ")).parse(i)
}

fn status(i: &[u8]) -> IResult<&[u8], Status> {
    map_opt(atom, Status::from_atom).parse(i)
}

// Everything up to the line ending; the separating space is optional since
// some servers send a bare `+` or `* OK`.
fn text(i: &[u8]) -> IResult<&[u8], &[u8]> {
    map(
        opt(preceded(tag(" "), take_while(|c: u8| c != b'\r' && c != b'\n'))),
        |text: Option<&[u8]>| text.unwrap_or_default(),
    )
    .parse(i)
}

pub(crate) fn number(i: &[u8]) -> IResult<&[u8], u32> {
    map_res(digit1, |digits: &[u8]| {
        String::from_utf8_lossy(digits).parse::<u32>()
    })
    .parse(i)
}

pub(crate) fn atom(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_atom_char).parse(i)
}

fn tag_token(i: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(|c: u8| c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'.')
        .parse(i)
}

pub(crate) fn is_atom_char(c: u8) -> bool {
    c.is_ascii_graphic() && !b"(){}%*\"\\[]".contains(&c)
}
