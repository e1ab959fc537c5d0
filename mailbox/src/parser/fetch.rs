use nom::{
    IResult, Needed, Parser,
    branch::alt,
    bytes::streaming::{tag, tag_no_case, take, take_until, take_while1},
    character::streaming::{crlf, digit1},
    combinator::{map, opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, terminated},
};

use super::{is_atom_char, number};
use crate::types::FetchAttribute;

// Upper bound on a single literal; a header block never comes close.
const MAX_LITERAL_SIZE: usize = 64 * 1024 * 1024;

/// `(UID 10 RFC822.SIZE 100 RFC822.HEADER {n}\r\n...)`
pub fn msg_att(i: &[u8]) -> IResult<&[u8], Vec<FetchAttribute<&[u8]>>> {
    delimited(tag("("), separated_list0(tag(" "), attribute), tag(")")).parse(i)
}

fn attribute(i: &[u8]) -> IResult<&[u8], FetchAttribute<&[u8]>> {
    let (i, name) = attribute_label(i)?;

    if name.eq_ignore_ascii_case(b"UID") {
        map(number, FetchAttribute::Uid).parse(i)
    } else if name.eq_ignore_ascii_case(b"RFC822.SIZE") {
        map(number, FetchAttribute::Rfc822Size).parse(i)
    } else if name.eq_ignore_ascii_case(b"RFC822.HEADER")
        || name.eq_ignore_ascii_case(b"BODY[HEADER]")
    {
        map(nstring, FetchAttribute::Header).parse(i)
    } else {
        map(value, move |_| FetchAttribute::Other(name)).parse(i)
    }
}

fn attribute_label(i: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(attribute_name, tag(" ")).parse(i)
}

// `UID`, `BODY[HEADER.FIELDS (SUBJECT)]`, `BODY[]<0>`
fn attribute_name(i: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize((
        take_while1(is_atom_char),
        opt((tag("["), take_until("]"), tag("]"))),
        opt((tag("<"), digit1, tag(">"))),
    ))
    .parse(i)
}

// Any attribute value this client has no use for; only its extent matters.
fn value(i: &[u8]) -> IResult<&[u8], &[u8]> {
    alt((list, recognize(nstring), take_while1(is_list_char))).parse(i)
}

fn list(i: &[u8]) -> IResult<&[u8], &[u8]> {
    recognize(delimited(tag("("), separated_list0(tag(" "), value), tag(")"))).parse(i)
}

fn is_list_char(c: u8) -> bool {
    c.is_ascii_graphic() && !b"()\"{".contains(&c)
}

pub(crate) fn nstring(i: &[u8]) -> IResult<&[u8], Option<&[u8]>> {
    alt((
        map(tag_no_case("NIL"), |_| None::<&[u8]>),
        map(quoted, Some),
        map(literal, Some),
    ))
    .parse(i)
}

// Returns the content between the quotes with escapes left in place.
fn quoted(i: &[u8]) -> IResult<&[u8], &[u8]> {
    match i.first() {
        None => return Err(nom::Err::Incomplete(Needed::new(1))),
        Some(b'"') => {}
        Some(_) => return Err(nom::Err::Error(Error::new(i, ErrorKind::Char))),
    }

    let body = &i[1..];
    let mut escaped = false;
    for (pos, &c) in body.iter().enumerate() {
        match c {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Ok((&body[pos + 1..], &body[..pos])),
            b'\r' | b'\n' => return Err(nom::Err::Error(Error::new(&body[pos..], ErrorKind::Char))),
            _ => {}
        }
    }
    Err(nom::Err::Incomplete(Needed::Unknown))
}

fn literal(i: &[u8]) -> IResult<&[u8], &[u8]> {
    let (i, len) = literal_length(i)?;
    let len = len as usize;
    if len > MAX_LITERAL_SIZE {
        return Err(nom::Err::Failure(Error::new(i, ErrorKind::TooLarge)));
    }
    take(len).parse(i)
}

// `{42}\r\n`, or the non-synchronizing `{42+}\r\n`
fn literal_length(i: &[u8]) -> IResult<&[u8], u32> {
    delimited(tag("{"), number, (opt(tag("+")), tag("}"), crlf)).parse(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_att_known_attributes() {
        let (rest, attrs) =
            msg_att(b"(UID 12 RFC822.SIZE 2048 RFC822.HEADER {9}\r\nSubject:\n)\r\n").unwrap();

        assert_eq!(rest, b"\r\n");
        assert_eq!(
            attrs,
            vec![
                FetchAttribute::Uid(12),
                FetchAttribute::Rfc822Size(2048),
                FetchAttribute::Header(Some(&b"Subject:\n"[..])),
            ]
        );
    }

    #[test]
    fn test_msg_att_skips_unrequested_attributes() {
        let (_, attrs) = msg_att(
            b"(FLAGS (\\Seen $Forwarded) UID 5 ENVELOPE (\"Tue, 8 May 2018\" \"hi\" NIL ((\"a\" NIL \"b\" \"c\")) NIL) RFC822.SIZE 77)\r\n",
        )
        .unwrap();

        assert_eq!(
            attrs,
            vec![
                FetchAttribute::Other(&b"FLAGS"[..]),
                FetchAttribute::Uid(5),
                FetchAttribute::Other(&b"ENVELOPE"[..]),
                FetchAttribute::Rfc822Size(77),
            ]
        );
    }

    #[test]
    fn test_body_header_section_and_nil() {
        let (_, attrs) = msg_att(b"(BODY[HEADER] NIL BODY[HEADER.FIELDS (SUBJECT)] \"x\")\r\n").unwrap();

        assert_eq!(
            attrs,
            vec![
                FetchAttribute::Header(None),
                FetchAttribute::Other(&b"BODY[HEADER.FIELDS (SUBJECT)]"[..]),
            ]
        );
    }

    #[test]
    fn test_quoted_header_keeps_escapes() {
        let (_, attrs) = msg_att(b"(RFC822.HEADER \"a\\\"b\")\r\n").unwrap();

        assert_eq!(attrs, vec![FetchAttribute::Header(Some(&b"a\\\"b"[..]))]);
    }

    #[test]
    fn test_literal_plus_and_empty() {
        assert_eq!(literal(b"{3+}\r\nabc"), Ok((&b""[..], &b"abc"[..])));
        assert_eq!(literal(b"{0}\r\n)"), Ok((&b")"[..], &b""[..])));
    }

    #[test]
    fn test_oversized_literal_is_rejected() {
        let input = format!("{{{}}}\r\n", MAX_LITERAL_SIZE + 1);

        assert!(matches!(literal(input.as_bytes()), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_incomplete_literal() {
        assert!(matches!(literal(b"{10}\r\nshort"), Err(nom::Err::Incomplete(_))));
        assert!(matches!(quoted(b"\"unterminated"), Err(nom::Err::Incomplete(_))));
    }
}
