use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

use crate::ImapError;
use crate::parser::decode;
use crate::types::OwnedResponse;

/// Splits the server byte stream into parsed responses, literals included.
pub struct ImapCodec;

impl Decoder for ImapCodec {
    type Item = OwnedResponse;
    type Error = ImapError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some((resp, consumed)) = decode(src)? {
            src.advance(consumed); // O(1) trim
            return Ok(Some(resp));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchAttribute, Response, Status, Untagged};
    use tokio_stream::StreamExt;
    use tokio_test::io::Builder;
    use tokio_util::codec::FramedRead;

    #[tokio::test]
    async fn test_responses_split_across_reads() {
        let mock = Builder::new()
            .read(b"* OK Dovecot ready.\r\n* 1 FETCH (UID 4 RFC822.SIZE 9")
            .read(b"0 RFC822.HEADER {15}\r\nSubject: ")
            .read(b"hi\r\n\r\n)\r\na003 OK Fetch completed.\r\n")
            .build();
        let mut framed = FramedRead::new(mock, ImapCodec);

        let greeting = framed.next().await.unwrap().unwrap();
        assert!(matches!(
            greeting,
            Response::Untagged(Untagged::Status { status: Status::Ok, .. })
        ));

        let fetch = framed.next().await.unwrap().unwrap();
        match fetch {
            Response::Untagged(Untagged::Fetch { seq, attributes }) => {
                assert_eq!(seq, 1);
                assert_eq!(attributes[0], FetchAttribute::Uid(4));
                assert_eq!(attributes[1], FetchAttribute::Rfc822Size(90));
                assert!(matches!(
                    &attributes[2],
                    FetchAttribute::Header(Some(header)) if header.as_ref() == b"Subject: hi\r\n\r\n"
                ));
            }
            other => panic!("Expected FETCH, got {other:?}"),
        }

        let done = framed.next().await.unwrap().unwrap();
        assert!(matches!(done, Response::Tagged { status: Status::Ok, .. }));

        assert!(framed.next().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_response_is_a_protocol_error() {
        let mock = Builder::new().read(b"what is this\r\n").build();
        let mut framed = FramedRead::new(mock, ImapCodec);

        let result = framed.next().await.unwrap();
        assert!(matches!(result, Err(ImapError::Protocol(_))));
    }
}
