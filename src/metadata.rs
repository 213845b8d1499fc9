//! Sender and receiver header
//!
//! The command line prepends a two line header to the payload before compressing.
//! The coder does not treat it specially, it is just more bytes.  After expansion
//! the header is parsed back off, which is where the receiver is checked.

use crate::Error;

const SENDER_TAG: &str = "Sender: ";
const RECEIVER_TAG: &str = "Receiver: ";
/// shortest acceptable identifier, as in `<id>,<name>`
pub const MIN_IDENT_LEN: usize = 12;

#[derive(Clone,Debug,PartialEq)]
pub struct Header {
    pub sender: String,
    pub receiver: String
}

/// Identifiers look like `<id>,<name>` and cannot span lines.
pub fn validate_ident(ident: &str) -> Result<(),Error> {
    if ident.len() < MIN_IDENT_LEN {
        return Err(Error::BadMetadata(format!("`{}` is shorter than {} bytes",ident,MIN_IDENT_LEN)));
    }
    if !ident.contains(',') {
        return Err(Error::BadMetadata(format!("`{}` should have the form <id>,<name>",ident)));
    }
    if ident.contains('\n') || ident.contains('\r') {
        return Err(Error::BadMetadata("identifier contains a line break".to_string()));
    }
    Ok(())
}

impl Header {
    pub fn create(sender: &str,receiver: &str) -> Result<Self,Error> {
        validate_ident(sender)?;
        validate_ident(receiver)?;
        Ok(Self {
            sender: sender.to_string(),
            receiver: receiver.to_string()
        })
    }
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{}\n{}{}\n",SENDER_TAG,self.sender,RECEIVER_TAG,self.receiver).into_bytes()
    }
    /// header followed by the payload
    pub fn prepend(&self,payload: &[u8]) -> Vec<u8> {
        [self.to_bytes(),payload.to_vec()].concat()
    }
    /// Parse the header off the front of an expanded payload, returns the header and the rest.
    pub fn split(dat: &[u8]) -> Result<(Self,&[u8]),Error> {
        let mut rest = dat;
        let mut fields = Vec::new();
        for tag in [SENDER_TAG,RECEIVER_TAG] {
            let end = match rest.iter().position(|b| *b == b'\n') {
                Some(end) => end,
                None => return Err(Error::BadMetadata("header is incomplete".to_string()))
            };
            let line = std::str::from_utf8(&rest[0..end]).map_err(|_| Error::BadMetadata("header is not UTF-8".to_string()))?;
            match line.strip_prefix(tag) {
                Some(val) => fields.push(val.to_string()),
                None => return Err(Error::BadMetadata(format!("expected `{}`",tag.trim_end())))
            }
            rest = &rest[end+1..];
        }
        let receiver = fields.pop().unwrap_or_default();
        let sender = fields.pop().unwrap_or_default();
        Ok((Self { sender, receiver },rest))
    }
    pub fn check_receiver(&self,receiver: &str) -> Result<(),Error> {
        match self.receiver == receiver {
            true => Ok(()),
            false => {
                log::error!("payload is addressed to `{}`",self.receiver);
                Err(Error::ReceiverMismatch)
            }
        }
    }
}

#[test]
fn header_round_trip() {
    let header = Header::create("20230001,Alice","20230002,Bob").expect("bad header");
    let dat = header.prepend(b"line one\nline two\n");
    assert_eq!(dat,b"Sender: 20230001,Alice\nReceiver: 20230002,Bob\nline one\nline two\n".to_vec());
    let (back,rest) = Header::split(&dat).expect("split failed");
    assert_eq!(back,header);
    assert_eq!(rest,b"line one\nline two\n");
    assert_eq!(back.check_receiver("20230002,Bob"),Ok(()));
    assert_eq!(back.check_receiver("20230003,Eve"),Err(Error::ReceiverMismatch));
}

#[test]
fn bad_identifiers() {
    for ident in ["short,id","20230001 Alice","20230001,\nAlice"] {
        assert!(matches!(validate_ident(ident),Err(Error::BadMetadata(_))));
    }
    assert!(Header::create("20230001,Alice","bob").is_err());
}

#[test]
fn bad_headers() {
    assert!(matches!(Header::split(b"Sender: 20230001,Alice\n"),Err(Error::BadMetadata(_))));
    assert!(matches!(Header::split(b"From: x\nReceiver: y\n"),Err(Error::BadMetadata(_))));
    let (header,rest) = Header::split(b"Sender: a\nReceiver: b\n").expect("split failed");
    assert_eq!((header.sender.as_str(),header.receiver.as_str(),rest.len()),("a","b",0));
}
