use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ParseError;

/// Structural token consumed by the scanners
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Start tag (also produced for self-closing elements)
    Start(String),
    /// Unescaped character data or CDATA content
    Text(String),
    /// End tag; the element is still on the path while this token is handled
    End(String),
    /// End of a well-formed document
    Eof,
}

/// Pull reader that reduces quick-xml events to [`Token`]s and tracks the
/// path of open element names.
pub(crate) struct TokenReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    path: Vec<String>,
    pop_pending: bool,
}

impl<R: BufRead> TokenReader<R> {
    pub(crate) fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.trim_text(false);
        config.expand_empty_elements = true;
        config.check_end_names = true;

        Self {
            reader,
            buf: Vec::new(),
            path: Vec::new(),
            pop_pending: false,
        }
    }

    /// Read the next structural token
    pub(crate) fn next_token(&mut self) -> Result<Token, ParseError> {
        if self.pop_pending {
            self.path.pop();
            self.pop_pending = false;
        }

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let name = std::str::from_utf8(e.local_name().as_ref())?.to_owned();
                    self.path.push(name.clone());
                    return Ok(Token::Start(name));
                }
                Event::End(e) => {
                    let name = std::str::from_utf8(e.local_name().as_ref())?.to_owned();
                    self.pop_pending = true;
                    return Ok(Token::End(name));
                }
                Event::Text(t) => {
                    if self.path.is_empty() {
                        continue;
                    }
                    return Ok(Token::Text(t.unescape()?.into_owned()));
                }
                Event::CData(c) => {
                    let bytes = c.into_inner();
                    return Ok(Token::Text(std::str::from_utf8(&bytes)?.to_owned()));
                }
                Event::Eof => {
                    return match self.path.last() {
                        Some(open) => Err(ParseError::UnexpectedEof(open.clone())),
                        None => Ok(Token::Eof),
                    };
                }
                _ => {}
            }
        }
    }

    /// Number of currently open elements, the root counting as 1
    pub(crate) fn depth(&self) -> usize {
        self.path.len()
    }

    /// Element enclosing the most recently started (or ending) element
    pub(crate) fn parent(&self) -> Option<&str> {
        let len = self.path.len();
        if len >= 2 {
            Some(self.path[len - 2].as_str())
        } else {
            None
        }
    }

    /// Whether `name` is anywhere on the current path
    pub(crate) fn in_path(&self, name: &str) -> bool {
        self.path.iter().any(|open| open == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<Token>, ParseError> {
        let mut tokens = TokenReader::new(xml.as_bytes());
        let mut out = Vec::new();
        loop {
            let token = tokens.next_token()?;
            if token == Token::Eof {
                return Ok(out);
            }
            out.push(token);
        }
    }

    #[test]
    fn test_self_closing_expands() {
        let tokens = collect("<a><b/></a>").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Start("a".into()),
                Token::Start("b".into()),
                Token::End("b".into()),
                Token::End("a".into()),
            ]
        );
    }

    #[test]
    fn test_namespace_prefix_stripped() {
        let tokens = collect(r#"<ns:a xmlns:ns="urn:x"><ns:b>1</ns:b></ns:a>"#).unwrap();
        assert_eq!(tokens[1], Token::Start("b".into()));
    }

    #[test]
    fn test_entities_and_cdata() {
        let tokens = collect("<a>x &amp; y<![CDATA[<z>]]></a>").unwrap();
        assert_eq!(tokens[1], Token::Text("x & y".into()));
        assert_eq!(tokens[2], Token::Text("<z>".into()));
    }

    #[test]
    fn test_path_tracking_on_end() {
        let mut tokens = TokenReader::new("<a><b><c/></b></a>".as_bytes());
        tokens.next_token().unwrap(); // <a>
        tokens.next_token().unwrap(); // <b>
        tokens.next_token().unwrap(); // <c>
        assert_eq!(tokens.depth(), 3);
        assert_eq!(tokens.next_token().unwrap(), Token::End("c".into()));
        assert_eq!(tokens.parent(), Some("b"));
        assert!(tokens.in_path("a"));
        assert_eq!(tokens.next_token().unwrap(), Token::End("b".into()));
        assert_eq!(tokens.depth(), 2);
    }

    #[test]
    fn test_mismatched_end_tag_is_error() {
        assert!(matches!(
            collect("<a><b></a>"),
            Err(ParseError::XmlError(_))
        ));
    }

    #[test]
    fn test_unclosed_document_is_error() {
        match collect("<a><b>text</b>") {
            Err(ParseError::UnexpectedEof(name)) => assert_eq!(name, "a"),
            Err(ParseError::XmlError(_)) => {}
            other => panic!("expected an end-of-document error, got {:?}", other),
        }
    }
}
