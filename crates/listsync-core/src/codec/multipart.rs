//! Line-oriented reader for `multipart/mixed` bodies carrying `application/http` parts.
//!
//! A part looks like:
//!
//! ```text
//! --changeset_01H...
//! Content-Type: application/http
//! Content-Transfer-Encoding: binary
//! Content-ID: 2
//!
//! HTTP/1.1 201 Created
//! Content-Type: application/json;odata=nometadata
//!
//! {"Id":7}
//! ```
//!
//! The first delimiter line fixes the outer boundary. Nested multipart headers
//! (a changeset announced inside the batch) carry no HTTP message; their
//! `boundary=` parameter is remembered and nothing else. Any other `--` line
//! is body text.

/// One `application/http` part.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpPart {
    /// Value of the MIME `Content-ID` header, if present and numeric.
    pub content_id: Option<usize>,
    /// Request line or status line of the embedded HTTP message.
    pub start_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpPart {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Outside any part (preamble or after a nested multipart header block).
    Between,
    MimeHeaders,
    StartLine,
    HttpHeaders,
    Body,
}

/// Token of a delimiter-shaped line: `--token` or `--token--`, no whitespace.
fn delimiter_token(line: &str) -> Option<&str> {
    let line = line.trim_end();
    let rest = line.strip_prefix("--")?;
    let token = rest.strip_suffix("--").unwrap_or(rest);
    (!token.is_empty() && !token.contains(char::is_whitespace)).then_some(token)
}

fn split_header(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim().to_string(), value.trim().to_string()))
}

/// Read every `application/http` part of a multipart body, in order.
pub fn parse_http_parts(body: &str) -> Vec<HttpPart> {
    let mut parts = Vec::new();
    let mut state = State::Between;
    let mut mime: Vec<(String, String)> = Vec::new();
    let mut current = HttpPart::default();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut boundaries: Vec<String> = Vec::new();

    let mut finish = |current: &mut HttpPart, body_lines: &mut Vec<&str>| {
        let mut part = std::mem::take(current);
        part.body = body_lines.join("\r\n").trim_end().to_string();
        body_lines.clear();
        parts.push(part);
    };

    for line in body.lines() {
        let is_boundary = match delimiter_token(line) {
            Some(token) if boundaries.is_empty() => {
                boundaries.push(token.to_string());
                true
            }
            Some(token) => boundaries.iter().any(|b| b == token),
            None => false,
        };
        if is_boundary {
            if matches!(state, State::HttpHeaders | State::Body) {
                finish(&mut current, &mut body_lines);
            }
            mime.clear();
            state = State::MimeHeaders;
            continue;
        }

        match state {
            State::Between => {}
            State::MimeHeaders => {
                if line.trim().is_empty() {
                    let is_http = mime.iter().any(|(k, v)| {
                        k.eq_ignore_ascii_case("Content-Type")
                            && v.to_ascii_lowercase().starts_with("application/http")
                    });
                    if is_http {
                        current = HttpPart {
                            content_id: mime
                                .iter()
                                .find(|(k, _)| k.eq_ignore_ascii_case("Content-ID"))
                                .and_then(|(_, v)| v.trim_matches(['<', '>']).parse().ok()),
                            ..HttpPart::default()
                        };
                        state = State::StartLine;
                    } else {
                        if let Some(nested) = mime
                            .iter()
                            .filter(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
                            .find_map(|(_, v)| boundary_of(v))
                        {
                            boundaries.push(nested.to_string());
                        }
                        state = State::Between;
                    }
                } else if let Some(header) = split_header(line) {
                    mime.push(header);
                }
            }
            State::StartLine => {
                if !line.trim().is_empty() {
                    current.start_line = line.trim().to_string();
                    state = State::HttpHeaders;
                }
            }
            State::HttpHeaders => {
                if line.trim().is_empty() {
                    state = State::Body;
                } else if let Some(header) = split_header(line) {
                    current.headers.push(header);
                }
            }
            State::Body => body_lines.push(line),
        }
    }

    if matches!(state, State::HttpHeaders | State::Body) {
        finish(&mut current, &mut body_lines);
    }
    parts
}

/// Parsed `HTTP/1.1 201 Created`.
pub fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let mut it = line.splitn(3, ' ');
    let version = it.next()?;
    if !version.starts_with("HTTP/") {
        return None;
    }
    let status = it.next()?.parse().ok()?;
    let text = it.next().unwrap_or("").trim().to_string();
    Some((status, text))
}

/// Parsed `POST https://host/_api/... HTTP/1.1`.
pub fn parse_request_line(line: &str) -> Option<(String, String)> {
    let mut it = line.split_whitespace();
    let method = it.next()?.to_string();
    let url = it.next()?.to_string();
    it.next().filter(|v| v.starts_with("HTTP/"))?;
    Some((method, url))
}

/// `boundary=...` parameter of a `multipart/mixed` content type.
pub fn boundary_of(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|param| {
        let (k, v) = param.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| v.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "--batchresponse_1\r\n\
Content-Type: multipart/mixed; boundary=changesetresponse_1\r\n\
\r\n\
--changesetresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
Content-ID: 1\r\n\
\r\n\
HTTP/1.1 201 Created\r\n\
CONTENT-TYPE: application/json;odata=nometadata\r\n\
ETag: \"1\"\r\n\
\r\n\
{\"Id\":7}\r\n\
--changesetresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
Content-ID: 2\r\n\
\r\n\
HTTP/1.1 409 Conflict\r\n\
\r\n\
--changesetresponse_1--\r\n\
--batchresponse_1--\r\n";

    #[test]
    fn reads_parts_inside_nested_changeset() {
        let parts = parse_http_parts(RESPONSE);
        assert_eq!(parts.len(), 2);

        assert_eq!(parts[0].content_id, Some(1));
        assert_eq!(parts[0].start_line, "HTTP/1.1 201 Created");
        assert_eq!(parts[0].header_value("etag"), Some("\"1\""));
        assert_eq!(parts[0].body, "{\"Id\":7}");

        assert_eq!(parts[1].content_id, Some(2));
        assert_eq!(parts[1].body, "");
    }

    #[test]
    fn dash_lines_in_a_body_stay_in_the_body() {
        let body = "--batch_1\r\n\
Content-Type: application/http\r\n\
Content-ID: 1\r\n\
\r\n\
HTTP/1.1 400 Bad Request\r\n\
\r\n\
--x\r\n\
--changeset_other\r\n\
tail\r\n\
--batch_1\r\n\
Content-Type: application/http\r\n\
Content-ID: 2\r\n\
\r\n\
HTTP/1.1 201 Created\r\n\
\r\n\
--batch_1--\r\n";

        let parts = parse_http_parts(body);

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].body, "--x\r\n--changeset_other\r\ntail");
        assert_eq!(parts[1].content_id, Some(2));
        assert_eq!(parts[1].start_line, "HTTP/1.1 201 Created");
    }

    #[test]
    fn delimiter_lines() {
        assert_eq!(delimiter_token("--batch_1"), Some("batch_1"));
        assert_eq!(delimiter_token("--batch_1--"), Some("batch_1"));
        assert_eq!(delimiter_token("--"), None);
        assert_eq!(delimiter_token("-- not a boundary"), None);
        assert_eq!(delimiter_token("text"), None);
    }

    #[test]
    fn plain_text_has_no_parts() {
        assert!(parse_http_parts("Service Unavailable").is_empty());
        assert!(parse_http_parts("").is_empty());
    }

    #[test]
    fn status_and_request_lines() {
        assert_eq!(
            parse_status_line("HTTP/1.1 412 Precondition Failed"),
            Some((412, "Precondition Failed".to_string()))
        );
        assert_eq!(parse_status_line("HTTP/1.1 abc"), None);
        assert_eq!(parse_status_line("POST /x HTTP/1.1"), None);

        assert_eq!(
            parse_request_line("POST https://h/_api/web HTTP/1.1"),
            Some(("POST".to_string(), "https://h/_api/web".to_string()))
        );
        assert_eq!(parse_request_line("HTTP/1.1 200 OK"), None);
    }

    #[test]
    fn boundary_parameter() {
        assert_eq!(
            boundary_of("multipart/mixed; boundary=batch_01H"),
            Some("batch_01H")
        );
        assert_eq!(
            boundary_of("multipart/mixed; boundary=\"changeset_9\""),
            Some("changeset_9")
        );
        assert_eq!(boundary_of("application/json"), None);
    }
}
