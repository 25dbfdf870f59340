//! Canonical RFC 7231 reason phrases, and the `:reason` pseudo-header
//! override that lets a caller ship a non-canonical phrase (e.g. a server
//! that wants to send `200 Awesome` instead of `200 OK`).

/// Looks up the canonical reason phrase for a three-digit status code.
/// Returns `None` for codes outside RFC 7231/7232/7233/7235's registry
/// (e.g. unassigned or custom codes), in which case a caller should fall
/// back to something generic or require an explicit `:reason`.
pub fn canonical_reason(status_code: u16) -> Option<&'static str> {
    Some(match status_code {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        103 => "Early Hints",

        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        226 => "IM Used",

        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",

        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        425 => "Too Early",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",

        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also Negotiates",
        507 => "Insufficient Storage",
        508 => "Loop Detected",
        510 => "Not Extended",
        511 => "Network Authentication Required",

        _ => return None,
    })
}

/// Resolves the reason phrase to write for `status_code`, preferring an
/// explicit override (the `:reason` pseudo-header, when present in
/// `headers`) over the canonical table, and falling back to an empty
/// phrase for codes this table doesn't recognize and that the caller
/// didn't override.
pub fn resolve_reason(status_code: u16, override_reason: Option<&[u8]>) -> &str {
    if let Some(bytes) = override_reason {
        return std::str::from_utf8(bytes).unwrap_or("");
    }
    canonical_reason(status_code).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(canonical_reason(200), Some("OK"));
        assert_eq!(canonical_reason(404), Some("Not Found"));
        assert_eq!(canonical_reason(500), Some("Internal Server Error"));
    }

    #[test]
    fn test_unknown_code_is_none() {
        assert_eq!(canonical_reason(999), None);
    }

    #[test]
    fn test_override_wins_over_canonical() {
        assert_eq!(resolve_reason(200, Some(b"Awesome")), "Awesome");
    }

    #[test]
    fn test_falls_back_to_canonical_without_override() {
        assert_eq!(resolve_reason(200, None), "OK");
    }
}
