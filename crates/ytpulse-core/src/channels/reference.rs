use once_cell::sync::Lazy;
use regex::Regex;

/// Bare channel ID: `UC` followed by 22 id characters
static CHANNEL_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^UC[A-Za-z0-9_-]{22}$").unwrap());

/// Channel URL carrying an ID (`.../channel/UC...`)
static CHANNEL_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/channel/(UC[A-Za-z0-9_-]{22})").unwrap());

/// Channel URL carrying a handle (`.../@name`)
static HANDLE_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/@([A-Za-z0-9._-]+)").unwrap());

/// How a channel is looked up upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Channel ID (`UC...`)
    Id,
    /// `@handle`, stored without the `@`
    Handle,
    /// Legacy username
    Username,
}

impl ReferenceKind {
    /// Query parameter used by the channels endpoint for this kind
    pub fn query_param(&self) -> &'static str {
        match self {
            ReferenceKind::Id => "id",
            ReferenceKind::Handle => "forHandle",
            ReferenceKind::Username => "forUsername",
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Id => write!(f, "id"),
            ReferenceKind::Handle => write!(f, "handle"),
            ReferenceKind::Username => write!(f, "username"),
        }
    }
}

/// A typed reference to one tracked channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReference {
    pub kind: ReferenceKind,
    pub value: String,
}

impl EntityReference {
    fn new(kind: ReferenceKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl std::fmt::Display for EntityReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ReferenceKind::Handle => write!(f, "@{}", self.value),
            _ => write!(f, "{}", self.value),
        }
    }
}

/// Parse one line of the channel list into a reference.
///
/// Recognized forms, first match wins:
/// 1. bare channel ID (`UCxxxxxxxxxxxxxxxxxxxxxx`)
/// 2. URL containing `/channel/<ID>`
/// 3. URL containing `/@<handle>`
/// 4. bare `@handle`
/// 5. anything else is treated as a legacy username
///
/// Blank lines and `#` comments yield `None`, as does a lone `@`.
pub fn parse_reference(line: &str) -> Option<EntityReference> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if CHANNEL_ID_RE.is_match(line) {
        return Some(EntityReference::new(ReferenceKind::Id, line));
    }

    if let Some(caps) = CHANNEL_URL_RE.captures(line) {
        return Some(EntityReference::new(ReferenceKind::Id, &caps[1]));
    }

    if let Some(caps) = HANDLE_URL_RE.captures(line) {
        return Some(EntityReference::new(ReferenceKind::Handle, &caps[1]));
    }

    if let Some(handle) = line.strip_prefix('@') {
        if handle.is_empty() {
            return None;
        }
        return Some(EntityReference::new(ReferenceKind::Handle, handle));
    }

    Some(EntityReference::new(ReferenceKind::Username, line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parsed(line: &str) -> (ReferenceKind, String) {
        let r = parse_reference(line).expect("should parse");
        (r.kind, r.value)
    }

    #[test]
    fn test_bare_channel_id() {
        let ids = [
            "UC1234567890123456789012",
            "UC_x5XG1OV2P6uZZ5FSM9Ttw",
            "UCabcdefghij-klmnopqrstu",
        ];
        for id in ids {
            assert_eq!(parsed(id), (ReferenceKind::Id, id.to_string()));
        }
    }

    #[test]
    fn test_id_with_wrong_length_falls_back_to_username() {
        assert_eq!(
            parsed("UC12345"),
            (ReferenceKind::Username, "UC12345".to_string())
        );
    }

    #[test]
    fn test_channel_url() {
        assert_eq!(
            parsed("https://youtube.com/channel/UC1234567890123456789012"),
            (ReferenceKind::Id, "UC1234567890123456789012".to_string())
        );
        assert_eq!(
            parsed("https://www.youtube.com/channel/UC1234567890123456789012/videos"),
            (ReferenceKind::Id, "UC1234567890123456789012".to_string())
        );
    }

    #[test]
    fn test_handle_url() {
        assert_eq!(
            parsed("https://www.youtube.com/@Some.Channel-1_x/featured"),
            (ReferenceKind::Handle, "Some.Channel-1_x".to_string())
        );
    }

    #[test]
    fn test_bare_handle() {
        assert_eq!(
            parsed("@mychannel"),
            (ReferenceKind::Handle, "mychannel".to_string())
        );
        assert!(parse_reference("@").is_none());
    }

    #[test]
    fn test_username_fallback() {
        assert_eq!(
            parsed("  LegacyUser  "),
            (ReferenceKind::Username, "LegacyUser".to_string())
        );
    }

    #[test]
    fn test_skip_lines() {
        assert!(parse_reference("").is_none());
        assert!(parse_reference("   \t").is_none());
        assert!(parse_reference("# comment").is_none());
        assert!(parse_reference("   # indented comment").is_none());
    }

    #[test]
    fn test_query_param_per_kind() {
        assert_eq!(ReferenceKind::Id.query_param(), "id");
        assert_eq!(ReferenceKind::Handle.query_param(), "forHandle");
        assert_eq!(ReferenceKind::Username.query_param(), "forUsername");
    }

    #[test]
    fn test_display() {
        let r = parse_reference("@demo").unwrap();
        assert_eq!(r.to_string(), "@demo");
    }
}
