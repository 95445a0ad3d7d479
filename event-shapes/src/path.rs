use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// Paths longer than this never resolve. Path strings may come from configuration
/// or payloads, so the walk is bounded.
pub const MAX_PATH_DEPTH: usize = 64;

lazy_static! {
    // `a[0].b` is the same path as `a.0.b`
    static ref BRACKET_INDEX: Regex = Regex::new(r"\[([0-9]+)\]").expect("Invalid bracket index regex. It's a bug.");
}

/// A single step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Looks up a key in an object. Also indexes arrays if it is a canonical decimal number,
    /// i.e. ASCII digits without sign or leading zeros.
    Key(String),
    /// Indexes an array. Also looks up its decimal form as an object key.
    Index(usize),
}

impl Segment {
    /// Returns the child of `value` addressed by this segment, if any.
    /// Anything other than an object or an array has no children.
    fn child<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match (self, value) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Key(key), Value::Array(items)) => array_index(key).and_then(|idx| items.get(idx)),
            (Segment::Index(idx), Value::Array(items)) => items.get(*idx),
            (Segment::Index(idx), Value::Object(map)) => map.get(&idx.to_string()),
            _ => None,
        }
    }
}

/// `"0"`, `"12"` are indices. `"01"`, `"+1"`, `"1.0"` are not.
fn array_index(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));

    if canonical {
        key.parse::<usize>().ok()
    } else {
        None
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_owned())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(idx: usize) -> Self {
        Segment::Index(idx)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// An ordered list of segments, either pre-split or parsed from a dotted string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parses a dotted path such as `requestContext.stage` or `records[0].body`.
    ///
    /// Every `[N]` is rewritten to `.N` before the string is split on `.`.
    /// Brackets that do not hold a plain number are kept as part of the key.
    pub fn parse(path: &str) -> Self {
        let normalized = BRACKET_INDEX.replace_all(path, ".$1");
        Path {
            segments: normalized.split('.').map(Segment::from).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Path::parse(path)
    }
}

impl From<&String> for Path {
    fn from(path: &String) -> Self {
        Path::parse(path)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path { segments }
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Path {
            segments: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.segments.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(".");
        f.write_str(&joined)
    }
}

/// Walks `path` through `root` one segment at a time.
///
/// Returns `None` if any segment is missing, an intermediate value cannot be indexed
/// or the path is longer than [MAX_PATH_DEPTH]. An explicit `null` at the end of the path
/// is returned as `Some(&Value::Null)`.
pub fn resolve<'a, P: Into<Path>>(root: &'a Value, path: P) -> Option<&'a Value> {
    let path = path.into();

    if path.len() > MAX_PATH_DEPTH {
        debug!("Path too deep: {} segments, max {}", path.len(), MAX_PATH_DEPTH);
        return None;
    }

    path.segments.iter().try_fold(root, |current, segment| segment.child(current))
}

/// Same as [resolve], but returns an owned copy of the value or `fallback` if the path is absent.
pub fn get<P: Into<Path>>(root: &Value, path: P, fallback: Value) -> Value {
    match resolve(root, path) {
        Some(v) => v.clone(),
        None => fallback,
    }
}
