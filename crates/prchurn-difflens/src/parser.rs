use std::fmt;

use prchurn_core::{ChurnError, Interval, PrFile};

/// The four numbers of a `@@ -start,count +start,count @@` hunk header.
///
/// # Examples
///
/// ```
/// use prchurn_difflens::parser::parse_hunk_header;
///
/// let header = parse_hunk_header("@@ -10,5 +12,7 @@").unwrap();
/// assert_eq!((header.orig_start, header.orig_count), (10, 5));
/// assert_eq!((header.new_start, header.new_count), (12, 7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    /// First pre-image line covered by the hunk.
    pub orig_start: u32,
    /// Pre-image lines covered by the hunk.
    pub orig_count: u32,
    /// First post-image line covered by the hunk.
    pub new_start: u32,
    /// Post-image lines covered by the hunk.
    pub new_count: u32,
}

/// Classification of one hunk body line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Unchanged line (leading space, or an empty line).
    Context,
    /// Line starting with `+`.
    Addition,
    /// Line starting with `-`.
    Deletion,
}

impl LineKind {
    fn classify(line: &str) -> Self {
        if line.starts_with('+') {
            LineKind::Addition
        } else if line.starts_with('-') {
            LineKind::Deletion
        } else {
            LineKind::Context
        }
    }
}

/// One hunk of a patch: its header and the kinds of its body lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Parsed header.
    pub header: HunkHeader,
    /// Body lines in order.
    pub lines: Vec<LineKind>,
}

impl Hunk {
    /// Pre-image ranges this hunk deletes or replaces.
    ///
    /// Runs of consecutive deletions form one range. The line number of a
    /// body line is `orig_start` plus its position in the body, corrected by
    /// the additions seen before the run opened. Pure-addition hunks produce
    /// nothing. A run still open at the end of the body is closed there.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Parse`] if a body line's number does not fit in
    /// a `u32`.
    pub fn changed_ranges(&self) -> Result<Vec<Interval>, ChurnError> {
        let offset = self.header.orig_start;
        let line_number = |n: usize| {
            u32::try_from(n)
                .ok()
                .and_then(|n| offset.checked_add(n))
                .ok_or_else(|| {
                    ChurnError::Parse(format!(
                        "hunk starting at line {offset} runs past the last line number"
                    ))
                })
        };

        let mut ranges = Vec::new();
        let mut in_deletion_group = false;
        let mut group_start = offset;
        let mut leading_additions = 0u32;

        for (n, kind) in self.lines.iter().enumerate() {
            let candidate = line_number(n)?;
            let is_deletion = *kind == LineKind::Deletion;

            if *kind == LineKind::Addition && !in_deletion_group {
                leading_additions += 1;
            }
            if is_deletion && !in_deletion_group {
                group_start = candidate - leading_additions;
            }

            if is_deletion {
                in_deletion_group = true;
            } else if in_deletion_group {
                ranges.push(Interval::try_new(
                    group_start,
                    candidate - 1 - leading_additions,
                )?);
                in_deletion_group = false;
                leading_additions = 0;
            }
        }

        if in_deletion_group {
            let candidate = line_number(self.lines.len())?;
            ranges.push(Interval::try_new(
                group_start,
                candidate - 1 - leading_additions,
            )?);
        }

        Ok(ranges)
    }
}

/// Split a single file's patch into hunks.
///
/// Every line starting with `@@ ` opens a hunk; the lines up to the next
/// header are its body. Text before the first header is ignored, and so is
/// anything after the closing `@@` on the header line itself.
/// `\ No newline at end of file` markers are not body lines.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] naming the header when one is malformed.
pub fn split_hunks(patch: &str) -> Result<Vec<Hunk>, ChurnError> {
    let mut hunks: Vec<Hunk> = Vec::new();

    for line in patch.lines() {
        if line.starts_with("@@ ") {
            hunks.push(Hunk {
                header: parse_hunk_header(line)?,
                lines: Vec::new(),
            });
            continue;
        }

        if line.starts_with('\\') {
            continue;
        }

        if let Some(hunk) = hunks.last_mut() {
            hunk.lines.push(LineKind::classify(line));
        }
    }

    Ok(hunks)
}

/// Pre-image line ranges a patch deletes or replaces, across all hunks in
/// encounter order. Ranges from different hunks are not merged.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] if a hunk header is malformed or a hunk
/// runs past the largest line number.
///
/// # Examples
///
/// ```
/// use prchurn_core::Interval;
/// use prchurn_difflens::parser::extract_changed_ranges;
///
/// let patch = "@@ -1,4 +1,4 @@\n line1\n-line2\n+line2mod\n line3\n line4";
/// assert_eq!(extract_changed_ranges(patch).unwrap(), vec![Interval::new(2, 2)]);
/// ```
pub fn extract_changed_ranges(patch: &str) -> Result<Vec<Interval>, ChurnError> {
    let mut ranges = Vec::new();
    for hunk in split_hunks(patch)? {
        ranges.extend(hunk.changed_ranges()?);
    }
    Ok(ranges)
}

/// Parse a `@@ -start,count +start,count @@` header line.
///
/// An omitted count (`@@ -3 +3 @@`) means one line, as git writes it.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] naming the header if it does not match or
/// its ranges run past `u32::MAX`.
pub fn parse_hunk_header(line: &str) -> Result<HunkHeader, ChurnError> {
    let inner = line
        .strip_prefix("@@ ")
        .and_then(|s| {
            let end = s.find(" @@")?;
            Some(&s[..end])
        })
        .ok_or_else(|| ChurnError::Parse(format!("invalid hunk header: {line}")))?;

    let parts: Vec<&str> = inner.split(' ').collect();
    if parts.len() != 2 {
        return Err(ChurnError::Parse(format!("invalid hunk header: {line}")));
    }

    let old = parts[0]
        .strip_prefix('-')
        .ok_or_else(|| ChurnError::Parse(format!("invalid old range in hunk: {line}")))?;
    let new = parts[1]
        .strip_prefix('+')
        .ok_or_else(|| ChurnError::Parse(format!("invalid new range in hunk: {line}")))?;

    let (orig_start, orig_count) = parse_range(old, line)?;
    let (new_start, new_count) = parse_range(new, line)?;

    if orig_start.checked_add(orig_count).is_none() || new_start.checked_add(new_count).is_none() {
        return Err(ChurnError::Parse(format!("hunk range out of bounds: {line}")));
    }

    Ok(HunkHeader {
        orig_start,
        orig_count,
        new_start,
        new_count,
    })
}

fn parse_range(range: &str, context: &str) -> Result<(u32, u32), ChurnError> {
    if let Some((start, count)) = range.split_once(',') {
        let s = start
            .parse()
            .map_err(|_| ChurnError::Parse(format!("invalid range number in: {context}")))?;
        let c = count
            .parse()
            .map_err(|_| ChurnError::Parse(format!("invalid range count in: {context}")))?;
        Ok((s, c))
    } else {
        let s = range
            .parse()
            .map_err(|_| ChurnError::Parse(format!("invalid range number in: {context}")))?;
        Ok((s, 1))
    }
}

/// One file section of a multi-file unified diff.
///
/// # Examples
///
/// ```
/// use prchurn_difflens::parser::parse_unified_diff;
///
/// let diff = "diff --git a/hello.rs b/hello.rs\n\
///             --- a/hello.rs\n\
///             +++ b/hello.rs\n\
///             @@ -1,3 +1,3 @@\n\
///              fn main() {\n\
///             -    old();\n\
///             +    new();\n\
///              }\n";
/// let files = parse_unified_diff(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert!(files[0].patch.starts_with("@@ -1,3 +1,3 @@"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    /// Path in the old version (`/dev/null` for new files).
    pub old_path: String,
    /// Path in the new version (`/dev/null` for deleted files).
    pub new_path: String,
    /// Hunk headers and bodies, in the shape of a GitHub `patch` field.
    pub patch: String,
    /// Whether this is a newly created file.
    pub is_new_file: bool,
    /// Whether this file was deleted.
    pub is_deleted_file: bool,
    /// Whether this file was renamed.
    pub is_rename: bool,
}

impl FilePatch {
    /// Convert to the same shape the PR files endpoint returns.
    pub fn into_pr_file(self) -> PrFile {
        let status = if self.is_new_file {
            "added"
        } else if self.is_deleted_file {
            "removed"
        } else if self.is_rename {
            "renamed"
        } else {
            "modified"
        };

        let filename = if self.is_deleted_file {
            self.old_path.clone()
        } else {
            self.new_path.clone()
        };

        let previous_filename = (self.is_rename
            && !self.old_path.is_empty()
            && self.old_path != self.new_path)
            .then(|| self.old_path.clone());

        PrFile {
            filename,
            previous_filename,
            status: status.to_string(),
            patch: (!self.patch.is_empty()).then_some(self.patch),
        }
    }
}

impl fmt::Display for FilePatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hunks = self.patch.lines().filter(|l| l.starts_with("@@ ")).count();
        write!(f, "{} ({hunks} hunks)", self.new_path)
    }
}

/// Split a unified diff (as produced by `git diff`) into per-file patches.
///
/// Handles new, deleted, renamed and binary files; binary files are dropped.
/// Hunk headers are validated here so a malformed diff fails early.
///
/// # Errors
///
/// Returns [`ChurnError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use prchurn_difflens::parser::parse_unified_diff;
///
/// assert!(parse_unified_diff("").unwrap().is_empty());
/// ```
pub fn parse_unified_diff(input: &str) -> Result<Vec<FilePatch>, ChurnError> {
    let mut files: Vec<FilePatch> = Vec::new();
    let mut current: Option<FilePatch> = None;
    // Pre-image and post-image lines still expected in the open hunk.
    let mut remaining = (0u32, 0u32);
    let mut is_binary = false;

    for line in input.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(file) = current.take() {
                if !is_binary {
                    files.push(file);
                }
            }
            is_binary = false;
            remaining = (0, 0);
            let mut file = FilePatch::default();
            if let Some((old, new)) = rest.rsplit_once(" b/") {
                file.old_path = parse_path(old);
                file.new_path = new.to_string();
            }
            current = Some(file);
            continue;
        }

        let in_hunk = remaining != (0, 0);

        // Patches without a "diff --git" line start at the "---" header.
        if line.starts_with("--- ")
            && !in_hunk
            && current.as_ref().map_or(true, |f| !f.patch.is_empty())
        {
            if let Some(file) = current.take() {
                files.push(file);
            }
            current = Some(FilePatch::default());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if line.starts_with("@@ ") {
            let header = parse_hunk_header(line)?;
            remaining = (header.orig_count, header.new_count);
            file.patch.push_str(line);
            file.patch.push('\n');
            continue;
        }

        if in_hunk || line.starts_with('\\') {
            match line.as_bytes().first() {
                Some(b'+') => remaining.1 = remaining.1.saturating_sub(1),
                Some(b'-') => remaining.0 = remaining.0.saturating_sub(1),
                Some(b'\\') => {}
                _ => {
                    remaining.0 = remaining.0.saturating_sub(1);
                    remaining.1 = remaining.1.saturating_sub(1);
                }
            }
            file.patch.push_str(line);
            file.patch.push('\n');
            continue;
        }

        if line.starts_with("Binary files ") && line.ends_with(" differ") {
            is_binary = true;
        } else if line.starts_with("new file mode") {
            file.is_new_file = true;
        } else if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
        } else if let Some(path) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_path = path.to_string();
        } else if let Some(path) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_path = path.to_string();
        } else if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            if file.old_path == "/dev/null" {
                file.is_new_file = true;
            }
        } else if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if file.new_path == "/dev/null" {
                file.is_deleted_file = true;
            }
        }
    }

    if let Some(file) = current.take() {
        if !is_binary {
            files.push(file);
        }
    }

    Ok(files)
}

fn parse_path(raw: &str) -> String {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return normalized.to_string();
    }

    normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized)
        .to_string()
}
