//! Pure classification of directory-listing entries.
//!
//! The listing grammar is thin: an entry ending in `/` is a directory,
//! anything else is a terminal file, and one directory suffix
//! (`/meta-data/public-keys/`) switches to the indexed-array encoding.
//! Nothing here performs I/O; the engine maps these kinds onto node states.

/// Child-path suffix identifying the indexed-array directory.
pub const PUBLIC_KEYS_SUFFIX: &str = "/meta-data/public-keys/";

/// What kind of node a listing entry names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A sub-directory; its listing is fetched and classified in turn.
    Directory,
    /// The `public-keys/` indexed-array directory.
    PublicKeyDir,
    /// A terminal file; fetched once, never expanded.
    File,
}

/// Join a listing entry onto its parent path without doubling the separator.
pub fn join_child(parent: &str, entry: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{entry}")
    } else {
        format!("{parent}/{entry}")
    }
}

/// Classify one line of a directory listing, returning the kind and the
/// child path to fetch.
///
/// Empty lines have no meaning in the listing grammar and yield `None`;
/// callers log and skip them rather than crash.
pub fn classify_entry(parent: &str, entry: &str) -> Option<(EntryKind, String)> {
    if entry.is_empty() {
        return None;
    }

    let child = join_child(parent, entry);

    if entry.ends_with('/') {
        if child.ends_with(PUBLIC_KEYS_SUFFIX) {
            Some((EntryKind::PublicKeyDir, child))
        } else {
            Some((EntryKind::Directory, child))
        }
    } else {
        Some((EntryKind::File, child))
    }
}

/// Extract the index from a `{index}={key_name}` listing line.
///
/// A line without `=` is taken whole; the service never produces one, but
/// the index is what gets fetched either way.
pub fn public_key_index(entry: &str) -> &str {
    entry.split_once('=').map(|(index, _)| index).unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_child_never_doubles_separator() {
        assert_eq!(join_child("/latest/meta-data/", "ami-id"), "/latest/meta-data/ami-id");
        assert_eq!(join_child("/latest/meta-data", "ami-id"), "/latest/meta-data/ami-id");
    }

    #[test]
    fn trailing_slash_means_directory() {
        assert_eq!(
            classify_entry("/latest/meta-data/", "network/"),
            Some((EntryKind::Directory, "/latest/meta-data/network/".to_string()))
        );
    }

    #[test]
    fn public_keys_directory_is_special() {
        assert_eq!(
            classify_entry("/latest/meta-data/", "public-keys/"),
            Some((
                EntryKind::PublicKeyDir,
                "/latest/meta-data/public-keys/".to_string()
            ))
        );

        // only the exact suffix triggers the array handling
        assert_eq!(
            classify_entry("/latest/meta-data/", "public-keys-backup/"),
            Some((
                EntryKind::Directory,
                "/latest/meta-data/public-keys-backup/".to_string()
            ))
        );
    }

    #[test]
    fn plain_entry_is_a_file() {
        assert_eq!(
            classify_entry("/latest/meta-data/", "instance-id"),
            Some((EntryKind::File, "/latest/meta-data/instance-id".to_string()))
        );
    }

    #[test]
    fn empty_entry_is_unclassifiable() {
        assert_eq!(classify_entry("/latest/meta-data/", ""), None);
    }

    #[test]
    fn public_key_index_takes_text_before_equals() {
        assert_eq!(public_key_index("0=my-key"), "0");
        assert_eq!(public_key_index("12=name=with=equals"), "12");
        assert_eq!(public_key_index("0"), "0");
    }
}
