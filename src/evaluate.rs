//! Per-object evaluation against the member classifier.
//!
//! An object is a candidate when one of its members matches a primary
//! pattern. In elastic mode it must additionally end with a flexible `char`
//! array, so the whole layout is read to find the last member.

use log::debug;

use crate::error::InspectError;
use crate::member::{MemberTrait, classify_elastic, classify_member, is_delimiter};

/// Lazily produced layout lines for one object. The first line is the
/// object's own name.
pub type MemberLines<'a> = Box<dyn Iterator<Item = Result<String, InspectError>> + 'a>;

/// Anything that can describe an object's layout line by line.
pub trait LayoutSource: Sync {
    fn layout<'a>(&'a self, object: &str) -> Result<MemberLines<'a>, InspectError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    /// First primary pattern found, if any.
    pub primary: Option<MemberTrait>,
    /// Last member seen is a flexible trailing array. Only computed when
    /// elastic evaluation was requested.
    pub elastic_tail: bool,
    pub members_read: usize,
}

impl Verdict {
    pub fn matches(&self, want_elastic: bool) -> bool {
        if want_elastic {
            self.primary.is_some() && self.elastic_tail
        } else {
            self.primary.is_some()
        }
    }
}

pub fn evaluate<S: LayoutSource + ?Sized>(
    source: &S,
    object: &str,
    want_elastic: bool,
) -> Result<Verdict, InspectError> {
    let mut lines = source.layout(object)?;
    let mut verdict = Verdict::default();
    let mut last_member: Option<String> = None;

    // The name line carries no member, but a failed run surfaces here.
    if let Some(first) = lines.next() {
        first?;
    }

    for line in lines {
        let line = line?;
        if is_delimiter(&line) {
            continue;
        }
        verdict.members_read += 1;

        if verdict.primary.is_none() {
            verdict.primary = classify_member(&line);
        }
        if verdict.primary.is_some() && !want_elastic {
            break;
        }
        last_member = Some(line);
    }

    if want_elastic {
        verdict.elastic_tail = last_member.as_deref().is_some_and(classify_elastic);
    }

    debug!(
        "{object}: primary={:?} elastic_tail={} members={}",
        verdict.primary.map(|t| t.as_str()),
        verdict.elastic_tail,
        verdict.members_read
    );
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeLayouts;

    const LAST_BOMB: &str = "\tstruct list_head * (*never)(struct file_operations *);";

    #[test]
    fn non_elastic_stops_at_first_primary_match() {
        let fake = FakeLayouts::new().with(
            "session",
            &[
                "struct session {",
                "\tint                        id;",
                "\tvoid                       (*close)(struct session *);",
                "\tint                        never_read;",
                LAST_BOMB,
                "};",
            ],
        );

        let verdict = evaluate(&fake, "session", false).unwrap();
        assert!(verdict.matches(false));
        assert_eq!(verdict.primary, Some(MemberTrait::FunctionPointer));
        assert_eq!(verdict.members_read, 2);
        // name + id + close; nothing after the match is pulled
        assert_eq!(fake.lines_pulled(), 3);
    }

    #[test]
    fn first_line_is_skipped_even_if_it_looks_interesting() {
        let fake = FakeLayouts::new().with(
            "list_head",
            &["struct list_head {", "\tlong a;", "};"],
        );
        assert!(!evaluate(&fake, "list_head", false).unwrap().matches(false));
    }

    #[test]
    fn elastic_requires_primary_and_trailing_array() {
        let fake = FakeLayouts::new()
            .with(
                "msg",
                &[
                    "struct msg {",
                    "\tstruct list_head           m_list;               /*     0    16 */",
                    "\tlong                       m_type;               /*    16     8 */",
                    "\tchar                       text[];               /*    24     0 */",
                    "",
                    "\t/* size: 24, cachelines: 1, members: 3 */",
                    "};",
                ],
            )
            .with(
                "blob",
                &[
                    "struct blob {",
                    "\tint                        len;",
                    "\tchar                       data[];",
                    "};",
                ],
            );

        let msg = evaluate(&fake, "msg", true).unwrap();
        assert!(msg.matches(true));
        assert_eq!(msg.members_read, 3);

        let blob = evaluate(&fake, "blob", true).unwrap();
        assert!(blob.elastic_tail);
        assert!(!blob.matches(true));
    }

    #[test]
    fn elastic_is_monotonic_without_trailing_array() {
        let fake = FakeLayouts::new().with(
            "timer",
            &[
                "struct timer {",
                "\tvoid                       (*fn)(struct timer *);",
                "\tchar                       name[16];",
                "};",
            ],
        );
        let v = evaluate(&fake, "timer", true).unwrap();
        assert!(v.primary.is_some());
        assert!(!v.matches(true));
    }

    #[test]
    fn elastic_reads_whole_layout_after_primary_match() {
        let fake = FakeLayouts::new().with(
            "pkt",
            &[
                "struct pkt {",
                "\tstruct list_head           node;",
                "\tint                        a;",
                "\tint                        b;",
                "\tchar                       payload[];",
                "};",
            ],
        );
        let v = evaluate(&fake, "pkt", true).unwrap();
        assert!(v.matches(true));
        assert_eq!(fake.lines_pulled(), 6);
    }

    #[test]
    fn error_on_name_line_is_not_swallowed() {
        let fake = FakeLayouts::new().with_broken("gone");
        for want_elastic in [false, true] {
            let err = evaluate(&fake, "gone", want_elastic).unwrap_err();
            assert!(matches!(err, InspectError::Read { .. }));
        }
    }

    #[test]
    fn layout_errors_propagate() {
        let fake = FakeLayouts::new();
        let err = evaluate(&fake, "missing", false).unwrap_err();
        assert!(!err.is_fatal());
    }
}
