use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::InspectError;
use crate::evaluate::{LayoutSource, MemberLines};

/// In-memory layouts keyed by object name. Unknown objects fail with a
/// per-object read error; objects marked fatal fail like a missing binary;
/// broken objects start streaming and fail on the first line.
#[derive(Default)]
pub struct FakeLayouts {
    layouts: HashMap<String, Vec<String>>,
    fatal: HashSet<String>,
    broken: HashSet<String>,
    pulled: AtomicUsize,
    inspected: Mutex<Vec<String>>,
}

impl FakeLayouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, object: &str, lines: &[&str]) -> Self {
        self.layouts.insert(
            object.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn with_lines(self, object: &str, lines: Vec<String>) -> Self {
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.with(object, &refs)
    }

    pub fn with_fatal(mut self, object: &str) -> Self {
        self.fatal.insert(object.to_string());
        self
    }

    pub fn with_broken(mut self, object: &str) -> Self {
        self.broken.insert(object.to_string());
        self
    }

    pub fn lines_pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn inspected(&self) -> Vec<String> {
        self.inspected.lock().expect("inspected lock poisoned").clone()
    }
}

impl LayoutSource for FakeLayouts {
    fn layout<'a>(&'a self, object: &str) -> Result<MemberLines<'a>, InspectError> {
        self.inspected
            .lock()
            .expect("inspected lock poisoned")
            .push(object.to_string());

        if self.fatal.contains(object) {
            return Err(InspectError::Launch {
                bin: PathBuf::from("pahole"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        if self.broken.contains(object) {
            let err = InspectError::Read {
                object: object.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stream died"),
            };
            return Ok(Box::new(std::iter::once(Err(err))));
        }

        let Some(lines) = self.layouts.get(object) else {
            return Err(InspectError::Read {
                object: object.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "no such layout"),
            });
        };

        let pulled = &self.pulled;
        Ok(Box::new(lines.iter().map(move |l| {
            pulled.fetch_add(1, Ordering::SeqCst);
            Ok(l.clone())
        })))
    }
}

/// A typical `pahole -E` layout with a function pointer member.
pub fn fn_ptr_layout(name: &str) -> Vec<String> {
    vec![
        format!("struct {name} {{"),
        "\tint                        refcnt;               /*     0     4 */".to_string(),
        "\tvoid                       (*release)(void *);   /*     8     8 */".to_string(),
        String::new(),
        "\t/* size: 16, cachelines: 1, members: 2 */".to_string(),
        "};".to_string(),
    ]
}

/// A layout with nothing interesting in it.
pub fn plain_layout(name: &str) -> Vec<String> {
    vec![
        format!("struct {name} {{"),
        "\tint                        a;                    /*     0     4 */".to_string(),
        "\tint                        b;                    /*     4     4 */".to_string(),
        "};".to_string(),
    ]
}

/// Primary match plus a flexible trailing array.
pub fn elastic_layout(name: &str) -> Vec<String> {
    vec![
        format!("struct {name} {{"),
        "\tstruct list_head           list;                 /*     0    16 */".to_string(),
        "\tchar                       data[];              /*    16     0 */".to_string(),
        "};".to_string(),
    ]
}
