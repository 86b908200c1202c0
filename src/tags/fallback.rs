//! Secondary tag writer used when the direct attribute write is refused.
//!
//! Sandboxed or permission-restricted processes may be denied `setxattr` on
//! files outside their container. `osascript` runs with the user's
//! privileges and can set `NSURLTagNamesKey` through Foundation instead.

use std::{path::Path, sync::Arc};

use crate::process::CommandRunner;

use super::TagSet;

pub trait TagWriteFallback: Send + Sync {
    /// Replace the tags of `path` with `tags`.
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), String>;
}

const OSASCRIPT: &str = "/usr/bin/osascript";

/// Writes tags with a JavaScript-for-Automation snippet run by `osascript`.
#[derive(Clone)]
pub struct JxaTagWriter {
    runner: Arc<dyn CommandRunner>,
}

impl JxaTagWriter {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl TagWriteFallback for JxaTagWriter {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), String> {
        let script = jxa_script(path, tags)?;
        let args = vec![
            "-l".to_string(),
            "JavaScript".to_string(),
            "-e".to_string(),
            script,
        ];
        let output = self
            .runner
            .run(OSASCRIPT, &args)
            .map_err(|err| format!("Failed to launch osascript: {err}"))?;
        if output.is_success() {
            tracing::debug!("osascript tag write output: {}", output.stdout.trim());
            Ok(())
        } else {
            Err(format!(
                "osascript exited with {:?}: {}",
                output.code,
                output.stderr.trim()
            ))
        }
    }
}

/// Build the JXA program. Path and names are embedded as JSON literals,
/// which are valid JavaScript string literals.
pub(crate) fn jxa_script(path: &Path, tags: &TagSet) -> Result<String, String> {
    let path_literal = serde_json::to_string(&path.to_string_lossy())
        .map_err(|err| format!("Failed to encode path: {err}"))?;
    let tags_literal = serde_json::to_string(&tags.to_vec())
        .map_err(|err| format!("Failed to encode tags: {err}"))?;
    Ok(format!(
        r#"ObjC.import("Foundation");
const fileURL = $.NSURL.fileURLWithPath({path_literal});
const tagArray = $.NSArray.arrayWithArray({tags_literal});
const ok = fileURL.setResourceValueForKeyError(tagArray, $.NSURLTagNamesKey, null);
if (!ok) {{ throw new Error("setResourceValue failed"); }}
"ok";"#
    ))
}
