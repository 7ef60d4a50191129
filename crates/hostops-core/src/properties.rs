//! `server.properties` editing.
//!
//! Patching keeps every line it does not touch byte for byte, including
//! comments and blank lines, and appends keys that were not present.

use std::collections::BTreeMap;

use tracing::info;

use crate::errors::HostError;
use crate::remote::RemoteSession;

pub fn parse_properties(contents: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    properties
}

/// Replace or append `key=value` pairs in properties text.
pub fn patch_properties(contents: &str, updates: &[(&str, &str)]) -> String {
    let mut applied = vec![false; updates.len()];
    let mut lines = contents
        .split('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                return line.to_string();
            }
            let Some((key, _)) = trimmed.split_once('=') else {
                return line.to_string();
            };
            match updates.iter().position(|(wanted, _)| *wanted == key.trim()) {
                Some(index) => {
                    applied[index] = true;
                    format!("{}={}", updates[index].0, updates[index].1)
                }
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>();

    let missing = updates
        .iter()
        .zip(&applied)
        .filter(|(_, done)| !**done)
        .map(|((key, value), _)| format!("{key}={value}"))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        // keep a trailing newline at the end of the file
        let trailing = lines.last().is_some_and(|line| line.is_empty());
        if trailing {
            lines.pop();
        }
        lines.extend(missing);
        if trailing {
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

/// Read the remote properties file, apply `updates` and write it back whole.
/// Not atomic: an edit made on the host between the read and the write is lost.
pub fn update_remote_properties(
    session: &dyn RemoteSession,
    path: &str,
    updates: &[(&str, &str)],
) -> Result<(), HostError> {
    let contents = read_text(session, path)?;
    let patched = patch_properties(&contents, updates);
    session.write(path, patched.as_bytes())?;
    for (key, value) in updates {
        info!("set {key}={value}");
    }
    Ok(())
}

pub fn read_remote_properties(
    session: &dyn RemoteSession,
    path: &str,
) -> Result<BTreeMap<String, String>, HostError> {
    Ok(parse_properties(&read_text(session, path)?))
}

/// Undecodable bytes are an error; a lossy decode would rewrite lines the
/// patch never matched.
fn read_text(session: &dyn RemoteSession, path: &str) -> Result<String, HostError> {
    let raw = session.read(path)?;
    String::from_utf8(raw).map_err(|err| {
        HostError::Configuration(format!("{path} is not valid UTF-8: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryRemote;

    const SAMPLE: &str = "#Minecraft server properties\nlevel-type=minecraft\\:normal\nmotd=Hello = world\nlevel-seed=\n";

    #[test]
    fn patch_replaces_in_place_and_appends_missing_keys() {
        let patched = patch_properties(
            SAMPLE,
            &[
                ("level-seed", "1234"),
                ("level-type", "minecraft:flat"),
                ("generator-settings", "{}"),
            ],
        );
        assert_eq!(
            patched,
            "#Minecraft server properties\nlevel-type=minecraft:flat\nmotd=Hello = world\nlevel-seed=1234\ngenerator-settings={}\n"
        );
    }

    #[test]
    fn comments_are_never_rewritten() {
        let patched = patch_properties("#level-seed=old\nlevel-seed=1", &[("level-seed", "2")]);
        assert_eq!(patched, "#level-seed=old\nlevel-seed=2");
    }

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let parsed = parse_properties(SAMPLE);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.get("motd").map(String::as_str), Some("Hello = world"));
        assert_eq!(parsed.get("level-seed").map(String::as_str), Some(""));
    }

    #[test]
    fn remote_update_round_trips_the_file() {
        let remote = MemoryRemote::new();
        remote.add_file("/server.properties", SAMPLE.as_bytes());
        update_remote_properties(&remote, "/server.properties", &[("level-seed", "42")])
            .expect("update");
        let props = read_remote_properties(&remote, "/server.properties").expect("read");
        assert_eq!(props.get("level-seed").map(String::as_str), Some("42"));
        assert_eq!(
            props.get("level-type").map(String::as_str),
            Some("minecraft\\:normal")
        );
    }

    #[test]
    fn non_utf8_file_is_left_untouched() {
        let original = b"motd=Caf\xE9\nlevel-seed=1\n".to_vec();
        let remote = MemoryRemote::new();
        remote.add_file("/server.properties", &original);

        let err = update_remote_properties(&remote, "/server.properties", &[("level-seed", "2")])
            .expect_err("invalid utf-8");

        assert!(err.to_string().contains("not valid UTF-8"));
        assert_eq!(remote.contents("/server.properties"), Some(original));
    }
}
