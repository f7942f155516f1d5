//! Path lookup via `stat`

use hostprobe_exec::shell_quote;

use crate::error::CheckError;
use crate::result::{FileKind, FileState};
use crate::strategy::{Probe, first_line};

pub(crate) async fn inspect(probe: &mut Probe<'_>, path: &str) -> Result<FileState, CheckError> {
    let cmd = format!("stat -c '%F|%a|%U|%G|%s' {}", shell_quote(path));
    let result = probe.run(&cmd).await?;

    if result.success() {
        return parse_stat(first_line(&result.stdout))
            .map_err(|reason| probe.unparsable(&cmd, reason));
    }

    if result.stderr.contains("No such file or directory") {
        Ok(FileState::missing())
    } else {
        Err(probe.command_failed(&cmd, &result))
    }
}

/// `regular file|644|root|root|1024`
fn parse_stat(line: &str) -> Result<FileState, String> {
    let fields: Vec<&str> = line.split('|').collect();
    let [kind, mode, owner, group, size] = fields.as_slice() else {
        return Err(format!("expected 5 stat fields, got '{line}'"));
    };

    let kind = match *kind {
        "regular file" | "regular empty file" => FileKind::RegularFile,
        "directory" => FileKind::Directory,
        "symbolic link" => FileKind::Symlink,
        "socket" => FileKind::Socket,
        "fifo" => FileKind::Fifo,
        "block special file" => FileKind::BlockDevice,
        "character special file" => FileKind::CharDevice,
        _ => FileKind::Other,
    };
    let mode = u32::from_str_radix(mode, 8).map_err(|_| format!("bad mode '{mode}'"))?;
    let size = size.parse().map_err(|_| format!("bad size '{size}'"))?;

    Ok(FileState {
        exists: true,
        kind: Some(kind),
        mode: Some(mode),
        owner: Some((*owner).to_string()),
        group: Some((*group).to_string()),
        size: Some(size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat() {
        let file = parse_stat("regular file|644|root|root|1024").unwrap();
        assert_eq!(file.kind, Some(FileKind::RegularFile));
        assert_eq!(file.mode, Some(0o644));
        assert_eq!(file.size, Some(1024));

        let dir = parse_stat("directory|755|www-data|www-data|4096").unwrap();
        assert_eq!(dir.kind, Some(FileKind::Directory));
        assert_eq!(dir.owner.as_deref(), Some("www-data"));
    }

    #[test]
    fn test_parse_stat_rejects_other_formats() {
        assert!(parse_stat("  File: /etc/passwd").is_err());
        assert!(parse_stat("regular file|rw-r--r--|root|root|1").is_err());
    }
}
