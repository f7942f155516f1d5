//! User lookup via the name service switch

use hostprobe_exec::shell_quote;

use crate::error::CheckError;
use crate::result::UserState;
use crate::strategy::{Probe, first_line};

/// `getent` exit status for a key not found in the database
const GETENT_NOT_FOUND: i32 = 2;

pub(crate) async fn inspect(probe: &mut Probe<'_>, name: &str) -> Result<UserState, CheckError> {
    let cmd = format!("getent passwd {}", shell_quote(name));
    let result = probe.run(&cmd).await?;

    match result.status {
        0 => parse_passwd(first_line(&result.stdout))
            .map_err(|reason| probe.unparsable(&cmd, reason)),
        GETENT_NOT_FOUND => Ok(UserState::missing()),
        _ => Err(probe.command_failed(&cmd, &result)),
    }
}

/// `www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin`
fn parse_passwd(line: &str) -> Result<UserState, String> {
    let fields: Vec<&str> = line.split(':').collect();
    let [_name, _password, uid, gid, _gecos, home, shell] = fields.as_slice() else {
        return Err(format!("expected 7 passwd fields, got '{line}'"));
    };

    let uid = uid.parse().map_err(|_| format!("bad uid '{uid}'"))?;
    let gid = gid.parse().map_err(|_| format!("bad gid '{gid}'"))?;

    Ok(UserState {
        exists: true,
        uid: Some(uid),
        gid: Some(gid),
        home: Some((*home).to_string()),
        shell: Some((*shell).to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_passwd() {
        let user = parse_passwd("www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin").unwrap();
        assert!(user.exists);
        assert_eq!(user.uid, Some(33));
        assert_eq!(user.home.as_deref(), Some("/var/www"));
        assert_eq!(user.shell.as_deref(), Some("/usr/sbin/nologin"));
    }

    #[test]
    fn test_parse_passwd_rejects_short_lines() {
        assert!(parse_passwd("www-data:x:33").is_err());
        assert!(parse_passwd("www-data:x:abc:33::/var/www:/bin/sh").is_err());
    }
}
