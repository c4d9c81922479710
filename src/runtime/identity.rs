use crate::error::Result;

/// Resolves host account names to numeric ids.
pub trait AccountResolver {
    fn uid_of(&self, user: &str) -> Result<u32>;

    fn gid_of(&self, group: &str) -> Result<u32>;
}

/// Looks accounts up in the host's passwd and group databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccounts;

impl AccountResolver for SystemAccounts {
    fn uid_of(&self, user: &str) -> Result<u32> {
        sys::uid_of(user)
    }

    fn gid_of(&self, group: &str) -> Result<u32> {
        sys::gid_of(group)
    }
}

#[cfg(unix)]
mod sys {
    use std::ffi::CString;
    use std::io;

    use crate::error::{EngineError, Result};

    const MAX_BUFFER: usize = 1 << 20;

    fn c_name(kind: &str, name: &str) -> Result<CString> {
        CString::new(name).map_err(|_| EngineError::Account(format!("invalid {kind} name '{name}'")))
    }

    pub fn uid_of(user: &str) -> Result<u32> {
        let name = c_name("user", user)?;
        let mut buf: Vec<libc::c_char> = vec![0; 1024];
        loop {
            // SAFETY: passwd is plain old data; getpwnam_r fills it in.
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            // SAFETY: every pointer is valid for the duration of the call and
            // `buf.len()` is the true size of the scratch buffer.
            let rc = unsafe {
                libc::getpwnam_r(name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result)
            };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 {
                return Err(EngineError::Account(format!(
                    "lookup of user '{user}' failed: {}",
                    io::Error::from_raw_os_error(rc)
                )));
            }
            if result.is_null() {
                return Err(EngineError::Account(format!("user '{user}' does not exist")));
            }
            return Ok(pwd.pw_uid);
        }
    }

    pub fn gid_of(group: &str) -> Result<u32> {
        let name = c_name("group", group)?;
        let mut buf: Vec<libc::c_char> = vec![0; 1024];
        loop {
            // SAFETY: group is plain old data; getgrnam_r fills it in.
            let mut grp: libc::group = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::group = std::ptr::null_mut();
            // SAFETY: every pointer is valid for the duration of the call and
            // `buf.len()` is the true size of the scratch buffer.
            let rc = unsafe {
                libc::getgrnam_r(name.as_ptr(), &mut grp, buf.as_mut_ptr(), buf.len(), &mut result)
            };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 {
                return Err(EngineError::Account(format!(
                    "lookup of group '{group}' failed: {}",
                    io::Error::from_raw_os_error(rc)
                )));
            }
            if result.is_null() {
                return Err(EngineError::Account(format!("group '{group}' does not exist")));
            }
            return Ok(grp.gr_gid);
        }
    }
}

#[cfg(not(unix))]
mod sys {
    use crate::error::{EngineError, Result};

    pub fn uid_of(user: &str) -> Result<u32> {
        Err(EngineError::Account(format!(
            "cannot resolve user '{user}': account lookup needs a unix host"
        )))
    }

    pub fn gid_of(group: &str) -> Result<u32> {
        Err(EngineError::Account(format!(
            "cannot resolve group '{group}': account lookup needs a unix host"
        )))
    }
}

/// `uid:gid` string passed as the runtime's execution identity.
pub(crate) fn user_spec(uid: u32, gid: u32) -> String {
    format!("{uid}:{gid}")
}
