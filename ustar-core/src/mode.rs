use core::fmt::{self, Display, Write};

bitflags::bitflags! {
    /// Permission bits as stored in the mode field of a header
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Mode: u32 {
        const SETUID = 0o4000;
        const SETGID = 0o2000;
        const STICKY = 0o1000;

        const USER_READ = 0o400;
        const USER_WRITE = 0o200;
        const USER_EXEC = 0o100;
        const USER_RWX = 0o700;

        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const GROUP_EXEC = 0o010;
        const GROUP_RWX = 0o070;

        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;
        const OTHER_EXEC = 0o001;
        const OTHER_RWX = 0o007;

        const PERM = 0o777;
    }
}

/// Mode given to directories created during extraction (rwxr-xr-x)
pub const DEFAULT_DIR_MODE: Mode = Mode::USER_RWX
    .union(Mode::GROUP_READ)
    .union(Mode::GROUP_EXEC)
    .union(Mode::OTHER_READ)
    .union(Mode::OTHER_EXEC);

/// Permission bits in `ls` order, with the character shown when the bit is set
pub const PERMISSION_TABLE: [(Mode, char); 9] = [
    (Mode::USER_READ, 'r'),
    (Mode::USER_WRITE, 'w'),
    (Mode::USER_EXEC, 'x'),
    (Mode::GROUP_READ, 'r'),
    (Mode::GROUP_WRITE, 'w'),
    (Mode::GROUP_EXEC, 'x'),
    (Mode::OTHER_READ, 'r'),
    (Mode::OTHER_WRITE, 'w'),
    (Mode::OTHER_EXEC, 'x'),
];

impl Mode {
    pub fn perm(self) -> Mode {
        self & Mode::PERM
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, set) in PERMISSION_TABLE {
            f.write_char(if self.contains(bit) { set } else { '-' })?;
        }
        Ok(())
    }
}
