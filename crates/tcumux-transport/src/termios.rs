//! Line discipline helpers shared by the serial link and the pseudo terminals.

use std::io;
use std::os::fd::BorrowedFd;

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::sys::termios::{cfmakeraw, cfsetspeed, tcgetattr, tcsetattr, BaudRate, SetArg};

/// Put the terminal behind `fd` in raw mode, optionally fixing the line speed.
pub(crate) fn make_raw(fd: BorrowedFd<'_>, speed: Option<BaudRate>) -> io::Result<()> {
    let mut attrs = tcgetattr(fd)?;
    cfmakeraw(&mut attrs);
    if let Some(speed) = speed {
        cfsetspeed(&mut attrs, speed)?;
    }
    tcsetattr(fd, SetArg::TCSANOW, &attrs)?;
    Ok(())
}

/// Set `O_NONBLOCK` on `fd`.
pub(crate) fn set_nonblocking(fd: BorrowedFd<'_>) -> io::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    if flags.contains(OFlag::O_NONBLOCK) {
        return Ok(());
    }
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}
